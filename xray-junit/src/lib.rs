// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Generate and read JUnit reports that carry Jira Xray metadata.
//!
//! The document produced here has a single `test_suite` root with one `testcase` per executed
//! test. Test cases may carry a `properties` container holding Xray-specific metadata: evidence
//! attachments, descriptions, summaries, keys and ids.
//!
//! The main types are [`TestSuite`], [`TestCase`] and [`Property`]. Reports can be read back into
//! a generic [`XmlElement`] tree, which is useful for inspecting or verifying a written report.

mod errors;
mod read;
mod report;
mod serialize;

pub use errors::*;
pub use read::*;
pub use report::*;
