// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Build JUnit XML reports from the lifecycle events of a test run.
//!
//! The main type here is [`ReportBuilder`], which consumes [`ReporterEvent`]s.

mod captured;
mod events;
mod junit;

pub use events::*;
pub use junit::ReportBuilder;
