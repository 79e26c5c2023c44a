// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Build JUnit XML reports with Jira Xray metadata from the lifecycle events of a test run.
//!
//! A host test framework feeds [`ReporterEvent`](reporter::ReporterEvent)s into an
//! [`XrayPlugin`](plugin::XrayPlugin), which owns a [`ReportBuilder`](reporter::ReportBuilder)
//! in the coordinating process. Tests attach Xray metadata through a
//! [`PropertyRecorder`](properties::PropertyRecorder); the recorded properties travel with the
//! test's reports.

pub mod config;
pub mod errors;
mod helpers;
pub mod plugin;
pub mod properties;
pub mod reporter;
mod time;
