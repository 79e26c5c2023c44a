// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;
use xray_junit::ReadError;
use xray_runner::errors::{ConfigReadError, WriteEventError};

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `xray-report` failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum XrayExitCode {}

impl XrayExitCode {
    /// No errors occurred and `xray-report` exited normally.
    pub const OK: i32 = 0;

    /// A user issue happened while setting up an `xray-report` invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// The event stream could not be read or parsed.
    pub const EVENT_PARSE_ERROR: i32 = 97;

    /// A test recorded a single-valued property more than once, so the report was aborted.
    pub const PROPERTY_ERROR: i32 = 98;

    /// Writing the report produced an error.
    pub const REPORT_WRITE_ERROR: i32 = 99;
}

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected error: a problem with the input rather than a bug in `xray-report`.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("current directory is invalid")]
    CurrentDirInvalid {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: std::path::PathBuf },
    #[error("config read error")]
    ConfigReadError {
        #[from]
        err: ConfigReadError,
    },
    #[error("event stream open error")]
    EventStreamOpenError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("event stream read error")]
    EventStreamReadError {
        source_name: String,
        #[source]
        err: std::io::Error,
    },
    #[error("event parse error")]
    EventParseError {
        source_name: String,
        line_number: usize,
        #[source]
        err: serde_json::Error,
    },
    #[error("write event error")]
    WriteEventError {
        #[from]
        err: WriteEventError,
    },
    #[error("report read error")]
    ReportReadError {
        path: Utf8PathBuf,
        #[source]
        err: ReadError,
    },
    #[error("report open error")]
    ReportOpenError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("not a junit-xray report")]
    NotAReport { path: Utf8PathBuf, root: String },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn event_parse_error(
        source_name: impl Into<String>,
        line_number: usize,
        err: serde_json::Error,
    ) -> Self {
        Self::EventParseError {
            source_name: source_name.into(),
            line_number,
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirInvalid { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigReadError { .. }
            | Self::ReportReadError { .. }
            | Self::ReportOpenError { .. }
            | Self::NotAReport { .. } => XrayExitCode::SETUP_ERROR,
            Self::EventStreamOpenError { .. }
            | Self::EventStreamReadError { .. }
            | Self::EventParseError { .. } => XrayExitCode::EVENT_PARSE_ERROR,
            Self::WriteEventError { err } => match err {
                WriteEventError::Property { .. } | WriteEventError::Aborted { .. } => {
                    XrayExitCode::PROPERTY_ERROR
                }
                _ => XrayExitCode::REPORT_WRITE_ERROR,
            },
            Self::WriteOutputError { .. } => XrayExitCode::REPORT_WRITE_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirInvalid { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigReadError { err } => {
                error!(
                    "failed to read config file `{}`",
                    err.config_file().style(styles.bold)
                );
                err.source()
            }
            Self::EventStreamOpenError { path, err } => {
                error!("failed to open event stream `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::EventStreamReadError { source_name, err } => {
                error!(
                    "failed to read event stream from {}",
                    source_name.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::EventParseError {
                source_name,
                line_number,
                err,
            } => {
                error!(
                    "failed to parse event at {}:{}",
                    source_name.style(styles.bold),
                    line_number,
                );
                Some(err as &dyn Error)
            }
            Self::WriteEventError { err } => {
                match err {
                    WriteEventError::Property { test_id, .. } => {
                        error!(
                            "test `{}` recorded invalid Xray properties: no report will be written",
                            test_id.style(styles.bold)
                        );
                    }
                    WriteEventError::Aborted { test_id, .. } => {
                        error!(
                            "report was aborted by invalid Xray properties recorded by test `{}`",
                            test_id.style(styles.bold)
                        );
                    }
                    WriteEventError::AlreadyFinished => {
                        error!("received an event after the suite finished");
                    }
                    other => {
                        error!("{other}");
                    }
                }
                err.source()
            }
            Self::ReportOpenError { path, err } => {
                error!("failed to open report `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::ReportReadError { path, err } => {
                error!("failed to read report `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::NotAReport { path, root } => {
                error!(
                    "`{}` is not a junit-xray report: expected root element `test_suite`, found `{}`",
                    path.style(styles.bold),
                    root,
                );
                None
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xray_runner::{errors::PropertyError, reporter::TestId};

    #[test]
    fn exit_codes() {
        let property_error = PropertyError::MoreThanOneId {
            values: vec!["1".to_owned(), "2".to_owned()],
        };
        let cases = [
            (
                ExpectedError::from(WriteEventError::Property {
                    test_id: TestId::new("t"),
                    error: property_error.clone(),
                }),
                XrayExitCode::PROPERTY_ERROR,
            ),
            (
                ExpectedError::from(WriteEventError::Aborted {
                    test_id: TestId::new("t"),
                    error: property_error,
                }),
                XrayExitCode::PROPERTY_ERROR,
            ),
            (
                ExpectedError::from(WriteEventError::AlreadyFinished),
                XrayExitCode::REPORT_WRITE_ERROR,
            ),
            (
                ExpectedError::event_parse_error(
                    "<stdin>",
                    3,
                    serde_json::from_str::<serde_json::Value>("{").expect_err("invalid JSON"),
                ),
                XrayExitCode::EVENT_PARSE_ERROR,
            ),
            (
                ExpectedError::NotAReport {
                    path: "report.xml".into(),
                    root: "testsuites".to_owned(),
                },
                XrayExitCode::SETUP_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.process_exit_code(), expected, "exit code for {error:?}");
        }
    }
}
