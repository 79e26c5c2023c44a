// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by junit-xray.

use crate::{config::LoggingMode, properties::PropertyKind, reporter::TestId};
use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use std::{error, fmt};
use thiserror::Error;

/// An error that occurred while reading the config.
#[derive(Debug, Error)]
#[error("failed to read junit-xray config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigReadError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigReadErrorKind,
}

impl ConfigReadError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigReadErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigReadErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while reading the config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigReadErrorKind {
    /// An error occurred while reading or merging the config sources.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the merged config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// Error returned while parsing a [`LoggingMode`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for logging mode: {input}\n(known values: {})",
    LoggingMode::variants().join(", "),
)]
pub struct LoggingModeParseError {
    input: String,
}

impl LoggingModeParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// A single-valued property was recorded more than once for a test.
///
/// Summaries, keys and ids map to a single field of the Xray test run, so at most one value is
/// accepted per test.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum PropertyError {
    /// More than one test summary was recorded.
    #[error("found {} test summaries: {}", .values.len(), DisplayValues(.values))]
    MoreThanOneSummary {
        /// The recorded values, in recording order.
        values: Vec<String>,
    },

    /// More than one test key was recorded.
    #[error("found {} test keys: {}", .values.len(), DisplayValues(.values))]
    MoreThanOneKey {
        /// The recorded values, in recording order.
        values: Vec<String>,
    },

    /// More than one test id was recorded.
    #[error("found {} test ids: {}", .values.len(), DisplayValues(.values))]
    MoreThanOneId {
        /// The recorded values, in recording order.
        values: Vec<String>,
    },
}

impl PropertyError {
    pub(crate) fn more_than_one(kind: PropertyKind, values: Vec<String>) -> Option<Self> {
        match kind {
            PropertyKind::Summary => Some(Self::MoreThanOneSummary { values }),
            PropertyKind::Key => Some(Self::MoreThanOneKey { values }),
            PropertyKind::Id => Some(Self::MoreThanOneId { values }),
            PropertyKind::Evidence | PropertyKind::Description => None,
        }
    }

    /// Returns the kind of property that was recorded more than once.
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::MoreThanOneSummary { .. } => PropertyKind::Summary,
            Self::MoreThanOneKey { .. } => PropertyKind::Key,
            Self::MoreThanOneId { .. } => PropertyKind::Id,
        }
    }

    /// Returns the offending values.
    pub fn values(&self) -> &[String] {
        match self {
            Self::MoreThanOneSummary { values }
            | Self::MoreThanOneKey { values }
            | Self::MoreThanOneId { values } => values,
        }
    }

    /// Returns the number of values that were recorded.
    pub fn count(&self) -> usize {
        self.values().len()
    }
}

struct DisplayValues<'a>(&'a [String]);

impl fmt::Display for DisplayValues<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value:?}")?;
        }
        Ok(())
    }
}

/// An error that occurs while handling a reporter event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit output to {file}")]
    Junit {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: xray_junit::SerializeError,
    },

    /// The properties recorded by a test could not be converted to report nodes.
    ///
    /// Once this error has been returned, the report is aborted.
    #[error("invalid properties recorded by test `{test_id}`")]
    Property {
        /// The test that recorded the properties.
        test_id: TestId,

        /// The underlying error.
        #[source]
        error: PropertyError,
    },

    /// The report was aborted by an earlier error, so it was not written.
    #[error("report not written: aborted by invalid properties recorded by test `{test_id}`")]
    Aborted {
        /// The test that caused the report to be aborted.
        test_id: TestId,

        /// The error that caused the report to be aborted.
        #[source]
        error: PropertyError,
    },

    /// The suite was already finished and its report written.
    #[error("suite already finished: the report has already been written")]
    AlreadyFinished,
}

/// Displays a chained error, including all of its sources.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E> fmt::Display for DisplayErrorChain<E>
where
    E: error::Error,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        while let Some(error) = source {
            write!(f, "\n  caused by:\n  - {error}")?;
            source = error.source();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_error_display() {
        let error = PropertyError::MoreThanOneSummary {
            values: vec!["first".to_owned(), "second \"quoted\"".to_owned()],
        };
        assert_eq!(error.count(), 2);
        assert_eq!(error.kind(), PropertyKind::Summary);
        assert_eq!(
            error.to_string(),
            r#"found 2 test summaries: "first", "second \"quoted\"""#
        );
    }

    #[test]
    fn display_error_chain() {
        let error = WriteEventError::Aborted {
            test_id: TestId::new("tests/test_a.py::test_key"),
            error: PropertyError::MoreThanOneKey {
                values: vec!["JIRA-1".to_owned(), "JIRA-2".to_owned()],
            },
        };
        assert_eq!(
            DisplayErrorChain::new(&error).to_string(),
            "report not written: aborted by invalid properties recorded by test \
             `tests/test_a.py::test_key`\n  caused by:\n  - found 2 test keys: \"JIRA-1\", \"JIRA-2\""
        );
    }
}
