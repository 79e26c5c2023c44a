// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for junit-xray.
//!
//! Configuration is layered: the built-in defaults in `default-config.toml` are overridden by a
//! repository config file (`.config/junit-xray.toml` by default), which is in turn overridden by
//! values set through the setters on [`XrayConfig`] (typically from command-line flags).

use crate::{
    errors::{ConfigReadError, ConfigReadErrorKind, LoggingModeParseError},
    helpers::resolve_output_path,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::{collections::BTreeSet, fmt, str::FromStr};
use tracing::warn;

/// Which captured output is written to the report.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingMode {
    /// No captured output is written.
    #[default]
    No,

    /// Captured log records and stdout are written to `system-out`.
    Log,

    /// Accepted for compatibility; writes no captured output.
    SystemOut,

    /// Captured stderr is written to `system-err`.
    SystemErr,

    /// Captured stderr is written to `system-err`.
    OutErr,

    /// Log records and stdout are written to `system-out`, stderr to `system-err`.
    All,
}

impl LoggingMode {
    /// Returns the string representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["no", "log", "system-out", "system-err", "out-err", "all"]
    }

    /// Returns true if captured log records are written.
    pub fn includes_log(self) -> bool {
        matches!(self, Self::Log | Self::All)
    }

    /// Returns true if captured stdout is written.
    pub fn includes_stdout(self) -> bool {
        matches!(self, Self::Log | Self::All)
    }

    /// Returns true if captured stderr is written.
    pub fn includes_stderr(self) -> bool {
        matches!(self, Self::SystemErr | Self::OutErr | Self::All)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Log => "log",
            Self::SystemOut => "system-out",
            Self::SystemErr => "system-err",
            Self::OutErr => "out-err",
            Self::All => "all",
        }
    }
}

impl FromStr for LoggingMode {
    type Err = LoggingModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s {
            "no" => Self::No,
            "log" => Self::Log,
            "system-out" => Self::SystemOut,
            "system-err" => Self::SystemErr,
            "out-err" => Self::OutErr,
            "all" => Self::All,
            other => return Err(LoggingModeParseError::new(other)),
        };
        Ok(mode)
    }
}

impl fmt::Display for LoggingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall configuration for junit-xray.
///
/// Create one with [`XrayConfig::from_sources`] or [`XrayConfig::default_config`], then apply
/// overrides through the setters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct XrayConfig {
    base_dir: Utf8PathBuf,
    path: Option<Utf8PathBuf>,
    suite_name: String,
    logging: LoggingMode,
    log_passing_tests: bool,
}

impl XrayConfig {
    /// The default location of the config within the base directory.
    pub const CONFIG_PATH: &'static str = ".config/junit-xray.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given sources.
    ///
    /// If `file` is `None`, the config is read from [`Self::CONFIG_PATH`] within `base_dir` if it
    /// exists. If `file` is specified, it must exist. Relative paths in the config are resolved
    /// against `base_dir`.
    pub fn from_sources(
        base_dir: impl Into<Utf8PathBuf>,
        file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigReadError> {
        let base_dir = base_dir.into();
        let (config_file, source) = match file {
            Some(file) => {
                let config_file = base_dir.join(file);
                let source = File::new(config_file.as_str(), FileFormat::Toml);
                (config_file, source)
            }
            None => {
                let config_file = base_dir.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let config = builder
            .build()
            .map_err(|error| ConfigReadErrorKind::BuildError(Box::new(error)))
            .and_then(Self::deserialize_config)
            .map_err(|kind| ConfigReadError::new(&config_file, kind))?;

        Ok(Self::from_deserialized(base_dir, config))
    }

    /// Returns the default config, with relative paths resolved against `base_dir`.
    pub fn default_config(base_dir: impl Into<Utf8PathBuf>) -> Self {
        let config = Self::make_default_config()
            .build()
            .map_err(|error| ConfigReadErrorKind::BuildError(Box::new(error)))
            .and_then(Self::deserialize_config)
            .expect("default config is always valid");

        Self::from_deserialized(base_dir.into(), config)
    }

    /// Returns the configured output path, as written in the config.
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Returns the name of the root `test_suite` element.
    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    /// Returns the logging mode.
    pub fn logging(&self) -> LoggingMode {
        self.logging
    }

    /// Returns true if captured output is written for passing tests.
    pub fn log_passing_tests(&self) -> bool {
        self.log_passing_tests
    }

    /// Sets the output path.
    pub fn set_path(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the name of the root `test_suite` element.
    pub fn set_suite_name(&mut self, suite_name: impl Into<String>) -> &mut Self {
        self.suite_name = suite_name.into();
        self
    }

    /// Sets the logging mode.
    pub fn set_logging(&mut self, logging: LoggingMode) -> &mut Self {
        self.logging = logging;
        self
    }

    /// Sets whether captured output is written for passing tests.
    pub fn set_log_passing_tests(&mut self, log_passing_tests: bool) -> &mut Self {
        self.log_passing_tests = log_passing_tests;
        self
    }

    /// Returns the report configuration, or `None` if no output path is configured.
    ///
    /// The output path is resolved: environment variables are expanded, then a leading `~` is
    /// expanded to the home directory. Relative paths are made absolute against the base
    /// directory, and `.` and `..` are normalized.
    pub fn report_config(&self) -> Option<ReportConfig> {
        let path = self.path.as_deref()?;
        let home_dir = home::home_dir().and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok());
        Some(ReportConfig {
            path: resolve_output_path(path, &self.base_dir, home_dir.as_deref(), |name| {
                std::env::var(name).ok()
            }),
            suite_name: self.suite_name.clone(),
            logging: self.logging,
            log_passing_tests: self.log_passing_tests,
        })
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> config::ConfigBuilder<config::builder::DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn deserialize_config(config: Config) -> Result<XrayConfigDeserialize, ConfigReadErrorKind> {
        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: XrayConfigDeserialize =
            serde_path_to_error::deserialize(ignored_de).map_err(|error| {
                // The config crate reports the key as well: drop it from the inner error.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigReadErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        if !ignored.is_empty() {
            let keys: Vec<_> = ignored.into_iter().collect();
            warn!("ignoring unknown configuration keys: {}", keys.join(", "));
        }

        Ok(config)
    }

    fn from_deserialized(base_dir: Utf8PathBuf, config: XrayConfigDeserialize) -> Self {
        let ReportConfigDeserialize {
            path,
            suite_name,
            logging,
            log_passing_tests,
        } = config.junit_xray;
        Self {
            base_dir,
            path,
            suite_name,
            logging,
            log_passing_tests,
        }
    }
}

/// Fully resolved configuration for writing a report.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReportConfig {
    path: Utf8PathBuf,
    suite_name: String,
    logging: LoggingMode,
    log_passing_tests: bool,
}

impl ReportConfig {
    /// Creates a new `ReportConfig` writing to the given absolute path, with default settings
    /// otherwise.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            suite_name: "pytest".to_owned(),
            logging: LoggingMode::No,
            log_passing_tests: true,
        }
    }

    /// Returns the path the report is written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the name of the root `test_suite` element.
    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    /// Returns the logging mode.
    pub fn logging(&self) -> LoggingMode {
        self.logging
    }

    /// Returns true if captured output is written for passing tests.
    pub fn log_passing_tests(&self) -> bool {
        self.log_passing_tests
    }

    /// Sets the name of the root `test_suite` element.
    pub fn with_suite_name(mut self, suite_name: impl Into<String>) -> Self {
        self.suite_name = suite_name.into();
        self
    }

    /// Sets the logging mode.
    pub fn with_logging(mut self, logging: LoggingMode) -> Self {
        self.logging = logging;
        self
    }

    /// Sets whether captured output is written for passing tests.
    pub fn with_log_passing_tests(mut self, log_passing_tests: bool) -> Self {
        self.log_passing_tests = log_passing_tests;
        self
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct XrayConfigDeserialize {
    junit_xray: ReportConfigDeserialize,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportConfigDeserialize {
    #[serde(default)]
    path: Option<Utf8PathBuf>,
    suite_name: String,
    logging: LoggingMode,
    log_passing_tests: bool,
}
