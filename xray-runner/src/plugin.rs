// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Activation of the report builder within a host test framework.
//!
//! The host calls [`XrayPlugin::configure`] once at startup, forwards every lifecycle event through
//! [`XrayPlugin::dispatch`], and calls [`XrayPlugin::unconfigure`] at shutdown.

use crate::{
    config::{ReportConfig, XrayConfig},
    errors::WriteEventError,
    reporter::{ReportBuilder, ReporterEvent},
};
use std::ffi::OsStr;
use tracing::{debug, warn};

/// The environment variable that marks a process as a parallel-execution worker.
pub const WORKER_ENV: &str = "JUNIT_XRAY_WORKER";

/// The role of the current process within a (possibly parallel) test run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProcessRole {
    /// The process that coordinates the run. Only this process writes a report.
    Controller,

    /// A worker process running a subset of tests on behalf of the controller.
    Worker,
}

impl ProcessRole {
    /// Detects the role of the current process from [`WORKER_ENV`].
    pub fn detect() -> Self {
        Self::from_env_value(std::env::var_os(WORKER_ENV).as_deref())
    }

    fn from_env_value(value: Option<&OsStr>) -> Self {
        match value {
            None => Self::Controller,
            Some(value) if value.is_empty() || value == "0" => Self::Controller,
            Some(_) => Self::Worker,
        }
    }
}

/// Owns the report builder for a run, if one is active.
#[derive(Debug, Default)]
pub struct XrayPlugin {
    builder: Option<ReportBuilder>,
}

impl XrayPlugin {
    /// Creates a new, inactive plugin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates the plugin if `config` has an output path and this is not a worker process.
    ///
    /// Returns true if a report builder was registered.
    pub fn configure(&mut self, config: &XrayConfig, role: ProcessRole) -> bool {
        self.configure_report(config.report_config(), role)
    }

    /// Activates the plugin with an already-resolved report config.
    ///
    /// Returns true if a report builder was registered.
    pub fn configure_report(&mut self, config: Option<ReportConfig>, role: ProcessRole) -> bool {
        let Some(config) = config else {
            debug!("no report path configured: junit-xray is disabled");
            return false;
        };
        if role == ProcessRole::Worker {
            debug!("running in a worker process: the controller writes the report");
            return false;
        }
        if self.builder.is_some() {
            warn!("junit-xray was already configured: replacing the existing report");
        }

        debug!(path = %config.path(), "junit-xray enabled");
        self.builder = Some(ReportBuilder::new(config));
        true
    }

    /// Returns true if a report builder is registered.
    pub fn is_active(&self) -> bool {
        self.builder.is_some()
    }

    /// Returns the registered report builder, if any.
    pub fn builder_mut(&mut self) -> Option<&mut ReportBuilder> {
        self.builder.as_mut()
    }

    /// Forwards an event to the registered report builder. Does nothing if inactive.
    pub fn dispatch(&mut self, event: ReporterEvent) -> Result<(), WriteEventError> {
        match &mut self.builder {
            Some(builder) => builder.write_event(event),
            None => Ok(()),
        }
    }

    /// Deregisters the report builder, returning it.
    pub fn unconfigure(&mut self) -> Option<ReportBuilder> {
        self.builder.take()
    }
}
