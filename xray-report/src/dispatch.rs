// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::{Result, XrayExitCode},
    output::{OutputContext, OutputOpts, OutputWriter, SummaryStyles, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
};
use tracing::{debug, info, warn};
use xray_junit::XmlElement;
use xray_runner::{
    config::{LoggingMode, XrayConfig},
    plugin::{ProcessRole, XrayPlugin},
    reporter::ReporterEvent,
};

/// Write JUnit XML reports with Jira Xray metadata.
///
/// Test frameworks describe a run as a stream of JSON lifecycle events, one per line. `xray-report
/// run` turns that stream into a report; `xray-report summarize` prints an existing report.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct XrayReportApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl XrayReportApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Run(opts) => {
                let cwd = current_dir()?;
                opts.exec(&cwd)
            }
            Command::Summarize { report } => summarize(&report, output, output_writer),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a report from a stream of test events
    ///
    /// Events are read as JSON lines from EVENTS, or from standard input if EVENTS is `-`. The
    /// report is written once the `suite-finished` event is seen.
    Run(RunOpts),

    /// Print a summary of an existing report
    Summarize {
        /// Path to the report
        #[arg(value_name = "REPORT")]
        report: Utf8PathBuf,
    },
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Where to write the report [default: from the config file, or disabled]
    #[arg(
        long = "junit-xray-xml",
        alias = "junitxrayxml",
        value_name = "PATH",
        env = "JUNIT_XRAY_XML"
    )]
    junit_xray_xml: Option<Utf8PathBuf>,

    /// Config file [default: .config/junit-xray.toml]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Name of the test suite in the report
    #[arg(long, value_name = "NAME")]
    suite_name: Option<String>,

    /// Which captured output to include: no, log, system-out, system-err, out-err, all
    #[arg(long, value_name = "MODE")]
    logging: Option<LoggingMode>,

    /// Whether to include captured output for passing tests
    #[arg(long, value_name = "BOOL")]
    log_passing_tests: Option<bool>,

    /// Hostname to record in the report [default: this machine's hostname]
    #[arg(long, value_name = "NAME")]
    hostname: Option<String>,

    /// Treat this process as a worker: events are parsed but no report is written
    #[arg(long)]
    worker: bool,

    /// File to read events from, or `-` for standard input
    #[arg(value_name = "EVENTS", default_value = "-")]
    events: Utf8PathBuf,
}

impl RunOpts {
    fn make_config(&self, cwd: &Utf8Path) -> Result<XrayConfig> {
        let mut config = XrayConfig::from_sources(cwd, self.config_file.as_deref())?;
        if let Some(path) = &self.junit_xray_xml {
            config.set_path(path.clone());
        }
        if let Some(suite_name) = &self.suite_name {
            config.set_suite_name(suite_name.clone());
        }
        if let Some(logging) = self.logging {
            config.set_logging(logging);
        }
        if let Some(log_passing_tests) = self.log_passing_tests {
            config.set_log_passing_tests(log_passing_tests);
        }
        Ok(config)
    }

    fn role(&self) -> ProcessRole {
        if self.worker {
            ProcessRole::Worker
        } else {
            ProcessRole::detect()
        }
    }

    fn exec(self, cwd: &Utf8Path) -> Result<i32> {
        let config = self.make_config(cwd)?;

        let mut plugin = XrayPlugin::new();
        if plugin.configure(&config, self.role()) {
            if let Some(hostname) = &self.hostname
                && let Some(builder) = plugin.builder_mut()
            {
                builder.set_hostname(hostname.clone());
            }
        } else {
            info!("no report will be written");
        }

        let (source_name, reader) = open_events(&self.events)?;
        let finished = replay_events(&source_name, reader, &mut plugin)?;

        if let Some(builder) = plugin.unconfigure()
            && !finished
        {
            warn!(
                "event stream ended before the suite finished: report `{}` was not written",
                builder.config().path()
            );
        }

        Ok(XrayExitCode::OK)
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(|err| ExpectedError::CurrentDirInvalid { err })?;
    Utf8PathBuf::try_from(cwd)
        .map_err(|err| ExpectedError::CurrentDirInvalidUtf8 { path: err.into_path_buf() })
}

fn open_events(events: &Utf8Path) -> Result<(String, Box<dyn BufRead>)> {
    if events.as_str() == "-" {
        return Ok(("<stdin>".to_owned(), Box::new(io::stdin().lock())));
    }

    let file = File::open(events).map_err(|err| ExpectedError::EventStreamOpenError {
        path: events.to_owned(),
        err,
    })?;
    Ok((events.to_string(), Box::new(BufReader::new(file))))
}

/// Feeds every event in `reader` to `plugin`.
///
/// Blank lines are skipped. Returns true if a `suite-finished` event was seen.
fn replay_events(source_name: &str, reader: impl BufRead, plugin: &mut XrayPlugin) -> Result<bool> {
    let mut finished = false;
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| ExpectedError::EventStreamReadError {
            source_name: source_name.to_owned(),
            err,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let event: ReporterEvent = serde_json::from_str(&line)
            .map_err(|err| ExpectedError::event_parse_error(source_name, index + 1, err))?;
        debug!(line = index + 1, ?event, "replaying event");

        finished |= matches!(event, ReporterEvent::SuiteFinished);
        plugin.dispatch(event)?;
    }

    Ok(finished)
}

fn summarize(
    report: &Utf8Path,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let file = File::open(report).map_err(|err| ExpectedError::ReportOpenError {
        path: report.to_owned(),
        err,
    })?;
    let root = XmlElement::from_reader(BufReader::new(file)).map_err(|err| {
        ExpectedError::ReportReadError {
            path: report.to_owned(),
            err,
        }
    })?;
    if root.name != "test_suite" {
        return Err(ExpectedError::NotAReport {
            path: report.to_owned(),
            root: root.name,
        });
    }

    let styles = output.stdout_styles();
    let mut writer = output_writer.stdout_writer();
    write_summary(&root, &styles, output.verbose, &mut writer)
        .and_then(|()| writer.flush())
        .map_err(|err| ExpectedError::WriteOutputError { err })?;

    Ok(XrayExitCode::OK)
}

fn write_summary(
    suite: &XmlElement,
    styles: &SummaryStyles,
    verbose: bool,
    writer: &mut dyn Write,
) -> io::Result<()> {
    let count = |name: &str| suite.attr(name).unwrap_or("0");

    writeln!(
        writer,
        "{}: {} tests, {} failed, {} errors, {} skipped in {}s",
        suite.attr("name").unwrap_or_default().style(styles.bold),
        count("tests"),
        count("failures"),
        count("errors"),
        count("skipped"),
        suite.attr("time").unwrap_or("0"),
    )?;

    for test_case in suite.children_named("testcase") {
        let name = test_case.attr("name").unwrap_or_default();
        let mut passed = true;

        for failure in test_case.children_named("failure") {
            passed = false;
            writeln!(writer, "{:>8} {name}", "FAIL".style(styles.fail))?;
            if verbose {
                for line in failure.text().lines() {
                    writeln!(writer, "           {line}")?;
                }
            }
        }
        for error in test_case.children_named("error") {
            passed = false;
            writeln!(
                writer,
                "{:>8} {name}: {}",
                "ERROR".style(styles.error),
                error.attr("message").unwrap_or_default(),
            )?;
        }
        for skipped in test_case.children_named("skipped") {
            passed = false;
            writeln!(
                writer,
                "{:>8} {name}: {}",
                "SKIP".style(styles.skip),
                skipped.attr("message").unwrap_or_default(),
            )?;
        }

        if passed && verbose {
            writeln!(writer, "{:>8} {name}", "PASS".style(styles.pass))?;
        }
    }

    Ok(())
}
