// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Code to build JUnit XML reports with Xray metadata from reporter events.

use crate::{
    config::ReportConfig,
    errors::{DisplayErrorChain, PropertyError, WriteEventError},
    helpers::convert_path_to_forward_slash,
    properties::to_junit_properties,
    reporter::{
        captured::format_captured,
        events::{PhaseOutcome, ReporterEvent, TestId, TestLocation, TestPhase, TestReport},
    },
    time::{StopwatchStart, stopwatch},
};
use debug_ignore::DebugIgnore;
use indexmap::IndexMap;
use std::{
    fs::File,
    io::{BufWriter, Write},
    time::Duration,
};
use tracing::{debug, info, warn};
use xray_junit::{TestCase, TestCaseError, TestCaseStatus, TestSuite};

/// Builds a report from reporter events.
///
/// The report is accumulated in memory as events arrive, and written to disk exactly once, when the
/// suite finishes. If the suite never finishes, no file is written.
#[derive(Debug)]
pub struct ReportBuilder {
    config: ReportConfig,
    hostname: Option<String>,
    suite: DebugIgnore<TestSuite>,
    stopwatch: Option<StopwatchStart>,
    tests: IndexMap<TestId, InProgressTest>,
    state: BuilderState,
}

impl ReportBuilder {
    /// Creates a new builder that writes to the location in `config`.
    pub fn new(config: ReportConfig) -> Self {
        let suite = TestSuite::new(config.suite_name());
        Self {
            config,
            hostname: None,
            suite: DebugIgnore(suite),
            stopwatch: None,
            tests: IndexMap::new(),
            state: BuilderState::Running,
        }
    }

    /// Sets the hostname recorded in the report.
    ///
    /// By default, the hostname of the current machine is used.
    pub fn set_hostname(&mut self, hostname: impl Into<String>) -> &mut Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Returns the configuration this builder writes with.
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Returns the suite built so far.
    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    /// Handles a single event.
    pub fn write_event(&mut self, event: ReporterEvent) -> Result<(), WriteEventError> {
        match event {
            ReporterEvent::SuiteStarted => self.on_suite_start(),
            ReporterEvent::TestStarted { id, location } => self.on_test_start(id, location),
            ReporterEvent::TestReport(report) => self.on_test_report(&report),
            ReporterEvent::SuiteFinished => self.on_suite_finish(),
        }
    }

    /// Records the start of the suite.
    pub fn on_suite_start(&mut self) -> Result<(), WriteEventError> {
        if !self.check_running()? {
            return Ok(());
        }

        debug!("suite started");
        self.stopwatch = Some(stopwatch());
        Ok(())
    }

    /// Records where a test is defined. The test case node is created once the test reports.
    pub fn on_test_start(
        &mut self,
        id: TestId,
        location: TestLocation,
    ) -> Result<(), WriteEventError> {
        if !self.check_running()? {
            return Ok(());
        }

        debug!(test_id = %id, "test started");
        self.tests.entry(id).or_default().location = Some(location);
        Ok(())
    }

    /// Records the outcome of one phase of a test.
    ///
    /// Returns [`WriteEventError::Property`] if the test recorded invalid properties. The report is
    /// then aborted: later events are ignored and it is never written.
    pub fn on_test_report(&mut self, report: &TestReport) -> Result<(), WriteEventError> {
        if !self.check_running()? {
            return Ok(());
        }

        debug!(test_id = %report.id, phase = %report.phase, "test phase finished");
        match report.phase {
            TestPhase::Call => self.on_call_report(report),
            TestPhase::Setup | TestPhase::Teardown => {
                self.on_fixture_report(report);
                Ok(())
            }
        }
    }

    /// Finishes the suite and writes the report.
    pub fn on_suite_finish(&mut self) -> Result<(), WriteEventError> {
        match &self.state {
            BuilderState::Running => {}
            BuilderState::Aborted { test_id, error } => {
                return Err(WriteEventError::Aborted {
                    test_id: test_id.clone(),
                    error: error.clone(),
                });
            }
            BuilderState::Finished => return Err(WriteEventError::AlreadyFinished),
        }

        let elapsed = match &self.stopwatch {
            Some(stopwatch) => stopwatch.snapshot().duration,
            None => {
                warn!("suite finished without having started: recording an elapsed time of 0s");
                Duration::ZERO
            }
        };
        let hostname = match &self.hostname {
            Some(hostname) => Some(hostname.clone()),
            None => detect_hostname(),
        };

        self.suite.set_time(elapsed);
        if let Some(hostname) = hostname {
            self.suite.set_hostname(hostname);
        }
        self.suite.update_counts();

        let junit_path = self.config.path();
        if let Some(junit_dir) = junit_path.parent() {
            std::fs::create_dir_all(junit_dir).map_err(|error| WriteEventError::Fs {
                file: junit_dir.to_path_buf(),
                error,
            })?;
        }

        let f = File::create(junit_path).map_err(|error| WriteEventError::Fs {
            file: junit_path.to_path_buf(),
            error,
        })?;
        let mut writer = BufWriter::new(f);
        self.suite
            .serialize(&mut writer)
            .map_err(|error| WriteEventError::Junit {
                file: junit_path.to_path_buf(),
                error,
            })?;
        writer.flush().map_err(|error| WriteEventError::Fs {
            file: junit_path.to_path_buf(),
            error,
        })?;

        info!(
            "wrote report for {} tests ({} failed, {} skipped, {} errors) to {}",
            self.suite.tests,
            self.suite.failures,
            self.suite.skipped,
            self.suite.errors,
            junit_path,
        );
        self.state = BuilderState::Finished;
        Ok(())
    }

    // ---
    // Helper methods
    // ---

    // Returns Ok(true) if events should be processed, Ok(false) if they should be ignored.
    fn check_running(&self) -> Result<bool, WriteEventError> {
        match &self.state {
            BuilderState::Running => Ok(true),
            BuilderState::Aborted { test_id, .. } => {
                debug!(aborted_by = %test_id, "ignoring event: report was aborted");
                Ok(false)
            }
            BuilderState::Finished => Err(WriteEventError::AlreadyFinished),
        }
    }

    fn on_call_report(&mut self, report: &TestReport) -> Result<(), WriteEventError> {
        let properties = match to_junit_properties(&report.properties) {
            Ok(properties) => properties,
            Err(error) => return Err(self.abort(&report.id, error)),
        };
        let blocks = format_captured(
            &report.captured,
            report.outcome.is_passed(),
            self.config.logging(),
            self.config.log_passing_tests(),
        );

        let in_progress = self.tests.entry(report.id.clone()).or_default();
        if in_progress.call_reported {
            debug!(test_id = %report.id, "test rerun: replacing the earlier call outcome");
        }
        in_progress.call_reported = true;

        // A rerun reports the call phase again, so everything it sets is replaced, not appended.
        let test_case = self.test_case_for(&report.id, report.duration);
        test_case.set_duration(report.duration);
        let status = match &report.outcome {
            PhaseOutcome::Passed => TestCaseStatus::Success,
            PhaseOutcome::Failed { long_repr, .. } => TestCaseStatus::failure(long_repr),
            PhaseOutcome::Skipped { message } => TestCaseStatus::skipped(message),
        };
        test_case.set_status(status);
        test_case.system_out = blocks.system_out.map(Into::into);
        test_case.system_err = blocks.system_err.map(Into::into);
        test_case.set_properties(properties);

        Ok(())
    }

    fn on_fixture_report(&mut self, report: &TestReport) {
        match &report.outcome {
            PhaseOutcome::Failed { long_repr, crash } => {
                let message = format!(
                    "error during {}: {}",
                    report.phase,
                    crash.as_deref().unwrap_or(long_repr),
                );
                self.test_case_for(&report.id, report.duration)
                    .add_error(TestCaseError::new(message));
            }
            PhaseOutcome::Passed | PhaseOutcome::Skipped { .. } => {}
        }
    }

    fn abort(&mut self, test_id: &TestId, error: PropertyError) -> WriteEventError {
        warn!(%test_id, "aborting report: {error}");
        self.state = BuilderState::Aborted {
            test_id: test_id.clone(),
            error: error.clone(),
        };
        WriteEventError::Property {
            test_id: test_id.clone(),
            error,
        }
    }

    // Returns the test case node for the given test, creating it if this is the first report that
    // needs one.
    fn test_case_for(&mut self, test_id: &TestId, duration: Duration) -> &mut TestCase {
        let in_progress = self.tests.entry(test_id.clone()).or_default();
        let index = match in_progress.node {
            Some(index) => index,
            None => {
                let test_case = match &in_progress.location {
                    Some(location) => new_test_case(location, duration),
                    None => {
                        warn!(%test_id, "test reported without having started: using its id as the name");
                        let mut test_case = TestCase::new(test_id.as_str());
                        test_case.set_duration(duration);
                        test_case
                    }
                };
                let index = self.suite.add_test_case(test_case);
                in_progress.node = Some(index);
                index
            }
        };
        &mut self.suite.test_cases[index]
    }
}

#[derive(Debug, Default)]
struct InProgressTest {
    location: Option<TestLocation>,
    call_reported: bool,
    // The index of the test case node within the suite, once created.
    node: Option<usize>,
}

#[derive(Debug)]
enum BuilderState {
    Running,
    Aborted {
        test_id: TestId,
        error: PropertyError,
    },
    Finished,
}

fn new_test_case(location: &TestLocation, duration: Duration) -> TestCase {
    let mut test_case = TestCase::new(location.name.as_str());
    test_case
        .set_file(convert_path_to_forward_slash(&location.file))
        .set_duration(duration);
    if let Some(line) = location.line {
        test_case.set_line(line);
    }
    test_case
}

fn detect_hostname() -> Option<String> {
    match whoami::fallible::hostname() {
        Ok(hostname) => Some(hostname),
        Err(error) => {
            warn!(
                "unable to determine hostname, omitting it from the report: {}",
                DisplayErrorChain::new(error)
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::LoggingMode,
        properties::{PropertyKind, PropertyRecorder},
        reporter::events::CapturedOutput,
    };
    use camino_tempfile::{Utf8TempDir, tempdir};
    use pretty_assertions::assert_eq;
    use xray_junit::{Property, XmlElement};

    fn builder(dir: &Utf8TempDir) -> ReportBuilder {
        let mut builder = ReportBuilder::new(ReportConfig::new(dir.path().join("xray.xml")));
        builder.set_hostname("ci-runner-01");
        builder
    }

    fn start_test(builder: &mut ReportBuilder, name: &str, line: u32) -> TestId {
        let id = TestId::new(format!("tests/test_basic.py::{name}"));
        builder
            .on_test_start(
                id.clone(),
                TestLocation {
                    file: "tests/test_basic.py".to_owned(),
                    line: Some(line),
                    name: name.to_owned(),
                },
            )
            .expect("test start succeeds");
        id
    }

    fn report(id: &TestId, phase: TestPhase, millis: u64, outcome: PhaseOutcome) -> TestReport {
        TestReport::new(id.clone(), phase, Duration::from_millis(millis), outcome)
    }

    fn failed(long_repr: &str, crash: Option<&str>) -> PhaseOutcome {
        PhaseOutcome::Failed {
            long_repr: long_repr.to_owned(),
            crash: crash.map(ToOwned::to_owned),
        }
    }

    fn read_report(dir: &Utf8TempDir) -> XmlElement {
        let contents =
            std::fs::read_to_string(dir.path().join("xray.xml")).expect("report was written");
        contents.parse().expect("report is well-formed")
    }

    #[test]
    fn phases_share_one_test_case() {
        let dir = tempdir().expect("created temp dir");
        let mut builder = builder(&dir);
        builder.on_suite_start().expect("suite start succeeds");
        let id = start_test(&mut builder, "test_pass", 3);

        for (phase, millis) in [
            (TestPhase::Setup, 1),
            (TestPhase::Call, 500),
            (TestPhase::Teardown, 2),
        ] {
            builder
                .on_test_report(&report(&id, phase, millis, PhaseOutcome::Passed))
                .expect("report succeeds");
        }

        let suite = builder.suite();
        assert_eq!(suite.test_cases.len(), 1);
        let test_case = &suite.test_cases[0];
        assert_eq!(test_case.name, "test_pass");
        assert_eq!(test_case.file.as_deref(), Some("tests/test_basic.py"));
        assert_eq!(test_case.line, Some(3));
        assert_eq!(test_case.duration, Some(Duration::from_millis(500)));
        assert_eq!(test_case.status, TestCaseStatus::Success);
    }

    #[test]
    fn passing_fixtures_create_no_node() {
        let dir = tempdir().expect("created temp dir");
        let mut builder = builder(&dir);
        let id = start_test(&mut builder, "test_never_called", 7);
        builder
            .on_test_report(&report(&id, TestPhase::Setup, 1, PhaseOutcome::Passed))
            .expect("report succeeds");
        assert!(builder.suite().test_cases.is_empty());
    }

    #[test]
    fn setup_error_creates_node_with_setup_duration() {
        let dir = tempdir().expect("created temp dir");
        let mut builder = builder(&dir);
        let id = start_test(&mut builder, "test_setup_error", 20);
        builder
            .on_test_report(&report(
                &id,
                TestPhase::Setup,
                125,
                failed(
                    "Traceback...\nValueError: Intentional error during setup",
                    Some("tests/test_basic.py:18: ValueError: Intentional error during setup"),
                ),
            ))
            .expect("report succeeds");

        let test_case = &builder.suite().test_cases[0];
        assert_eq!(test_case.duration, Some(Duration::from_millis(125)));
        assert_eq!(
            test_case.errors,
            [TestCaseError::new(
                "error during setup: tests/test_basic.py:18: ValueError: Intentional error during setup"
            )]
        );
        assert_eq!(test_case.status, TestCaseStatus::Success);
    }

    #[test]
    fn teardown_error_without_crash_uses_long_repr() {
        let dir = tempdir().expect("created temp dir");
        let mut builder = builder(&dir);
        let id = start_test(&mut builder, "test_fail_twice", 30);
        builder
            .on_test_report(&report(&id, TestPhase::Call, 10, failed("assert False", None)))
            .expect("report succeeds");
        builder
            .on_test_report(&report(
                &id,
                TestPhase::Teardown,
                5,
                failed("RuntimeError: cleanup", None),
            ))
            .expect("report succeeds");

        let suite = builder.suite();
        assert_eq!(suite.test_cases.len(), 1);
        let test_case = &suite.test_cases[0];
        // The call phase owns the duration.
        assert_eq!(test_case.duration, Some(Duration::from_millis(10)));
        assert_eq!(test_case.status, TestCaseStatus::failure("assert False"));
        assert_eq!(
            test_case.errors,
            [TestCaseError::new("error during teardown: RuntimeError: cleanup")]
        );
    }

    #[test]
    fn report_without_start_uses_id() {
        let dir = tempdir().expect("created temp dir");
        let mut builder = builder(&dir);
        builder
            .on_test_report(&report(
                &TestId::new("tests/test_x.py::test_orphan"),
                TestPhase::Call,
                1,
                PhaseOutcome::Passed,
            ))
            .expect("report succeeds");

        let test_case = &builder.suite().test_cases[0];
        assert_eq!(test_case.name, "tests/test_x.py::test_orphan");
        assert_eq!(test_case.file, None);
        assert_eq!(test_case.line, None);
    }

    #[test]
    fn call_report_attaches_output_and_properties() {
        let dir = tempdir().expect("created temp dir");
        let config = ReportConfig::new(dir.path().join("xray.xml")).with_logging(LoggingMode::All);
        let mut builder = ReportBuilder::new(config);
        let id = start_test(&mut builder, "test_record", 3);

        let mut recorder = PropertyRecorder::new();
        recorder
            .record_description("line 1")
            .record_key("JIRA-1234")
            .record_description("line 2");
        let call = report(&id, TestPhase::Call, 50, PhaseOutcome::Passed)
            .with_captured(CapturedOutput {
                log: None,
                stdout: Some("hello".to_owned()),
                stderr: Some("oops".to_owned()),
            })
            .with_properties(recorder.into_properties());
        builder.on_test_report(&call).expect("report succeeds");

        let test_case = &builder.suite().test_cases[0];
        assert_eq!(
            test_case.properties,
            [
                Property::text("test_description", "line 1\nline 2"),
                Property::value("test_key", "JIRA-1234"),
            ]
        );
        let system_out = test_case.system_out.as_ref().expect("stdout is logged");
        assert!(system_out.ends_with(" Captured Out ---------------------------------\nhello\n"));
        let system_err = test_case.system_err.as_ref().expect("stderr is logged");
        assert!(system_err.ends_with("\noops\n"));
    }

    #[test]
    fn rerun_call_replaces_outcome_and_properties() {
        let dir = tempdir().expect("created temp dir");
        let config = ReportConfig::new(dir.path().join("xray.xml")).with_logging(LoggingMode::All);
        let mut builder = ReportBuilder::new(config);
        builder.set_hostname("ci-runner-01");
        builder.on_suite_start().expect("suite start succeeds");
        let id = start_test(&mut builder, "test_flaky", 12);

        let mut recorder = PropertyRecorder::new();
        recorder.record_summary("S");
        let first = report(&id, TestPhase::Call, 40, failed("assert flaky", None))
            .with_captured(CapturedOutput {
                log: None,
                stdout: None,
                stderr: Some("first attempt".to_owned()),
            })
            .with_properties(recorder.properties().to_vec());
        let second = report(&id, TestPhase::Call, 30, PhaseOutcome::Passed)
            .with_properties(recorder.into_properties());
        builder.on_test_report(&first).expect("first call succeeds");
        builder.on_test_report(&second).expect("rerun succeeds");

        let suite = builder.suite();
        assert_eq!(suite.test_cases.len(), 1);
        let test_case = &suite.test_cases[0];
        assert_eq!(test_case.properties, [Property::value("test_summary", "S")]);
        assert_eq!(test_case.status, TestCaseStatus::Success);
        assert_eq!(test_case.duration, Some(Duration::from_millis(30)));
        assert_eq!(test_case.system_err, None);

        builder.on_suite_finish().expect("suite finish succeeds");
        let root = read_report(&dir);
        assert_eq!(
            root.find_all("testcase/properties/property").len(),
            1,
            "one summary in the written report"
        );
        assert_eq!(root.attr("failures"), Some("0"));
    }

    #[test]
    fn multiline_messages_survive_the_report() {
        let dir = tempdir().expect("created temp dir");
        let mut builder = builder(&dir);
        builder.on_suite_start().expect("suite start succeeds");
        let id = start_test(&mut builder, "test_multiline", 40);
        builder
            .on_test_report(&report(
                &id,
                TestPhase::Setup,
                1,
                failed("Traceback:\n  line 2\nValueError", None),
            ))
            .expect("setup report succeeds");
        builder
            .on_test_report(&report(
                &id,
                TestPhase::Call,
                1,
                PhaseOutcome::Skipped {
                    message: "skip\nreason".to_owned(),
                },
            ))
            .expect("call report succeeds");
        builder.on_suite_finish().expect("suite finish succeeds");

        let contents =
            std::fs::read_to_string(dir.path().join("xray.xml")).expect("report was written");
        assert!(
            contents.contains(r#"message="error during setup: Traceback:&#10;  line 2&#10;ValueError""#),
            "report: {contents}"
        );

        let root = read_report(&dir);
        let test_case = root.child("testcase").expect("test case written");
        assert_eq!(
            test_case.child("error").and_then(|error| error.attr("message")),
            Some("error during setup: Traceback:\n  line 2\nValueError")
        );
        assert_eq!(
            test_case.child("skipped").and_then(|skipped| skipped.attr("message")),
            Some("skip\nreason")
        );
    }

    #[test]
    fn duplicate_summary_aborts_report() {
        let dir = tempdir().expect("created temp dir");
        let mut builder = builder(&dir);
        builder.on_suite_start().expect("suite start succeeds");
        let id = start_test(&mut builder, "test_two_summaries", 3);

        let mut recorder = PropertyRecorder::new();
        recorder.record_summary("first").record_summary("second");
        let call = report(&id, TestPhase::Call, 1, PhaseOutcome::Passed)
            .with_properties(recorder.into_properties());

        let error = builder
            .on_test_report(&call)
            .expect_err("duplicate summary is an error");
        match &error {
            WriteEventError::Property { test_id, error } => {
                assert_eq!(test_id, &id);
                assert_eq!(error.kind(), PropertyKind::Summary);
                assert_eq!(error.count(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Later events are ignored.
        let other = start_test(&mut builder, "test_after", 10);
        builder
            .on_test_report(&report(&other, TestPhase::Call, 1, PhaseOutcome::Passed))
            .expect("events after an abort are ignored");

        let error = builder
            .on_suite_finish()
            .expect_err("aborted report is not written");
        assert!(
            matches!(error, WriteEventError::Aborted { ref test_id, .. } if test_id == &id),
            "unexpected error: {error:?}"
        );
        assert!(!dir.path().join("xray.xml").exists());
    }

    #[test]
    fn suite_finish_writes_once() {
        let dir = tempdir().expect("created temp dir");
        let mut builder = builder(&dir);
        builder.on_suite_start().expect("suite start succeeds");
        let id = start_test(&mut builder, "test_pass", 3);
        builder
            .on_test_report(&report(&id, TestPhase::Call, 1, PhaseOutcome::Passed))
            .expect("report succeeds");
        builder.on_suite_finish().expect("suite finish succeeds");

        let root = read_report(&dir);
        assert_eq!(root.name, "test_suite");
        assert_eq!(root.attr("name"), Some("pytest"));
        assert_eq!(root.attr("tests"), Some("1"));
        assert_eq!(root.attr("hostname"), Some("ci-runner-01"));

        assert!(matches!(
            builder.on_suite_finish(),
            Err(WriteEventError::AlreadyFinished)
        ));
        assert!(matches!(
            builder.on_suite_start(),
            Err(WriteEventError::AlreadyFinished)
        ));
    }

    #[test]
    fn suite_finish_without_start() {
        let dir = tempdir().expect("created temp dir");
        let mut builder = builder(&dir);
        builder.on_suite_finish().expect("suite finish succeeds");

        let root = read_report(&dir);
        assert_eq!(root.attr("time"), Some("0.000"));
        assert_eq!(root.attr("tests"), Some("0"));
        assert!(root.children.is_empty());
    }

    #[test]
    fn suite_finish_creates_parent_directory() {
        let dir = tempdir().expect("created temp dir");
        let path = dir.path().join("nested/reports/xray.xml");
        let mut builder = ReportBuilder::new(ReportConfig::new(&path).with_suite_name("nested"));
        builder.on_suite_start().expect("suite start succeeds");
        builder.on_suite_finish().expect("suite finish succeeds");

        let contents = std::fs::read_to_string(&path).expect("report was written");
        let root: XmlElement = contents.parse().expect("report is well-formed");
        assert_eq!(root.attr("name"), Some("nested"));
    }
}
