// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{helpers::duration_secs, properties::RecordedProperty};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{fmt, time::Duration};

/// A reporter event.
///
/// Events are produced by the host test framework, in the order
/// `SuiteStarted → (TestStarted → TestReport+)* → SuiteFinished`, and consumed by a
/// [`ReportBuilder`](crate::reporter::ReportBuilder).
///
/// Events are serialized as JSON objects with a `type` tag.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReporterEvent {
    /// The test suite started.
    SuiteStarted,

    /// A test started.
    TestStarted {
        /// The stable identifier of the test.
        id: TestId,

        /// Where the test is defined.
        location: TestLocation,
    },

    /// A phase of a test finished.
    TestReport(TestReport),

    /// The test suite finished.
    SuiteFinished,
}

/// A stable identifier for a test, unique within a run.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(SmolStr);

impl TestId {
    /// Creates a new `TestId`.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    /// Returns the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a test is defined.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TestLocation {
    /// The source file, as reported by the host.
    pub file: String,

    /// The line number within the file, if known.
    #[serde(default)]
    pub line: Option<u32>,

    /// The name of the test.
    pub name: String,
}

/// A phase of a test's execution.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestPhase {
    /// Fixture setup, before the test body runs.
    Setup,

    /// The test body.
    Call,

    /// Fixture teardown, after the test body runs.
    Teardown,
}

impl TestPhase {
    /// Returns the name of the phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Call => "call",
            Self::Teardown => "teardown",
        }
    }
}

impl fmt::Display for TestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a single test phase.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PhaseOutcome {
    /// The phase passed.
    Passed,

    /// The phase failed.
    Failed {
        /// The full failure representation, e.g. a traceback.
        long_repr: String,

        /// A short summary of where and why the phase crashed, if known.
        #[serde(default)]
        crash: Option<String>,
    },

    /// The phase was skipped.
    Skipped {
        /// Why the phase was skipped.
        message: String,
    },
}

impl PhaseOutcome {
    /// Returns true if the phase passed.
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Output captured while a test phase ran.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CapturedOutput {
    /// Captured log records.
    #[serde(default)]
    pub log: Option<String>,

    /// Captured standard output.
    #[serde(default)]
    pub stdout: Option<String>,

    /// Captured standard error.
    #[serde(default)]
    pub stderr: Option<String>,
}

/// The report for a single phase of a test.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    /// The test this report is for.
    pub id: TestId,

    /// The phase this report is for.
    pub phase: TestPhase,

    /// How long the phase took.
    #[serde(with = "duration_secs")]
    pub duration: Duration,

    /// The outcome of the phase.
    pub outcome: PhaseOutcome,

    /// Output captured while the phase ran.
    #[serde(default)]
    pub captured: CapturedOutput,

    /// Properties recorded by the test so far, in recording order.
    #[serde(default)]
    pub properties: Vec<RecordedProperty>,
}

impl TestReport {
    /// Creates a new report with no captured output and no properties.
    pub fn new(
        id: impl Into<TestId>,
        phase: TestPhase,
        duration: Duration,
        outcome: PhaseOutcome,
    ) -> Self {
        Self {
            id: id.into(),
            phase,
            duration,
            outcome,
            captured: CapturedOutput::default(),
            properties: Vec::new(),
        }
    }

    /// Sets the captured output.
    pub fn with_captured(mut self, captured: CapturedOutput) -> Self {
        self.captured = captured;
        self
    }

    /// Sets the recorded properties.
    pub fn with_properties(mut self, properties: impl IntoIterator<Item = RecordedProperty>) -> Self {
        self.properties = properties.into_iter().collect();
        self
    }
}

impl From<&str> for TestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TestId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_event_stream() {
        let input = indoc! {r#"
            {"type":"suite-started"}
            {"type":"test-started","id":"tests/test_a.py::test_fail","location":{"file":"tests/test_a.py","line":14,"name":"test_fail"}}
            {"type":"test-report","id":"tests/test_a.py::test_fail","phase":"call","duration":0.25,"outcome":{"status":"failed","long_repr":"assert 1 == 2"},"captured":{"stderr":"oops"},"properties":[{"kind":"summary","value":"fails"}]}
            {"type":"suite-finished"}
        "#};

        let events: Vec<ReporterEvent> = input
            .lines()
            .map(|line| serde_json::from_str(line).expect("event parses"))
            .collect();

        assert_eq!(
            events,
            vec![
                ReporterEvent::SuiteStarted,
                ReporterEvent::TestStarted {
                    id: "tests/test_a.py::test_fail".into(),
                    location: TestLocation {
                        file: "tests/test_a.py".to_owned(),
                        line: Some(14),
                        name: "test_fail".to_owned(),
                    },
                },
                ReporterEvent::TestReport(
                    TestReport::new(
                        "tests/test_a.py::test_fail",
                        TestPhase::Call,
                        Duration::from_millis(250),
                        PhaseOutcome::Failed {
                            long_repr: "assert 1 == 2".to_owned(),
                            crash: None,
                        },
                    )
                    .with_captured(CapturedOutput {
                        stderr: Some("oops".to_owned()),
                        ..Default::default()
                    })
                    .with_properties([RecordedProperty::Summary {
                        value: "fails".to_owned()
                    }])
                ),
                ReporterEvent::SuiteFinished,
            ]
        );
    }

    #[test]
    fn reject_negative_duration() {
        let error = serde_json::from_str::<TestReport>(
            r#"{"id":"t","phase":"setup","duration":-1.0,"outcome":{"status":"passed"}}"#,
        )
        .expect_err("negative durations are rejected");
        assert!(
            error.to_string().contains("invalid duration -1"),
            "error: {error}"
        );
    }

    #[test]
    fn serialize_round_trips() {
        let event = ReporterEvent::TestReport(TestReport::new(
            "t",
            TestPhase::Teardown,
            Duration::from_millis(125),
            PhaseOutcome::Skipped {
                message: "not today".to_owned(),
            },
        ));
        let json = serde_json::to_string(&event).expect("serialized");
        assert_eq!(
            json,
            r#"{"type":"test-report","id":"t","phase":"teardown","duration":0.125,"outcome":{"status":"skipped","message":"not today"},"captured":{"log":null,"stdout":null,"stderr":null},"properties":[]}"#
        );
        let parsed: ReporterEvent = serde_json::from_str(&json).expect("parsed");
        assert_eq!(parsed, event);
    }
}
