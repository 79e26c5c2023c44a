// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Formatting of captured output into `system-out` and `system-err` blocks.

use crate::{config::LoggingMode, reporter::events::CapturedOutput};
use swrite::{SWrite, swriteln};

static CAPTURED_LOG_HEADER: &str = " Captured Log ";
static CAPTURED_OUT_HEADER: &str = " Captured Out ";
static CAPTURED_ERR_HEADER: &str = " Captured Err ";

const BANNER_WIDTH: usize = 80;

/// The captured output blocks to attach to a test case.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct CapturedBlocks {
    pub(crate) system_out: Option<String>,
    pub(crate) system_err: Option<String>,
}

/// Formats captured output for a test's call phase.
///
/// Nothing is produced for a passing test unless `log_passing_tests` is set. Otherwise, the
/// `system-out` block holds the log and stdout sections and the `system-err` block holds the stderr
/// section, as selected by `logging`. Blocks with no sections are omitted.
pub(crate) fn format_captured(
    captured: &CapturedOutput,
    passed: bool,
    logging: LoggingMode,
    log_passing_tests: bool,
) -> CapturedBlocks {
    if passed && !log_passing_tests {
        return CapturedBlocks::default();
    }

    let mut system_out = String::new();
    if logging.includes_log()
        && let Some(log) = non_empty(captured.log.as_deref())
    {
        push_section(&mut system_out, CAPTURED_LOG_HEADER, log);
    }
    if logging.includes_stdout()
        && let Some(stdout) = non_empty(captured.stdout.as_deref())
    {
        push_section(&mut system_out, CAPTURED_OUT_HEADER, stdout);
    }

    let mut system_err = String::new();
    if logging.includes_stderr()
        && let Some(stderr) = non_empty(captured.stderr.as_deref())
    {
        push_section(&mut system_err, CAPTURED_ERR_HEADER, stderr);
    }

    CapturedBlocks {
        system_out: (!system_out.is_empty()).then_some(system_out),
        system_err: (!system_err.is_empty()).then_some(system_err),
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

// A section is the header centered in a line of dashes, then the content, each followed by a
// newline.
fn push_section(out: &mut String, header: &str, content: &str) {
    swriteln!(out, "{header:-^width$}", width = BANNER_WIDTH);
    out.push_str(content);
    out.push('\n');
}
