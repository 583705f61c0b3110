//! Assertion engine
//!
//! Three independent checkers evaluate a finished scenario transcript:
//! regex patterns over normalized tool-call text, domain outcome rules, and
//! judge-evaluated quality criteria. Checks never abort their siblings; a
//! failing check is recorded and evaluation continues.

pub mod outcomes;
pub mod patterns;
pub mod quality;

use serde::Serialize;

use crate::protocol::ToolCall;

/// Outcome of one assertion
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Human-readable check description
    pub check: String,
    /// Whether the check held
    pub passed: bool,
    /// Short rationale shown next to failing checks
    pub detail: String,
}

impl CheckResult {
    pub fn new(check: impl Into<String>, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            passed,
            detail: detail.into(),
        }
    }
}

/// Newline-joined normalized commands, call order preserved
pub(crate) fn commands_blob(tool_calls: &[ToolCall]) -> String {
    tool_calls
        .iter()
        .map(|tc| tc.command.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
