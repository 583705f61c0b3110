//! Judge-evaluated quality checks
//!
//! Free-text criteria are handed to one bounded auxiliary agent call along
//! with the full transcript. The judge is asked for exactly one JSON object
//! per check; its response envelope varies by output format and version, so
//! decoding walks an ordered fallback chain. The result list always has one
//! entry per input check.

use serde::Deserialize;
use serde_json::Value;

use super::CheckResult;
use crate::driver::AgentDriver;

/// Reason recorded for checks the judge never answered
const NOT_EVALUATED: &str = "not evaluated";

/// Evaluate free-text quality criteria against the transcript.
///
/// Returns exactly `checks.len()` results. A failed or unparseable judge
/// call fails the affected checks; it never propagates an error.
pub async fn run_quality_checks(
    driver: &AgentDriver,
    checks: &[String],
    transcript: &str,
) -> Vec<CheckResult> {
    if checks.is_empty() {
        return Vec::new();
    }

    let prompt = judge_prompt(checks, transcript);
    let raw = match driver.judge(&prompt).await {
        Ok(stdout) => stdout,
        Err(e) => {
            tracing::warn!("{e}");
            return checks
                .iter()
                .map(|c| CheckResult::new(format!("quality: {c}"), false, NOT_EVALUATED))
                .collect();
        }
    };

    let verdicts = parse_verdicts(&JudgeEnvelope::decode(&raw).into_text(), checks.len());
    assemble_results(checks, verdicts)
}

/// Pair every input check with its verdict slot; empty slots become
/// failures with reason "not evaluated", so the output length always
/// equals the input length.
fn assemble_results(checks: &[String], verdicts: Vec<Option<JudgeVerdict>>) -> Vec<CheckResult> {
    checks
        .iter()
        .zip(verdicts)
        .map(|(check, verdict)| match verdict {
            Some(v) => CheckResult::new(format!("quality: {check}"), v.passed, v.reason),
            None => CheckResult::new(format!("quality: {check}"), false, NOT_EVALUATED),
        })
        .collect()
}

/// Build the judge prompt: transcript first, then the numbered checks
fn judge_prompt(checks: &[String], transcript: &str) -> String {
    let checks_text = checks
        .iter()
        .enumerate()
        .map(|(i, c)| format!("  {}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a QA judge evaluating an AI customer-service agent's conversation.\n\
         \n\
         Below is the full transcript of the conversation (agent tool calls and\n\
         text responses interleaved with customer messages). After the transcript\n\
         are quality checks to evaluate.\n\
         \n\
         For EACH check, respond with exactly one JSON object per line:\n\
         {{\"check_index\": <1-based>, \"passed\": true/false, \"reason\": \"<brief explanation>\"}}\n\
         \n\
         Output ONLY those JSON lines, nothing else.\n\
         \n\
         === TRANSCRIPT ===\n\
         {transcript}\n\
         \n\
         === QUALITY CHECKS ===\n\
         {checks_text}\n"
    )
}

/// The judge response envelope: a wrapping object with a `result` payload,
/// a stream-style event array, or plain text. Decoded through an ordered
/// fallback chain; the raw text is the last resort.
enum JudgeEnvelope {
    Wrapped { result: String },
    Stream { items: Vec<Value>, raw: String },
    Plain(String),
}

impl JudgeEnvelope {
    fn decode(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(Value::Object(map)) => match map.get("result").and_then(Value::as_str) {
                Some(result) => Self::Wrapped {
                    result: result.to_string(),
                },
                None => Self::Plain(raw.to_string()),
            },
            Ok(Value::Array(items)) => Self::Stream {
                items,
                raw: raw.to_string(),
            },
            _ => Self::Plain(raw.to_string()),
        }
    }

    /// Extract the free-text verdict payload
    fn into_text(self) -> String {
        match self {
            Self::Wrapped { result } => result,
            Self::Stream { items, raw } => items
                .iter()
                .find(|item| item.get("type").and_then(Value::as_str) == Some("result"))
                .and_then(|item| item.get("result").and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or(raw),
            Self::Plain(text) => text,
        }
    }
}

/// One evaluation record emitted by the judge
#[derive(Deserialize)]
struct JudgeVerdict {
    check_index: usize,
    #[serde(default)]
    passed: bool,
    #[serde(default)]
    reason: String,
}

/// Parse verdict lines into per-check slots; unparseable lines are skipped
/// and out-of-range indices ignored.
fn parse_verdicts(text: &str, count: usize) -> Vec<Option<JudgeVerdict>> {
    let mut slots: Vec<Option<JudgeVerdict>> = (0..count).map(|_| None).collect();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(verdict) = serde_json::from_str::<JudgeVerdict>(line) else {
            tracing::debug!("skipped unparseable judge line: {line}");
            continue;
        };
        let Some(idx) = verdict.check_index.checked_sub(1) else {
            continue;
        };
        if idx < count {
            slots[idx] = Some(verdict);
        }
    }

    slots
}
