//! Tool-call pattern checks
//!
//! `must_include` / `must_not_include` regexes are searched against the
//! newline-joined concatenation of all normalized tool-call strings. Every
//! pattern evaluates independently; an invalid regex fails only its own
//! check, at evaluation time.

use regex::Regex;

use super::{commands_blob, CheckResult};
use crate::protocol::ToolCall;
use crate::scenario::ExpectedToolCalls;

/// Evaluate all tool-call pattern expectations
pub fn check_patterns(tool_calls: &[ToolCall], expected: &ExpectedToolCalls) -> Vec<CheckResult> {
    let blob = commands_blob(tool_calls);
    let mut results = Vec::new();

    for spec in &expected.must_include {
        let pattern = spec.pattern();
        let check = format!("must_include: {pattern}");
        match Regex::new(pattern) {
            Ok(re) => {
                if re.is_match(&blob) {
                    let count = tool_calls
                        .iter()
                        .filter(|tc| re.is_match(&tc.command))
                        .count();
                    results.push(CheckResult::new(
                        check,
                        true,
                        format!("matched in {count} command(s)"),
                    ));
                } else {
                    results.push(CheckResult::new(check, false, "no match found"));
                }
            }
            Err(e) => results.push(CheckResult::new(check, false, format!("invalid pattern: {e}"))),
        }
    }

    for spec in &expected.must_not_include {
        let pattern = spec.pattern();
        let check = format!("must_not_include: {pattern}");
        match Regex::new(pattern) {
            Ok(re) => {
                let offender = tool_calls.iter().find(|tc| re.is_match(&tc.command));
                match offender {
                    None => results.push(CheckResult::new(check, true, "correctly absent")),
                    Some(tc) => results.push(CheckResult::new(
                        check,
                        false,
                        format!("matched command: {}", tc.command),
                    )),
                }
            }
            Err(e) => results.push(CheckResult::new(check, false, format!("invalid pattern: {e}"))),
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::PatternSpec;
    use serde_json::json;

    fn call(name: &str, input: serde_json::Value) -> ToolCall {
        match input {
            serde_json::Value::Object(map) => ToolCall::new(name.to_string(), map),
            _ => panic!("expected object"),
        }
    }

    fn expectations(include: &[&str], exclude: &[&str]) -> ExpectedToolCalls {
        ExpectedToolCalls {
            must_include: include
                .iter()
                .map(|p| PatternSpec::Plain(p.to_string()))
                .collect(),
            must_not_include: exclude
                .iter()
                .map(|p| PatternSpec::Plain(p.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_must_include_passes_on_match() {
        let calls = vec![
            call("mcp__orders__get_order", json!({"order_id": "ORD-1001"})),
            call(
                "mcp__orders__refund",
                json!({"order_id": "ORD-1001", "amount": 19.99}),
            ),
        ];
        let results = check_patterns(&calls, &expectations(&["mcp__orders__refund"], &[]));
        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
        assert_eq!(results[0].detail, "matched in 1 command(s)");
    }

    #[test]
    fn test_must_include_fails_without_match() {
        let calls = vec![call("mcp__orders__get_order", json!({"order_id": "ORD-1"}))];
        let results = check_patterns(&calls, &expectations(&["mcp__orders__refund"], &[]));
        assert!(!results[0].passed);
        assert_eq!(results[0].detail, "no match found");
    }

    #[test]
    fn test_must_not_include_zero_matches_passes() {
        let calls = vec![call("mcp__tickets__resolve_ticket", json!({"ticket_id": "T-1"}))];
        let results = check_patterns(
            &calls,
            &expectations(&[], &["mcp__tickets__escalate_ticket"]),
        );
        assert!(results[0].passed);
    }

    #[test]
    fn test_must_not_include_failure_names_the_match() {
        let calls = vec![call(
            "mcp__tickets__escalate_ticket",
            json!({"ticket_id": "T-9", "reason": "angry customer"}),
        )];
        let results = check_patterns(
            &calls,
            &expectations(&[], &["mcp__tickets__escalate_ticket"]),
        );
        assert!(!results[0].passed);
        assert!(results[0].detail.contains("mcp__tickets__escalate_ticket"));
        assert!(results[0].detail.contains("T-9"));
    }

    #[test]
    fn test_invalid_regex_fails_only_its_own_check() {
        let calls = vec![call("mcp__orders__refund", json!({"order_id": "ORD-1"}))];
        let results = check_patterns(
            &calls,
            &expectations(&["[unclosed", "mcp__orders__refund"], &[]),
        );
        assert_eq!(results.len(), 2);
        assert!(!results[0].passed);
        assert!(results[0].detail.starts_with("invalid pattern"));
        assert!(results[1].passed);
    }

    #[test]
    fn test_pattern_spans_call_boundaries_are_not_matched() {
        // Calls are newline-joined; `.` does not cross lines by default,
        // so a pattern cannot accidentally bridge two commands.
        let calls = vec![
            call("tool_a", json!({"k": "end"})),
            call("tool_b", json!({"k": "start"})),
        ];
        let results = check_patterns(&calls, &expectations(&["end.start"], &[]));
        assert!(!results[0].passed);
    }
}
