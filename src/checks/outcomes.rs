//! Named outcome checks
//!
//! Boolean outcomes are judged on tool-call evidence only, so prose that
//! merely mentions a keyword (an agent saying "I could escalate this")
//! cannot satisfy an outcome whose action never happened. Known keys map
//! to fixed evidence rules through a closed enum; everything else takes an
//! explicit fallback branch.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{commands_blob, CheckResult};
use crate::protocol::ToolCall;
use crate::scenario::OutcomeValue;

static ESCALATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"mcp__tickets__escalate_ticket").expect("static regex"));
static RESOLVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"mcp__tickets__resolve_ticket").expect("static regex"));
static REFUND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"mcp__orders__refund").expect("static regex"));
static CREATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"mcp__tickets__create_ticket").expect("static regex"));

/// Known outcome keys, plus one explicit fallback for everything else
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutcomeKey {
    Escalated,
    RefundProcessed,
    TicketCreated,
    FinalTicketStatus,
    TicketReused,
    Unknown,
}

impl OutcomeKey {
    fn parse(key: &str) -> Self {
        match key {
            "escalated" => Self::Escalated,
            "refund_processed" => Self::RefundProcessed,
            "ticket_created" => Self::TicketCreated,
            "final_ticket_status" => Self::FinalTicketStatus,
            "ticket_reused" => Self::TicketReused,
            _ => Self::Unknown,
        }
    }
}

/// Evaluate all named outcome expectations
pub fn check_outcomes(
    tool_calls: &[ToolCall],
    tool_results: &[Value],
    text_responses: &[String],
    expected: &BTreeMap<String, OutcomeValue>,
) -> Vec<CheckResult> {
    let commands = commands_blob(tool_calls);
    let transcript = transcript_blob(tool_calls, tool_results, text_responses);

    expected
        .iter()
        .map(|(key, value)| match value {
            OutcomeValue::Bool(expected_val) => {
                let found = bool_evidence(key, &commands);
                CheckResult::new(
                    format!("outcome: {key} == {expected_val}"),
                    found == *expected_val,
                    if found {
                        "evidence found in tool commands"
                    } else {
                        "evidence not found in tool commands"
                    },
                )
            }
            OutcomeValue::Text(expected_val) => string_outcome(key, expected_val, &commands, &transcript),
            OutcomeValue::Other(other) => CheckResult::new(
                format!("outcome: {key}"),
                false,
                format!("unsupported outcome type: {}", yaml_type_name(other)),
            ),
        })
        .collect()
}

/// Tool-call evidence for a boolean outcome key
fn bool_evidence(key: &str, commands: &str) -> bool {
    match OutcomeKey::parse(key) {
        OutcomeKey::Escalated => ESCALATE_RE.is_match(commands),
        OutcomeKey::RefundProcessed => REFUND_RE.is_match(commands),
        OutcomeKey::TicketCreated => CREATE_RE.is_match(commands),
        // Not really a boolean key, but handle it as "a terminal status
        // transition happened"
        OutcomeKey::FinalTicketStatus => {
            RESOLVE_RE.is_match(commands) || ESCALATE_RE.is_match(commands)
        }
        // ticket_reused has no meaningful boolean form; treat like any
        // unregistered key
        OutcomeKey::TicketReused | OutcomeKey::Unknown => {
            let needle = key.replace('_', " ").to_lowercase();
            commands.to_lowercase().contains(&needle)
        }
    }
}

/// Evaluate a string-valued outcome key
fn string_outcome(
    key: &str,
    expected_val: &str,
    commands: &str,
    transcript: &str,
) -> CheckResult {
    let check = format!("outcome: {key} contains '{expected_val}'");

    match OutcomeKey::parse(key) {
        OutcomeKey::FinalTicketStatus if expected_val == "resolved" => {
            let found = RESOLVE_RE.is_match(commands);
            CheckResult::new(check, found, status_detail(found, "resolve"))
        }
        OutcomeKey::FinalTicketStatus if expected_val == "escalated" => {
            let found = ESCALATE_RE.is_match(commands);
            CheckResult::new(check, found, status_detail(found, "escalate"))
        }
        OutcomeKey::TicketReused => {
            // The identifier must appear in tool-call text AND no ticket
            // may have been created
            let id_in_commands = commands.contains(expected_val);
            let created = CREATE_RE.is_match(commands);
            let passed = id_in_commands && !created;
            let detail = if created {
                "a create_ticket call is present".to_string()
            } else if !id_in_commands {
                format!("'{expected_val}' not found in tool commands")
            } else {
                "identifier reused without ticket creation".to_string()
            };
            CheckResult::new(check, passed, detail)
        }
        _ => {
            let found = transcript.contains(expected_val);
            CheckResult::new(
                check,
                found,
                if found {
                    "value found in transcript"
                } else {
                    "value not found in transcript"
                },
            )
        }
    }
}

fn status_detail(found: bool, tool: &str) -> String {
    if found {
        format!("{tool} tool was invoked")
    } else {
        format!("{tool} tool was not invoked")
    }
}

/// Full transcript blob for string-search fallbacks: commands, then tool
/// results, then text, in turn order within each list
fn transcript_blob(
    tool_calls: &[ToolCall],
    tool_results: &[Value],
    text_responses: &[String],
) -> String {
    let mut parts: Vec<String> = tool_calls.iter().map(|tc| tc.command.clone()).collect();
    parts.extend(tool_results.iter().map(|tr| tr.to_string()));
    parts.extend(text_responses.iter().cloned());
    parts.join("\n")
}

fn yaml_type_name(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "bool",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged",
    }
}
