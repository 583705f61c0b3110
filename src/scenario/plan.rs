//! Scenario plan types and loading
//!
//! Defines the data structures for deserializing YAML scenarios. Loading
//! fails only on structural malformation; regex syntax and outcome-key
//! validity are checked later, at assertion time, scoped to a single check.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::{Error, Result};

/// A complete scenario loaded from a YAML file
///
/// Immutable once loaded; the orchestrator never mutates a plan.
#[derive(Deserialize, Debug)]
pub struct ScenarioPlan {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    #[serde(default)]
    pub description: String,
    /// The ordered conversation turns to play
    #[serde(default)]
    pub turns: Vec<Turn>,
    /// Regex expectations over normalized tool-call text
    pub expected_tool_calls: Option<ExpectedToolCalls>,
    /// Named outcome expectations (boolean or string valued)
    pub expected_outcomes: Option<BTreeMap<String, OutcomeValue>>,
    /// Free-text qualitative criteria evaluated by the judge
    pub quality_checks: Option<Vec<String>>,
}

/// One exchange unit in a scenario
#[derive(Deserialize, Debug)]
pub struct Turn {
    /// Who speaks on this turn
    pub role: Role,
    /// Message text; empty for `await_agent` markers
    #[serde(default)]
    pub message: String,
}

/// Speaker role for a turn
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A scripted customer message sent to the agent
    Customer,
    /// Context folded into the transcript without an agent call
    System,
    /// Marker only; the agent already responded with the preceding turn
    AwaitAgent,
}

/// Regex expectations over the normalized tool-call text
#[derive(Deserialize, Debug, Default)]
pub struct ExpectedToolCalls {
    /// Patterns that must match at least one tool call
    #[serde(default)]
    pub must_include: Vec<PatternSpec>,
    /// Patterns that must match no tool call
    #[serde(default)]
    pub must_not_include: Vec<PatternSpec>,
}

/// A pattern entry: either a bare string or a `{pattern: ...}` mapping
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum PatternSpec {
    Plain(String),
    Tagged { pattern: String },
}

impl PatternSpec {
    /// The regex source text
    pub fn pattern(&self) -> &str {
        match self {
            PatternSpec::Plain(p) => p,
            PatternSpec::Tagged { pattern } => pattern,
        }
    }
}

/// An expected outcome value
///
/// The `Other` variant keeps structurally valid but unsupported YAML types
/// (numbers, lists) so they can be rejected per-check instead of failing
/// the whole load.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum OutcomeValue {
    Bool(bool),
    Text(String),
    Other(serde_yaml::Value),
}

impl ScenarioPlan {
    /// Load a scenario plan from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::scenario_read(path, e))?;
        serde_yaml::from_str(&content).map_err(|e| Error::scenario_parse(path, e))
    }

    /// Number of customer turns in the plan
    pub fn customer_turns(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.role == Role::Customer)
            .count()
    }
}

/// Expand scenario paths: files are taken as-is, directories are searched
/// for `.yaml`/`.yml` files in sorted order. Missing paths are logged and
/// skipped.
pub fn collect_scenario_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .map(|rd| {
                    rd.filter_map(|e| e.ok())
                        .map(|e| e.path())
                        .filter(|p| {
                            p.is_file()
                                && matches!(
                                    p.extension().and_then(|e| e.to_str()),
                                    Some("yaml") | Some("yml")
                                )
                        })
                        .collect()
                })
                .unwrap_or_default();
            entries.sort();
            files.extend(entries);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            tracing::warn!("scenario path not found, skipping: {}", path.display());
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_scenario() {
        let yaml = r#"
name: refund_flow
description: Customer requests a refund for a defective product
turns:
  - role: customer
    message: "My order ORD-1001 arrived broken. I want a refund."
  - role: await_agent
  - role: system
    message: "The customer is a premium member."
  - role: customer
    message: "Thanks!"
expected_tool_calls:
  must_include:
    - "mcp__orders__refund"
    - pattern: "order_id=ORD-1001"
  must_not_include:
    - "mcp__tickets__escalate_ticket"
expected_outcomes:
  refund_processed: true
  final_ticket_status: resolved
quality_checks:
  - "The agent was polite throughout the conversation"
"#;
        let plan: ScenarioPlan = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(plan.name, "refund_flow");
        assert_eq!(plan.turns.len(), 4);
        assert_eq!(plan.turns[0].role, Role::Customer);
        assert_eq!(plan.turns[1].role, Role::AwaitAgent);
        assert!(plan.turns[1].message.is_empty());
        assert_eq!(plan.customer_turns(), 2);

        let expected = plan.expected_tool_calls.unwrap();
        assert_eq!(expected.must_include.len(), 2);
        assert_eq!(expected.must_include[0].pattern(), "mcp__orders__refund");
        assert_eq!(expected.must_include[1].pattern(), "order_id=ORD-1001");
        assert_eq!(expected.must_not_include.len(), 1);

        let outcomes = plan.expected_outcomes.unwrap();
        assert_eq!(outcomes.get("refund_processed"), Some(&OutcomeValue::Bool(true)));
        assert_eq!(
            outcomes.get("final_ticket_status"),
            Some(&OutcomeValue::Text("resolved".to_string()))
        );
    }

    #[test]
    fn test_missing_name_is_structural_error() {
        let yaml = r#"
description: no name here
turns: []
"#;
        let result: std::result::Result<ScenarioPlan, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_role_is_structural_error() {
        let yaml = r#"
name: bad_role
turns:
  - role: narrator
    message: "hi"
"#;
        let result: std::result::Result<ScenarioPlan, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_outcome_type_survives_load() {
        // Structural parsing keeps odd value types; the outcome checker
        // rejects them per-check later.
        let yaml = r#"
name: odd_outcome
turns: []
expected_outcomes:
  retry_count: 3
"#;
        let plan: ScenarioPlan = serde_yaml::from_str(yaml).unwrap();
        let outcomes = plan.expected_outcomes.unwrap();
        assert!(matches!(
            outcomes.get("retry_count"),
            Some(OutcomeValue::Other(_))
        ));
    }

    #[test]
    fn test_collect_scenario_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.yaml", "a.yml", "notes.txt", "c.yaml"] {
            std::fs::write(dir.path().join(name), "name: x\n").unwrap();
        }
        let files = collect_scenario_files(&[dir.path().to_path_buf()]);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.yml", "b.yaml", "c.yaml"]);
    }
}
