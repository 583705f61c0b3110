//! Scenario orchestration and run reporting
//!
//! Drives one scenario end to end (reset → turns → assert) and aggregates
//! a multi-scenario run summary. Failures are contained: a failed turn is
//! recorded and the scenario continues fail-forward; a failed scenario
//! never aborts the run.

use std::path::{Path, PathBuf};
use std::time::Instant;

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use crate::checks::{outcomes, patterns, quality, CheckResult};
use crate::common::{Error, Result};
use crate::driver::AgentDriver;
use crate::protocol::{self, ToolCall};
use crate::scenario::{collect_scenario_files, Role, ScenarioPlan};

/// Aggregate result for one scenario
#[derive(Debug, Serialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    #[serde(rename = "tool_call_checks")]
    pub pattern_results: Vec<CheckResult>,
    #[serde(rename = "outcome_checks")]
    pub outcome_results: Vec<CheckResult>,
    #[serde(rename = "quality_checks")]
    pub quality_results: Vec<CheckResult>,
    pub errors: Vec<String>,
    pub total_turns: usize,
    pub duration_s: f64,
}

impl TestResult {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            pattern_results: Vec::new(),
            outcome_results: Vec::new(),
            quality_results: Vec::new(),
            errors: Vec::new(),
            total_turns: 0,
            duration_s: 0.0,
        }
    }

    fn failed(name: impl Into<String>, error: String) -> Self {
        Self {
            passed: false,
            errors: vec![error],
            ..Self::named(name)
        }
    }

    /// Every check across all three lists
    fn all_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.pattern_results
            .iter()
            .chain(&self.outcome_results)
            .chain(&self.quality_results)
    }
}

/// Aggregate totals for a run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    #[serde(rename = "tests")]
    pub results: Vec<TestResult>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Run every scenario found under `paths` sequentially and report.
pub async fn run_paths(
    driver: &AgentDriver,
    paths: &[PathBuf],
    json_report: Option<&Path>,
) -> Result<RunSummary> {
    let files = collect_scenario_files(paths);
    if files.is_empty() {
        return Err(Error::Config("no scenario files found".to_string()));
    }

    println!(
        "\n{} {} scenario(s)",
        "Running".blue().bold(),
        files.len()
    );

    let mut results = Vec::new();
    for file in &files {
        let result = match ScenarioPlan::load(file) {
            Ok(plan) => run_scenario(driver, &plan).await,
            Err(e) => {
                // A malformed document aborts only this scenario's load
                println!("\n  {} {}", "✗".red(), e);
                let name = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string());
                TestResult::failed(name, e.to_string())
            }
        };
        results.push(result);
    }

    let passed = results.iter().filter(|r| r.passed).count();
    let summary = RunSummary {
        total: results.len(),
        passed,
        failed: results.len() - passed,
        results,
    };

    print_summary(&summary);

    if let Some(path) = json_report {
        write_report(path, &summary)?;
        println!("  Report written to {}", path.display());
    }

    Ok(summary)
}

/// Execute one scenario: reset, play the turns, evaluate assertions.
pub async fn run_scenario(driver: &AgentDriver, plan: &ScenarioPlan) -> TestResult {
    let start = Instant::now();
    let mut result = TestResult::named(plan.name.as_str());

    println!(
        "\n{} {}",
        "Running Scenario:".blue().bold(),
        plan.name.white().bold()
    );
    if !plan.description.is_empty() {
        println!("  {}", preview(plan.description.trim(), 100).dimmed());
    }

    // Best-effort state reset; failure is logged and never blocks the run
    if let Err(e) = driver.reset().await {
        tracing::warn!("state reset failed, continuing: {e}");
    }

    let mut session_id: Option<String> = None;
    let mut all_tool_calls: Vec<ToolCall> = Vec::new();
    let mut all_tool_results: Vec<Value> = Vec::new();
    let mut all_text: Vec<String> = Vec::new();
    let mut transcript: Vec<String> = Vec::new();
    let mut turn_count = 0usize;

    for turn in &plan.turns {
        match turn.role {
            Role::Customer => {
                let message = turn.message.trim();
                turn_count += 1;
                println!(
                    "\n  {} {}",
                    format!("[turn {turn_count}] customer:").cyan(),
                    preview(message, 120)
                );
                transcript.push(format!("[CUSTOMER]: {message}"));

                let turn_start = Instant::now();
                match driver.send(message, session_id.as_deref()).await {
                    Ok(invocation) => {
                        if invocation.session_id.is_some() {
                            session_id = invocation.session_id.clone();
                        }
                        if invocation.skipped_lines > 0 {
                            println!(
                                "    {}",
                                format!(
                                    "(skipped {} malformed event line(s))",
                                    invocation.skipped_lines
                                )
                                .dimmed()
                            );
                        }

                        let parsed = protocol::parse_turn(invocation.events);
                        for tc in &parsed.tool_calls {
                            transcript.push(format!("[TOOL CALL]: {}", tc.command));
                            println!("    {} {}", "tool:".dimmed(), preview(&tc.command, 100));
                        }
                        for tr in &parsed.tool_results {
                            transcript.push(format!(
                                "[TOOL RESULT]: {}",
                                preview(&tr.to_string(), 200)
                            ));
                        }
                        for text in &parsed.text_responses {
                            transcript.push(format!("[AGENT]: {text}"));
                            println!(
                                "    {} {}",
                                "agent:".dimmed(),
                                preview(&text.replace('\n', " "), 120)
                            );
                        }

                        all_tool_calls.extend(parsed.tool_calls);
                        all_tool_results.extend(parsed.tool_results);
                        all_text.extend(parsed.text_responses);

                        println!(
                            "    {}",
                            format!(
                                "turn: {:.1}s | total: {:.1}s",
                                turn_start.elapsed().as_secs_f64(),
                                start.elapsed().as_secs_f64()
                            )
                            .dimmed()
                        );
                    }
                    // Fail-forward: record the error, keep whatever partial
                    // transcript exists, and continue with the next turn
                    Err(e) => {
                        println!("    {} turn failed: {e}", "✗".red());
                        result.errors.push(e.to_string());
                        result.passed = false;
                    }
                }
            }
            Role::System => {
                transcript.push(format!("[SYSTEM]: {}", turn.message));
            }
            // Marker only; the agent already responded with the preceding
            // customer turn
            Role::AwaitAgent => {}
        }
    }

    result.total_turns = turn_count;
    let full_transcript = transcript.join("\n");

    println!("\n  {}", "Assertions:".cyan());

    if let Some(expected) = &plan.expected_tool_calls {
        result.pattern_results = patterns::check_patterns(&all_tool_calls, expected);
        print_checks(&result.pattern_results);
    }

    if let Some(expected) = &plan.expected_outcomes {
        result.outcome_results =
            outcomes::check_outcomes(&all_tool_calls, &all_tool_results, &all_text, expected);
        print_checks(&result.outcome_results);
    }

    if let Some(quality_checks) = &plan.quality_checks {
        if !quality_checks.is_empty() {
            println!("  {}", "running judge…".dimmed());
            let judge_start = Instant::now();
            result.quality_results =
                quality::run_quality_checks(driver, quality_checks, &full_transcript).await;
            println!(
                "  {}",
                format!("(judge took {:.1}s)", judge_start.elapsed().as_secs_f64()).dimmed()
            );
            print_checks(&result.quality_results);
        }
    }

    if result.all_checks().any(|c| !c.passed) {
        result.passed = false;
    }

    result.duration_s = start.elapsed().as_secs_f64();

    if result.passed {
        println!(
            "\n  {} {} ({:.1}s)",
            "✓".green().bold(),
            "Scenario Passed".green().bold(),
            result.duration_s
        );
    } else {
        println!(
            "\n  {} {} ({:.1}s)",
            "✗".red().bold(),
            "Scenario Failed".red().bold(),
            result.duration_s
        );
    }

    result
}

fn print_checks(results: &[CheckResult]) {
    for r in results {
        if r.passed {
            println!("  {} {}", "✓".green(), r.check);
        } else {
            println!("  {} {}", "✗".red(), r.check);
            println!("      {}", r.detail.dimmed());
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n{}", "Summary:".blue().bold());
    println!(
        "  {} passed, {} failed, {} total",
        summary.passed, summary.failed, summary.total
    );
    for r in &summary.results {
        let icon = if r.passed {
            "✓".green()
        } else {
            "✗".red()
        };
        println!("  {} {} ({:.1}s)", icon, r.name, r.duration_s);
    }
    println!();
}

fn write_report(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Character-safe preview with an ellipsis for overlong text
fn preview(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(passed: bool) -> CheckResult {
        CheckResult::new("c", passed, "d")
    }

    #[test]
    fn test_passed_is_conjunction_of_all_checks() {
        let mut result = TestResult::named("t");
        result.pattern_results = vec![check(true), check(true)];
        result.outcome_results = vec![check(true)];
        result.quality_results = vec![check(false)];
        assert!(result.all_checks().any(|c| !c.passed));

        result.quality_results = vec![check(true)];
        assert!(result.all_checks().all(|c| c.passed));
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("héllo wörld", 5), "héllo…");
        assert_eq!(preview("short", 10), "short");
    }

    #[test]
    fn test_report_serialization_shape() {
        let summary = RunSummary {
            total: 1,
            passed: 0,
            failed: 1,
            results: vec![TestResult::failed("t", "boom".to_string())],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["tests"][0]["name"], "t");
        assert_eq!(json["tests"][0]["passed"], false);
        assert_eq!(json["tests"][0]["errors"][0], "boom");
        assert!(json["tests"][0]["tool_call_checks"].is_array());
    }
}
