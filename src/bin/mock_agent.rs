//! Mock agent binary for integration testing
//!
//! Implements just enough of the agent CLI surface (`-p`, `--resume`,
//! `--output-format`) to exercise the harness without a real agent.
//! Behavior is keyed off the prompt text:
//!
//! - "refund" → refund + resolve tool calls
//! - "manager"/"escalate" → escalation tool call
//! - "[slow]" → sleeps three seconds before answering (timeout tests)
//! - judge prompts (containing "QUALITY CHECKS") → one verdict per check,
//!   failing any check whose text contains "impossible"

use serde_json::{json, Value};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let prompt = flag_value(&args, "-p").unwrap_or_default();
    let format = flag_value(&args, "--output-format").unwrap_or_else(|| "stream-json".to_string());
    let resumed = flag_value(&args, "--resume");

    if prompt.contains("[slow]") {
        std::thread::sleep(std::time::Duration::from_secs(3));
    }

    if format == "json" {
        if prompt.contains("QUALITY CHECKS") {
            emit(&judge_response(&prompt));
        } else {
            // reset and other one-shot calls
            emit(&json!({"type": "result", "result": "ok"}));
        }
        return;
    }

    stream_turn(&prompt, resumed.as_deref());
}

/// Value following a flag, if present
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn emit(event: &Value) {
    println!("{event}");
}

/// Emit one turn's stream-json event sequence
fn stream_turn(prompt: &str, resumed: Option<&str>) {
    let session_id = resumed.unwrap_or("mock-session-0001");

    // Non-protocol noise the harness must skip
    println!("mock-agent: warming up");

    emit(&json!({"type": "system", "subtype": "init", "session_id": session_id}));

    let mut blocks: Vec<Value> = Vec::new();
    if resumed.is_some() {
        blocks.push(json!({
            "type": "tool_use",
            "name": "session_note",
            "input": {"resumed": true, "session_id": session_id}
        }));
    }

    let lower = prompt.to_lowercase();
    let reply = if lower.contains("refund") {
        blocks.push(json!({
            "type": "tool_use",
            "name": "mcp__orders__get_order",
            "input": {"order_id": "ORD-1001"}
        }));
        blocks.push(json!({
            "type": "tool_use",
            "name": "mcp__orders__refund",
            "input": {"order_id": "ORD-1001", "amount": 19.99, "reason": "defective item"}
        }));
        blocks.push(json!({
            "type": "tool_use",
            "name": "mcp__tickets__resolve_ticket",
            "input": {"ticket_id": "TKT-2001", "resolution": "refund issued"}
        }));
        "I've issued a refund of $19.99 for order ORD-1001."
    } else if lower.contains("manager") || lower.contains("escalate") {
        blocks.push(json!({
            "type": "tool_use",
            "name": "mcp__tickets__escalate_ticket",
            "input": {"ticket_id": "TKT-2002", "reason": "customer requested a manager"}
        }));
        "I've escalated this to a human specialist."
    } else {
        "How can I help you today?"
    };

    let tool_count = blocks.len();
    if !blocks.is_empty() {
        emit(&json!({
            "type": "assistant",
            "message": {"session_id": session_id, "content": blocks}
        }));
    }
    for i in 0..tool_count {
        emit(&json!({"type": "tool_result", "tool_use_id": format!("toolu_{i}"), "content": "ok"}));
    }

    emit(&json!({
        "type": "assistant",
        "message": {"session_id": session_id, "content": [{"type": "text", "text": reply}]}
    }));
    // Final summary duplicates the last text block, as the real CLI does
    emit(&json!({"type": "result", "result": reply, "session_id": session_id}));
}

/// Build a judge response: the numbered checks after the QUALITY CHECKS
/// marker each get one verdict line, wrapped in a result envelope.
fn judge_response(prompt: &str) -> Value {
    let mut in_checks = false;
    let mut verdicts: Vec<String> = Vec::new();

    for line in prompt.lines() {
        if line.contains("QUALITY CHECKS") {
            in_checks = true;
            continue;
        }
        if !in_checks {
            continue;
        }
        let trimmed = line.trim();
        if let Some((num, text)) = trimmed.split_once(". ") {
            if !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()) {
                let passed = !text.to_lowercase().contains("impossible");
                let reason = if passed { "criterion satisfied" } else { "criterion not met" };
                verdicts.push(
                    json!({
                        "check_index": verdicts.len() + 1,
                        "passed": passed,
                        "reason": reason
                    })
                    .to_string(),
                );
            }
        }
    }

    json!({"type": "result", "result": verdicts.join("\n")})
}
