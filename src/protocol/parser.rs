//! Tolerant event-stream parsing
//!
//! The agent's stdout is newline-delimited JSON, possibly interleaved with
//! partial or non-JSON lines. Decoding skips and counts malformed lines
//! instead of aborting; a turn with a mangled stream still yields whatever
//! well-formed events arrived.

use serde_json::Value;

use super::normalize::ToolCall;

/// Everything captured from one agent turn
#[derive(Debug, Default)]
pub struct TurnResult {
    /// Ordered assistant text blocks
    pub text_responses: Vec<String>,
    /// Ordered tool invocations
    pub tool_calls: Vec<ToolCall>,
    /// Ordered tool results, wherever they appeared in the stream
    pub tool_results: Vec<Value>,
    /// The raw event log, kept for diagnostics
    pub raw_events: Vec<Value>,
}

/// Decode a raw stdout capture into events, skipping malformed lines.
///
/// Returns the well-formed events in arrival order and the count of lines
/// that failed to parse.
pub fn decode_events(stdout: &str) -> (Vec<Value>, usize) {
    let mut events = Vec::new();
    let mut skipped = 0;
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(event) => events.push(event),
            Err(_) => {
                skipped += 1;
                tracing::debug!("skipped malformed event line: {}", truncated(line, 120));
            }
        }
    }
    (events, skipped)
}

/// Pull a session id from the shapes the agent emits: at the event's top
/// level, or nested under `message`.
pub fn session_id_from(event: &Value) -> Option<&str> {
    if let Some(sid) = event.get("session_id").and_then(Value::as_str) {
        return Some(sid);
    }
    event
        .get("message")
        .and_then(|m| m.get("session_id"))
        .and_then(Value::as_str)
}

/// First non-empty session id anywhere in the event stream
pub fn first_session_id(events: &[Value]) -> Option<String> {
    events
        .iter()
        .filter_map(session_id_from)
        .find(|sid| !sid.is_empty())
        .map(str::to_string)
}

/// Classify a turn's events into text, tool calls, and tool results.
pub fn parse_turn(events: Vec<Value>) -> TurnResult {
    let mut result = TurnResult::default();

    for event in &events {
        match event.get("type").and_then(Value::as_str).unwrap_or("") {
            "assistant" => {
                let content = event.get("message").and_then(|m| m.get("content"));
                match content {
                    Some(Value::String(text)) => {
                        result.text_responses.push(text.clone());
                    }
                    Some(Value::Array(blocks)) => {
                        for block in blocks {
                            classify_block(block, &mut result);
                        }
                    }
                    _ => {}
                }
            }
            // tool_result events also arrive as standalone top-level events
            "tool_result" => result.tool_results.push(event.clone()),
            // The final summary may duplicate the last assistant text block
            "result" => {
                if let Some(text) = event.get("result").and_then(Value::as_str) {
                    if !text.is_empty() && result.text_responses.last().map(String::as_str) != Some(text)
                    {
                        result.text_responses.push(text.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    result.raw_events = events;
    result
}

fn classify_block(block: &Value, result: &mut TurnResult) {
    match block.get("type").and_then(Value::as_str).unwrap_or("") {
        "text" => {
            if let Some(text) = block.get("text").and_then(Value::as_str) {
                result.text_responses.push(text.to_string());
            }
        }
        "tool_use" => {
            let name = block
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let input = match block.get("input") {
                Some(Value::Object(map)) => map.clone(),
                _ => serde_json::Map::new(),
            };
            result.tool_calls.push(ToolCall::new(name, input));
        }
        "tool_result" => result.tool_results.push(block.clone()),
        _ => {}
    }
}

fn truncated(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_skips_malformed_lines() {
        let stdout = concat!(
            "{\"type\":\"assistant\",\"message\":{\"content\":[]}}\n",
            "this is not json\n",
            "\n",
            "{\"type\":\"result\",\"result\":\"done\"}\n",
            "{truncated...\n",
        );
        let (events, skipped) = decode_events(stdout);
        assert_eq!(events.len(), 2);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_decode_all_well_formed() {
        let stdout = "{\"a\":1}\n{\"b\":2}\n{\"c\":3}\n";
        let (events, skipped) = decode_events(stdout);
        assert_eq!(events.len(), 3);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_session_id_extraction_shapes() {
        let top = json!({"type": "system", "session_id": "sid-1"});
        let nested = json!({"type": "assistant", "message": {"session_id": "sid-2"}});
        let none = json!({"type": "assistant", "message": {}});
        assert_eq!(session_id_from(&top), Some("sid-1"));
        assert_eq!(session_id_from(&nested), Some("sid-2"));
        assert_eq!(session_id_from(&none), None);

        let events = vec![none, json!({"session_id": ""}), top];
        assert_eq!(first_session_id(&events), Some("sid-1".to_string()));
    }

    #[test]
    fn test_parse_turn_classification() {
        let events = vec![
            json!({"type": "assistant", "message": {"content": [
                {"type": "text", "text": "Let me look that up."},
                {"type": "tool_use", "name": "mcp__orders__get_order",
                 "input": {"order_id": "ORD-1001"}},
                {"type": "tool_result", "content": "found"},
            ]}}),
            json!({"type": "tool_result", "tool_use_id": "t2", "content": "ok"}),
            json!({"type": "assistant", "message": {"content": "plain string content"}}),
        ];
        let result = parse_turn(events);
        assert_eq!(
            result.text_responses,
            vec!["Let me look that up.", "plain string content"]
        );
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(
            result.tool_calls[0].command,
            "mcp__orders__get_order order_id=ORD-1001"
        );
        assert_eq!(result.tool_results.len(), 2);
        assert_eq!(result.raw_events.len(), 3);
    }

    #[test]
    fn test_result_event_dedupes_last_text() {
        let events = vec![
            json!({"type": "assistant", "message": {"content": [
                {"type": "text", "text": "Your refund is on its way."},
            ]}}),
            json!({"type": "result", "result": "Your refund is on its way."}),
        ];
        let result = parse_turn(events);
        assert_eq!(result.text_responses.len(), 1);
    }

    #[test]
    fn test_result_event_appends_new_text() {
        let events = vec![
            json!({"type": "assistant", "message": {"content": [
                {"type": "text", "text": "Working on it."},
            ]}}),
            json!({"type": "result", "result": "All done, refund issued."}),
        ];
        let result = parse_turn(events);
        assert_eq!(
            result.text_responses,
            vec!["Working on it.", "All done, refund issued."]
        );
    }

    #[test]
    fn test_empty_result_text_ignored() {
        let events = vec![json!({"type": "result", "result": ""})];
        let result = parse_turn(events);
        assert!(result.text_responses.is_empty());
    }

    #[test]
    fn test_tool_result_order_preserved_across_sources() {
        let events = vec![
            json!({"type": "tool_result", "seq": 1}),
            json!({"type": "assistant", "message": {"content": [
                {"type": "tool_result", "seq": 2},
            ]}}),
            json!({"type": "tool_result", "seq": 3}),
        ];
        let result = parse_turn(events);
        let seqs: Vec<i64> = result
            .tool_results
            .iter()
            .map(|r| r.get("seq").and_then(Value::as_i64).unwrap())
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }
}
