//! Tool-call normalization
//!
//! Every tool invocation is rendered into one canonical string. All
//! downstream pattern matching operates on this text, so rendering must be
//! deterministic in (name, ordered parameter map).

use serde_json::{Map, Value};

/// A single tool invocation captured from the event stream
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Tool name as reported by the agent
    pub name: String,
    /// Input parameters in their original order
    pub input: Map<String, Value>,
    /// Canonical command string used for pattern matching
    pub command: String,
}

impl ToolCall {
    /// Build a tool call from a `tool_use` content block's name and input
    pub fn new(name: String, input: Map<String, Value>) -> Self {
        let command = render_command(&name, &input);
        Self {
            name,
            input,
            command,
        }
    }
}

/// Render a tool invocation as a canonical command string.
///
/// Shell execution tools carry their full intent in the `command` argument,
/// which is used verbatim. Every other tool renders as
/// `tool_name key=value ...` in parameter order: null parameters are
/// omitted, true booleans become bare `--key` flags, and all other values
/// use their natural string form.
pub fn render_command(name: &str, input: &Map<String, Value>) -> String {
    if is_shell_tool(name) {
        return input
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }

    let mut parts = vec![name.to_string()];
    for (key, value) in input {
        match value {
            Value::Null => continue,
            Value::Bool(true) => parts.push(format!("--{key}")),
            other => parts.push(format!("{key}={}", render_value(other))),
        }
    }
    parts.join(" ")
}

fn is_shell_tool(name: &str) -> bool {
    matches!(name.to_lowercase().as_str(), "bash" | "bash_tool")
}

/// Natural string form of a parameter value: bare strings, display form for
/// numbers and booleans, compact JSON for nested structures.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
