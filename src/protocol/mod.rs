//! Agent output stream protocol
//!
//! The agent process emits newline-delimited JSON events on stdout. This
//! module decodes that stream tolerantly, classifies events into a per-turn
//! result, and renders tool invocations into canonical command strings for
//! pattern matching.

mod normalize;
mod parser;

pub use normalize::{render_command, ToolCall};
pub use parser::{decode_events, first_session_id, parse_turn, session_id_from, TurnResult};
