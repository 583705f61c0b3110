//! Error types for the harness CLI
//!
//! Failures are contained at the narrowest scope: one failing check never
//! aborts sibling checks, and one failing scenario never aborts the run.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness CLI
#[derive(Error, Debug)]
pub enum Error {
    // === Scenario Errors ===
    #[error("Failed to read scenario '{path}': {error}")]
    ScenarioRead { path: String, error: String },

    #[error("Failed to parse scenario '{path}': {error}")]
    ScenarioParse { path: String, error: String },

    // === Agent Process Errors ===
    #[error("Agent command '{0}' not found on PATH. Install it or set [agent] command in the config file")]
    AgentNotFound(String),

    #[error("Failed to spawn agent process: {0}")]
    AgentSpawn(#[source] io::Error),

    #[error("Agent call timed out after {0} seconds")]
    ProcessTimeout(u64),

    #[error("Agent process error: {0}")]
    AgentProcess(String),

    // === Judge Errors ===
    #[error("Judge call failed: {0}")]
    JudgeUnavailable(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a scenario read error
    pub fn scenario_read(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::ScenarioRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a scenario parse error
    pub fn scenario_parse(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::ScenarioParse {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
