//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// External agent process settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Environment policy for spawned agent processes
    #[serde(default)]
    pub env: EnvConfig,

    /// State reset settings
    #[serde(default)]
    pub reset: ResetConfig,
}

/// External agent process configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    /// Command name or path of the agent CLI
    #[serde(default = "default_agent_command")]
    pub command: String,

    /// Arguments prepended to every invocation
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            args: Vec::new(),
        }
    }
}

fn default_agent_command() -> String {
    "claude".to_string()
}

/// Default settings
#[derive(Debug, Deserialize)]
pub struct Defaults {
    /// Model passed to the agent unless overridden on the command line
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

fn default_model() -> String {
    "sonnet".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Hard timeout for one conversation turn
    #[serde(default = "default_turn")]
    pub turn_secs: u64,

    /// Timeout for the best-effort state reset call
    #[serde(default = "default_reset")]
    pub reset_secs: u64,

    /// Timeout for the auxiliary judge call
    #[serde(default = "default_judge")]
    pub judge_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            turn_secs: default_turn(),
            reset_secs: default_reset(),
            judge_secs: default_judge(),
        }
    }
}

fn default_turn() -> u64 {
    300
}
fn default_reset() -> u64 {
    60
}
fn default_judge() -> u64 {
    120
}

/// Environment policy applied when spawning the agent process
///
/// The nested-session marker is stripped by default so the spawned agent
/// does not assume it is embedded in a parent session.
#[derive(Debug, Deserialize, Clone)]
pub struct EnvConfig {
    /// Inherit the caller's environment
    #[serde(default = "default_inherit")]
    pub inherit: bool,

    /// Variables removed from the inherited environment
    #[serde(default = "default_excluded_keys")]
    pub excluded_keys: Vec<String>,

    /// Variables added after inheritance/exclusion
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            inherit: default_inherit(),
            excluded_keys: default_excluded_keys(),
            extra: HashMap::new(),
        }
    }
}

fn default_inherit() -> bool {
    true
}
fn default_excluded_keys() -> Vec<String> {
    vec!["CLAUDECODE".to_string()]
}

/// State reset configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ResetConfig {
    /// Prompt sent before each scenario to clear external mutable state
    #[serde(default = "default_reset_prompt")]
    pub prompt: String,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            prompt: default_reset_prompt(),
        }
    }
}

fn default_reset_prompt() -> String {
    "Call both reset_state tools right now: mcp__orders__reset_state and \
     mcp__tickets__reset_state. Do not say anything else."
        .to_string()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if the file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            super::Error::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Load from an explicit path if given, otherwise from the default location
    pub fn load_or_default(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(p),
            None => Self::load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.command, "claude");
        assert_eq!(config.timeouts.turn_secs, 300);
        assert_eq!(config.timeouts.reset_secs, 60);
        assert_eq!(config.timeouts.judge_secs, 120);
        assert!(config.env.inherit);
        assert_eq!(config.env.excluded_keys, vec!["CLAUDECODE"]);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [agent]
            command = "/opt/agent/bin/agent"

            [timeouts]
            turn_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.agent.command, "/opt/agent/bin/agent");
        assert_eq!(config.timeouts.turn_secs, 5);
        // Unspecified sections fall back to defaults
        assert_eq!(config.timeouts.judge_secs, 120);
        assert_eq!(config.defaults.model, "sonnet");
    }
}
