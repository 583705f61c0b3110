//! Scenario plans
//!
//! Loading and representation of YAML turn-scripted test scenarios.

mod plan;

pub use plan::{
    collect_scenario_files, ExpectedToolCalls, OutcomeValue, PatternSpec, Role, ScenarioPlan, Turn,
};
