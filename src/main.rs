//! Scenario test harness CLI
//!
//! Runs YAML-scripted multi-turn scenarios against an external
//! conversational-agent process and reports pass/fail per check.

use std::path::PathBuf;

use clap::Parser;

use harness::common::config::Config;
use harness::common::logging;
use harness::driver::{AgentDriver, DriverOptions};
use harness::runner;

#[derive(Parser)]
#[command(name = "harness", about = "Scenario test harness for conversational agent CLIs")]
#[command(version, long_about = None)]
struct Cli {
    /// YAML scenario file(s) or directories containing .yaml files
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Working-directory hint passed to the agent process
    #[arg(long, short = 'd')]
    agent_dir: Option<PathBuf>,

    /// Verbose tracing of agent invocations
    #[arg(long, short)]
    verbose: bool,

    /// Additional flags passed through to the agent CLI
    #[arg(long, num_args = 0.., allow_hyphen_values = true)]
    extra_flags: Vec<String>,

    /// Model to select for the agent process
    #[arg(long, short)]
    model: Option<String>,

    /// Write a JSON report to this path
    #[arg(long, short = 'j')]
    json_report: Option<PathBuf>,

    /// Use an explicit config file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        logging::init_verbose();
    } else {
        logging::init_cli();
    }

    match run(cli).await {
        Ok(all_passed) => std::process::exit(if all_passed { 0 } else { 1 }),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

async fn run(cli: Cli) -> harness::Result<bool> {
    let config = Config::load_or_default(cli.config.as_ref())?;

    let driver = AgentDriver::new(
        &config,
        DriverOptions {
            model: cli.model,
            extra_flags: cli.extra_flags,
            working_dir: cli.agent_dir,
            verbose: cli.verbose,
        },
    )?;

    let summary = runner::run_paths(&driver, &cli.paths, cli.json_report.as_deref()).await?;
    Ok(summary.all_passed())
}
