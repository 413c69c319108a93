// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! boxci-agent binary entrypoint: resolve config, wire up the real system
//! resources (HTTP client, journal, git driver, clock), and run the agent
//! to completion. See spec.md §4.10, §6.

use boxci_agentd::{run_agent, AgentConfig, AgentRuntime, AGENT_VERSION};
use boxci_core::SystemClock;
use boxci_git::GitDriver;
use boxci_http::HttpClient;
use boxci_journal::{Journal, JournalPaths};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("boxci-agent {AGENT_VERSION}");
                return std::process::ExitCode::SUCCESS;
            }
            "--help" | "-h" => {
                print_help();
                return std::process::ExitCode::SUCCESS;
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: boxci-agent [--help | --version]");
                return std::process::ExitCode::FAILURE;
            }
        }
    }

    let config_path = config_path();
    let config = match AgentConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let paths = match JournalPaths::resolve() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("error: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let clock = SystemClock;
    let journal = Journal::new(paths, clock);
    let http = std::sync::Arc::new(HttpClient::new(
        config.service.clone(),
        config.project_id.as_str(),
        config.key.clone(),
    ));
    let git = GitDriver::new(std::env::temp_dir());

    let runtime = AgentRuntime { http, journal, git, clock: SystemClock };

    let outcome = run_agent(config, runtime).await;
    tracing::info!(?outcome, "agent exiting");
    outcome.exit_code()
}

/// Path to the agent's TOML config file, overridable via `BOXCI_AGENT_CONFIG`
/// for tests and non-default deployments; defaults to `boxci.agent.toml` in
/// the current directory.
fn config_path() -> PathBuf {
    std::env::var("BOXCI_AGENT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("boxci.agent.toml"))
}

fn print_help() {
    println!("boxci-agent {AGENT_VERSION}");
    println!("Remote build agent: polls the control service for builds tied to one project.");
    println!();
    println!("USAGE:");
    println!("    boxci-agent");
    println!();
    println!("Configuration is read from boxci.agent.toml (override path via");
    println!("BOXCI_AGENT_CONFIG) and from BOXCI_PROJECT/BOXCI_KEY/BOXCI_MACHINE/");
    println!("BOXCI_SILENT/BOXCI___TS environment variables.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}
