// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Corvus - a message-bus-centric retrieval platform.
//!
//! Binary entry point. Each subcommand runs one long-lived service;
//! a clean SIGINT/SIGTERM shutdown exits 0, startup failures exit 1.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod serve;
mod shutdown;

/// Corvus - auth, index, chat, and gateway services over a message bus.
#[derive(Parser, Debug)]
#[command(name = "corvus", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to the standard hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a Corvus service.
    Serve {
        #[command(subcommand)]
        service: Service,
    },
}

#[derive(Subcommand, Debug)]
enum Service {
    /// Authentication and registration service.
    Auth,
    /// Document ingestion service.
    Index,
    /// Retrieval-augmented chat service.
    Chat,
    /// HTTP-to-bus gateway.
    Gateway,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => corvus_config::load_config_from_path(path),
        None => corvus_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    serve::init_tracing(&config.log.level);

    let result = match cli.command {
        Commands::Serve { service } => match service {
            Service::Auth => serve::run_auth(config).await,
            Service::Index => serve::run_index(config).await,
            Service::Chat => serve::run_chat(config).await,
            Service::Gateway => serve::run_gateway(config).await,
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
