//! CREBAS capability authority: operator front end.
//!
//! Loads the layered configuration and the control plane's PKI material,
//! stands up an in-memory authority, and runs operator commands against it.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crebas_authority::AuthorityRole;
use crebas_config::{Config, ResolvedConfig};

mod commands;
mod config_bridge;
mod theme;

use commands::{cert, check, config, replay};

/// CREBAS capability authority
#[derive(Parser)]
#[command(name = "crebas-cp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to an explicit configuration file (highest file precedence)
    #[arg(short, long, global = true, env = "CREBAS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the configuration and PKI material, and report the authority's identities
    Check,

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print one of the authority's certificates
    Cert {
        /// Which principal: cp or user
        role: AuthorityRole,

        /// Print the registration JSON instead of PEM
        #[arg(long)]
        json: bool,
    },

    /// Check that a certificate was issued by the configured CA
    VerifyCert {
        /// PEM certificate file
        path: PathBuf,
    },

    /// Run a JSON operation script against a fresh authority
    Replay {
        /// File holding one operation or an array of operations
        path: PathBuf,

        /// Fail if any operation replies with an error
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration with the layer each value came from
    Show {
        /// Output format: toml or json
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
    /// Show the configuration file locations
    Paths,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = Config::load(cli.config.as_deref());

    // Set up logging from config, with --verbose override.
    let log_config = match resolved.as_ref().map(|r| config_bridge::to_log_config(&r.config)) {
        Ok(Ok(mut lc)) => {
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        _ => {
            let level = if cli.verbose { "debug" } else { "info" };
            crebas_telemetry::LogConfig::new(level)
                .with_format(crebas_telemetry::LogFormat::Compact)
                .with_target(crebas_telemetry::LogTarget::Stderr)
        },
    };
    if let Err(e) = crebas_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Config {
            command: ConfigCommands::Paths,
        } => {
            config::show_paths(cli.config.as_deref());
        },
        Commands::Config {
            command: ConfigCommands::Show { format },
        } => {
            config::show_config(&resolved?, &format)?;
        },
        Commands::Check => {
            check::run_check(&resolved?)?;
        },
        Commands::Cert { role, json } => {
            cert::show_authority_cert(&loaded(resolved)?, role, json)?;
        },
        Commands::VerifyCert { path } => {
            cert::verify_cert(&loaded(resolved)?, &path)?;
        },
        Commands::Replay { path, strict } => {
            let authority = config_bridge::build_authority(&loaded(resolved)?)?;
            replay::run_replay(&authority, &path, strict)?;
        },
    }

    Ok(())
}

fn loaded(resolved: crebas_config::ConfigResult<ResolvedConfig>) -> Result<Config> {
    Ok(resolved?.config)
}
