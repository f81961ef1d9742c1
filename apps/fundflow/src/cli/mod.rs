//! # Fundflow CLI Module
//!
//! This module implements the CLI interface for Fundflow.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `explore` - Explore an address offline and print what was found
//! - `render` - Explore, settle the layout and write the scene as SVG
//! - `config` - Print the effective configuration

mod commands;

use crate::config::AppConfig;
use crate::error::AppError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Fundflow - Fund-Flow Explorer
///
/// Follows value between addresses and lays the result out as a graph.
#[derive(Parser, Debug)]
#[command(name = "fundflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON fixture served as the ledger
    #[arg(short = 'f', long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to add before serving
        #[arg(short, long)]
        seed: Option<String>,
    },

    /// Explore an address and print the resulting graph
    Explore {
        /// Seed address
        address: String,

        /// Maximum number of pages to load for the seed
        #[arg(short = 'n', long, default_value = "1")]
        pages: usize,

        /// Transactions per page
        #[arg(short = 'l', long)]
        page_limit: Option<String>,

        /// How net amounts are split: proportional or full_net
        #[arg(short, long)]
        attribution: Option<String>,
    },

    /// Explore an address, settle the layout and write SVG
    Render {
        /// Seed address
        address: String,

        /// Maximum number of pages to load for the seed
        #[arg(short = 'n', long, default_value = "1")]
        pages: usize,

        /// Simulation ticks before rendering
        #[arg(short, long, default_value = "300")]
        ticks: usize,

        /// Link rest distance
        #[arg(short, long)]
        distance: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Assemble the configuration: file, then environment, then global flags.
pub fn resolve_config(cli: &Cli) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env()?;
    if let Some(fixture) = &cli.fixture {
        config.ledger.fixture = Some(fixture.clone());
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port, seed }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            cmd_server(&config, seed.as_deref()).await
        }
        Some(Commands::Explore {
            address,
            pages,
            page_limit,
            attribution,
        }) => {
            if let Some(limit) = page_limit {
                config.explorer.page_limit = fundflow_core::PageLimit::parse(&limit)?;
            }
            if let Some(mode) = attribution {
                config.explorer.attribution = mode.parse().map_err(|reason: String| {
                    crate::config::ConfigError::Invalid {
                        key: "--attribution".to_string(),
                        value: mode.clone(),
                        reason,
                    }
                })?;
            }
            config.validate()?;
            cmd_explore(&config, &address, pages, json_mode).await
        }
        Some(Commands::Render {
            address,
            pages,
            ticks,
            distance,
            output,
        }) => {
            if let Some(distance) = distance {
                config.layout.distance = fundflow_core::LayoutDistance::parse(&distance)?;
            }
            config.validate()?;
            cmd_render(&config, &address, pages, ticks, output.as_deref()).await
        }
        Some(Commands::Config) | None => cmd_config(&config, json_mode),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_anywhere() {
        let cli = Cli::try_parse_from([
            "fundflow",
            "explore",
            "ckb1seed",
            "--pages",
            "3",
            "--fixture",
            "demos/fixture.json",
            "--json-mode",
        ])
        .expect("valid arguments");

        assert!(cli.json_mode);
        assert_eq!(cli.fixture, Some(PathBuf::from("demos/fixture.json")));
        match cli.command {
            Some(Commands::Explore { address, pages, .. }) => {
                assert_eq!(address, "ckb1seed");
                assert_eq!(pages, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn render_defaults() {
        let cli = Cli::try_parse_from(["fundflow", "render", "ckb1seed"]).expect("valid");
        match cli.command {
            Some(Commands::Render { pages, ticks, output, .. }) => {
                assert_eq!(pages, 1);
                assert_eq!(ticks, 300);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn explore_requires_address() {
        assert!(Cli::try_parse_from(["fundflow", "explore"]).is_err());
    }
}
