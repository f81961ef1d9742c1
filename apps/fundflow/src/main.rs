//! # Fundflow - Fund-Flow Explorer
//!
//! The main binary for the Fundflow explorer.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for offline exploration and rendering
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     apps/fundflow (THE BINARY)                  │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐     │
//! │  │   CLI       │    │   HTTP API  │    │  Explorer        │     │
//! │  │  (clap)     │    │   (axum)    │    │  (ledger fetch)  │     │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘     │
//! │         │                  │                    │               │
//! │         └──────────────────┼────────────────────┘               │
//! │                            ▼                                    │
//! │                    ┌────────────────┐                           │
//! │                    │ fundflow-core  │                           │
//! │                    │  (THE LOGIC)   │                           │
//! │                    └────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server on a fixture ledger
//! fundflow --fixture demos/fixture.json server --port 8080
//!
//! # Offline exploration
//! fundflow --fixture demos/fixture.json explore ckb1... --pages 3
//! fundflow --fixture demos/fixture.json render ckb1... -o flow.svg
//! ```

use clap::Parser;
use fundflow::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // FUNDFLOW_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("FUNDFLOW_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "fundflow=debug,tower_http=debug"
    } else {
        "fundflow=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Fundflow startup banner.
fn print_banner() {
    println!(
        r#"
  ┌─┐┬ ┬┌┐┌┌┬┐┌─┐┬  ┌─┐┬ ┬
  ├┤ │ ││││ ││├┤ │  │ ││││
  └  └─┘┘└┘─┴┘└  ┴─┘└─┘└┴┘

  Fund-Flow Explorer v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
