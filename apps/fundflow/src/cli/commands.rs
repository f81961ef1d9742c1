//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::explorer::PageReport;
use crate::ledger::{Fixture, FixtureLedger, Ledger};
use crate::session::{LogOpener, Session};
use fundflow_core::visual::{format_amount, short_address};
use fundflow_core::GraphSnapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// SESSION CONSTRUCTION
// =============================================================================

/// Open the ledger named by the configuration.
pub fn build_ledger(config: &AppConfig) -> Result<Arc<dyn Ledger>, AppError> {
    match &config.ledger.fixture {
        Some(path) => {
            let path = validate_file_path(path)?;
            let ledger = FixtureLedger::from_path(&path)?;
            tracing::info!(fixture = %path.display(), "ledger_opened");
            Ok(Arc::new(ledger))
        }
        None => {
            tracing::warn!("No ledger fixture configured; every address will be unknown");
            Ok(Arc::new(FixtureLedger::new(Fixture::default())))
        }
    }
}

/// Build a session from the configuration.
pub fn build_session(config: &AppConfig) -> Result<Arc<Session>, AppError> {
    let ledger = build_ledger(config)?;
    Ok(Arc::new(Session::new(
        ledger,
        config.explorer_config(),
        config.layout_config(),
        Arc::new(LogOpener::new(config.hooks.open_url_base.clone())),
    )))
}

/// Validate file path before reading.
fn validate_file_path(path: &Path) -> Result<PathBuf, AppError> {
    let canonical = path.canonicalize()?;
    if !canonical.is_file() {
        return Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Path '{}' is not a regular file", path.display()),
        )));
    }
    Ok(canonical)
}

/// Validate output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, AppError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize()?;
    let filename = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Output path has no filename",
        )
    })?;
    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server with the tick and refit loops running.
pub async fn cmd_server(config: &AppConfig, seed: Option<&str>) -> Result<(), AppError> {
    let session = build_session(config)?;
    if let Some(address) = seed {
        session.add_seed_address(address).await?;
    }
    let _driver = Arc::clone(&session).spawn_driver(config.tick_interval(), config.refit_interval());

    println!("Fundflow Explorer Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:        {}", config.server.host);
    println!("  Port:        {}", config.server.port);
    println!(
        "  Fixture:     {}",
        config
            .ledger
            .fixture
            .as_ref()
            .map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
    );
    println!("  Page limit:  {}", config.explorer.page_limit);
    println!("  Distance:    {}", config.layout.distance);
    println!();
    println!("Endpoints:");
    println!("  POST /address              - Add a seed address");
    println!("  POST /nodes/{{id}}/load-more - Load the next page of a node");
    println!("  POST /nodes/{{id}}/open      - Open a node");
    println!("  PUT  /tuning               - Change distance / page limit");
    println!("  GET  /snapshot             - Graph snapshot");
    println!("  GET  /scene.svg            - Rendered scene");
    println!("  GET  /status               - Session status");
    println!("  GET  /health               - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&config.bind_addr(), session).await
}

// =============================================================================
// EXPLORE COMMAND
// =============================================================================

/// Explore `address` for up to `pages` pages and print the graph.
pub async fn cmd_explore(
    config: &AppConfig,
    address: &str,
    pages: usize,
    json_mode: bool,
) -> Result<(), AppError> {
    let session = build_session(config)?;
    let (seed, reports) = explore(&session, address, pages).await?;
    let snapshot = session.snapshot().await;

    if json_mode {
        let output = serde_json::json!({
            "seed": seed,
            "pages": reports,
            "graph": snapshot,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Fundflow Exploration");
    println!("====================");
    println!("Seed:  {}", seed);
    println!("Pages: {}", reports.len());
    for (i, report) in reports.iter().enumerate() {
        println!(
            "  #{:<3} fetched {:>4}  edges {:>4}  duplicates {:>3}  new nodes {:>3}  failed {}",
            i + 1,
            report.fetched,
            report.edges_recorded,
            report.duplicates,
            report.nodes_discovered,
            report.failed.len()
        );
        for failed in &report.failed {
            println!("        {} - {}", failed.hash, failed.reason);
        }
    }
    print_graph(&snapshot);
    Ok(())
}

async fn explore(
    session: &Session,
    address: &str,
    pages: usize,
) -> Result<(String, Vec<PageReport>), AppError> {
    let seed = session.add_seed_address(address).await?;
    let reports = session.load_pages(&seed, pages).await?;
    Ok((seed.0, reports))
}

fn print_graph(snapshot: &GraphSnapshot) {
    println!();
    println!("Nodes ({}):", snapshot.nodes.len());
    for node in &snapshot.nodes {
        println!(
            "  {:<16} {:>18}  {:<18} ({}) {}",
            short_address(node.id.as_str()),
            format_amount(node.balance),
            node.label,
            node.loaded,
            if node.has_more() { "more" } else { "done" }
        );
    }
    println!();
    println!("Edges ({}):", snapshot.edges.len());
    for edge in &snapshot.edges {
        println!(
            "  {:<16} -> {:<16} {:>18}",
            short_address(edge.source.as_str()),
            short_address(edge.target.as_str()),
            format_amount(edge.value)
        );
    }
}

// =============================================================================
// RENDER COMMAND
// =============================================================================

/// Explore, run the layout for `ticks` steps and write the scene.
pub async fn cmd_render(
    config: &AppConfig,
    address: &str,
    pages: usize,
    ticks: usize,
    output: Option<&Path>,
) -> Result<(), AppError> {
    let session = build_session(config)?;
    let (seed, reports) = explore(&session, address, pages).await?;

    let mut energy = 0.0;
    for _ in 0..ticks {
        energy = session.tick().await.energy;
    }
    let viewport = session.refit().await;
    let svg = session.render_svg().await;

    tracing::info!(
        seed = %seed,
        pages = reports.len(),
        ticks,
        energy,
        view_box = %viewport.view_box(),
        "scene_rendered"
    );

    match output {
        Some(path) => {
            let path = validate_output_path(path)?;
            std::fs::write(&path, svg)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{svg}"),
    }
    Ok(())
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

/// Print the effective configuration.
pub fn cmd_config(config: &AppConfig, json_mode: bool) -> Result<(), AppError> {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(config).unwrap_or_default()
        );
        return Ok(());
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
