//! # Fundflow
//!
//! Fund-flow explorer for the CKB ledger.
//!
//! Starting from a seed address, the explorer pages through transaction
//! history, classifies the net flow of each transaction and folds it into a
//! directed graph. A force-directed layout places the graph and a scene
//! renders it as SVG while it grows.
//!
//! ## Modules
//!
//! - `ledger`: the ledger collaborator trait and a fixture-backed client
//! - `explorer`: paginated, concurrent traversal with bounded retry
//! - `session`: graph, explorer, layout and scene behind one facade
//! - `config`: TOML + environment configuration
//! - `api`: axum HTTP server
//! - `cli`: clap command line

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod explorer;
pub mod ledger;
pub mod session;

pub use error::AppError;
