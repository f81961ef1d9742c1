//! # fundflow-core
//!
//! The deterministic fund-flow engine for Fundflow - THE LOGIC.
//!
//! This crate turns ledger transaction data into a directed, weighted graph
//! of value moving between addresses, lays it out with a live force
//! simulation, and keeps a visual scene in sync with both.
//!
//! ## Components
//!
//! - `graph`: the GraphStore (`FlowGraph`) with idempotent node creation,
//!   commutative edge accumulation and the `(tx, from, to)` dedup ledger
//! - `flow`: net-flow classification of one transaction for one address
//! - `layout`: the force-directed LayoutEngine
//! - `scene`: the Renderer/Reconciler and SVG output
//! - `viewport`: default framing and interactive zoom/pan
//! - `tuning`: validated user-adjustable parameters
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust)
//! - Ledger access belongs to the app; the core only consumes its data
//! - `BTreeMap`/`BTreeSet` only, so iteration order is reproducible
//! - Currency is integer-only; floating point is confined to `layout`,
//!   `scene`, `viewport` and `visual`

// =============================================================================
// MODULES
// =============================================================================

pub mod flow;
pub mod graph;
pub mod layout;
pub mod primitives;
pub mod scene;
pub mod tuning;
pub mod types;
pub mod viewport;
pub mod visual;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Address, Amount, CellRef, Cursor, FlowError, Point, Script, TransactionDetail,
    TransactionPage, TxHash,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use flow::{Classified, Counterparty, FlowAttribution, FlowDirection, TxFlow, classify};
pub use graph::{Edge, EdgeKey, FlowGraph, GraphSnapshot, Node, NodeSpec};

// =============================================================================
// RE-EXPORTS: Layout and Rendering
// =============================================================================

pub use layout::{LayoutConfig, LayoutEngine};
pub use scene::{EdgeVisual, NodeVisual, ReconcileReport, Scene};
pub use tuning::{LayoutDistance, PageLimit};
pub use viewport::{ViewTransform, Viewport};
pub use visual::Hsl;
