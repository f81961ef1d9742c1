//! # Graph Engine
//!
//! The fund-flow graph store for the Fundflow core.
//!
//! Nodes are addresses, edges are aggregated net value between an ordered pair
//! of addresses. The graph only grows: nodes and edges are created lazily on
//! first discovery and never deleted.
//!
//! All mutation goes through `FlowGraph` methods. Callers that share a graph
//! across tasks wrap it in a single lock; there is no per-field locking.
//! All data structures use `BTreeMap` for deterministic ordering.

use crate::visual::{Hsl, node_radius};
use crate::{Address, Amount, Cursor, FlowError, Point, Script, TxHash};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// NODE
// =============================================================================

/// Everything needed to create a node, gathered before the graph is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub address: Address,
    pub script: Script,
    pub balance: Amount,
    pub label: String,
}

/// A graph vertex: one address and its exploration state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// The address, unique key of the node.
    pub id: Address,
    /// The lock script behind the address.
    pub script: Script,
    /// Balance snapshot taken at creation. Not live.
    pub balance: Amount,
    /// Classification label, resolved once at creation.
    pub label: String,
    /// Number of transactions already folded into the graph.
    pub loaded: u64,
    /// Pagination state of the transaction history.
    pub cursor: Cursor,
    /// Listed transactions that could not be folded yet. Retried by the next
    /// page load, even once the cursor is exhausted.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub pending: BTreeSet<TxHash>,
    /// Read-only copy of the layout position, refreshed once per tick.
    pub position: Point,
    /// Display radius, derived once from the balance.
    pub radius: f64,
    /// Display colour, derived once from the script digest.
    pub color: Hsl,
}

impl Node {
    /// Whether another page load can still add to the graph.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.cursor.has_more() || !self.pending.is_empty()
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// Ordered pair identifying an edge. `(a, b)` and `(b, a)` are distinct edges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: Address,
    pub target: Address,
}

impl EdgeKey {
    #[must_use]
    pub fn new(source: Address, target: Address) -> Self {
        Self { source, target }
    }
}

/// Aggregate net flow from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: Address,
    pub target: Address,
    /// Monotonically accumulated value.
    pub value: Amount,
}

/// Dedup ledger entry: one transaction's contribution to one directed pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct FlowClaim {
    tx: TxHash,
    from: Address,
    to: Address,
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The fund-flow graph.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    /// Node storage: Address -> Node
    nodes: BTreeMap<Address, Node>,

    /// Edge storage: (source, target) -> Edge
    edges: BTreeMap<EdgeKey, Edge>,

    /// Already-counted (tx, from, to) triples
    claims: BTreeSet<FlowClaim>,
}

impl FlowGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless one with the same address exists.
    ///
    /// Idempotent: a second call with the same address returns the existing
    /// node untouched (balance, label and colour keep their first values).
    pub fn add_node(&mut self, spec: NodeSpec) -> &Node {
        self.nodes.entry(spec.address.clone()).or_insert_with(|| {
            let color = Hsl::from_seed(&spec.script.digest());
            let radius = node_radius(spec.balance);
            Node {
                id: spec.address,
                script: spec.script,
                balance: spec.balance,
                label: spec.label,
                loaded: 0,
                cursor: Cursor::NotStarted,
                pending: BTreeSet::new(),
                position: Point::ORIGIN,
                radius,
                color,
            }
        })
    }

    /// Add `amount` to the edge `source -> target`, creating it if needed.
    ///
    /// Both endpoints must exist and the amount must be positive.
    pub fn add_or_accumulate_edge(
        &mut self,
        source: &Address,
        target: &Address,
        amount: Amount,
    ) -> Result<&Edge, FlowError> {
        self.check_edge(source, target, amount)?;
        let edge = self
            .edges
            .entry(EdgeKey::new(source.clone(), target.clone()))
            .and_modify(|e| e.value = e.value.saturating_add(amount))
            .or_insert_with(|| Edge {
                source: source.clone(),
                target: target.clone(),
                value: amount,
            });
        Ok(&*edge)
    }

    /// Insert `(tx, from, to)` into the dedup ledger.
    ///
    /// Returns `false` if the triple was already counted.
    pub fn try_claim(&mut self, tx: &TxHash, from: &Address, to: &Address) -> bool {
        self.claims.insert(FlowClaim {
            tx: tx.clone(),
            from: from.clone(),
            to: to.clone(),
        })
    }

    /// Claim and accumulate in one step.
    ///
    /// Validation happens first, so a claim is never taken for a contribution
    /// that was not written. Returns `Ok(false)` for an already-counted triple.
    pub fn record_flow(
        &mut self,
        tx: &TxHash,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<bool, FlowError> {
        self.check_edge(from, to, amount)?;
        if !self.try_claim(tx, from, to) {
            return Ok(false);
        }
        self.add_or_accumulate_edge(from, to, amount)?;
        Ok(true)
    }

    /// Fold one fetched page into a node's traversal state.
    ///
    /// `loaded` grows by the batch size. A batch shorter than the page limit
    /// (or a full batch without a continuation token) exhausts the node.
    pub fn advance_cursor(
        &mut self,
        id: &Address,
        batch_len: usize,
        next_cursor: Option<String>,
        page_limit: u32,
    ) -> Result<Cursor, FlowError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| FlowError::NodeNotFound(id.clone()))?;

        node.loaded = node.loaded.saturating_add(batch_len as u64);
        let full_page = batch_len != 0 && batch_len >= page_limit as usize;
        node.cursor = match next_cursor {
            Some(token) if full_page => Cursor::InProgress(token),
            _ => Cursor::Exhausted,
        };
        Ok(node.cursor.clone())
    }

    /// Replace the set of transactions still waiting to be folded for `id`.
    pub fn set_pending(
        &mut self,
        id: &Address,
        pending: BTreeSet<TxHash>,
    ) -> Result<(), FlowError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| FlowError::NodeNotFound(id.clone()))?;
        node.pending = pending;
        Ok(())
    }

    /// Refresh the read-only position copies from the layout.
    ///
    /// Unknown addresses are skipped.
    pub fn apply_positions<'a>(
        &mut self,
        positions: impl IntoIterator<Item = (&'a Address, Point)>,
    ) {
        for (id, point) in positions {
            if let Some(node) = self.nodes.get_mut(id) {
                node.position = point;
            }
        }
    }

    fn check_edge(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), FlowError> {
        if amount.is_zero() {
            return Err(FlowError::InvalidAmount {
                from: from.clone(),
                to: to.clone(),
            });
        }
        for id in [from, to] {
            if !self.nodes.contains_key(id) {
                return Err(FlowError::NodeNotFound(id.clone()));
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn node(&self, id: &Address) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn contains_node(&self, id: &Address) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get all nodes in deterministic (address) order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all edges in deterministic `(source, target)` order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    #[must_use]
    pub fn edge(&self, source: &Address, target: &Address) -> Option<&Edge> {
        self.edges.get(&EdgeKey::new(source.clone(), target.clone()))
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of counted `(tx, from, to)` triples.
    #[must_use]
    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    /// Owned copy of nodes and edges for readers outside the lock.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Serializable point-in-time view of the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

// =============================================================================
// TESTS
// =============================================================================
