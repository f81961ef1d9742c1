//! # Core Type Definitions
//!
//! This module contains all core types for the Fundflow graph engine:
//! - Graph identifiers (`Address`, `TxHash`)
//! - Ledger identity and value (`Script`, `Amount`)
//! - Ledger data consumed by the flow rules (`CellRef`, `TransactionDetail`, `TransactionPage`)
//! - Traversal state (`Cursor`)
//! - Layout coordinates (`Point`)
//! - Error types (`FlowError`)
//!
//! ## Determinism Guarantees
//!
//! - Currency is integer only (`Amount` wraps `u128` shannons, never a float)
//! - Identifiers implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Accumulation uses saturating arithmetic to prevent overflow

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// GRAPH IDENTIFIERS
// =============================================================================

/// A ledger address in its display form. This is the node key of the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    /// Create a new address from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash of a ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// SCRIPT
// =============================================================================

/// A ledger-native ownership predicate (a lock script).
///
/// Two cells belong to the same owner exactly when their scripts are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Script {
    pub code_hash: String,
    pub hash_type: String,
    pub args: String,
}

impl Script {
    /// Create a new script.
    #[must_use]
    pub fn new(
        code_hash: impl Into<String>,
        hash_type: impl Into<String>,
        args: impl Into<String>,
    ) -> Self {
        Self {
            code_hash: code_hash.into(),
            hash_type: hash_type.into(),
            args: args.into(),
        }
    }

    /// BLAKE3 digest over the canonical `code_hash|hash_type|args` encoding.
    ///
    /// Used as the colour seed of the node, so it must be stable across runs.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.code_hash.as_bytes());
        hasher.update(b"|");
        hasher.update(self.hash_type.as_bytes());
        hasher.update(b"|");
        hasher.update(self.args.as_bytes());
        *hasher.finalize().as_bytes()
    }
}

// =============================================================================
// AMOUNT
// =============================================================================

/// A currency amount in the ledger's smallest unit (shannons).
///
/// Uses u128 with saturating arithmetic; never converted to floating point
/// except for display sizing in the `visual` module.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Add another amount using saturating arithmetic.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtract another amount, returning `None` if it would go negative.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Get the raw shannon value.
    #[must_use]
    pub const fn value(self) -> u128 {
        self.0
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// LEDGER DATA
// =============================================================================

/// One resolved input or output of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    /// The lock script owning the cell.
    pub owner: Script,
    /// The capacity held by the cell.
    pub amount: Amount,
}

impl CellRef {
    #[must_use]
    pub fn new(owner: Script, amount: Amount) -> Self {
        Self { owner, amount }
    }
}

/// Full detail of a transaction with input amounts already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub hash: TxHash,
    pub inputs: Vec<CellRef>,
    pub outputs: Vec<CellRef>,
}

/// One page returned by the transaction-listing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionPage {
    /// Transaction references, ascending by chain order.
    pub refs: Vec<TxHash>,
    /// Opaque continuation token for the next page.
    pub next_cursor: Option<String>,
}

// =============================================================================
// CURSOR
// =============================================================================

/// Traversal state of a node's transaction history.
///
/// `NotStarted -> InProgress(token) -> ... -> Exhausted`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "token", rename_all = "snake_case")]
pub enum Cursor {
    /// No page has been fetched yet.
    #[default]
    NotStarted,
    /// At least one full page was fetched; continue after this token.
    InProgress(String),
    /// The last page was short; nothing more to load.
    Exhausted,
}

impl Cursor {
    /// Whether another page can be requested.
    #[must_use]
    pub fn has_more(&self) -> bool {
        !matches!(self, Cursor::Exhausted)
    }

    /// The token to pass to the listing call (`None` for the first page).
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Cursor::InProgress(token) => Some(token),
            Cursor::NotStarted | Cursor::Exhausted => None,
        }
    }
}

// =============================================================================
// POINT
// =============================================================================

/// A 2D coordinate in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Fundflow core.
///
/// - No silent failures
/// - Use `Result<T, FlowError>` for fallible operations
/// - The core should never panic; all errors must be recoverable
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    /// An edge contribution must be strictly positive.
    #[error("Edge amount must be positive: {from} -> {to}")]
    InvalidAmount { from: Address, to: Address },

    /// The requested node was not found in the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(Address),

    /// A tuning value failed validation.
    #[error("Invalid {field} '{value}': {reason}")]
    InvalidConfig {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

// =============================================================================
// TESTS
// =============================================================================
