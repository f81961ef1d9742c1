//! # Ledger Collaborator
//!
//! The interface the explorer needs from a ledger client, and the error
//! taxonomy it reports through.
//!
//! ## Implementations
//!
//! - `FixtureLedger`: serves a JSON fixture from memory, with optional
//!   failure injection for exercising the retry path
//!
//! Script classification is shared by every implementation through
//! `ScriptRegistry`.

mod fixture;
mod registry;

pub use fixture::{Fixture, FixtureAccount, FixtureLedger};
pub use registry::{KnownScript, ScriptRegistry};

use async_trait::async_trait;
use fundflow_core::{Address, Amount, Script, TransactionDetail, TransactionPage, TxHash};
use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors reported by a ledger client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The address string does not decode to a script.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The requested object does not exist on the ledger.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or service hiccup. Worth retrying.
    #[error("Transient ledger failure: {0}")]
    Transient(String),

    /// The ledger answered with data that cannot be interpreted.
    #[error("Malformed ledger response: {0}")]
    Malformed(String),
}

impl LedgerError {
    /// Whether the same request may succeed if repeated.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Transient(_))
    }

    /// Error category for logging.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            LedgerError::InvalidAddress(_) => "address",
            LedgerError::NotFound(_) => "lookup",
            LedgerError::Transient(_) => "network",
            LedgerError::Malformed(_) => "decode",
        }
    }
}

// =============================================================================
// LEDGER TRAIT
// =============================================================================

/// A ledger client as consumed by the explorer.
///
/// All network-facing calls are async. `classify` and `address_from_script`
/// are pure lookups and stay synchronous.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Decode an address into the script that owns it.
    async fn resolve_address(&self, address: &str) -> Result<Script, LedgerError>;

    /// Current balance held by `script`.
    async fn get_balance(&self, script: &Script) -> Result<Amount, LedgerError>;

    /// One page of transactions touching `script`, ascending by chain order,
    /// grouped by transaction, starting after `cursor`.
    async fn list_transactions(
        &self,
        script: &Script,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<TransactionPage, LedgerError>;

    /// Full transaction detail with input amounts resolved.
    async fn get_transaction(&self, hash: &TxHash) -> Result<TransactionDetail, LedgerError>;

    /// Human label for a script, or `"Unknown"`.
    fn classify(&self, script: &Script) -> String;

    /// Display address of a script.
    fn address_from_script(&self, script: &Script) -> Result<Address, LedgerError>;
}
