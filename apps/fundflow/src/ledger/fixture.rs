//! Fixture-backed ledger.
//!
//! Serves a fixed set of accounts and transactions from memory. Used by the
//! CLI for offline exploration and by the test suites.
//!
//! ## Fixture format (JSON)
//!
//! ```json
//! {
//!   "accounts": [{ "address": "ckb1...", "script": {...}, "balance": 50000000000 }],
//!   "transactions": [{ "hash": "0x..", "inputs": [...], "outputs": [...] }],
//!   "scripts": [{ "code_hash": "0x..", "hash_type": "type", "label": "Custom" }],
//!   "flaky": { "0x..": 2 },
//!   "broken": ["0x.."],
//!   "flaky_listings": 1
//! }
//! ```
//!
//! Transactions are listed in chain order. Owners that are not listed as
//! accounts still get a stable derived address and a zero balance.
//! `flaky` fails a transaction fetch the given number of times before it
//! succeeds, `broken` fails it forever, `flaky_listings` fails that many
//! page requests up front.

use super::{KnownScript, Ledger, LedgerError, ScriptRegistry};
use async_trait::async_trait;
use fundflow_core::{Address, Amount, Script, TransactionDetail, TransactionPage, TxHash};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Bytes of the script digest used in a derived address.
const DERIVED_ADDRESS_BYTES: usize = 20;

// =============================================================================
// FIXTURE DATA
// =============================================================================

/// An account with a known address and balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureAccount {
    pub address: Address,
    pub script: Script,
    #[serde(default)]
    pub balance: Amount,
}

/// The on-disk fixture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub accounts: Vec<FixtureAccount>,
    #[serde(default)]
    pub transactions: Vec<TransactionDetail>,
    #[serde(default)]
    pub scripts: Vec<KnownScript>,
    #[serde(default)]
    pub flaky: BTreeMap<TxHash, u32>,
    #[serde(default)]
    pub broken: BTreeSet<TxHash>,
    #[serde(default)]
    pub flaky_listings: u32,
}

// =============================================================================
// FIXTURE LEDGER
// =============================================================================

/// In-memory ledger built from a `Fixture`.
#[derive(Debug)]
pub struct FixtureLedger {
    registry: ScriptRegistry,
    by_address: BTreeMap<Address, Script>,
    by_script: BTreeMap<Script, Address>,
    balances: BTreeMap<Script, Amount>,
    history: BTreeMap<Script, Vec<TxHash>>,
    details: BTreeMap<TxHash, TransactionDetail>,
    flaky: Mutex<BTreeMap<TxHash, u32>>,
    broken: BTreeSet<TxHash>,
    flaky_listings: AtomicU32,
    list_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

impl FixtureLedger {
    /// Index a fixture. Later duplicates of an account or hash are ignored.
    #[must_use]
    pub fn new(fixture: Fixture) -> Self {
        let mut registry = ScriptRegistry::mainnet();
        for known in fixture.scripts {
            registry.insert(known);
        }

        let mut ledger = Self {
            registry,
            by_address: BTreeMap::new(),
            by_script: BTreeMap::new(),
            balances: BTreeMap::new(),
            history: BTreeMap::new(),
            details: BTreeMap::new(),
            flaky: Mutex::new(fixture.flaky),
            broken: fixture.broken,
            flaky_listings: AtomicU32::new(fixture.flaky_listings),
            list_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
        };

        for account in fixture.accounts {
            if ledger.by_script.contains_key(&account.script) {
                continue;
            }
            ledger.register(account.address, account.script.clone());
            ledger.balances.insert(account.script, account.balance);
        }

        for tx in fixture.transactions {
            if ledger.details.contains_key(&tx.hash) {
                continue;
            }
            let owners: BTreeSet<&Script> = tx
                .inputs
                .iter()
                .chain(&tx.outputs)
                .map(|c| &c.owner)
                .collect();
            for owner in owners {
                if !ledger.by_script.contains_key(owner) {
                    ledger.register(derived_address(owner), owner.clone());
                }
                ledger
                    .history
                    .entry(owner.clone())
                    .or_default()
                    .push(tx.hash.clone());
            }
            ledger.details.insert(tx.hash.clone(), tx);
        }

        ledger
    }

    /// Parse a JSON fixture.
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let fixture: Fixture = serde_json::from_str(json)
            .map_err(|e| LedgerError::Malformed(format!("fixture: {e}")))?;
        Ok(Self::new(fixture))
    }

    /// Read and parse a JSON fixture file.
    pub fn from_path(path: &Path) -> Result<Self, LedgerError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::NotFound(format!("fixture '{}': {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    fn register(&mut self, address: Address, script: Script) {
        self.by_address.insert(address.clone(), script.clone());
        self.by_script.insert(script, address);
    }

    /// Number of page requests served so far, failures included.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of transaction fetches served so far, failures included.
    #[must_use]
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

/// Stable display address for an owner that is not a listed account.
fn derived_address(script: &Script) -> Address {
    let digest = script.digest();
    let hex: String = digest[..DERIVED_ADDRESS_BYTES]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    Address::new(format!("ckb1{hex}"))
}

fn parse_cursor(cursor: &str) -> Result<usize, LedgerError> {
    cursor
        .strip_prefix("0x")
        .and_then(|hex| usize::from_str_radix(hex, 16).ok())
        .ok_or_else(|| LedgerError::Malformed(format!("cursor '{cursor}'")))
}

#[async_trait]
impl Ledger for FixtureLedger {
    async fn resolve_address(&self, address: &str) -> Result<Script, LedgerError> {
        let address = address.trim();
        if !(address.starts_with("ckb1") || address.starts_with("ckt1")) {
            return Err(LedgerError::InvalidAddress(address.to_string()));
        }
        self.by_address
            .get(&Address::new(address))
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("address {address}")))
    }

    async fn get_balance(&self, script: &Script) -> Result<Amount, LedgerError> {
        Ok(self.balances.get(script).copied().unwrap_or_default())
    }

    async fn list_transactions(
        &self,
        script: &Script,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<TransactionPage, LedgerError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .flaky_listings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(LedgerError::Transient("listing unavailable".into()));
        }

        let offset = cursor.map(parse_cursor).transpose()?.unwrap_or(0);
        let history = self.history.get(script).map_or(&[][..], Vec::as_slice);
        let refs: Vec<TxHash> = history
            .iter()
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect();
        let next = offset + refs.len();
        let next_cursor = (next < history.len()).then(|| format!("0x{next:x}"));

        Ok(TransactionPage { refs, next_cursor })
    }

    async fn get_transaction(&self, hash: &TxHash) -> Result<TransactionDetail, LedgerError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.contains(hash) {
            return Err(LedgerError::Transient(format!("{hash} unavailable")));
        }
        {
            let mut flaky = self.flaky.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(left) = flaky.get_mut(hash).filter(|left| **left > 0) {
                *left -= 1;
                return Err(LedgerError::Transient(format!("{hash} timed out")));
            }
        }
        self.details
            .get(hash)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {hash}")))
    }

    fn classify(&self, script: &Script) -> String {
        self.registry.classify(script).to_string()
    }

    fn address_from_script(&self, script: &Script) -> Result<Address, LedgerError> {
        Ok(self
            .by_script
            .get(script)
            .cloned()
            .unwrap_or_else(|| derived_address(script)))
    }
}
