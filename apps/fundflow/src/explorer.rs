//! # Explorer
//!
//! Paginated traversal of an address's transaction history.
//!
//! Each `load_more` call fetches one page for one node, folds the page into
//! the node's cursor, then fetches and classifies every transaction of the
//! page concurrently. Counterparties are discovered (balance lookup,
//! classification) before any edge referencing them is written.
//!
//! ## Concurrency
//!
//! Transaction fetches run through `buffer_unordered` and complete in any
//! order. All writes go through the single `RwLock` around the graph, and the
//! graph's dedup ledger makes every contribution count at most once, so the
//! final state does not depend on completion order.
//!
//! ## Failures
//!
//! Transient ledger errors are retried with exponential backoff according to
//! `RetryPolicy`. A transaction that still fails is listed in
//! `PageReport::failed` and kept pending on its node, so the next `load_more`
//! tries it again. Its siblings are unaffected. Re-folding is safe because
//! the dedup ledger counts each contribution once.

use crate::ledger::{Ledger, LedgerError};
use fundflow_core::{
    Address, Cursor, FlowAttribution, FlowDirection, FlowError, FlowGraph, NodeSpec, PageLimit,
    Script, TxHash, classify,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Default number of transaction fetches in flight per page.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by the explorer.
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Graph(#[from] FlowError),

    /// Another `load_more` for this node has not finished yet.
    #[error("Node {0} is already loading")]
    AlreadyLoading(Address),
}

// =============================================================================
// RETRY POLICY
// =============================================================================

/// Retry budget for transient ledger failures.
///
/// The delay before retry `n` (zero-based) is `base_delay * 2^n`, capped at
/// `max_delay`. `max_attempts: None` retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(5),
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Retry until success.
    #[must_use]
    pub fn unbounded(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: None,
            base_delay,
            max_delay,
        }
    }

    /// Backoff before retry number `retry` (zero-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempts` have failed.
    #[must_use]
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Explorer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerConfig {
    pub page_limit: PageLimit,
    pub max_concurrent_fetches: usize,
    pub retry: RetryPolicy,
    pub attribution: FlowAttribution,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            page_limit: PageLimit::default(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            retry: RetryPolicy::default(),
            attribution: FlowAttribution::default(),
        }
    }
}

// =============================================================================
// PAGE REPORT
// =============================================================================

/// A transaction that could not be folded into the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTx {
    pub hash: TxHash,
    pub reason: String,
}

/// Outcome of one `load_more` call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageReport {
    /// Transaction references returned by the page request.
    pub fetched: usize,
    /// Previously failed transactions attempted again.
    #[serde(default)]
    pub retried: usize,
    /// Edge contributions written.
    pub edges_recorded: usize,
    /// Contributions skipped because they were already counted.
    pub duplicates: usize,
    /// Counterparty nodes created by this page.
    pub nodes_discovered: usize,
    /// Transactions whose retry budget ran out. They stay pending on the
    /// node and are retried by the next `load_more`.
    pub failed: Vec<FailedTx>,
    /// Cursor of the node after this page.
    pub cursor: Cursor,
}

#[derive(Debug, Default)]
struct FoldStats {
    edges_recorded: usize,
    duplicates: usize,
    nodes_discovered: usize,
}

// =============================================================================
// IN-FLIGHT GUARD
// =============================================================================

/// Marks a node as loading for as long as it lives.
struct LoadingGuard<'a> {
    loading: &'a Mutex<BTreeSet<Address>>,
    id: Address,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(loading: &'a Mutex<BTreeSet<Address>>, id: &Address) -> Result<Self, ExploreError> {
        let mut set = loading.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(id.clone()) {
            return Err(ExploreError::AlreadyLoading(id.clone()));
        }
        Ok(Self {
            loading,
            id: id.clone(),
        })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

// =============================================================================
// EXPLORER
// =============================================================================

/// Drives the per-node traversal state machine against a ledger.
pub struct Explorer {
    ledger: Arc<dyn Ledger>,
    graph: Arc<RwLock<FlowGraph>>,
    page_limit: AtomicU32,
    max_concurrent_fetches: usize,
    retry: RetryPolicy,
    attribution: FlowAttribution,
    loading: Mutex<BTreeSet<Address>>,
}

impl Explorer {
    #[must_use]
    pub fn new(
        ledger: Arc<dyn Ledger>,
        graph: Arc<RwLock<FlowGraph>>,
        config: ExplorerConfig,
    ) -> Self {
        Self {
            ledger,
            graph,
            page_limit: AtomicU32::new(config.page_limit.into()),
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
            retry: config.retry,
            attribution: config.attribution,
            loading: Mutex::new(BTreeSet::new()),
        }
    }

    /// Transactions requested per page.
    #[must_use]
    pub fn page_limit(&self) -> u32 {
        self.page_limit.load(Ordering::SeqCst)
    }

    /// Change the page size for subsequent pages.
    pub fn set_page_limit(&self, limit: PageLimit) {
        self.page_limit.store(limit.into(), Ordering::SeqCst);
    }

    /// Resolve `address` and make sure its node exists.
    ///
    /// On failure the graph is left untouched.
    pub async fn discover(&self, address: &str) -> Result<Address, ExploreError> {
        let script = self
            .with_retry("resolve_address", || self.ledger.resolve_address(address))
            .await?;
        self.discover_script(&script).await
    }

    /// Make sure the node owning `script` exists.
    pub async fn discover_script(&self, script: &Script) -> Result<Address, ExploreError> {
        let (id, _) = self.ensure_node(script).await?;
        Ok(id)
    }

    /// Returns the node id and whether this call created it.
    async fn ensure_node(&self, script: &Script) -> Result<(Address, bool), ExploreError> {
        let id = self.ledger.address_from_script(script)?;
        if self.graph.read().await.contains_node(&id) {
            return Ok((id, false));
        }

        // Lookups happen before the write lock is taken
        let balance = self
            .with_retry("get_balance", || self.ledger.get_balance(script))
            .await?;
        let label = self.ledger.classify(script);

        let mut graph = self.graph.write().await;
        let created = !graph.contains_node(&id);
        graph.add_node(NodeSpec {
            address: id.clone(),
            script: script.clone(),
            balance,
            label,
        });
        if created {
            debug!(node = %id, balance = %balance, "node_discovered");
        }
        Ok((id, created))
    }

    /// Fetch and fold the next page of `id`'s history.
    ///
    /// Transactions left pending by an earlier call are retried first, even
    /// when the node is exhausted. A no-op once the node is exhausted with
    /// nothing pending. Fails with `AlreadyLoading` while another call for the
    /// same node is running.
    pub async fn load_more(&self, id: &Address) -> Result<PageReport, ExploreError> {
        let _guard = LoadingGuard::acquire(&self.loading, id)?;

        let (script, cursor, pending) = {
            let graph = self.graph.read().await;
            let node = graph
                .node(id)
                .ok_or_else(|| FlowError::NodeNotFound(id.clone()))?;
            (node.script.clone(), node.cursor.clone(), node.pending.clone())
        };
        if !cursor.has_more() && pending.is_empty() {
            debug!(node = %id, "load_more_skipped::exhausted");
            return Ok(PageReport {
                cursor,
                ..PageReport::default()
            });
        }

        let mut report = PageReport {
            retried: pending.len(),
            cursor: cursor.clone(),
            ..PageReport::default()
        };
        let mut batch = pending;
        if cursor.has_more() {
            let limit = self.page_limit();
            let page = self
                .with_retry("list_transactions", || {
                    self.ledger
                        .list_transactions(&script, limit, cursor.token())
                })
                .await?;

            // The count moves with the page; unfolded hashes stay pending
            report.cursor = self.graph.write().await.advance_cursor(
                id,
                page.refs.len(),
                page.next_cursor.clone(),
                limit,
            )?;
            report.fetched = page.refs.len();
            batch.extend(page.refs);
        }

        let outcomes: Vec<Result<FoldStats, FailedTx>> = stream::iter(batch)
            .map(|hash| self.process_tx(&script, id, hash))
            .buffer_unordered(self.max_concurrent_fetches)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Ok(stats) => {
                    report.edges_recorded += stats.edges_recorded;
                    report.duplicates += stats.duplicates;
                    report.nodes_discovered += stats.nodes_discovered;
                }
                Err(failed) => report.failed.push(failed),
            }
        }
        report.failed.sort_by(|a, b| a.hash.cmp(&b.hash));

        let still_pending = report.failed.iter().map(|f| f.hash.clone()).collect();
        self.graph.write().await.set_pending(id, still_pending)?;

        info!(
            node = %id,
            fetched = report.fetched,
            retried = report.retried,
            edges = report.edges_recorded,
            duplicates = report.duplicates,
            discovered = report.nodes_discovered,
            failed = report.failed.len(),
            more = report.cursor.has_more(),
            "page_loaded"
        );
        Ok(report)
    }

    async fn process_tx(
        &self,
        script: &Script,
        id: &Address,
        hash: TxHash,
    ) -> Result<FoldStats, FailedTx> {
        self.fold_tx(script, id, &hash).await.map_err(|e| {
            warn!(node = %id, tx = %hash, error = %e, "transaction_failed");
            FailedTx {
                hash,
                reason: e.to_string(),
            }
        })
    }

    async fn fold_tx(
        &self,
        script: &Script,
        id: &Address,
        hash: &TxHash,
    ) -> Result<FoldStats, ExploreError> {
        let detail = self
            .with_retry("get_transaction", || self.ledger.get_transaction(hash))
            .await?;
        let classified = classify(&detail, script, self.attribution);

        let mut stats = FoldStats::default();
        for counterparty in classified.counterparties {
            let (other, created) = self.ensure_node(&counterparty.script).await?;
            if created {
                stats.nodes_discovered += 1;
            }
            let (from, to) = match classified.direction {
                FlowDirection::Outflow(_) => (id, &other),
                FlowDirection::Inflow(_) => (&other, id),
                FlowDirection::Balanced => continue,
            };
            let recorded = self
                .graph
                .write()
                .await
                .record_flow(hash, from, to, counterparty.amount)?;
            if recorded {
                stats.edges_recorded += 1;
            } else {
                stats.duplicates += 1;
            }
        }
        Ok(stats)
    }

    /// Run `op`, retrying transient failures per the retry policy.
    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempts = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempts = attempts.saturating_add(1);
                    if !e.is_retryable() || !self.retry.allows(attempts) {
                        return Err(e);
                    }
                    let delay = self.retry.delay_for(attempts - 1);
                    warn!(
                        op = what,
                        attempt = attempts,
                        category = e.category(),
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "ledger_retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = RetryPolicy {
            max_attempts: Some(10),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(1000));
    }

    #[test]
    fn attempt_budget() {
        let policy = RetryPolicy {
            max_attempts: Some(3),
            ..RetryPolicy::default()
        };
        assert!(policy.allows(1));
        assert!(policy.allows(2));
        assert!(!policy.allows(3));

        let forever = RetryPolicy::unbounded(Duration::from_millis(1), Duration::from_millis(2));
        assert!(forever.allows(u32::MAX));
    }

    #[test]
    fn guard_is_exclusive_and_released() {
        let loading = Mutex::new(BTreeSet::new());
        let id = Address::new("ckb1a");
        {
            let _first = LoadingGuard::acquire(&loading, &id).expect("free");
            assert!(matches!(
                LoadingGuard::acquire(&loading, &id),
                Err(ExploreError::AlreadyLoading(_))
            ));
            let _other = LoadingGuard::acquire(&loading, &Address::new("ckb1b")).expect("free");
        }
        assert!(LoadingGuard::acquire(&loading, &id).is_ok());
    }
}
