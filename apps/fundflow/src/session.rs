//! # Session
//!
//! The surface the UI layer talks to. A session owns one graph, the explorer
//! writing into it, and the layout and scene reading from it.
//!
//! ## Locking
//!
//! The graph sits behind one `RwLock`, the single serialization point for
//! every writer. Layout and scene sit together behind one `Mutex`. When both
//! are needed, the view lock is taken first.

use crate::explorer::{Explorer, ExplorerConfig, ExploreError, PageReport};
use crate::ledger::Ledger;
use fundflow_core::{
    Address, FlowError, FlowGraph, GraphSnapshot, LayoutConfig, LayoutDistance, LayoutEngine,
    PageLimit, Point, ReconcileReport, Scene, Viewport,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Default block explorer page for an address.
pub const DEFAULT_OPEN_URL_BASE: &str = "https://explorer.nervos.org/address/";

// =============================================================================
// OPEN HOOK
// =============================================================================

/// Drill-down hook invoked when the user opens a node.
pub trait NodeOpener: Send + Sync {
    fn open(&self, id: &Address);
}

/// Logs the block explorer link of the opened node.
#[derive(Debug, Clone)]
pub struct LogOpener {
    base_url: String,
}

impl LogOpener {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    #[must_use]
    pub fn url_for(&self, id: &Address) -> String {
        format!("{}{}", self.base_url, id)
    }
}

impl Default for LogOpener {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_URL_BASE)
    }
}

impl NodeOpener for LogOpener {
    fn open(&self, id: &Address) {
        info!(node = %id, url = %self.url_for(id), "open_node");
    }
}

/// Remembers every opened node. Useful for tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: StdMutex<Vec<Address>>,
}

impl RecordingOpener {
    #[must_use]
    pub fn opened(&self) -> Vec<Address> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NodeOpener for RecordingOpener {
    fn open(&self, id: &Address) {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id.clone());
    }
}

// =============================================================================
// REPORTS
// =============================================================================

/// What one `tick` did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickReport {
    /// Bodies added to the layout by this tick's sync.
    pub added: usize,
    /// Displacement energy of the step.
    pub energy: f64,
    pub alpha: f64,
    pub scene: ReconcileReport,
}

/// Counters for the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub nodes: usize,
    pub edges: usize,
    pub counted_flows: usize,
    pub pending_nodes: usize,
    pub layout_bodies: usize,
    pub alpha: f64,
    pub layout_distance: LayoutDistance,
    pub page_limit: u32,
}

// =============================================================================
// SESSION
// =============================================================================

struct ViewState {
    layout: LayoutEngine,
    scene: Scene,
}

/// One exploration session.
pub struct Session {
    graph: Arc<RwLock<FlowGraph>>,
    explorer: Explorer,
    view: Mutex<ViewState>,
    opener: Arc<dyn NodeOpener>,
}

impl Session {
    #[must_use]
    pub fn new(
        ledger: Arc<dyn Ledger>,
        explorer: ExplorerConfig,
        layout: LayoutConfig,
        opener: Arc<dyn NodeOpener>,
    ) -> Self {
        let graph = Arc::new(RwLock::new(FlowGraph::new()));
        Self {
            explorer: Explorer::new(ledger, Arc::clone(&graph), explorer),
            graph,
            view: Mutex::new(ViewState {
                layout: LayoutEngine::new(layout),
                scene: Scene::default(),
            }),
            opener,
        }
    }

    #[must_use]
    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    // -------------------------------------------------------------------------
    // Exploration
    // -------------------------------------------------------------------------

    /// Resolve and add a seed address.
    pub async fn add_seed_address(&self, address: &str) -> Result<Address, ExploreError> {
        let id = self.explorer.discover(address).await?;
        info!(node = %id, "seed_added");
        Ok(id)
    }

    /// Fold one more page of `id`'s history into the graph.
    pub async fn load_more(&self, id: &Address) -> Result<PageReport, ExploreError> {
        self.explorer.load_more(id).await
    }

    /// Load pages until `id` is exhausted or `max_pages` were fetched.
    ///
    /// Returns one report per page.
    pub async fn load_pages(
        &self,
        id: &Address,
        max_pages: usize,
    ) -> Result<Vec<PageReport>, ExploreError> {
        let mut reports = Vec::new();
        while reports.len() < max_pages {
            let report = self.load_more(id).await?;
            let more = report.cursor.has_more();
            reports.push(report);
            if !more {
                break;
            }
        }
        Ok(reports)
    }

    // -------------------------------------------------------------------------
    // Tuning
    // -------------------------------------------------------------------------

    /// Parse and apply a new link rest distance.
    pub async fn set_layout_distance(&self, input: &str) -> Result<LayoutDistance, FlowError> {
        let distance = LayoutDistance::parse(input)?;
        self.view.lock().await.layout.set_distance(distance);
        debug!(distance = %distance, "layout_distance_set");
        Ok(distance)
    }

    /// Parse and apply a new page size.
    pub fn set_page_limit(&self, input: &str) -> Result<PageLimit, FlowError> {
        let limit = PageLimit::parse(input)?;
        self.explorer.set_page_limit(limit);
        debug!(limit = %limit, "page_limit_set");
        Ok(limit)
    }

    // -------------------------------------------------------------------------
    // Read access and hooks
    // -------------------------------------------------------------------------

    pub async fn snapshot(&self) -> GraphSnapshot {
        self.graph.read().await.snapshot()
    }

    /// Hand `id` to the drill-down hook.
    pub async fn open_node(&self, id: &Address) -> Result<(), FlowError> {
        if !self.graph.read().await.contains_node(id) {
            return Err(FlowError::NodeNotFound(id.clone()));
        }
        self.opener.open(id);
        Ok(())
    }

    pub async fn status(&self) -> SessionStatus {
        let view = self.view.lock().await;
        let graph = self.graph.read().await;
        SessionStatus {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            counted_flows: graph.claim_count(),
            pending_nodes: graph.nodes().filter(|n| n.has_more()).count(),
            layout_bodies: view.layout.len(),
            alpha: view.layout.alpha(),
            layout_distance: view.layout.distance(),
            page_limit: self.explorer.page_limit(),
        }
    }

    // -------------------------------------------------------------------------
    // Simulation and view
    // -------------------------------------------------------------------------

    /// One frame: sync the layout and the scene with the graph, step the
    /// layout, copy positions back and move the scene.
    ///
    /// The physics step runs without any graph lock, so explorer writes only
    /// wait for the sync and the position copy.
    pub async fn tick(&self) -> TickReport {
        let mut view = self.view.lock().await;
        let ViewState { layout, scene } = &mut *view;

        let (added, reconciled) = {
            let graph = self.graph.read().await;
            (layout.sync(&graph), scene.reconcile(&graph))
        };
        let energy = layout.tick();
        self.graph.write().await.apply_positions(layout.positions());
        scene.on_tick(layout);

        if !reconciled.is_noop() {
            debug!(
                entered = reconciled.entered,
                updated = reconciled.updated,
                exited = reconciled.exited,
                "scene_reconciled"
            );
        }

        TickReport {
            added,
            energy,
            alpha: layout.alpha(),
            scene: reconciled,
        }
    }

    /// Recompute the default frame around every node.
    pub async fn refit(&self) -> Viewport {
        self.view.lock().await.scene.refit()
    }

    pub async fn drag(&self, id: &Address, to: Point) -> Result<(), FlowError> {
        self.view.lock().await.layout.drag(id, to)
    }

    pub async fn release(&self, id: &Address) -> Result<(), FlowError> {
        self.view.lock().await.layout.release(id)
    }

    pub async fn zoom(&self, factor: f64, anchor: Point) -> Result<(), FlowError> {
        self.view.lock().await.scene.zoom(factor, anchor)
    }

    pub async fn pan(&self, dx: f64, dy: f64) {
        self.view.lock().await.scene.pan(dx, dy);
    }

    pub async fn render_svg(&self) -> String {
        self.view.lock().await.scene.to_svg()
    }

    /// Run the tick loop and the refit loop on their own cadences.
    pub fn spawn_driver(
        self: Arc<Self>,
        tick_interval: Duration,
        refit_interval: Duration,
    ) -> JoinHandle<()> {
        let floor = Duration::from_millis(1);
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(tick_interval.max(floor));
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut refits = tokio::time::interval(refit_interval.max(floor));
            refits.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticks.tick() => {
                        self.tick().await;
                    }
                    _ = refits.tick() => {
                        let viewport = self.refit().await;
                        debug!(view_box = %viewport.view_box(), "viewport_refit");
                    }
                }
            }
        })
    }
}
