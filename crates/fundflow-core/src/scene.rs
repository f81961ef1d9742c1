//! # Scene Reconciler
//!
//! Persistent visual objects keyed by node id and edge identity.
//!
//! The scene follows the data graph through three passes:
//! - `reconcile`: enter new ids, update text and widths of existing ones,
//!   exit ids the graph no longer lists
//! - `on_tick`: move every object to the latest layout positions
//! - `refit`: recompute the default frame around all nodes
//!
//! `refit` is an explicit step. The caller decides the cadence
//! (`REFIT_INTERVAL_MS` by default), independent of the tick rate.

#![allow(clippy::float_arithmetic)]

use crate::graph::{Edge, EdgeKey, FlowGraph, Node};
use crate::layout::LayoutEngine;
use crate::primitives::{EDGE_LABEL_SOURCE_BIAS, VIEW_PADDING};
use crate::viewport::{ViewTransform, Viewport};
use crate::visual::{Hsl, edge_stroke_width, format_amount, short_address};
use crate::{Address, Amount, FlowError, Point};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Vertical label offsets relative to the node centre.
const ADDRESS_OFFSET: f64 = 18.0;
const TYPE_OFFSET: f64 = -18.0;
const MORE_GAP: f64 = 16.0;

// =============================================================================
// VISUAL OBJECTS
// =============================================================================

/// Visual object of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeVisual {
    pub id: Address,
    pub center: Point,
    pub radius: f64,
    pub fill: Hsl,
    /// `first6..last4`
    pub address_text: String,
    pub balance_text: String,
    pub type_text: String,
    /// `(n) Load more` or `(n) Loaded`
    pub more_text: String,
    /// Whether the "load more" label is actionable.
    pub has_more: bool,
}

impl NodeVisual {
    fn enter(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            center: node.position,
            radius: node.radius,
            fill: node.color,
            address_text: short_address(node.id.as_str()),
            balance_text: format_amount(node.balance),
            type_text: node.label.clone(),
            more_text: more_text(node),
            has_more: node.has_more(),
        }
    }

    /// Refresh the parts that react to traversal progress.
    fn update(&mut self, node: &Node) -> bool {
        let text = more_text(node);
        let has_more = node.has_more();
        if text == self.more_text && has_more == self.has_more {
            return false;
        }
        self.more_text = text;
        self.has_more = has_more;
        true
    }

    #[must_use]
    pub fn address_anchor(&self) -> Point {
        Point::new(self.center.x, self.center.y + ADDRESS_OFFSET)
    }

    #[must_use]
    pub fn balance_anchor(&self) -> Point {
        self.center
    }

    #[must_use]
    pub fn type_anchor(&self) -> Point {
        Point::new(self.center.x, self.center.y + TYPE_OFFSET)
    }

    #[must_use]
    pub fn more_anchor(&self) -> Point {
        Point::new(self.center.x, self.center.y + self.radius + MORE_GAP)
    }
}

fn more_text(node: &Node) -> String {
    let state = if node.has_more() {
        "Load more"
    } else {
        "Loaded"
    };
    format!("({}) {state}", node.loaded)
}

/// Visual object of one edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeVisual {
    pub source: Address,
    pub target: Address,
    pub from: Point,
    pub to: Point,
    pub stroke_width: f64,
    pub value_text: String,
    value: Amount,
}

impl EdgeVisual {
    fn enter(edge: &Edge, from: Point, to: Point) -> Self {
        Self {
            source: edge.source.clone(),
            target: edge.target.clone(),
            from,
            to,
            stroke_width: edge_stroke_width(edge.value),
            value_text: format_amount(edge.value),
            value: edge.value,
        }
    }

    fn update(&mut self, edge: &Edge) -> bool {
        if edge.value == self.value {
            return false;
        }
        self.value = edge.value;
        self.stroke_width = edge_stroke_width(edge.value);
        self.value_text = format_amount(edge.value);
        true
    }

    /// Label position, biased toward the target end.
    #[must_use]
    pub fn label_anchor(&self) -> Point {
        let s = EDGE_LABEL_SOURCE_BIAS;
        let t = 1.0 - EDGE_LABEL_SOURCE_BIAS;
        Point::new(
            self.from.x * s + self.to.x * t,
            self.from.y * s + self.to.y * t,
        )
    }
}

/// What one `reconcile` pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub entered: usize,
    pub updated: usize,
    pub exited: usize,
}

impl ReconcileReport {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.entered == 0 && self.updated == 0 && self.exited == 0
    }
}

// =============================================================================
// SCENE
// =============================================================================

/// The visual scene graph.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: BTreeMap<Address, NodeVisual>,
    edges: BTreeMap<EdgeKey, EdgeVisual>,
    viewport: Viewport,
    transform: ViewTransform,
    padding: f64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(VIEW_PADDING)
    }
}

impl Scene {
    #[must_use]
    pub fn new(padding: f64) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            viewport: Viewport::fit(std::iter::empty(), padding),
            transform: ViewTransform::IDENTITY,
            padding,
        }
    }

    /// Bring the visual objects in line with the graph.
    pub fn reconcile(&mut self, graph: &FlowGraph) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for node in graph.nodes() {
            match self.nodes.get_mut(&node.id) {
                Some(visual) => {
                    if visual.update(node) {
                        report.updated += 1;
                    }
                }
                None => {
                    self.nodes.insert(node.id.clone(), NodeVisual::enter(node));
                    report.entered += 1;
                }
            }
        }

        for edge in graph.edges() {
            let key = EdgeKey::new(edge.source.clone(), edge.target.clone());
            match self.edges.get_mut(&key) {
                Some(visual) => {
                    if visual.update(edge) {
                        report.updated += 1;
                    }
                }
                None => {
                    let from = self.center_of(&edge.source);
                    let to = self.center_of(&edge.target);
                    self.edges.insert(key, EdgeVisual::enter(edge, from, to));
                    report.entered += 1;
                }
            }
        }

        let nodes_before = self.nodes.len();
        self.nodes.retain(|id, _| graph.contains_node(id));
        let edges_before = self.edges.len();
        self.edges
            .retain(|key, _| graph.edge(&key.source, &key.target).is_some());
        report.exited = (nodes_before - self.nodes.len()) + (edges_before - self.edges.len());

        report
    }

    /// Move every object to the engine's current positions.
    pub fn on_tick(&mut self, layout: &LayoutEngine) {
        for (id, point) in layout.positions() {
            if let Some(visual) = self.nodes.get_mut(id) {
                visual.center = point;
            }
        }
        let nodes = &self.nodes;
        for visual in self.edges.values_mut() {
            if let Some(n) = nodes.get(&visual.source) {
                visual.from = n.center;
            }
            if let Some(n) = nodes.get(&visual.target) {
                visual.to = n.center;
            }
        }
    }

    /// Recompute the default frame and drop any zoom/pan override.
    pub fn refit(&mut self) -> Viewport {
        self.viewport = Viewport::fit(self.nodes.values().map(|n| n.center), self.padding);
        self.transform.reset();
        self.viewport
    }

    fn center_of(&self, id: &Address) -> Point {
        self.nodes.get(id).map_or(Point::ORIGIN, |n| n.center)
    }

    // -------------------------------------------------------------------------
    // Interactive view
    // -------------------------------------------------------------------------

    pub fn zoom(&mut self, factor: f64, anchor: Point) -> Result<(), FlowError> {
        self.transform.zoom_by(factor, anchor)
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.transform.pan_by(dx, dy);
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn node(&self, id: &Address) -> Option<&NodeVisual> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn edge(&self, source: &Address, target: &Address) -> Option<&EdgeVisual> {
        self.edges
            .get(&EdgeKey::new(source.clone(), target.clone()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeVisual> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeVisual> {
        self.edges.values()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    // -------------------------------------------------------------------------
    // SVG output
    // -------------------------------------------------------------------------

    /// Serialise the scene as a standalone SVG document.
    ///
    /// Edges are drawn first so nodes sit on top of them.
    #[must_use]
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{}" font-family="sans-serif" font-size="12" text-anchor="middle">"#,
            self.viewport.view_box()
        );
        let _ = writeln!(out, r#"<g transform="{}">"#, self.transform.to_svg());

        for edge in self.edges.values() {
            let label = edge.label_anchor();
            let _ = writeln!(
                out,
                r##"<g class="edge"><line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="#999" stroke-width="{:.2}"/><text x="{:.2}" y="{:.2}">{}</text></g>"##,
                edge.from.x,
                edge.from.y,
                edge.to.x,
                edge.to.y,
                edge.stroke_width,
                label.x,
                label.y,
                escape(&edge.value_text)
            );
        }

        for node in self.nodes.values() {
            let _ = write!(
                out,
                r#"<g class="node"><circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}"/>"#,
                node.center.x, node.center.y, node.radius, node.fill
            );
            for (class, at, text) in [
                ("addr", node.address_anchor(), &node.address_text),
                ("balance", node.balance_anchor(), &node.balance_text),
                ("type", node.type_anchor(), &node.type_text),
                ("more", node.more_anchor(), &node.more_text),
            ] {
                let _ = write!(
                    out,
                    r#"<text class="{class}" x="{:.2}" y="{:.2}">{}</text>"#,
                    at.x,
                    at.y,
                    escape(text)
                );
            }
            out.push_str("</g>\n");
        }

        out.push_str("</g>\n</svg>\n");
        out
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeSpec;
    use crate::primitives::SHANNONS_PER_CKB;
    use crate::{Script, TxHash};

    fn add(graph: &mut FlowGraph, id: &str, ckb: u128) {
        graph.add_node(NodeSpec {
            address: Address::new(id),
            script: Script::new("0xcode", "type", id),
            balance: Amount::new(ckb * SHANNONS_PER_CKB),
            label: "Secp256k1Blake160".into(),
        });
    }

    fn flow(graph: &mut FlowGraph, tx: &str, from: &str, to: &str, ckb: u128) {
        graph
            .record_flow(
                &TxHash::new(tx),
                &Address::new(from),
                &Address::new(to),
                Amount::new(ckb * SHANNONS_PER_CKB),
            )
            .expect("endpoints exist");
    }

    fn sample() -> FlowGraph {
        let mut graph = FlowGraph::new();
        add(&mut graph, "ckb1qzda0cr08m85hc8jlnfp3zer7xulejywt49kt2rr0vthywaa50xwsqwx", 1500);
        add(&mut graph, "ckb1qyqrdsefa43s6m882pcj53m4gdnj4k440axqdt9rtd", 20);
        flow(
            &mut graph,
            "0x01",
            "ckb1qzda0cr08m85hc8jlnfp3zer7xulejywt49kt2rr0vthywaa50xwsqwx",
            "ckb1qyqrdsefa43s6m882pcj53m4gdnj4k440axqdt9rtd",
            1000,
        );
        graph
    }

    #[test]
    fn first_reconcile_enters_everything() {
        let graph = sample();
        let mut scene = Scene::default();
        let report = scene.reconcile(&graph);
        assert_eq!(
            report,
            ReconcileReport {
                entered: 3,
                updated: 0,
                exited: 0
            }
        );

        let node = scene
            .node(&Address::new("ckb1qyqrdsefa43s6m882pcj53m4gdnj4k440axqdt9rtd"))
            .expect("node entered");
        assert_eq!(node.address_text, "ckb1qy..9rtd");
        assert_eq!(node.balance_text, "20");
        assert_eq!(node.type_text, "Secp256k1Blake160");
        assert_eq!(node.more_text, "(0) Load more");
        assert!(node.has_more);
    }

    #[test]
    fn second_reconcile_is_noop() {
        let graph = sample();
        let mut scene = Scene::default();
        scene.reconcile(&graph);
        assert!(scene.reconcile(&graph).is_noop());
    }

    #[test]
    fn progress_and_value_update_in_place() {
        let mut graph = sample();
        let mut scene = Scene::default();
        scene.reconcile(&graph);

        let seed = Address::new("ckb1qzda0cr08m85hc8jlnfp3zer7xulejywt49kt2rr0vthywaa50xwsqwx");
        let other = Address::new("ckb1qyqrdsefa43s6m882pcj53m4gdnj4k440axqdt9rtd");
        graph
            .advance_cursor(&seed, 3, None, 100)
            .expect("seed exists");
        flow(&mut graph, "0x02", seed.as_str(), other.as_str(), 500);

        let report = scene.reconcile(&graph);
        assert_eq!(report.entered, 0);
        assert_eq!(report.updated, 2);

        let node = scene.node(&seed).expect("seed visual");
        assert_eq!(node.more_text, "(3) Loaded");
        assert!(!node.has_more);
        let edge = scene.edge(&seed, &other).expect("edge visual");
        assert_eq!(edge.value_text, "1,500");
    }

    #[test]
    fn exit_removes_vanished_ids() {
        let graph = sample();
        let mut scene = Scene::default();
        scene.reconcile(&graph);
        let report = scene.reconcile(&FlowGraph::new());
        assert_eq!(report.exited, 3);
        assert_eq!(scene.nodes().count(), 0);
        assert_eq!(scene.edges().count(), 0);
    }

    #[test]
    fn tick_moves_nodes_and_edges() {
        let graph = sample();
        let mut layout = LayoutEngine::default();
        layout.sync(&graph);
        let mut scene = Scene::default();
        scene.reconcile(&graph);
        for _ in 0..5 {
            layout.tick();
        }
        scene.on_tick(&layout);

        for (id, point) in layout.positions() {
            assert_eq!(scene.node(id).map(|n| n.center), Some(point));
        }
        let edge = scene.edges().next().expect("one edge");
        assert_eq!(Some(edge.from), layout.position(&edge.source));
        assert_eq!(Some(edge.to), layout.position(&edge.target));
    }

    #[test]
    fn node_label_offsets() {
        let graph = sample();
        let mut scene = Scene::default();
        scene.reconcile(&graph);
        let node = scene.nodes().next().expect("node");
        assert_eq!(node.address_anchor().y, node.center.y + 18.0);
        assert_eq!(node.balance_anchor(), node.center);
        assert_eq!(node.type_anchor().y, node.center.y - 18.0);
        assert_eq!(node.more_anchor().y, node.center.y + node.radius + 16.0);
    }

    #[test]
    fn edge_label_biased_to_target() {
        let visual = EdgeVisual {
            source: Address::new("a"),
            target: Address::new("b"),
            from: Point::new(0.0, 0.0),
            to: Point::new(100.0, 200.0),
            stroke_width: 1.0,
            value_text: "1".into(),
            value: Amount::new(1),
        };
        let at = visual.label_anchor();
        assert!((at.x - 70.0).abs() < 1e-9);
        assert!((at.y - 140.0).abs() < 1e-9);
    }

    #[test]
    fn refit_frames_nodes_and_resets_override() {
        let graph = sample();
        let mut layout = LayoutEngine::default();
        layout.sync(&graph);
        let mut scene = Scene::default();
        scene.reconcile(&graph);
        for _ in 0..20 {
            layout.tick();
        }
        scene.on_tick(&layout);
        scene.zoom(2.0, Point::ORIGIN).expect("valid zoom");
        assert!(!scene.transform().is_identity());

        let viewport = scene.refit();
        assert!(scene.transform().is_identity());
        assert!(scene.nodes().all(|n| viewport.contains(n.center)));
    }

    #[test]
    fn svg_draws_edges_below_nodes() {
        let graph = sample();
        let mut scene = Scene::default();
        scene.reconcile(&graph);
        let svg = scene.to_svg();
        assert!(svg.starts_with("<svg"));
        let edge_at = svg.find(r#"class="edge""#).expect("edge drawn");
        let node_at = svg.find(r#"class="node""#).expect("node drawn");
        assert!(edge_at < node_at);
        assert!(svg.contains("(0) Load more"));
        assert!(svg.contains("1,000"));
    }

    #[test]
    fn escape_handles_markup() {
        assert_eq!(escape(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }
}
