//! # Force Layout
//!
//! A continuous force-directed simulation over the fund-flow graph.
//!
//! Each tick applies, in order:
//! - link springs pulling connected nodes toward the rest distance
//! - an exact pairwise many-body charge pushing every pair apart
//! - a centering translation that keeps the mean position at the origin
//!
//! then integrates velocities with decay. Alpha decays toward a small
//! positive target instead of zero, so the simulation never freezes and
//! nodes added later are absorbed without a restart.
//!
//! The engine owns every position. The graph only receives read-only copies
//! through `FlowGraph::apply_positions`.

#![allow(clippy::float_arithmetic)]

use crate::graph::FlowGraph;
use crate::primitives::{
    ALPHA_MIN, ALPHA_TARGET, CENTER_STRENGTH, CHARGE_STRENGTH, INITIAL_RADIUS, LINK_STRENGTH,
    VELOCITY_DECAY,
};
use crate::tuning::LayoutDistance;
use crate::{Address, FlowError, Point};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Ticks it takes alpha to decay from 1 to `alpha_min` with a zero target.
const DECAY_TICKS: f64 = 300.0;

/// Offset used when two bodies sit exactly on top of each other.
const JIGGLE: f64 = 1e-6;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Force parameters of the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Rest length of the link springs.
    pub link_distance: LayoutDistance,
    /// Link spring stiffness.
    pub link_strength: f64,
    /// Many-body strength (negative repels).
    pub charge_strength: f64,
    /// Fraction of the mean offset removed each tick.
    pub center_strength: f64,
    /// Fraction of velocity lost each tick.
    pub velocity_decay: f64,
    /// Floor alpha decays toward.
    pub alpha_target: f64,
    /// Reference alpha used to derive the decay rate.
    pub alpha_min: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_distance: LayoutDistance::default(),
            link_strength: LINK_STRENGTH,
            charge_strength: CHARGE_STRENGTH,
            center_strength: CENTER_STRENGTH,
            velocity_decay: VELOCITY_DECAY,
            alpha_target: ALPHA_TARGET,
            alpha_min: ALPHA_MIN,
        }
    }
}

// =============================================================================
// BODIES AND LINKS
// =============================================================================

#[derive(Debug, Clone)]
struct Body {
    id: Address,
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    pin: Option<Point>,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    source: usize,
    target: usize,
    /// Share of the correction applied to the target end.
    bias: f64,
}

/// Deterministic stand-in for a random nudge: antisymmetric in the pair,
/// so coincident bodies are pushed apart rather than together.
fn jiggle(from: usize, to: usize) -> f64 {
    if to > from { JIGGLE } else { -JIGGLE }
}

/// Seed position of the `i`-th body on a phyllotaxis spiral around the origin.
fn spiral(i: usize) -> (f64, f64) {
    let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
    let angle = i as f64 * PI * (3.0 - 5.0_f64.sqrt());
    (radius * angle.cos(), radius * angle.sin())
}

// =============================================================================
// ENGINE
// =============================================================================

/// The live layout simulation.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: LayoutConfig,
    alpha: f64,
    alpha_decay: f64,
    bodies: Vec<Body>,
    index: BTreeMap<Address, usize>,
    links: Vec<Link>,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl LayoutEngine {
    #[must_use]
    pub fn new(config: LayoutConfig) -> Self {
        let alpha_decay = 1.0 - config.alpha_min.powf(1.0 / DECAY_TICKS);
        Self {
            config,
            alpha: 1.0,
            alpha_decay,
            bodies: Vec::new(),
            index: BTreeMap::new(),
            links: Vec::new(),
        }
    }

    /// Bring the body and link sets in line with the graph.
    ///
    /// Existing bodies keep their position and velocity. New nodes are placed
    /// on the seed spiral. The link list is rebuilt from scratch so that
    /// degree-based biases reflect the current graph. Returns the number of
    /// bodies added.
    pub fn sync(&mut self, graph: &FlowGraph) -> usize {
        let mut added = 0;
        for node in graph.nodes() {
            if self.index.contains_key(&node.id) {
                continue;
            }
            let i = self.bodies.len();
            let (x, y) = spiral(i);
            self.bodies.push(Body {
                id: node.id.clone(),
                x,
                y,
                vx: 0.0,
                vy: 0.0,
                pin: None,
            });
            self.index.insert(node.id.clone(), i);
            added += 1;
        }

        let pairs: Vec<(usize, usize)> = graph
            .edges()
            .filter_map(|e| Some((*self.index.get(&e.source)?, *self.index.get(&e.target)?)))
            .collect();
        let mut degree = vec![0u32; self.bodies.len()];
        for &(s, t) in &pairs {
            degree[s] += 1;
            degree[t] += 1;
        }
        self.links = pairs
            .into_iter()
            .map(|(source, target)| {
                let (ds, dt) = (f64::from(degree[source]), f64::from(degree[target]));
                Link {
                    source,
                    target,
                    bias: ds / (ds + dt),
                }
            })
            .collect();

        added
    }

    /// Advance the simulation by one step.
    ///
    /// Returns the displacement energy of the step: the sum over all bodies
    /// of the distance each one moved.
    pub fn tick(&mut self) -> f64 {
        if self.bodies.is_empty() {
            return 0.0;
        }
        let before: Vec<(f64, f64)> = self.bodies.iter().map(|b| (b.x, b.y)).collect();

        self.alpha += (self.config.alpha_target - self.alpha) * self.alpha_decay;
        self.apply_links();
        self.apply_charge();
        self.apply_center();
        self.integrate();

        self.bodies
            .iter()
            .zip(before)
            .map(|(b, (x, y))| (b.x - x).hypot(b.y - y))
            .sum()
    }

    fn apply_links(&mut self) {
        let distance = self.config.link_distance.value();
        // A factor above 1 overshoots the rest length and oscillates
        let stiffness = (self.alpha * self.config.link_strength).min(1.0);

        for link in &self.links {
            let (s, t) = (&self.bodies[link.source], &self.bodies[link.target]);
            let mut dx = t.x + t.vx - s.x - s.vx;
            let mut dy = t.y + t.vy - s.y - s.vy;
            if dx == 0.0 && dy == 0.0 {
                dx = jiggle(link.source, link.target);
                dy = dx * 0.5;
            }
            let len = dx.hypot(dy);
            let k = (len - distance) / len * stiffness;
            dx *= k;
            dy *= k;

            let t = &mut self.bodies[link.target];
            t.vx -= dx * link.bias;
            t.vy -= dy * link.bias;
            let s = &mut self.bodies[link.source];
            s.vx += dx * (1.0 - link.bias);
            s.vy += dy * (1.0 - link.bias);
        }
    }

    fn apply_charge(&mut self) {
        let scale = self.config.charge_strength * self.alpha;
        let n = self.bodies.len();
        let mut impulses = vec![(0.0, 0.0); n];

        for (i, impulse) in impulses.iter_mut().enumerate() {
            let (xi, yi) = (self.bodies[i].x, self.bodies[i].y);
            for j in 0..n {
                if i == j {
                    continue;
                }
                let mut dx = self.bodies[j].x - xi;
                let mut dy = self.bodies[j].y - yi;
                if dx == 0.0 && dy == 0.0 {
                    dx = jiggle(i, j);
                    dy = dx * 0.5;
                }
                let mut l2 = dx * dx + dy * dy;
                if l2 < 1.0 {
                    l2 = l2.sqrt();
                }
                let w = scale / l2;
                impulse.0 += dx * w;
                impulse.1 += dy * w;
            }
        }

        for (body, (ix, iy)) in self.bodies.iter_mut().zip(impulses) {
            body.vx += ix;
            body.vy += iy;
        }
    }

    fn apply_center(&mut self) {
        let n = self.bodies.len() as f64;
        let (sx, sy) = self
            .bodies
            .iter()
            .fold((0.0, 0.0), |(sx, sy), b| (sx + b.x, sy + b.y));
        let (mx, my) = (
            sx / n * self.config.center_strength,
            sy / n * self.config.center_strength,
        );
        for body in &mut self.bodies {
            body.x -= mx;
            body.y -= my;
        }
    }

    fn integrate(&mut self) {
        let keep = 1.0 - self.config.velocity_decay;
        for body in &mut self.bodies {
            if let Some(pin) = body.pin {
                body.x = pin.x;
                body.y = pin.y;
                body.vx = 0.0;
                body.vy = 0.0;
            } else {
                body.vx *= keep;
                body.vy *= keep;
                body.x += body.vx;
                body.y += body.vy;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Interaction
    // -------------------------------------------------------------------------

    /// Move a body under the pointer: pin it and jump there immediately.
    /// Forces are ignored for it until `release`.
    pub fn drag(&mut self, id: &Address, to: Point) -> Result<(), FlowError> {
        let body = self.body_mut(id)?;
        body.pin = Some(to);
        body.x = to.x;
        body.y = to.y;
        body.vx = 0.0;
        body.vy = 0.0;
        Ok(())
    }

    /// End a drag. The body rejoins the simulation where it was left.
    pub fn release(&mut self, id: &Address) -> Result<(), FlowError> {
        self.body_mut(id)?.pin = None;
        Ok(())
    }

    fn body_mut(&mut self, id: &Address) -> Result<&mut Body, FlowError> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| FlowError::NodeNotFound(id.clone()))?;
        Ok(&mut self.bodies[i])
    }

    // -------------------------------------------------------------------------
    // Tuning and state
    // -------------------------------------------------------------------------

    /// Change the link rest distance and reheat so bodies move to the new
    /// equilibrium at full energy.
    pub fn set_distance(&mut self, distance: LayoutDistance) {
        self.config.link_distance = distance;
        self.reheat();
    }

    fn reheat(&mut self) {
        self.alpha = 1.0;
    }

    #[must_use]
    pub fn distance(&self) -> LayoutDistance {
        self.config.link_distance
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    #[must_use]
    pub fn position(&self, id: &Address) -> Option<Point> {
        self.index.get(id).map(|&i| {
            let b = &self.bodies[i];
            Point::new(b.x, b.y)
        })
    }

    /// Current positions in insertion order.
    pub fn positions(&self) -> impl Iterator<Item = (&Address, Point)> {
        self.bodies.iter().map(|b| (&b.id, Point::new(b.x, b.y)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeSpec;
    use crate::{Amount, Script, TxHash};

    fn graph_with(nodes: &[&str], edges: &[(&str, &str)]) -> FlowGraph {
        let mut graph = FlowGraph::new();
        for id in nodes {
            graph.add_node(NodeSpec {
                address: Address::new(*id),
                script: Script::new("0xcode", "type", *id),
                balance: Amount::new(1),
                label: "Unknown".into(),
            });
        }
        for (i, (s, t)) in edges.iter().enumerate() {
            graph
                .record_flow(
                    &TxHash::new(format!("0x{i}")),
                    &Address::new(*s),
                    &Address::new(*t),
                    Amount::new(1),
                )
                .expect("endpoints exist");
        }
        graph
    }

    fn distance_between(engine: &LayoutEngine, a: &str, b: &str) -> f64 {
        let pa = engine.position(&Address::new(a)).expect("a placed");
        let pb = engine.position(&Address::new(b)).expect("b placed");
        (pa.x - pb.x).hypot(pa.y - pb.y)
    }

    #[test]
    fn empty_engine_ticks_quietly() {
        let mut engine = LayoutEngine::default();
        assert_eq!(engine.tick(), 0.0);
        assert!(engine.is_empty());
    }

    #[test]
    fn alpha_decays_toward_target_not_zero() {
        let mut engine = LayoutEngine::default();
        engine.sync(&graph_with(&["a"], &[]));
        for _ in 0..2000 {
            engine.tick();
        }
        assert!(engine.alpha() > 0.0);
        assert!((engine.alpha() - ALPHA_TARGET).abs() < 1e-6);

        engine.set_distance(LayoutDistance::new(300.0).expect("valid"));
        assert_eq!(engine.alpha(), 1.0);
    }

    #[test]
    fn sync_keeps_existing_positions() {
        let mut graph = graph_with(&["a", "b"], &[("a", "b")]);
        let mut engine = LayoutEngine::default();
        assert_eq!(engine.sync(&graph), 2);
        for _ in 0..50 {
            engine.tick();
        }
        let before = engine.position(&Address::new("a")).expect("a placed");

        graph.add_node(NodeSpec {
            address: Address::new("c"),
            script: Script::new("0xcode", "type", "c"),
            balance: Amount::new(1),
            label: "Unknown".into(),
        });
        assert_eq!(engine.sync(&graph), 1);
        assert_eq!(engine.sync(&graph), 0);
        assert_eq!(engine.position(&Address::new("a")), Some(before));
        assert_eq!(engine.len(), 3);
        assert_eq!(engine.links.len(), 1);
    }

    #[test]
    fn linked_pair_settles_near_rest_distance() {
        let graph = graph_with(&["a", "b"], &[("a", "b")]);
        let mut engine = LayoutEngine::default();
        engine.sync(&graph);
        for _ in 0..600 {
            engine.tick();
        }
        let d = distance_between(&engine, "a", "b");
        assert!((d - 450.0).abs() < 25.0, "distance {d}");
    }

    #[test]
    fn unlinked_pair_repels() {
        let graph = graph_with(&["a", "b"], &[]);
        let mut engine = LayoutEngine::default();
        engine.sync(&graph);
        let start = distance_between(&engine, "a", "b");
        for _ in 0..10 {
            engine.tick();
        }
        assert!(distance_between(&engine, "a", "b") > start);
    }

    #[test]
    fn centering_keeps_mean_at_origin() {
        let graph = graph_with(&["a", "b", "c"], &[("a", "b")]);
        let mut engine = LayoutEngine::default();
        engine.sync(&graph);
        for _ in 0..100 {
            engine.tick();
        }
        let (sx, sy) = engine
            .positions()
            .fold((0.0, 0.0), |(sx, sy), (_, p)| (sx + p.x, sy + p.y));
        // Only the last integration step moves the mean away from zero
        assert!((sx / 3.0).abs() < 50.0);
        assert!((sy / 3.0).abs() < 50.0);
    }

    #[test]
    fn pinned_body_stays_put() {
        let graph = graph_with(&["a", "b"], &[("a", "b")]);
        let mut engine = LayoutEngine::default();
        engine.sync(&graph);
        let a = Address::new("a");
        engine.drag(&a, Point::new(300.0, -200.0)).expect("a exists");
        assert!(engine.bodies[0].pin.is_some());
        for _ in 0..30 {
            engine.tick();
            assert_eq!(engine.position(&a), Some(Point::new(300.0, -200.0)));
        }

        engine.release(&a).expect("a exists");
        assert!(engine.bodies[0].pin.is_none());
        engine.tick();
        assert_ne!(engine.position(&a), Some(Point::new(300.0, -200.0)));
    }

    #[test]
    fn interaction_on_unknown_node_fails() {
        let mut engine = LayoutEngine::default();
        let ghost = Address::new("ghost");
        assert_eq!(
            engine.drag(&ghost, Point::ORIGIN),
            Err(FlowError::NodeNotFound(ghost.clone()))
        );
        assert!(engine.release(&ghost).is_err());
    }

    #[test]
    fn coincident_bodies_separate() {
        let graph = graph_with(&["a", "b"], &[]);
        let mut engine = LayoutEngine::default();
        engine.sync(&graph);
        engine.drag(&Address::new("a"), Point::ORIGIN).expect("a");
        engine.drag(&Address::new("b"), Point::ORIGIN).expect("b");
        engine.release(&Address::new("a")).expect("a");
        engine.release(&Address::new("b")).expect("b");
        engine.tick();
        assert!(distance_between(&engine, "a", "b") > 0.0);
    }

    #[test]
    fn distance_change_moves_equilibrium() {
        let graph = graph_with(&["a", "b"], &[("a", "b")]);
        let mut engine = LayoutEngine::default();
        engine.sync(&graph);
        for _ in 0..600 {
            engine.tick();
        }
        engine.set_distance(LayoutDistance::new(200.0).expect("valid"));
        for _ in 0..600 {
            engine.tick();
        }
        let d = distance_between(&engine, "a", "b");
        assert!(d < 300.0, "distance {d}");
    }

    #[test]
    fn seed_spiral_is_deterministic() {
        let graph = graph_with(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let mut first = LayoutEngine::default();
        let mut second = LayoutEngine::default();
        first.sync(&graph);
        second.sync(&graph);
        for _ in 0..100 {
            first.tick();
            second.tick();
        }
        let a: Vec<_> = first.positions().map(|(_, p)| p).collect();
        let b: Vec<_> = second.positions().map(|(_, p)| p).collect();
        assert_eq!(a, b);
    }
}
