//! # Validation Tier Tests (T0-T3)
//!
//! If ANY tier fails, the system is INVALID.
//!
//! ## Tiers
//! - T0: GraphStore Integrity
//! - T1: Flow Direction
//! - T2: Pagination Termination
//! - T3: Layout Stability

#![allow(clippy::float_arithmetic)]

use fundflow_core::{
    Address, Amount, CellRef, Cursor, FlowAttribution, FlowDirection, FlowError, FlowGraph,
    LayoutEngine, NodeSpec, Scene, Script, TransactionDetail, TxHash, classify,
};

fn script(name: &str) -> Script {
    Script::new(
        "0x9bd7e06f3ecf4be0f2fcd2188b23f1b9fcc88e5d4b65a8637b17723bbda3cce8",
        "type",
        name,
    )
}

fn spec(id: &str, balance: u128) -> NodeSpec {
    NodeSpec {
        address: Address::new(id),
        script: script(id),
        balance: Amount::new(balance),
        label: "Secp256k1Blake160".into(),
    }
}

/// Fold one classified transaction into the graph the way the explorer does.
fn fold(graph: &mut FlowGraph, detail: &TransactionDetail, node: &str) {
    let classified = classify(detail, &script(node), FlowAttribution::Proportional);
    let me = Address::new(node);
    for cp in classified.counterparties {
        let other = Address::new(cp.script.args.clone());
        graph.add_node(spec(&cp.script.args, 0));
        let (from, to) = match classified.direction {
            FlowDirection::Outflow(_) => (&me, &other),
            FlowDirection::Inflow(_) => (&other, &me),
            FlowDirection::Balanced => continue,
        };
        graph
            .record_flow(&detail.hash, from, to, cp.amount)
            .expect("both endpoints exist");
    }
}

// =============================================================================
// TIER T0: GRAPHSTORE INTEGRITY
// =============================================================================

mod t0_graph_integrity {
    use super::*;

    /// T0.1: Node creation is idempotent.
    #[test]
    fn add_node_idempotent() {
        let mut graph = FlowGraph::new();
        let first = graph.add_node(spec("x", 500)).clone();
        let second = graph.add_node(spec("x", 9)).clone();

        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(second.balance, Amount::new(500));
    }

    /// T0.2: Opposite directions are separate edges.
    #[test]
    fn opposite_edges_are_distinct() {
        let mut graph = FlowGraph::new();
        graph.add_node(spec("a", 1));
        graph.add_node(spec("b", 1));
        let (a, b) = (Address::new("a"), Address::new("b"));

        graph
            .add_or_accumulate_edge(&a, &b, Amount::new(5))
            .expect("edge");
        graph
            .add_or_accumulate_edge(&b, &a, Amount::new(7))
            .expect("edge");
        graph
            .add_or_accumulate_edge(&a, &b, Amount::new(1))
            .expect("edge");

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge(&a, &b).map(|e| e.value), Some(Amount::new(6)));
        assert_eq!(graph.edge(&b, &a).map(|e| e.value), Some(Amount::new(7)));
    }

    /// T0.3: Zero amounts and dangling endpoints are rejected.
    #[test]
    fn invalid_contributions_rejected() {
        let mut graph = FlowGraph::new();
        graph.add_node(spec("a", 1));
        let (a, ghost) = (Address::new("a"), Address::new("ghost"));

        assert!(matches!(
            graph.add_or_accumulate_edge(&a, &a, Amount::ZERO),
            Err(FlowError::InvalidAmount { .. })
        ));
        assert_eq!(
            graph.record_flow(&TxHash::new("0x1"), &a, &ghost, Amount::new(1)),
            Err(FlowError::NodeNotFound(ghost))
        );
        // A rejected flow never takes a claim
        assert_eq!(graph.claim_count(), 0);
    }
}

// =============================================================================
// TIER T1: FLOW DIRECTION
// =============================================================================

mod t1_flow_direction {
    use super::*;

    /// T1.1: A spends 100, keeps 30, pays B and C: edges A->B and A->C total 70.
    #[test]
    fn outflow_edges_sum_to_net() {
        let detail = TransactionDetail {
            hash: TxHash::new("0xaa"),
            inputs: vec![CellRef::new(script("a"), Amount::new(100))],
            outputs: vec![
                CellRef::new(script("a"), Amount::new(30)),
                CellRef::new(script("b"), Amount::new(50)),
                CellRef::new(script("c"), Amount::new(20)),
            ],
        };
        let mut graph = FlowGraph::new();
        graph.add_node(spec("a", 100));
        fold(&mut graph, &detail, "a");

        let (a, b, c) = (Address::new("a"), Address::new("b"), Address::new("c"));
        let ab = graph.edge(&a, &b).map(|e| e.value).expect("A->B");
        let ac = graph.edge(&a, &c).map(|e| e.value).expect("A->C");
        assert_eq!(ab.saturating_add(ac), Amount::new(70));
        assert!(graph.edge(&b, &a).is_none());
        assert!(graph.edge(&c, &a).is_none());
        assert!(graph.edge(&a, &a).is_none());
    }

    /// T1.2: X spends 500 to Y; the same hash seen again does not double it.
    #[test]
    fn end_to_end_single_transfer() {
        let detail = TransactionDetail {
            hash: TxHash::new("0xbb"),
            inputs: vec![CellRef::new(script("x"), Amount::new(500))],
            outputs: vec![CellRef::new(script("y"), Amount::new(500))],
        };
        let mut graph = FlowGraph::new();
        graph.add_node(spec("x", 500));
        fold(&mut graph, &detail, "x");
        fold(&mut graph, &detail, "x");

        let (x, y) = (Address::new("x"), Address::new("y"));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge(&x, &y).map(|e| e.value), Some(Amount::new(500)));
    }

    /// T1.3: The same transaction seen from both sides counts once.
    #[test]
    fn both_sides_agree() {
        let detail = TransactionDetail {
            hash: TxHash::new("0xcc"),
            inputs: vec![CellRef::new(script("x"), Amount::new(500))],
            outputs: vec![CellRef::new(script("y"), Amount::new(500))],
        };
        let mut graph = FlowGraph::new();
        graph.add_node(spec("x", 500));
        fold(&mut graph, &detail, "x");
        fold(&mut graph, &detail, "y");

        assert_eq!(graph.claim_count(), 1);
        assert_eq!(
            graph
                .edge(&Address::new("x"), &Address::new("y"))
                .map(|e| e.value),
            Some(Amount::new(500))
        );
    }

    /// T1.4: Self-transfers produce nothing.
    #[test]
    fn self_transfer_is_silent() {
        let detail = TransactionDetail {
            hash: TxHash::new("0xdd"),
            inputs: vec![CellRef::new(script("x"), Amount::new(500))],
            outputs: vec![CellRef::new(script("x"), Amount::new(500))],
        };
        let mut graph = FlowGraph::new();
        graph.add_node(spec("x", 500));
        fold(&mut graph, &detail, "x");
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 1);
    }
}

// =============================================================================
// TIER T2: PAGINATION TERMINATION
// =============================================================================

mod t2_pagination {
    use super::*;

    /// T2.1: N items at page size P take ceil(N/P) pages and end exhausted.
    #[test]
    fn cursor_walk_terminates() {
        for (n, p) in [(0usize, 10u32), (7, 10), (10, 10), (25, 10), (100, 1)] {
            let mut graph = FlowGraph::new();
            graph.add_node(spec("a", 1));
            let id = Address::new("a");

            let mut remaining = n;
            let mut pages = 0;
            while graph.node(&id).is_some_and(|node| node.cursor.has_more()) {
                let batch = remaining.min(p as usize);
                remaining -= batch;
                pages += 1;
                // The source stops handing out tokens once it runs dry
                let token = (remaining > 0).then(|| format!("0x{pages}"));
                graph
                    .advance_cursor(&id, batch, token, p)
                    .expect("node exists");
            }

            // An empty history still costs one request
            let expected = n.div_ceil(p as usize).max(1);
            assert_eq!(pages, expected, "n={n} p={p}");
            let node = graph.node(&id).expect("node exists");
            assert_eq!(node.loaded, n as u64);
            assert_eq!(node.cursor, Cursor::Exhausted);
        }
    }
}

// =============================================================================
// TIER T3: LAYOUT STABILITY
// =============================================================================

mod t3_layout_stability {
    use super::*;

    fn three_node_chain() -> FlowGraph {
        let mut graph = FlowGraph::new();
        for id in ["a", "b", "c"] {
            graph.add_node(spec(id, 1));
        }
        for (tx, from, to) in [("0x1", "a", "b"), ("0x2", "b", "c")] {
            graph
                .record_flow(
                    &TxHash::new(tx),
                    &Address::new(from),
                    &Address::new(to),
                    Amount::new(1),
                )
                .expect("edge");
        }
        graph
    }

    /// T3.1: Displacement energy is non-increasing and converges.
    #[test]
    fn energy_converges() {
        let graph = three_node_chain();
        let mut engine = LayoutEngine::default();
        engine.sync(&graph);

        let energy: Vec<f64> = (0..1000).map(|_| engine.tick()).collect();
        let sums: Vec<f64> = energy[100..]
            .chunks(100)
            .map(|w| w.iter().sum())
            .collect();

        for pair in sums.windows(2) {
            assert!(pair[1] <= pair[0], "energy rose: {sums:?}");
        }
        let last = sums.last().copied().unwrap_or(f64::MAX);
        assert!(last < 2.0, "energy {last}");
        assert!(last < sums[0] / 4.0);
    }

    /// T3.2: Growth mid-simulation keeps settled nodes where they were.
    #[test]
    fn growth_preserves_positions() {
        let mut graph = three_node_chain();
        let mut engine = LayoutEngine::default();
        engine.sync(&graph);
        for _ in 0..300 {
            engine.tick();
        }
        let before = engine.position(&Address::new("a")).expect("a");

        graph.add_node(spec("d", 1));
        engine.sync(&graph);
        assert_eq!(engine.position(&Address::new("a")), Some(before));

        // The newcomer is pulled in without blowing the others away
        let step = engine.tick();
        assert!(step.is_finite());
        let after = engine.position(&Address::new("a")).expect("a");
        assert!((after.x - before.x).hypot(after.y - before.y) < 100.0);
    }

    /// T3.3: Graph, layout and scene stay aligned over a full cycle.
    #[test]
    fn scene_follows_layout() {
        let mut graph = three_node_chain();
        let mut engine = LayoutEngine::default();
        let mut scene = Scene::default();

        engine.sync(&graph);
        scene.reconcile(&graph);
        for _ in 0..50 {
            engine.tick();
            graph.apply_positions(engine.positions());
            scene.on_tick(&engine);
        }
        let viewport = scene.refit();

        for node in graph.nodes() {
            assert_eq!(engine.position(&node.id), Some(node.position));
            assert!(viewport.contains(node.position));
        }
    }
}
