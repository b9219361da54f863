//! Phase ordering and the node preconditions.

mod common;

use std::sync::{Arc, Mutex};

use common::{Bin, Leak, LoggedBin, LoggedLeak, LoggedProbe, q};
use fg_graph::{ControllerSpec, EdgeSpec, Graph, GraphError, NodeSpec};

#[test]
fn all_edges_then_all_nodes_then_all_controllers() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut g = Graph::new("plant");
    let a = g
        .add_node(NodeSpec::new(LoggedBin(log.clone(), "a")).field("q", 1.0))
        .unwrap();
    let sub = g.add_graph("sub").unwrap();
    let b = sub
        .add_node(NodeSpec::new(LoggedBin(log.clone(), "b")).field("q", 0.0))
        .unwrap();
    let c = sub
        .add_node(NodeSpec::new(LoggedBin(log.clone(), "c")).field("q", 0.0))
        .unwrap();
    sub.add_edge(EdgeSpec::new(LoggedLeak(log.clone(), "bc"), b, c)).unwrap();
    sub.add_controller(ControllerSpec::new(LoggedProbe(log.clone(), "sub")).connect("target", c))
        .unwrap();
    g.add_edge(EdgeSpec::new(LoggedLeak(log.clone(), "ab"), a, b)).unwrap();
    g.add_controller(ControllerSpec::new(LoggedProbe(log.clone(), "top")).connect("target", a))
        .unwrap();

    g.update(0.1, 1).unwrap();

    let entries = log.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec![
            "edge ab",
            "edge bc",
            "node a",
            "node b",
            "node c",
            "controller top",
            "controller sub",
        ]
    );
}

#[test]
fn edges_read_state_from_cycle_start() {
    // a -> b -> c with equal conductance. If b were updated before the b->c
    // edge read it, c would receive something in the first step.
    let mut g = Graph::new("chain");
    let a = g.add_node(NodeSpec::new(Bin).field("q", 1.0)).unwrap();
    let b = g.add_node(NodeSpec::new(Bin).field("q", 0.0)).unwrap();
    let c = g.add_node(NodeSpec::new(Bin).field("q", 0.0)).unwrap();
    g.add_edge(EdgeSpec::new(Leak, a, b)).unwrap();
    g.add_edge(EdgeSpec::new(Leak, b, c)).unwrap();

    g.update(0.1, 1).unwrap();

    assert_eq!(q(&g, c), 0.0);
    assert!((q(&g, b) - 0.1).abs() < 1e-15);
}

#[test]
fn node_before_edges_fails_without_changes() {
    let mut g = Graph::new("pair");
    let a = g.add_node(NodeSpec::new(Bin).field("q", 4.0)).unwrap();
    let b = g.add_node(NodeSpec::new(Bin).field("q", 0.0)).unwrap();
    let e = g.add_edge(EdgeSpec::new(Leak, a, b)).unwrap();

    g.begin_cycle();
    let err = g.update_node(a, 0.1).unwrap_err();
    assert!(matches!(err, GraphError::FlowsNotCalculated { node, edge } if node == a && edge == e));
    assert_eq!(
        err.to_string(),
        format!("Flows have not been calculated for edge {e} before updating node {a}")
    );
    assert_eq!(q(&g, a), 4.0);
}

#[test]
fn stale_flows_from_previous_cycle_are_not_used() {
    let mut g = Graph::new("pair");
    let a = g.add_node(NodeSpec::new(Bin).field("q", 4.0)).unwrap();
    let b = g.add_node(NodeSpec::new(Bin).field("q", 0.0)).unwrap();
    g.add_edge(EdgeSpec::new(Leak, a, b)).unwrap();
    g.update(0.1, 1).unwrap();

    g.begin_cycle();
    assert!(matches!(
        g.update_nodes(0.1),
        Err(GraphError::FlowsNotCalculated { .. })
    ));
}

#[test]
fn tree_wide_precondition_check_precedes_any_mutation() {
    let mut g = Graph::new("plant");
    let a = g.add_node(NodeSpec::new(Bin).field("q", 4.0)).unwrap();
    let b = g.add_node(NodeSpec::new(Bin).field("q", 0.0)).unwrap();
    g.add_edge(EdgeSpec::new(Leak, a, b)).unwrap();
    let sub = g.add_graph("sub").unwrap();
    let c = sub.add_node(NodeSpec::new(Bin).field("q", 2.0)).unwrap();
    let d = sub.add_node(NodeSpec::new(Bin).field("q", 0.0)).unwrap();
    let late = sub.add_edge(EdgeSpec::new(Leak, c, d)).unwrap();

    g.begin_cycle();
    // Only the top-level edge runs; the sub-graph edge has no flows yet.
    let top_edge = g.edges().next().map(|e| e.id()).unwrap();
    g.update_edge(top_edge, 0.1).unwrap();

    let err = g.update_nodes(0.1).unwrap_err();
    assert!(matches!(err, GraphError::FlowsNotCalculated { edge, .. } if edge == late));
    assert_eq!(q(&g, a), 4.0);
    assert_eq!(q(&g, b), 0.0);
}

#[test]
fn second_integration_in_one_cycle_is_rejected() {
    let mut g = Graph::new("pair");
    let a = g.add_node(NodeSpec::new(Bin).field("q", 4.0)).unwrap();
    let b = g.add_node(NodeSpec::new(Bin).field("q", 0.0)).unwrap();
    g.add_edge(EdgeSpec::new(Leak, a, b)).unwrap();

    g.begin_cycle();
    g.update_edges(0.1).unwrap();
    g.update_node(a, 0.1).unwrap();
    let after_once = q(&g, a);
    assert!(matches!(
        g.update_node(a, 0.1),
        Err(GraphError::AlreadyIntegrated { .. })
    ));
    assert_eq!(q(&g, a), after_once);
}

#[test]
fn manual_phases_match_update() {
    let build = || {
        let mut g = Graph::new("pair");
        let a = g.add_node(NodeSpec::new(Bin).field("q", 4.0)).unwrap();
        let b = g.add_node(NodeSpec::new(Bin).field("q", 1.0)).unwrap();
        g.add_edge(EdgeSpec::new(Leak, a, b)).unwrap();
        (g, a)
    };
    let (mut auto, a) = build();
    let (mut manual, _) = build();

    auto.update(0.2, 3).unwrap();
    for _ in 0..3 {
        manual.begin_cycle();
        manual.update_edges(0.2).unwrap();
        manual.update_nodes(0.2).unwrap();
        manual.update_controllers(0.2).unwrap();
        manual.advance_time(0.2);
    }

    assert_eq!(q(&auto, a), q(&manual, a));
    assert_eq!(auto.time(), manual.time());
}

#[test]
fn edge_cannot_recalculate_after_an_endpoint_integrated() {
    let mut g = Graph::new("pair");
    let a = g.add_node(NodeSpec::new(Bin).field("q", 4.0)).unwrap();
    let b = g.add_node(NodeSpec::new(Bin).field("q", 0.0)).unwrap();
    let e = g.add_edge(EdgeSpec::new(Leak, a, b)).unwrap();

    g.begin_cycle();
    g.update_edges(0.25).unwrap();
    g.update_node(a, 0.25).unwrap();

    let err = g.update_edge(e, 0.25).unwrap_err();
    assert!(matches!(
        err,
        GraphError::NodeAlreadyIntegrated { edge, node, .. } if edge == e && node == a
    ));

    // The flows from the start of the cycle still stand for b.
    g.update_node(b, 0.25).unwrap();
    assert_eq!(q(&g, a), 3.0);
    assert_eq!(q(&g, b), 1.0);
}

#[test]
fn stepping_a_sub_graph_alone_keeps_the_tree_cycle_unique() {
    let mut g = Graph::new("plant");
    let sub = g.add_graph("sub").unwrap();
    let sub_id = sub.id();
    let x = sub.add_node(NodeSpec::new(Bin).field("q", 1.0)).unwrap();
    let y = sub.add_node(NodeSpec::new(Bin).field("q", 0.0)).unwrap();
    sub.add_edge(EdgeSpec::new(Leak, x, y)).unwrap();

    g.graph_mut(sub_id).unwrap().update(0.1, 1).unwrap();
    assert_eq!(g.cycle(), 1);

    g.update(0.1, 1).unwrap();
    assert_eq!(g.cycle(), 2);
    assert_eq!(g.graph(sub_id).map(Graph::cycle), Some(2));
    assert!((q(&g, x) + q(&g, y) - 1.0).abs() < 1e-15);
}
