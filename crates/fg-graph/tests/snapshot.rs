//! Snapshot round trips and restore determinism.

mod common;

use common::{Bin, Copier, Leak, Probe, Pump, q, registry};
use fg_graph::{
    ControllerSpec, EdgeSpec, Graph, GraphError, GraphSnapshot, NodeSpec, Registry,
};

/// Two levels, a cross-level edge and an aliased edge.
fn plant() -> Graph {
    let mut g = Graph::new("plant");
    let a = g.add_node(NodeSpec::new(Bin).named("a").field("q", 12.0)).unwrap();
    let sub = g.add_graph("loop").unwrap();
    let b = sub.add_node(NodeSpec::new(Bin).named("b").field("q", 3.0)).unwrap();
    let c = sub.add_node(NodeSpec::new(Bin).named("c").field("q", 0.0)).unwrap();
    sub.add_edge(EdgeSpec::new(Leak, b, c).named("bc").field("k", 0.3)).unwrap();
    g.add_edge(EdgeSpec::new(Pump, a, b).alias_source([("q", "q")]).field("rate", 0.5))
        .unwrap();
    g
}

/// `plant` plus a node driven by a controller and a probe.
fn controlled_plant() -> (Graph, fg_graph::ComponentId) {
    let mut g = plant();
    let a = g.find("a").map(|e| e.id()).unwrap();
    let c = g.find("c").map(|e| e.id()).unwrap();
    let d = g.add_node(NodeSpec::new(Bin).named("d").field("q", 0.0)).unwrap();
    g.add_controller(
        ControllerSpec::new(Copier)
            .named("copy")
            .field("gain", 0.1)
            .connect("sensor", c)
            .connect("actuator", d),
    )
    .unwrap();
    g.add_controller(ControllerSpec::new(Probe).connect("target", a))
        .unwrap();
    (g, d)
}

#[test]
fn json_round_trip_is_exact() {
    let (mut g, _) = controlled_plant();
    g.update(0.1, 5).unwrap();

    let json = g.to_json().unwrap();
    let restored = Graph::from_json(&json, &registry()).unwrap();

    assert_eq!(restored.snapshot(), g.snapshot());
    assert_eq!(restored.to_json().unwrap(), json);
}

#[test]
fn yaml_round_trip_is_exact() {
    let (mut g, _) = controlled_plant();
    g.update(0.1, 3).unwrap();

    let yaml = g.to_yaml().unwrap();
    let restored = Graph::from_yaml(&yaml, &registry()).unwrap();
    assert_eq!(restored.snapshot(), g.snapshot());
}

#[test]
fn restored_graph_continues_identically() {
    let (mut original, d) = controlled_plant();
    original.update(0.1, 7).unwrap();
    // A command is in flight at the snapshot point.
    assert_eq!(original.node(d).map(|n| n.pending().len()), Some(1));

    let mut restored = Graph::from_json(&original.to_json().unwrap(), &registry()).unwrap();
    assert_eq!(restored.node(d).map(|n| n.pending().len()), Some(1));

    original.update(0.1, 20).unwrap();
    restored.update(0.1, 20).unwrap();

    assert_eq!(restored.snapshot(), original.snapshot());
    assert_eq!(q(&restored, d), q(&original, d));
}

#[test]
fn restore_keeps_ids_and_allocator_position() {
    let (g, _) = controlled_plant();
    let snap = g.snapshot();
    let mut restored = Graph::from_snapshot(&snap, &registry()).unwrap();

    for name in ["a", "b", "c", "d", "bc", "copy", "loop"] {
        assert_eq!(
            restored.find(name).map(|e| e.id()),
            g.find(name).map(|e| e.id()),
            "{name}"
        );
    }
    let fresh = restored.add_node(NodeSpec::new(Bin).field("q", 0.0)).unwrap();
    assert!(!g.contains(fresh));
    assert_eq!(fresh.index(), snap.next_id.unwrap());
}

#[test]
fn unknown_type_fails() {
    let (g, _) = controlled_plant();
    let json = g.to_json().unwrap();
    let partial = Registry::new().with_node::<Bin>();
    assert!(matches!(
        Graph::from_json(&json, &partial),
        Err(GraphError::UnknownType { kind: "edge", .. })
    ));
}

#[test]
fn duplicate_ids_fail() {
    let (g, _) = controlled_plant();
    let mut snap: GraphSnapshot = g.snapshot();
    let (&id, node) = snap.nodes.iter().next().map(|(k, v)| (k, v.clone())).unwrap();
    let sub = snap.graphs.values_mut().next().unwrap();
    sub.nodes.insert(id, node);
    assert!(matches!(
        Graph::from_snapshot(&snap, &registry()),
        Err(GraphError::DuplicateId { id: dup }) if dup == id
    ));
}

#[test]
fn null_alias_map_is_a_parse_error() {
    let (g, _) = controlled_plant();
    let mut value: serde_json::Value = serde_json::from_str(&g.to_json().unwrap()).unwrap();
    let edges = value["edges"].as_object_mut().unwrap();
    let edge = edges.values_mut().next().unwrap();
    edge["alias_source"] = serde_json::Value::Null;

    assert!(matches!(
        Graph::from_json(&value.to_string(), &registry()),
        Err(GraphError::Json(_))
    ));
}

#[test]
fn omitted_alias_map_means_identity() {
    let (g, _) = controlled_plant();
    let mut value: serde_json::Value = serde_json::from_str(&g.to_json().unwrap()).unwrap();
    for edge in value["edges"].as_object_mut().unwrap().values_mut() {
        edge.as_object_mut().unwrap().remove("alias_source");
    }
    let restored = Graph::from_json(&value.to_string(), &registry()).unwrap();
    assert!(restored.edges().all(|e| e.alias(fg_graph::End::Source).is_empty()));
}
