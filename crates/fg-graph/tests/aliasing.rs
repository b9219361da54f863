//! Canonical flow names mapped onto node-local field names.

mod common;

use common::{Bin, Leak, Reactor, total_q};
use fg_graph::{AliasMap, EdgeSpec, FieldSpec, Graph, GraphError, GraphResult, NodeModel, NodeSpec};

struct Exchanger;

impl NodeModel for Exchanger {
    fn type_name(&self) -> &'static str {
        "Exchanger"
    }

    fn fields(&self) -> &'static [FieldSpec] {
        const F: &[FieldSpec] = &[FieldSpec::scalar("Q_hot"), FieldSpec::scalar("Q_cold")];
        F
    }
}

fn scalar(g: &Graph, id: fg_graph::ComponentId, field: &str) -> f64 {
    g.node(id).and_then(|n| n.state().scalar(field).ok()).unwrap_or(f64::NAN)
}

#[test]
fn aliases_route_flows_to_local_fields() {
    let mut g = Graph::new("plant");
    let hx = g
        .add_node(NodeSpec::new(Exchanger).field("Q_hot", 10.0).field("Q_cold", 0.0))
        .unwrap();
    let hot = g.add_node(NodeSpec::new(Bin).field("q", 20.0)).unwrap();
    let cold = g.add_node(NodeSpec::new(Bin).field("q", 0.0)).unwrap();

    g.add_edge(EdgeSpec::new(Leak, hot, hx).alias_target([("q", "Q_hot")]))
        .unwrap();
    g.add_edge(EdgeSpec::new(Leak, hx, cold).alias_source([("q", "Q_cold")]))
        .unwrap();

    g.update(0.1, 1).unwrap();

    // hot -> Q_hot: rate 20 - 10 = 10; Q_cold -> cold: rate 0 - 0 = 0.
    assert_eq!(scalar(&g, hx, "Q_hot"), 11.0);
    assert_eq!(scalar(&g, hx, "Q_cold"), 0.0);
    assert_eq!(scalar(&g, hot, "q"), 19.0);
}

#[test]
fn override_keys_are_aliased_too() {
    let mut g = Graph::new("plant");
    let hx = g
        .add_node(NodeSpec::new(Exchanger).field("Q_hot", 0.0).field("Q_cold", 0.0))
        .unwrap();
    let feed = g.add_node(NodeSpec::new(Bin).field("q", 5.0)).unwrap();
    g.add_edge(
        EdgeSpec::new(Reactor, feed, hx)
            .field("yield", 1.0)
            .alias_target(AliasMap::new().with("q", "Q_cold")),
    )
    .unwrap();

    g.update(1.0, 1).unwrap();

    assert_eq!(scalar(&g, feed, "q"), 4.0);
    assert_eq!(scalar(&g, hx, "Q_cold"), 1.0);
    assert_eq!(scalar(&g, hx, "Q_hot"), 0.0);
}

#[test]
fn alias_to_missing_field_is_rejected_at_construction() {
    let mut g = Graph::new("plant");
    let a = g.add_node(NodeSpec::new(Bin).field("q", 1.0)).unwrap();
    let b = g.add_node(NodeSpec::new(Bin).field("q", 1.0)).unwrap();
    let err = g
        .add_edge(EdgeSpec::new(Leak, a, b).alias_source([("q", "level")]))
        .unwrap_err();
    assert!(matches!(err, GraphError::UnknownFlow { ref field, .. } if field == "level"));
    assert_eq!(g.edges().count(), 0);
}

#[test]
fn unaliased_flow_on_foreign_schema_fails_the_step() {
    let mut g = Graph::new("plant");
    let hx = g
        .add_node(NodeSpec::new(Exchanger).field("Q_hot", 1.0).field("Q_cold", 1.0))
        .unwrap();
    let feed = g.add_node(NodeSpec::new(Bin).field("q", 1.0)).unwrap();
    // Without an alias the edge reads `q` on the exchanger, which has none.
    g.add_edge(EdgeSpec::new(Leak, feed, hx)).unwrap();

    let result: GraphResult<()> = g.update(0.1, 1);
    assert!(matches!(result, Err(GraphError::NoSuchField { .. })));
    assert_eq!(total_q(&g), 1.0);
}

#[test]
fn edge_reports_resolved_names() {
    let mut g = Graph::new("plant");
    let hx = g
        .add_node(NodeSpec::new(Exchanger).field("Q_hot", 1.0).field("Q_cold", 1.0))
        .unwrap();
    let feed = g.add_node(NodeSpec::new(Bin).field("q", 1.0)).unwrap();
    let e = g
        .add_edge(EdgeSpec::new(Leak, feed, hx).alias_target([("q", "Q_hot")]))
        .unwrap();
    let edge = g.edge(e).unwrap();
    assert_eq!(edge.get_field_source("q"), "q");
    assert_eq!(edge.get_field_target("q"), "Q_hot");
}
