//! Error types for graph construction, stepping and persistence.

use fg_core::{ComponentId, CoreError};
use fg_materials::MaterialError;
use thiserror::Error;

use crate::value::FieldKind;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised by the graph engine.
#[derive(Debug, Error)]
pub enum GraphError {
    /// No entity with this id is reachable from the graph.
    #[error("No entity with id {id}")]
    UnknownId { id: ComponentId },

    #[error("Entity {id} is a {found}, expected a {expected}")]
    WrongKind {
        id: ComponentId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Id {id} is already in use")]
    DuplicateId { id: ComponentId },

    #[error("Edge {edge} connects node {node} to itself")]
    SelfLoop { edge: String, node: ComponentId },

    /// Construction state lacks declared fields.
    #[error("{owner} is missing fields: {}", .fields.join(", "))]
    MissingFields { owner: String, fields: Vec<String> },

    /// Construction state has fields the type does not declare.
    #[error("{owner} got unknown fields: {}", .fields.join(", "))]
    UnknownFields { owner: String, fields: Vec<String> },

    #[error("No state field named '{field}'")]
    NoSuchField { field: String },

    #[error("Field '{field}' holds a {found}, expected a {expected}")]
    FieldKind {
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    /// A staged command names a field the endpoint does not have.
    #[error("Signal contains unknown state variable '{field}' for {owner}")]
    UnknownSignalField { owner: String, field: String },

    /// A node integrated before one of its edges computed flows this cycle.
    #[error("Flows have not been calculated for edge {edge} before updating node {node}")]
    FlowsNotCalculated { node: ComponentId, edge: ComponentId },

    #[error("Node {node} already integrated flows in cycle {cycle}")]
    AlreadyIntegrated { node: ComponentId, cycle: u64 },

    /// An edge recomputed flows after one of its endpoints moved on.
    #[error("Edge {edge} cannot calculate flows: node {node} already integrated cycle {cycle}")]
    NodeAlreadyIntegrated {
        edge: ComponentId,
        node: ComponentId,
        cycle: u64,
    },

    #[error("Edge {edge} returned a flow under the reserved key '{key}'")]
    ReservedFlowKey { edge: ComponentId, key: String },

    #[error("Edge {edge} returned '{key}' both as a shared rate and for one endpoint")]
    OverlappingFlow { edge: ComponentId, key: String },

    #[error("Edge {edge} sends flow '{field}' that node {node} does not have")]
    UnknownFlow {
        edge: ComponentId,
        node: ComponentId,
        field: String,
    },

    #[error("Flow '{field}' from edge {edge} cannot be applied to node {node}: {reason}")]
    IncompatibleFlow {
        edge: ComponentId,
        node: ComponentId,
        field: String,
        reason: String,
    },

    /// Controller connections lack names declared by the controller type.
    #[error("{controller} is missing connections: {}", .names.join(", "))]
    MissingConnections { controller: String, names: Vec<String> },

    #[error("{controller} got undeclared connections: {}", .names.join(", "))]
    UnexpectedConnections { controller: String, names: Vec<String> },

    #[error("{controller} has no {direction} connection named '{name}'")]
    UnknownConnection {
        controller: String,
        name: String,
        direction: &'static str,
    },

    /// Signals may only attach to nodes and edges.
    #[error("Entity {id} is a {kind} and cannot be a signal endpoint")]
    InvalidEndpoint { id: ComponentId, kind: &'static str },

    #[error("Entity {id} is still referenced by {}", join_ids(.by))]
    InUse { id: ComponentId, by: Vec<ComponentId> },

    /// A lifecycle operation would leave a reference the graph cannot rebind.
    #[error("Entity {id} is referenced by {from}, which lies outside this graph")]
    ExternalReference { id: ComponentId, from: ComponentId },

    #[error("Replacement graph has no {kind} named '{name}' to take over references to {id}")]
    SwapUnresolved {
        id: ComponentId,
        kind: &'static str,
        name: String,
    },

    #[error("Unknown {kind} type '{type_name}'")]
    UnknownType { kind: &'static str, type_name: String },

    #[error("Material field '{field}' of {owner} is non-physical: {source}")]
    NonPhysical {
        owner: String,
        field: String,
        source: MaterialError,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Material(#[from] MaterialError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn join_ids(ids: &[ComponentId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
