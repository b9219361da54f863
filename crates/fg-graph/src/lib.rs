//! fg-graph: the conservation graph engine.
//!
//! A [`Graph`] owns nodes (which hold conserved quantities), edges (which
//! compute rates between two nodes) and controllers (which observe nodes and
//! edges and command them through signals). Each step runs three phases over
//! the whole tree:
//!
//! 1. every edge applies pending commands and calculates its flows from node
//!    state as of the start of the step,
//! 2. every node applies pending commands and integrates the flows of its
//!    edges,
//! 3. every controller observes its endpoints and stages commands that take
//!    effect in the next step.
//!
//! Conservative flows leave the source and enter the target in equal amounts,
//! so totals are preserved to floating point precision.
//!
//! ```
//! use fg_graph::{
//!     EdgeModel, EdgeSpec, Endpoints, FieldSpec, Flows, Graph, GraphResult, NodeModel, NodeSpec,
//!     State,
//! };
//!
//! struct Bin;
//!
//! impl NodeModel for Bin {
//!     fn type_name(&self) -> &'static str {
//!         "Bin"
//!     }
//!     fn fields(&self) -> &'static [FieldSpec] {
//!         const F: &[FieldSpec] = &[FieldSpec::scalar("q")];
//!         F
//!     }
//! }
//!
//! struct Leak;
//!
//! impl EdgeModel for Leak {
//!     fn type_name(&self) -> &'static str {
//!         "Leak"
//!     }
//!     fn fields(&self) -> &'static [FieldSpec] {
//!         const F: &[FieldSpec] = &[FieldSpec::scalar("k")];
//!         F
//!     }
//!     fn calculate_flows(
//!         &mut self,
//!         state: &mut State,
//!         ends: Endpoints<'_>,
//!         _dt: f64,
//!     ) -> GraphResult<Flows> {
//!         let k = state.scalar("k")?;
//!         let rate = k * (ends.source_scalar("q")? - ends.target_scalar("q")?);
//!         Ok(Flows::new().with("q", rate))
//!     }
//! }
//!
//! # fn main() -> GraphResult<()> {
//! let mut g = Graph::new("demo");
//! let a = g.add_node(NodeSpec::new(Bin).field("q", 10.0))?;
//! let b = g.add_node(NodeSpec::new(Bin).field("q", 0.0))?;
//! g.add_edge(EdgeSpec::new(Leak, a, b).field("k", 0.5))?;
//!
//! g.update(0.1, 100)?;
//! let total: f64 = [a, b]
//!     .iter()
//!     .map(|id| g.node(*id).map_or(0.0, |n| n.state().scalar("q").unwrap_or(0.0)))
//!     .sum();
//! assert!((total - 10.0).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```

pub mod alias;
pub mod controller;
pub mod edge;
pub mod error;
pub mod flows;
pub mod graph;
mod lifecycle;
pub mod node;
pub mod options;
pub mod registry;
pub mod signal;
pub mod snapshot;
pub mod state;
mod update;
pub mod value;

pub use alias::AliasMap;
pub use controller::{ControlContext, Controller, ControllerModel, ControllerSpec, Monitor, Reading};
pub use edge::{Edge, EdgeModel, EdgeSpec, Endpoints};
pub use error::{GraphError, GraphResult};
pub use flows::{End, FlowMap, Flows};
pub use graph::{Entity, Graph};
pub use node::{Node, NodeModel, NodeSpec};
pub use options::GraphOptions;
pub use registry::Registry;
pub use signal::{Direction, Payload, Signal, apply_payloads};
pub use snapshot::{ControllerSnapshot, EdgeSnapshot, GraphSnapshot, NodeSnapshot};
pub use state::{FieldSpec, State};
pub use value::{FieldKind, Value};

pub use fg_core::ComponentId;
