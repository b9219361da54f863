//! Type-name to model factories, used to rebuild graphs from snapshots.

use std::collections::BTreeMap;
use std::fmt;

use crate::controller::ControllerModel;
use crate::edge::EdgeModel;
use crate::error::{GraphError, GraphResult};
use crate::node::NodeModel;

type Factory<T> = Box<dyn Fn() -> Box<T> + Send + Sync>;

/// Known model types.
///
/// A snapshot stores each entity's type name and state only. Anything a
/// model is configured with outside its state record comes from the factory
/// registered here.
#[derive(Default)]
pub struct Registry {
    nodes: BTreeMap<String, Factory<dyn NodeModel>>,
    edges: BTreeMap<String, Factory<dyn EdgeModel>>,
    controllers: BTreeMap<String, Factory<dyn ControllerModel>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node<T: NodeModel + Default + 'static>(self) -> Self {
        let name = T::default().type_name();
        self.with_node_factory(name, || Box::new(T::default()))
    }

    pub fn with_node_factory<F>(mut self, type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn NodeModel> + Send + Sync + 'static,
    {
        self.nodes.insert(type_name.into(), Box::new(factory));
        self
    }

    pub fn with_edge<T: EdgeModel + Default + 'static>(self) -> Self {
        let name = T::default().type_name();
        self.with_edge_factory(name, || Box::new(T::default()))
    }

    pub fn with_edge_factory<F>(mut self, type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn EdgeModel> + Send + Sync + 'static,
    {
        self.edges.insert(type_name.into(), Box::new(factory));
        self
    }

    pub fn with_controller<T: ControllerModel + Default + 'static>(self) -> Self {
        let name = T::default().type_name();
        self.with_controller_factory(name, || Box::new(T::default()))
    }

    pub fn with_controller_factory<F>(mut self, type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ControllerModel> + Send + Sync + 'static,
    {
        self.controllers.insert(type_name.into(), Box::new(factory));
        self
    }

    /// Adds every factory of `other`; on a name clash `other` wins.
    pub fn merge(mut self, other: Registry) -> Self {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
        self.controllers.extend(other.controllers);
        self
    }

    pub(crate) fn node(&self, type_name: &str) -> GraphResult<Box<dyn NodeModel>> {
        self.nodes
            .get(type_name)
            .map(|f| f())
            .ok_or_else(|| unknown("node", type_name))
    }

    pub(crate) fn edge(&self, type_name: &str) -> GraphResult<Box<dyn EdgeModel>> {
        self.edges
            .get(type_name)
            .map(|f| f())
            .ok_or_else(|| unknown("edge", type_name))
    }

    pub(crate) fn controller(&self, type_name: &str) -> GraphResult<Box<dyn ControllerModel>> {
        self.controllers
            .get(type_name)
            .map(|f| f())
            .ok_or_else(|| unknown("controller", type_name))
    }
}

fn unknown(kind: &'static str, type_name: &str) -> GraphError {
    GraphError::UnknownType {
        kind,
        type_name: type_name.to_string(),
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges.keys().collect::<Vec<_>>())
            .field("controllers", &self.controllers.keys().collect::<Vec<_>>())
            .finish()
    }
}
