//! Graph stepping options.

use serde::{Deserialize, Serialize};

/// Options shared by a graph and its sub-graphs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    /// Update the entities of one level on the rayon pool. Results are
    /// identical to sequential stepping.
    pub parallel: bool,
    /// Reject non-physical materials (negative mass, NaN) after each node
    /// update. Off by default: a transiently negative inventory is carried
    /// forward and only reported by an explicit `Material::validate`.
    pub validate_materials: bool,
}
