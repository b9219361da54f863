//! fg-components: reference models for fluxgraph graphs.
//!
//! Provides:
//! - `Vessel` and `HeatedVessel` nodes holding one material inventory
//! - `LevelPipe`, a gravity-driven conservative mass and heat connection
//! - `HeatExchange` (conservative) and `ThermalCoupling` (lossy) heat edges
//! - `PiController` and `Probe` controllers
//!
//! All models keep their parameters in the entity state, so graphs built from
//! them survive a snapshot round trip through [`registry`].
//!
//! # Example
//!
//! ```
//! use fg_components::{LevelPipe, Vessel};
//! use fg_core::units::k;
//! use fg_graph::{EdgeSpec, Graph, NodeSpec};
//! use fg_materials::{Material, catalog};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tank = |mass| -> Result<NodeSpec, Box<dyn std::error::Error>> {
//!     let water = Material::from_temperature(catalog::water(), mass, k(300.0))?;
//!     Ok(NodeSpec::new(Vessel).field("contents", water).field("area_m2", 0.01))
//! };
//!
//! let mut g = Graph::new("tanks");
//! let a = g.add_node(tank(10.0)?)?;
//! let b = g.add_node(tank(2.0)?)?;
//! g.add_edge(EdgeSpec::new(LevelPipe, a, b).field("conductance", 1.0))?;
//!
//! g.update(0.1, 1000)?;
//! let mass = |id| g.node(id).and_then(|n| n.state().material("contents").ok()).map(|m| m.mass_kg);
//! assert!((mass(a).unwrap_or(0.0) - 6.0).abs() < 1e-6);
//! # Ok(())
//! # }
//! ```

pub mod control;
pub mod heat;
pub mod pipe;
pub mod vessel;

pub use control::{Measure, PiController, Probe};
pub use heat::{HeatExchange, ThermalCoupling};
pub use pipe::LevelPipe;
pub use vessel::{HeatedVessel, Vessel, level};

use fg_graph::Registry;

/// Registry with every model in this crate under its type name.
///
/// `PiController` is registered in its default thermostat configuration;
/// merge a registry with a custom factory to restore other configurations.
pub fn registry() -> Registry {
    Registry::new()
        .with_node::<Vessel>()
        .with_node::<HeatedVessel>()
        .with_edge::<LevelPipe>()
        .with_edge::<HeatExchange>()
        .with_edge::<ThermalCoupling>()
        .with_controller::<PiController>()
        .with_controller::<Probe>()
}
