//! fg-materials: conserved-quantity value types for fluxgraph.
//!
//! A [`Material`] is an immutable bundle of extrinsic quantities (mass,
//! internal energy, volume) tagged with the [`Substance`] it is made of. All
//! intrinsic properties (temperature, density, pressure, saturation state) are
//! derived on demand from the substance's constant table.
//!
//! Provides:
//! - `Phase` / `Substance` constant tables and a small substance catalog
//! - `Material` algebra (combine, remove, scale) with type checking
//! - pure thermodynamic formulas used by the derivations
//! - `LinearPressureLaw` for incompressible contents in a compliant vessel
//!
//! # Example
//!
//! ```
//! use fg_core::units::k;
//! use fg_materials::{catalog, Material};
//!
//! let hot = Material::from_temperature(catalog::water(), 2.0, k(350.0)).unwrap();
//! let cold = Material::from_temperature(catalog::water(), 2.0, k(300.0)).unwrap();
//! let mixed = hot.combine(&cold).unwrap();
//!
//! assert!((mixed.temperature().unwrap().value - 325.0).abs() < 1e-9);
//! ```

pub mod catalog;
pub mod error;
pub mod material;
pub mod physics;
pub mod substance;
pub mod vessel;

pub use error::{MaterialError, MaterialResult};
pub use material::Material;
pub use substance::{Phase, Saturation, Substance};
pub use vessel::LinearPressureLaw;
