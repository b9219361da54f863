//! The `Material` value type.
//!
//! A material carries only extrinsic quantities. Operations never mutate in
//! place; each returns a fresh value, so a material handed to a flow can be
//! shared freely without aliasing surprises.

use std::fmt;
use std::ops::{Mul, Neg};

use serde::{Deserialize, Serialize};

use crate::error::{MaterialError, MaterialResult};
use crate::physics;
use crate::substance::{Phase, Substance};
use fg_core::numeric::ensure_finite;
use fg_core::units::{
    Density, Energy, Mass, Pressure, Temperature, Volume, joules, k, kg, kg_per_m3, m3, pa,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub substance: Substance,
    pub mass_kg: f64,
    /// Internal energy on the substance's reference scale.
    pub energy_j: f64,
    pub volume_m3: f64,
}

impl Material {
    /// Direct construction from extrinsic attributes. No physicality checks;
    /// call [`Material::validate`] when that matters.
    pub fn new(substance: Substance, mass_kg: f64, energy_j: f64, volume_m3: f64) -> Self {
        Self {
            substance,
            mass_kg,
            energy_j,
            volume_m3,
        }
    }

    /// Condensed-phase material; volume follows from the fixed density.
    pub fn condensed(substance: Substance, mass_kg: f64, energy_j: f64) -> MaterialResult<Self> {
        let density = substance.phase.fixed_density().ok_or(MaterialError::NotSupported {
            what: "volume from mass needs a liquid or solid",
        })?;
        if density <= 0.0 {
            return Err(MaterialError::NonPhysical {
                what: "density",
                value: density,
            });
        }
        Ok(Self::new(substance, mass_kg, energy_j, mass_kg / density))
    }

    /// Energy-only material, used for heat flows.
    pub fn energy(energy_j: f64) -> Self {
        Self::new(Substance::energy(), 0.0, energy_j, 0.0)
    }

    /// Condensed-phase material at temperature `t`.
    pub fn from_temperature(
        substance: Substance,
        mass_kg: f64,
        t: Temperature,
    ) -> MaterialResult<Self> {
        let energy = energy_at(&substance, mass_kg, t.value)?;
        Self::condensed(substance, mass_kg, energy)
    }

    /// Material of any non-energy phase at temperature `t` occupying `v`.
    pub fn from_temperature_volume(
        substance: Substance,
        mass_kg: f64,
        t: Temperature,
        v: Volume,
    ) -> MaterialResult<Self> {
        let energy = energy_at(&substance, mass_kg, t.value)?;
        Ok(Self::new(substance, mass_kg, energy, v.value))
    }

    /// Gas at temperature `t` and pressure `p`; volume from the ideal gas law.
    pub fn from_temperature_pressure(
        substance: Substance,
        mass_kg: f64,
        t: Temperature,
        p: Pressure,
    ) -> MaterialResult<Self> {
        let molar_mass = substance.phase.molar_mass().ok_or(MaterialError::NotSupported {
            what: "pressure-defined volume needs a gas",
        })?;
        let volume = physics::ideal_gas_volume(mass_kg, molar_mass, t.value, p.value)?;
        let energy = energy_at(&substance, mass_kg, t.value)?;
        Ok(Self::new(substance, mass_kg, energy, volume))
    }

    pub fn is_energy(&self) -> bool {
        self.substance.is_energy()
    }

    pub fn mass(&self) -> Mass {
        kg(self.mass_kg)
    }

    pub fn internal_energy(&self) -> Energy {
        joules(self.energy_j)
    }

    pub fn volume(&self) -> Volume {
        m3(self.volume_m3)
    }

    /// `self + other`.
    ///
    /// Same substance: component-wise sum. Energy combines with anything and
    /// only adds internal energy. Anything else is a type mismatch.
    pub fn combine(&self, other: &Material) -> MaterialResult<Material> {
        let substance = if self.substance == other.substance || other.is_energy() {
            &self.substance
        } else if self.is_energy() {
            &other.substance
        } else {
            return Err(MaterialError::Mismatch {
                left: self.substance.to_string(),
                right: other.substance.to_string(),
            });
        };
        Ok(Material::new(
            substance.clone(),
            self.mass_kg + other.mass_kg,
            self.energy_j + other.energy_j,
            self.volume_m3 + other.volume_m3,
        ))
    }

    /// `self - other`.
    pub fn remove(&self, other: &Material) -> MaterialResult<Material> {
        self.combine(&other.negate())
    }

    /// Multiply every extrinsic quantity by `factor`.
    pub fn scale(&self, factor: f64) -> Material {
        Material::new(
            self.substance.clone(),
            self.mass_kg * factor,
            self.energy_j * factor,
            self.volume_m3 * factor,
        )
    }

    pub fn divide(&self, divisor: f64) -> MaterialResult<Material> {
        if divisor == 0.0 {
            return Err(MaterialError::DivisionUndefined {
                what: "material divided by zero",
            });
        }
        Ok(self.scale(1.0 / divisor))
    }

    pub fn negate(&self) -> Material {
        self.scale(-1.0)
    }

    /// Internal energy per unit mass.
    pub fn specific_energy(&self) -> MaterialResult<f64> {
        if self.mass_kg == 0.0 {
            return Err(MaterialError::DivisionUndefined {
                what: "specific energy of zero-mass material",
            });
        }
        Ok(self.energy_j / self.mass_kg)
    }

    pub fn temperature(&self) -> MaterialResult<Temperature> {
        let t = physics::temperature_from_energy(
            self.energy_j,
            self.mass_kg,
            self.substance.cv_j_per_kg_k,
            self.substance.t0_k,
            self.substance.u0_j_per_kg,
        )?;
        Ok(k(t))
    }

    pub fn density(&self) -> MaterialResult<Density> {
        if self.volume_m3 == 0.0 {
            return Err(MaterialError::DivisionUndefined {
                what: "density of zero-volume material",
            });
        }
        Ok(kg_per_m3(self.mass_kg / self.volume_m3))
    }

    /// Ideal-gas pressure. Condensed phases have no equation of state here;
    /// see [`crate::LinearPressureLaw`] for a vessel-imposed pressure.
    pub fn pressure(&self) -> MaterialResult<Pressure> {
        match self.substance.phase {
            Phase::Gas {
                molar_mass_kg_per_mol,
            } => {
                let t = self.temperature()?;
                let p = physics::ideal_gas_pressure(
                    self.mass_kg,
                    molar_mass_kg_per_mol,
                    t.value,
                    self.volume_m3,
                )?;
                Ok(pa(p))
            }
            Phase::Liquid { .. } | Phase::Solid { .. } => Err(MaterialError::NotSupported {
                what: "intrinsic pressure of an incompressible phase",
            }),
            Phase::Energy => Err(MaterialError::NotSupported {
                what: "pressure of energy",
            }),
        }
    }

    /// Heat capacity at constant pressure, `cv + R/M`, for gases.
    pub fn cp(&self) -> MaterialResult<f64> {
        let molar_mass = self.substance.phase.molar_mass().ok_or(MaterialError::NotSupported {
            what: "cp is defined for gases only",
        })?;
        Ok(self.substance.cv_j_per_kg_k + physics::specific_gas_constant(molar_mass)?)
    }

    pub fn saturation_temperature(&self, p: Pressure) -> MaterialResult<Temperature> {
        let sat = self.substance.saturation.ok_or(MaterialError::NotSupported {
            what: "substance has no saturation curve",
        })?;
        let t = physics::saturation_temperature(
            p.value,
            sat.latent_heat_j_per_kg,
            sat.p0_pa,
            sat.t0_k,
            sat.molar_mass_kg_per_mol,
        )?;
        Ok(k(t))
    }

    pub fn saturation_pressure(&self, t: Temperature) -> MaterialResult<Pressure> {
        let sat = self.substance.saturation.ok_or(MaterialError::NotSupported {
            what: "substance has no saturation curve",
        })?;
        let p = physics::saturation_pressure(
            t.value,
            sat.latent_heat_j_per_kg,
            sat.p0_pa,
            sat.t0_k,
            sat.molar_mass_kg_per_mol,
        )?;
        Ok(pa(p))
    }

    /// Specific energy of saturated material at temperature `t`, the energy
    /// each kilogram carries when it changes phase.
    pub fn saturation_specific_energy(&self, t: Temperature) -> MaterialResult<f64> {
        if self.substance.saturation.is_none() {
            return Err(MaterialError::NotSupported {
                what: "substance has no saturation curve",
            });
        }
        energy_at(&self.substance, 1.0, t.value)
    }

    /// Opt-in physicality check.
    ///
    /// Rejects non-finite values, negative mass or volume, negative energy on
    /// an absolute scale, and a mix of zero and non-zero extrinsic quantities.
    pub fn validate(&self) -> MaterialResult<()> {
        for (what, value) in [
            ("mass", self.mass_kg),
            ("internal energy", self.energy_j),
            ("volume", self.volume_m3),
        ] {
            ensure_finite(value, what).map_err(|_| MaterialError::NonPhysical { what, value })?;
        }
        if self.mass_kg < 0.0 {
            return Err(MaterialError::NonPhysical {
                what: "mass",
                value: self.mass_kg,
            });
        }
        if self.volume_m3 < 0.0 {
            return Err(MaterialError::NonPhysical {
                what: "volume",
                value: self.volume_m3,
            });
        }
        if self.energy_j < 0.0 && self.substance.is_absolute_referenced() {
            return Err(MaterialError::NonPhysical {
                what: "internal energy",
                value: self.energy_j,
            });
        }
        if !self.is_energy() {
            let zeros = [self.mass_kg, self.energy_j, self.volume_m3]
                .iter()
                .filter(|v| **v == 0.0)
                .count();
            if zeros != 0 && zeros != 3 {
                return Err(MaterialError::NonPhysical {
                    what: "partially empty material",
                    value: self.mass_kg,
                });
            }
        }
        Ok(())
    }
}

fn energy_at(substance: &Substance, mass_kg: f64, t_k: f64) -> MaterialResult<f64> {
    if substance.is_energy() {
        return Err(MaterialError::NotSupported {
            what: "temperature of energy",
        });
    }
    Ok(physics::energy_from_temperature(
        t_k,
        mass_kg,
        substance.cv_j_per_kg_k,
        substance.t0_k,
        substance.u0_j_per_kg,
    ))
}

impl Mul<f64> for &Material {
    type Output = Material;

    fn mul(self, rhs: f64) -> Material {
        self.scale(rhs)
    }
}

impl Mul<f64> for Material {
    type Output = Material;

    fn mul(self, rhs: f64) -> Material {
        self.scale(rhs)
    }
}

impl Neg for &Material {
    type Output = Material;

    fn neg(self) -> Material {
        self.negate()
    }
}

impl Neg for Material {
    type Output = Material;

    fn neg(self) -> Material {
        self.negate()
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(m={:.4e} kg, U={:.4e} J, V={:.4e} m3)",
            self.substance.name, self.mass_kg, self.energy_j, self.volume_m3
        )
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::catalog;
    use proptest::prelude::*;

    fn tol(a: f64, b: f64) -> f64 {
        1e-9 * (1.0 + a.abs().max(b.abs()))
    }

    proptest! {
        #[test]
        fn combine_is_commutative(
            m1 in 0.0_f64..1e3,
            u1 in 0.0_f64..1e8,
            m2 in 0.0_f64..1e3,
            u2 in 0.0_f64..1e8,
        ) {
            let a = Material::condensed(catalog::water(), m1, u1).unwrap();
            let b = Material::condensed(catalog::water(), m2, u2).unwrap();
            prop_assert_eq!(a.combine(&b).unwrap(), b.combine(&a).unwrap());
        }

        #[test]
        fn combine_then_remove_is_identity(
            m1 in 0.0_f64..1e3,
            u1 in 0.0_f64..1e8,
            m2 in 0.0_f64..1e3,
            u2 in 0.0_f64..1e8,
        ) {
            let a = Material::condensed(catalog::water(), m1, u1).unwrap();
            let b = Material::condensed(catalog::water(), m2, u2).unwrap();
            let back = a.combine(&b).unwrap().remove(&b).unwrap();
            prop_assert!((back.mass_kg - a.mass_kg).abs() <= tol(a.mass_kg, m2));
            prop_assert!((back.energy_j - a.energy_j).abs() <= tol(a.energy_j, u2));
            prop_assert!((back.volume_m3 - a.volume_m3).abs() <= tol(a.volume_m3, b.volume_m3));
        }

        #[test]
        fn scale_is_linear(m in 0.0_f64..1e3, u in 0.0_f64..1e8, f in -10.0_f64..10.0) {
            let a = Material::condensed(catalog::pwr_primary_water(), m, u).unwrap();
            let s = a.scale(f);
            prop_assert_eq!(s.mass_kg, m * f);
            prop_assert_eq!(s.energy_j, u * f);
        }

        #[test]
        fn mixing_temperature_is_mass_weighted(
            m1 in 0.1_f64..100.0,
            t1 in 280.0_f64..600.0,
            m2 in 0.1_f64..100.0,
            t2 in 280.0_f64..600.0,
        ) {
            let a = Material::from_temperature(catalog::water(), m1, k(t1)).unwrap();
            let b = Material::from_temperature(catalog::water(), m2, k(t2)).unwrap();
            let t = a.combine(&b).unwrap().temperature().unwrap().value;
            let expected = (m1 * t1 + m2 * t2) / (m1 + m2);
            prop_assert!((t - expected).abs() < 1e-6);
        }
    }
}
