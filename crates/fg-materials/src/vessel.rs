//! Pressure imposed on incompressible contents by a compliant vessel.

use serde::{Deserialize, Serialize};

use crate::error::{MaterialError, MaterialResult};
use crate::material::Material;
use fg_core::units::{Pressure, pa};

/// `P = P0 + dP/dV (V - V0)`.
///
/// Liquids and solids carry no equation of state, so whatever contains them
/// supplies the pressure. The linear law is the simplest compliant wall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearPressureLaw {
    pub v0_m3: f64,
    pub p0_pa: f64,
    pub dp_dv_pa_per_m3: f64,
}

impl LinearPressureLaw {
    pub fn new(v0_m3: f64, p0_pa: f64, dp_dv_pa_per_m3: f64) -> MaterialResult<Self> {
        if dp_dv_pa_per_m3 < 0.0 {
            return Err(MaterialError::InvalidArg {
                what: "dp/dV must be non-negative",
            });
        }
        Ok(Self {
            v0_m3,
            p0_pa,
            dp_dv_pa_per_m3,
        })
    }

    /// Law whose reference point is the current contents at pressure `p0`.
    pub fn around(contents: &Material, p0: Pressure, dp_dv_pa_per_m3: f64) -> MaterialResult<Self> {
        Self::new(contents.volume_m3, p0.value, dp_dv_pa_per_m3)
    }

    pub fn pressure_at(&self, volume_m3: f64) -> Pressure {
        pa(self.p0_pa + self.dp_dv_pa_per_m3 * (volume_m3 - self.v0_m3))
    }

    pub fn pressure(&self, contents: &Material) -> Pressure {
        self.pressure_at(contents.volume_m3)
    }

    /// Same stiffness, new reference point.
    pub fn rebased(&self, v0_m3: f64, p0: Pressure) -> Self {
        Self {
            v0_m3,
            p0_pa: p0.value,
            dp_dv_pa_per_m3: self.dp_dv_pa_per_m3,
        }
    }

    /// Volume at which the vessel reaches pressure `p`.
    pub fn volume_at(&self, p: Pressure) -> MaterialResult<f64> {
        if self.dp_dv_pa_per_m3 == 0.0 {
            return Err(MaterialError::DivisionUndefined {
                what: "volume of a rigid-pressure vessel",
            });
        }
        Ok(self.v0_m3 + (p.value - self.p0_pa) / self.dp_dv_pa_per_m3)
    }
}
