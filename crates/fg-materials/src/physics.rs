//! Pure thermodynamic relations used by material property derivation.
//!
//! All inputs and outputs are SI base units.

use crate::error::{MaterialError, MaterialResult};
use fg_core::units::constants::R_UNIVERSAL;

/// `T = (U/m - u0)/cv + T0`.
pub fn temperature_from_energy(
    energy_j: f64,
    mass_kg: f64,
    cv: f64,
    t0_k: f64,
    u0_j_per_kg: f64,
) -> MaterialResult<f64> {
    if mass_kg == 0.0 {
        return Err(MaterialError::DivisionUndefined {
            what: "temperature of zero-mass material",
        });
    }
    if cv <= 0.0 {
        return Err(MaterialError::InvalidArg {
            what: "heat capacity must be positive",
        });
    }
    Ok((energy_j / mass_kg - u0_j_per_kg) / cv + t0_k)
}

/// Inverse of [`temperature_from_energy`]: `U = m (u0 + cv (T - T0))`.
pub fn energy_from_temperature(
    t_k: f64,
    mass_kg: f64,
    cv: f64,
    t0_k: f64,
    u0_j_per_kg: f64,
) -> f64 {
    mass_kg * (u0_j_per_kg + cv * (t_k - t0_k))
}

/// Specific gas constant `R / M`, J/(kg K).
pub fn specific_gas_constant(molar_mass_kg_per_mol: f64) -> MaterialResult<f64> {
    if molar_mass_kg_per_mol <= 0.0 {
        return Err(MaterialError::InvalidArg {
            what: "molar mass must be positive",
        });
    }
    Ok(R_UNIVERSAL / molar_mass_kg_per_mol)
}

/// Ideal gas law solved for pressure, `P = m R_s T / V`.
pub fn ideal_gas_pressure(
    mass_kg: f64,
    molar_mass_kg_per_mol: f64,
    t_k: f64,
    volume_m3: f64,
) -> MaterialResult<f64> {
    if volume_m3 == 0.0 {
        return Err(MaterialError::DivisionUndefined {
            what: "pressure of zero-volume gas",
        });
    }
    Ok(mass_kg * specific_gas_constant(molar_mass_kg_per_mol)? * t_k / volume_m3)
}

/// Ideal gas law solved for volume, `V = m R_s T / P`.
pub fn ideal_gas_volume(
    mass_kg: f64,
    molar_mass_kg_per_mol: f64,
    t_k: f64,
    p_pa: f64,
) -> MaterialResult<f64> {
    if p_pa <= 0.0 {
        return Err(MaterialError::NonPhysical {
            what: "gas pressure",
            value: p_pa,
        });
    }
    Ok(mass_kg * specific_gas_constant(molar_mass_kg_per_mol)? * t_k / p_pa)
}

/// Clausius-Clapeyron saturation temperature at pressure `p`.
///
/// `1/T = 1/T0 - (R_s/L) ln(P/P0)`
pub fn saturation_temperature(
    p_pa: f64,
    latent_heat_j_per_kg: f64,
    p0_pa: f64,
    t0_k: f64,
    molar_mass_kg_per_mol: f64,
) -> MaterialResult<f64> {
    if p_pa <= 0.0 {
        return Err(MaterialError::NonPhysical {
            what: "saturation pressure",
            value: p_pa,
        });
    }
    check_reference(latent_heat_j_per_kg, p0_pa, t0_k)?;
    let r = specific_gas_constant(molar_mass_kg_per_mol)?;
    let inv_t = 1.0 / t0_k - (r / latent_heat_j_per_kg) * (p_pa / p0_pa).ln();
    if inv_t <= 0.0 {
        return Err(MaterialError::NonPhysical {
            what: "saturation temperature beyond model range",
            value: p_pa,
        });
    }
    Ok(1.0 / inv_t)
}

/// Clausius-Clapeyron saturation pressure at temperature `t`.
///
/// `P = P0 exp((L/R_s)(1/T0 - 1/T))`
pub fn saturation_pressure(
    t_k: f64,
    latent_heat_j_per_kg: f64,
    p0_pa: f64,
    t0_k: f64,
    molar_mass_kg_per_mol: f64,
) -> MaterialResult<f64> {
    if t_k <= 0.0 {
        return Err(MaterialError::NonPhysical {
            what: "saturation temperature",
            value: t_k,
        });
    }
    check_reference(latent_heat_j_per_kg, p0_pa, t0_k)?;
    let r = specific_gas_constant(molar_mass_kg_per_mol)?;
    Ok(p0_pa * ((latent_heat_j_per_kg / r) * (1.0 / t0_k - 1.0 / t_k)).exp())
}

fn check_reference(latent_heat: f64, p0: f64, t0: f64) -> MaterialResult<()> {
    if latent_heat <= 0.0 || p0 <= 0.0 || t0 <= 0.0 {
        return Err(MaterialError::InvalidArg {
            what: "saturation reference state must be positive",
        });
    }
    Ok(())
}
