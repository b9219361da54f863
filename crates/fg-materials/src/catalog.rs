//! Built-in substances.
//!
//! Constants are representative single-point values, not property-library
//! quality. Each call returns a fresh [`Substance`]; equal calls compare equal.

use crate::substance::{Phase, Saturation, Substance};
use fg_core::units::constants::P_ATM_PA;

const WATER_MOLAR_MASS: f64 = 0.018_015;

fn water_boiling() -> Saturation {
    Saturation {
        t0_k: 373.15,
        p0_pa: P_ATM_PA,
        latent_heat_j_per_kg: 2.257e6,
        molar_mass_kg_per_mol: WATER_MOLAR_MASS,
    }
}

/// Liquid water at ambient conditions.
pub fn water() -> Substance {
    Substance::new(
        "Water",
        Phase::Liquid {
            density_kg_per_m3: 1000.0,
        },
        4186.0,
    )
    .with_saturation(water_boiling())
}

/// Dry air as a single ideal gas.
pub fn air() -> Substance {
    Substance::new(
        "Air",
        Phase::Gas {
            molar_mass_kg_per_mol: 0.028_97,
        },
        718.0,
    )
}

pub fn helium() -> Substance {
    Substance::new(
        "Helium",
        Phase::Gas {
            molar_mass_kg_per_mol: 0.004_003,
        },
        3116.0,
    )
}

/// Pressurized-water-reactor primary coolant.
pub fn pwr_primary_water() -> Substance {
    Substance::new(
        "PWRPrimaryWater",
        Phase::Liquid {
            density_kg_per_m3: 700.0,
        },
        4200.0,
    )
}

/// Pressurized-water-reactor secondary feedwater.
pub fn pwr_secondary_water() -> Substance {
    Substance::new(
        "PWRSecondaryWater",
        Phase::Liquid {
            density_kg_per_m3: 720.0,
        },
        4200.0,
    )
    .with_saturation(water_boiling())
}

/// Steam raised on the secondary side.
pub fn pwr_secondary_steam() -> Substance {
    Substance::new(
        "PWRSecondarySteam",
        Phase::Gas {
            molar_mass_kg_per_mol: WATER_MOLAR_MASS,
        },
        2100.0,
    )
    .with_saturation(water_boiling())
}

/// Uranium dioxide fuel.
pub fn uranium_dioxide() -> Substance {
    Substance::new(
        "UraniumDioxide",
        Phase::Solid {
            density_kg_per_m3: 10_970.0,
        },
        300.0,
    )
}

/// Every built-in substance, for lookups by name.
pub fn all() -> Vec<Substance> {
    vec![
        water(),
        air(),
        helium(),
        pwr_primary_water(),
        pwr_secondary_water(),
        pwr_secondary_steam(),
        uranium_dioxide(),
    ]
}

pub fn by_name(name: &str) -> Option<Substance> {
    all().into_iter().find(|s| s.name == name)
}
