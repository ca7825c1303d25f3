//! Sampling new directions at scattering events.
//!
//! A `PhaseFunction` is built per tissue region from the run-wide
//! `PhaseFunctionInput` and the region's optical properties (anisotropy `g`).
//! Sampling only ever reads the phase function, so one instance is shared by
//! all photons in a run.

pub mod hg;
pub mod rm;
pub mod lookup;

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::optics::OpticalProperties;
use crate::types::Vector;

pub use hg::HenyeyGreenstein;
pub use rm::ReynoldsMcCormick;
pub use lookup::{LookupTable, LookupTableInput, AzimuthalTable, TableError};

/// Which scattering kernel to use, as written in input files
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PhaseFunctionInput {
    #[default]
    HenyeyGreenstein,
    ReynoldsMcCormick { alpha: f64 },
    LookupTable(LookupTableInput),
}

#[derive(Clone, Debug)]
pub enum PhaseFunction {
    HenyeyGreenstein(HenyeyGreenstein),
    ReynoldsMcCormick(ReynoldsMcCormick),
    LookupTable(Arc<LookupTable>),
}

impl PhaseFunction {

    pub fn new(input: &PhaseFunctionInput, optical_properties: &OpticalProperties) -> Result<Self, TableError> {
        let g = optical_properties.g;
        Ok(match input {
            PhaseFunctionInput::HenyeyGreenstein         => Self::HenyeyGreenstein(HenyeyGreenstein::new(g)),
            PhaseFunctionInput::ReynoldsMcCormick{alpha} => Self::ReynoldsMcCormick(ReynoldsMcCormick::new(g, *alpha)),
            PhaseFunctionInput::LookupTable(table)       => Self::LookupTable(Arc::new(LookupTable::new(table)?)),
        })
    }

    /// Sample a scattering event: the new direction of a photon which was
    /// travelling along `direction`.
    pub fn scatter<R: Rng + ?Sized>(&self, direction: Vector, rng: &mut R) -> Vector {
        let (cos_theta, phi) = match self {
            Self::HenyeyGreenstein (pf) => pf.sample(rng),
            Self::ReynoldsMcCormick(pf) => pf.sample(rng),
            Self::LookupTable      (pf) => pf.sample(rng),
        };
        rotate(direction, cos_theta, phi)
    }
}

/// Deflect `direction` by polar angle `acos(cos_theta)` and azimuth `phi`,
/// measured in the local frame of the incoming direction.
pub fn rotate(direction: Vector, cos_theta: f64, phi: f64) -> Vector {
    let Vector { x: ux, y: uy, z: uz } = direction;
    let cos_theta = cos_theta.clamp(-1.0, 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
    let (sin_phi, cos_phi) = phi.sin_cos();
    // Local frame is undefined along z
    if uz.abs() > 1.0 - 1e-10 {
        return Vector::new(sin_theta * cos_phi,
                           sin_theta * sin_phi,
                           cos_theta * uz.signum())
    }
    let temp = (1.0 - uz * uz).sqrt();
    Vector::new(
        sin_theta * (ux * uz * cos_phi - uy * sin_phi) / temp + ux * cos_theta,
        sin_theta * (uy * uz * cos_phi + ux * sin_phi) / temp + uy * cos_theta,
        -sin_theta * cos_phi * temp                            + uz * cos_theta,
    ).normalize()
}
