use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use units::TWOPI;

use crate::rng::McRng;
use crate::types::{Length, Point, RegionIndex, Vector};
use super::{default_region, Emission, Source};

/// Collimated beam with a circular cross-section, centred on `center`, in the
/// plane `z = center.z`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectionalCircular {
    pub center: Point,
    #[serde(deserialize_with = "crate::config::deserialize_length")]
    pub radius: Length,
    #[serde(default = "Vector::unit_z")]
    pub direction: Vector,
    #[serde(default)]
    pub profile: BeamProfile,
    #[serde(default = "default_region")]
    pub initial_region: RegionIndex,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BeamProfile {
    /// Uniform irradiance over the disc
    #[default]
    Flat,
    /// Gaussian irradiance, truncated at the disc's radius
    Gaussian { fwhm: Length },
}

// FWHM = 2 √(2 ln 2) σ
const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949;

impl DirectionalCircular {

    fn sample_offset(&self, rng: &mut McRng) -> (Length, Length) {
        match self.profile {
            BeamProfile::Flat => {
                let r = self.radius * rng.gen::<f64>().sqrt();
                let phi = TWOPI * rng.gen::<f64>();
                (r * phi.cos(), r * phi.sin())
            }
            BeamProfile::Gaussian { fwhm } => {
                let sigma = fwhm / FWHM_PER_SIGMA;
                match Normal::new(0.0, sigma) {
                    Ok(normal) => loop {
                        let (x, y) = (normal.sample(rng), normal.sample(rng));
                        if x.hypot(y) <= self.radius { break (x, y) }
                    },
                    // Degenerate beam width: all photons through the centre
                    Err(_) => (0.0, 0.0),
                }
            }
        }
    }
}

impl Source for DirectionalCircular {
    fn emit(&self, rng: &mut McRng) -> Emission {
        let (dx, dy) = self.sample_offset(rng);
        let position = Point::new(self.center.x + dx, self.center.y + dy, self.center.z);
        Emission { position, direction: self.direction.normalize(), region: self.initial_region }
    }

    fn is_cylindrically_symmetric(&self) -> bool {
        self.center.rho() == 0.0 && self.direction.x == 0.0 && self.direction.y == 0.0
    }

    fn initial_region(&self) -> RegionIndex { self.initial_region }
}
