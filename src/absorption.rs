//! Absorption weighting: how a photon's weight represents absorption, and the
//! matching estimators of absorbed energy and fluence along a history.

use serde::{Deserialize, Serialize};

use crate::optics::OpticalProperties;
use crate::photon::{PhotonDataPoint, PhotonStatus};
use crate::types::{Length, Weight};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbsorptionWeightingType {
    /// Photons are absorbed whole, with probability μa/μt per collision
    Analog,
    /// Weight is multiplied by the albedo μs/μt at each collision
    #[default]
    Discrete,
    /// Free paths are sampled with μs alone; weight decays as exp(-μa ℓ)
    /// along every path segment
    Continuous,
}

impl std::fmt::Display for AbsorptionWeightingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl AbsorptionWeightingType {

    /// The attenuation coefficient governing free-path sampling
    pub fn sampling_coefficient(self, op: &OpticalProperties) -> f64 {
        match self {
            Self::Continuous => op.mus(),
            _                => op.r#mut(),
        }
    }

    /// Weight absorbed along the segment from `previous` to `current`, which
    /// lies in a region with optical properties `op`.
    pub fn absorbed_weight(self, previous: &PhotonDataPoint, current: &PhotonDataPoint, op: &OpticalProperties) -> Weight {
        match self {
            Self::Analog =>
                if current.status == PhotonStatus::Absorbed { previous.weight } else { 0.0 },
            Self::Discrete => {
                let mut_ = op.r#mut();
                if current.status.is_collision() && mut_ > 0.0 { previous.weight * op.mua / mut_ } else { 0.0 }
            }
            Self::Continuous =>
                previous.weight * (1.0 - (-op.mua * segment_length(previous, current)).exp()),
        }
    }

    /// Contribution to the fluence (track-length or collision estimator) of
    /// the segment from `previous` to `current`.
    pub fn fluence_weight(self, previous: &PhotonDataPoint, current: &PhotonDataPoint, op: &OpticalProperties) -> Weight {
        match self {
            Self::Analog => {
                let absorbed = self.absorbed_weight(previous, current, op);
                if op.mua > 0.0 { absorbed / op.mua } else { 0.0 }
            }
            Self::Discrete => {
                let mut_ = op.r#mut();
                if current.status.is_collision() && mut_ > 0.0 { previous.weight / mut_ } else { 0.0 }
            }
            Self::Continuous => {
                let l = segment_length(previous, current);
                if op.mua > 0.0 { previous.weight * (1.0 - (-op.mua * l).exp()) / op.mua }
                else            { previous.weight * l }
            }
        }
    }
}

fn segment_length(previous: &PhotonDataPoint, current: &PhotonDataPoint) -> Length {
    (current.position - previous.position).magnitude()
}
