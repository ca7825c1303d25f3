//! Virtual boundaries: logical surfaces and volumes at which photons are
//! tallied, and the controller that routes each photon event to the
//! detectors of the boundary it concerns.

mod controller;

pub use controller::DetectorController;

use serde::{Deserialize, Serialize};

use crate::photon::PhotonStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VirtualBoundaryType {
    /// The top surface, crossed outwards
    DiffuseReflectance,
    /// The bottom surface, crossed outwards
    DiffuseTransmittance,
    /// The top surface at launch, for specularly reflected weight
    Specular,
    /// The whole tissue volume, seen through complete histories
    GenericVolume,
    /// The top surface, seen with each photon's collision info for
    /// perturbation Monte Carlo
    #[serde(rename = "pMCDiffuseReflectance")]
    PmcDiffuseReflectance,
    /// A plane of constant depth inside the tissue
    InternalSurface,
    /// The lateral wall of a bounding volume
    BoundingVolume,
}

impl VirtualBoundaryType {

    /// Whether a photon event with status `status` concerns this boundary.
    /// `GenericVolume` sees every history once it is over.
    pub fn accepts(self, status: PhotonStatus) -> bool {
        use PhotonStatus as S;
        match self {
            Self::DiffuseReflectance | Self::PmcDiffuseReflectance => status == S::ExitedTop,
            Self::DiffuseTransmittance => status == S::ExitedBottom,
            Self::Specular             => status == S::PseudoSpecular,
            Self::GenericVolume        => status.is_terminal(),
            Self::InternalSurface      => status == S::PseudoInternalSurface,
            Self::BoundingVolume       => status == S::ExitedBoundingVolume,
        }
    }
}

impl std::fmt::Display for VirtualBoundaryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PmcDiffuseReflectance => write!(f, "pMCDiffuseReflectance"),
            other                       => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest(/**/ vb,                                        status,                              accepted,
             case(VirtualBoundaryType::DiffuseReflectance,    PhotonStatus::ExitedTop,             true),
             case(VirtualBoundaryType::DiffuseReflectance,    PhotonStatus::ExitedBottom,          false),
             case(VirtualBoundaryType::PmcDiffuseReflectance, PhotonStatus::ExitedTop,             true),
             case(VirtualBoundaryType::DiffuseTransmittance,  PhotonStatus::ExitedBottom,          true),
             case(VirtualBoundaryType::Specular,              PhotonStatus::PseudoSpecular,        true),
             case(VirtualBoundaryType::Specular,              PhotonStatus::ExitedTop,             false),
             case(VirtualBoundaryType::GenericVolume,         PhotonStatus::KilledRussianRoulette, true),
             case(VirtualBoundaryType::GenericVolume,         PhotonStatus::PseudoTissueBoundary,  false),
             case(VirtualBoundaryType::InternalSurface,       PhotonStatus::PseudoInternalSurface, true),
             case(VirtualBoundaryType::BoundingVolume,        PhotonStatus::ExitedBoundingVolume,  true),
    )]
    fn boundaries_select_events(vb: VirtualBoundaryType, status: PhotonStatus, accepted: bool) {
        assert_eq!(vb.accepts(status), accepted);
    }
}
