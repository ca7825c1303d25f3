//! Detectors: binned estimates of what photons do.
//!
//! Every detector belongs to one virtual boundary, which decides which photon
//! events the detector sees. A detector accumulates un-normalized sums over a
//! run (`tally`, `end_photon`), may be merged with its counterparts from other
//! partitions of the run, and is finally normalized once by the number of
//! photons launched.

mod binning;
mod tally;
mod input;
mod surface;
mod fx;
mod volume;
mod path_length;
mod pmc;

pub use binning::{BinAxis, BinIndex, Binning, Coordinate, MAX_AXES};
pub use tally::TallyData;
pub use input::{DetectorInput, DetectorKind, Perturbation, unique_names};
pub use surface::SurfaceDetector;
pub use fx::ROfFxDetector;
pub use volume::{VolumeDetector, VolumeQuantity};
pub use path_length::{ReflectedMTDetector, ReflectedTimeDetector};
pub use pmc::{PmcDetector, PmcQuantity, perturbation_factor};

use thiserror::Error;

use crate::absorption::AbsorptionWeightingType;
use crate::optics::OpticalProperties;
use crate::photon::{CollisionInfo, PhotonDataPoint, PhotonHistory};
use crate::tissue::Tissue;
use crate::types::{Length, Range};
use crate::virtual_boundary::VirtualBoundaryType;

/// What a detector gets to see of a photon
#[derive(Clone, Copy, Debug)]
pub struct TallyEvent<'a> {
    /// The photon's state at the event
    pub dp: &'a PhotonDataPoint,
    pub collision_info: &'a CollisionInfo,
    /// Empty unless some detector asked for histories to be kept
    pub history: &'a PhotonHistory,
}

/// Properties of the tissue that detectors need at construction
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorContext {
    pub optical_properties: Vec<OpticalProperties>,
    /// Whether each region lies inside the simulation domain
    pub in_domain: Vec<bool>,
    pub absorption_weighting: AbsorptionWeightingType,
}

impl DetectorContext {
    pub fn new(tissue: &dyn Tissue, absorption_weighting: AbsorptionWeightingType) -> Self {
        let n = tissue.regions().len();
        Self {
            optical_properties: (0..n).map(|r| *tissue.optical_properties(r)).collect(),
            in_domain:          (0..n).map(|r| tissue.domain_exit(r).is_none()).collect(),
            absorption_weighting,
        }
    }

    pub fn number_of_regions(&self) -> usize { self.optical_properties.len() }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectorError {
    #[error("results have already been normalized")]
    AlreadyNormalized,
    #[error("cannot normalize by zero photons")]
    NoPhotons,
    #[error("invalid {coordinate:?} binning {range}")]
    BadRange { coordinate: Coordinate, range: Range },
    #[error("detectors have at most 3 axes, {0} requested")]
    TooManyAxes(usize),
    #[error("cannot merge detectors with different binning")]
    IncompatibleBinning,
    #[error("cannot merge detector '{0}' with '{1}'")]
    Mismatch(String, String),
    #[error("bad perturbation: {0}")]
    BadPerturbation(String),
    #[error("need one blood volume fraction in [0, 1] for each of the {0} regions")]
    BadBloodVolumeFractions(usize),
}

/// The capability shared by every detector
pub trait Detector: Send {

    /// Unique within a simulation; names the output files
    fn name(&self) -> &str;

    /// The input `type` tag which created this detector
    fn type_name(&self) -> &'static str;

    fn virtual_boundary(&self) -> VirtualBoundaryType;

    fn tally(&mut self, event: &TallyEvent);

    fn tally_data(&self) -> &TallyData;

    fn tally_data_mut(&mut self) -> &mut TallyData;

    /// The detector reads `TallyEvent::history`
    fn needs_history(&self) -> bool { false }

    /// Depth of the plane watched by internal-surface detectors
    fn internal_surface(&self) -> Option<Length> { None }

    fn end_photon(&mut self) { self.tally_data_mut().end_photon() }

    /// Forget whatever the current photon contributed
    fn discard_photon(&mut self) { self.tally_data_mut().discard_photon() }

    fn binning(&self) -> &Binning { self.tally_data().binning() }

    /// Turn sums over `n` photons into per-photon estimates. Only the first
    /// call has any effect: later ones are errors.
    fn normalize(&mut self, n: u64) -> Result<(), DetectorError> {
        self.tally_data_mut().normalize(n)
    }

    fn merge(&mut self, other: &dyn Detector) -> Result<(), DetectorError> {
        if self.name() != other.name() || self.type_name() != other.type_name() {
            return Err(DetectorError::Mismatch(self.name().into(), other.name().into()))
        }
        self.tally_data_mut().merge(other.tally_data())
    }
}

impl std::fmt::Debug for dyn Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.type_name())
    }
}
