//! Light sources: where photons start, in which direction, and in which
//! tissue region.
//!
//! A source whose initial region is the ambient medium above the tissue
//! (region 0, the default) injects photons through the tissue surface, which
//! gives rise to specular reflection.

mod point;
mod circular;

pub use point::{DirectionalPoint, IsotropicPoint, CustomPoint};
pub use circular::{DirectionalCircular, BeamProfile};

use serde::{Deserialize, Serialize};

use crate::rng::McRng;
use crate::types::{Point, RegionIndex, Vector};

/// Initial state of a photon, before it has interacted with anything
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Emission {
    pub position : Point,
    pub direction: Vector,
    pub region   : RegionIndex,
}

pub trait Source: Send + Sync {
    fn emit(&self, rng: &mut McRng) -> Emission;

    /// Launch direction does not depend on the azimuth about the z-axis, and
    /// the source lies on the z-axis
    fn is_cylindrically_symmetric(&self) -> bool;

    fn initial_region(&self) -> RegionIndex;
}

/// Source description as written in input files
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SourceInput {
    DirectionalPoint(DirectionalPoint),
    IsotropicPoint(IsotropicPoint),
    CustomPoint(CustomPoint),
    DirectionalCircular(DirectionalCircular),
}

impl Default for SourceInput {
    fn default() -> Self { Self::DirectionalPoint(DirectionalPoint::normal()) }
}

impl SourceInput {
    pub fn as_source(&self) -> &dyn Source {
        match self {
            Self::DirectionalPoint(s)    => s,
            Self::IsotropicPoint(s)      => s,
            Self::CustomPoint(s)         => s,
            Self::DirectionalCircular(s) => s,
        }
    }
}

pub(crate) fn default_region() -> RegionIndex { 0 }
