//! Tissue geometry: which region a point lies in, how far a photon may travel
//! before meeting another region, and what happens to its direction when it
//! does.
//!
//! Region indices are assigned in input order: the ambient medium above the
//! tissue is region 0, then the layers, then the ambient medium below; any
//! inclusions follow. Ambient regions lie outside the simulation domain:
//! photons entering them have left the tissue.

mod region;
mod layered;
mod inclusion;
mod bounding;

pub use region::{InclusionShape, LayerInput, TissueRegion, RegionShape};
pub use layered::MultiLayerTissue;
pub use inclusion::{InclusionInput, InclusionTissue};
pub use bounding::{BoundingCylinderTissue, BoundingCylinderInput};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use geometry::{Dot, EPSILON};
use crate::optics::OpticalProperties;
use crate::types::{Length, Point, RegionIndex, Vector};

/// The nearest physical boundary along a photon's direction of travel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryHit {
    pub distance: Length,
    /// Region on the far side of the boundary
    pub neighbor: RegionIndex,
    /// Unit normal at the crossing point, pointing into `neighbor`
    pub normal: Vector,
}

/// Ways of leaving the simulation domain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomainExit { Top, Bottom, BoundingVolume }

pub trait Tissue: Send + Sync {

    /// Every region, including the ambient ones
    fn regions(&self) -> &[TissueRegion];

    fn region_index_at(&self, p: Point) -> RegionIndex;

    /// The first boundary of `region` met by a ray starting at `p`, or `None`
    /// if the ray never leaves the region.
    fn next_boundary(&self, p: Point, direction: Vector, region: RegionIndex) -> Option<BoundaryHit>;

    /// `Some` for regions outside the simulation domain
    fn domain_exit(&self, region: RegionIndex) -> Option<DomainExit>;

    /// Invariant under rotations about the z-axis
    fn is_cylindrically_symmetric(&self) -> bool;

    fn optical_properties(&self, region: RegionIndex) -> &OpticalProperties {
        &self.regions()[region].optical_properties
    }

    fn distance_to_boundary(&self, p: Point, direction: Vector, region: RegionIndex) -> Length {
        self.next_boundary(p, direction, region).map_or(Length::INFINITY, |hit| hit.distance)
    }

    fn neighbor_region_index(&self, p: Point, direction: Vector, region: RegionIndex) -> Option<RegionIndex> {
        self.next_boundary(p, direction, region).map(|hit| hit.neighbor)
    }

    /// Cosine of the angle of incidence at `hit`
    fn angle_relative_to_boundary_normal(&self, direction: Vector, hit: &BoundaryHit) -> f64 {
        direction.dot(hit.normal).abs().min(1.0)
    }

    /// The photon is on a boundary whose far side is outside the domain
    fn on_domain_boundary(&self, p: Point, direction: Vector, region: RegionIndex) -> bool {
        self.next_boundary(p, direction, region)
            .map_or(false, |hit| hit.distance <= EPSILON && self.domain_exit(hit.neighbor).is_some())
    }

    fn reflected_direction(&self, direction: Vector, hit: &BoundaryHit) -> Vector {
        reflect(direction, hit.normal)
    }

    /// Snell's law, given the cosine of the transmission angle already found
    /// by `optics::fresnel`
    fn refracted_direction(
        &self, direction: Vector, hit: &BoundaryHit,
        n_current: f64, n_next: f64, cos_transmitted: f64,
    ) -> Vector {
        refract(direction, hit.normal, n_current / n_next, cos_transmitted)
    }
}

pub fn reflect(direction: Vector, normal: Vector) -> Vector {
    (direction - normal * (2.0 * direction.dot(normal))).normalize()
}

/// `eta` is the ratio of refractive indices, current over next
pub fn refract(direction: Vector, normal: Vector, eta: f64, cos_transmitted: f64) -> Vector {
    // Orient the normal along the direction of travel
    let cos_incident = direction.dot(normal);
    let (normal, cos_incident) = if cos_incident < 0.0 { (-normal, -cos_incident) }
                                 else                  { ( normal,  cos_incident) };
    (direction * eta + normal * (cos_transmitted - eta * cos_incident)).normalize()
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TissueError {
    #[error("tissue must contain at least one layer")]
    NoLayers,
    #[error("layer {index} has negative or non-finite thickness {thickness}")]
    BadThickness { index: usize, thickness: Length },
    #[error("inclusion {index} does not lie entirely within a single tissue layer")]
    InclusionOutsideLayer { index: usize },
    #[error("inclusions {0} and {1} overlap")]
    OverlappingInclusions(usize, usize),
    #[error("bounding cylinder radius must be positive, got {0}")]
    BadRadius(Length),
}

/// Tissue description as written in input files. The `type` tag selects the
/// geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TissueInput {
    MultiLayer {
        layers: Vec<LayerInput>,
        #[serde(default = "OpticalProperties::air")]
        above: OpticalProperties,
        #[serde(default = "OpticalProperties::air")]
        below: OpticalProperties,
    },
    Inclusion {
        layers: Vec<LayerInput>,
        inclusions: Vec<InclusionInput>,
        #[serde(default = "OpticalProperties::air")]
        above: OpticalProperties,
        #[serde(default = "OpticalProperties::air")]
        below: OpticalProperties,
    },
    BoundingCylinder {
        layers: Vec<LayerInput>,
        cylinder: BoundingCylinderInput,
        #[serde(default = "OpticalProperties::air")]
        above: OpticalProperties,
        #[serde(default = "OpticalProperties::air")]
        below: OpticalProperties,
    },
}

impl TissueInput {

    pub fn build(&self) -> Result<Box<dyn Tissue>, TissueError> {
        Ok(match self {
            Self::MultiLayer { layers, above, below } =>
                Box::new(MultiLayerTissue::new(layers, *above, *below)?),
            Self::Inclusion { layers, inclusions, above, below } =>
                Box::new(InclusionTissue::new(MultiLayerTissue::new(layers, *above, *below)?, inclusions)?),
            Self::BoundingCylinder { layers, cylinder, above, below } =>
                Box::new(BoundingCylinderTissue::new(MultiLayerTissue::new(layers, *above, *below)?, *cylinder)?),
        })
    }

    pub fn layers(&self) -> &[LayerInput] {
        match self {
            Self::MultiLayer       { layers, .. } |
            Self::Inclusion        { layers, .. } |
            Self::BoundingCylinder { layers, .. } => layers,
        }
    }

    /// Optical properties of every region, indexed like the built tissue
    pub fn region_optical_properties(&self) -> Vec<OpticalProperties> {
        let (above, below) = match self {
            Self::MultiLayer       { above, below, .. } |
            Self::Inclusion        { above, below, .. } |
            Self::BoundingCylinder { above, below, .. } => (*above, *below),
        };
        let mut ops = vec![above];
        ops.extend(self.layers().iter().map(|l| l.optical_properties));
        ops.push(below);
        match self {
            Self::Inclusion { inclusions, .. } => ops.extend(inclusions.iter().map(|i| i.optical_properties)),
            Self::BoundingCylinder { .. } => ops.push(OpticalProperties::air()),
            Self::MultiLayer { .. } => {}
        }
        ops
    }

    pub fn number_of_regions(&self) -> usize { self.region_optical_properties().len() }

    /// Depth of the tissue's lower surface
    pub fn bottom(&self) -> Length { self.layers().iter().map(|l| l.thickness).sum() }

    /// Simple layered tissue of a single slab between matched ambient media
    pub fn single_layer(thickness: Length, optical_properties: OpticalProperties) -> Self {
        Self::MultiLayer {
            layers: vec![LayerInput { thickness, optical_properties }],
            above: OpticalProperties::air(),
            below: OpticalProperties::air(),
        }
    }
}
