use geometry::{Shape, VerticalCylinder};
use crate::optics::OpticalProperties;
use crate::types::{Point, RegionIndex, Vector};
use super::{BoundaryHit, DomainExit, MultiLayerTissue, RegionShape, Tissue, TissueError, TissueRegion};

/// The bounding cylinder's axis is vertical; the z-component of its centre is
/// ignored.
pub type BoundingCylinderInput = VerticalCylinder;

/// Layered tissue truncated laterally by a vertical cylinder. Photons reaching
/// the cylinder wall leave the domain without reflection.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingCylinderTissue {
    layers: MultiLayerTissue,
    cylinder: VerticalCylinder,
    regions: Vec<TissueRegion>,
}

impl BoundingCylinderTissue {

    pub fn new(layers: MultiLayerTissue, cylinder: VerticalCylinder) -> Result<Self, TissueError> {
        if !(cylinder.radius > 0.0 && cylinder.radius.is_finite()) {
            return Err(TissueError::BadRadius(cylinder.radius))
        }
        let outside = TissueRegion {
            shape: RegionShape::OutsideCylinder(cylinder),
            optical_properties: OpticalProperties::air(),
        };
        let regions = layers.regions().iter().copied().chain(std::iter::once(outside)).collect();
        Ok(Self { layers, cylinder, regions })
    }

    fn outside_index(&self) -> RegionIndex { self.regions.len() - 1 }
}

impl Tissue for BoundingCylinderTissue {

    fn regions(&self) -> &[TissueRegion] { &self.regions }

    fn region_index_at(&self, p: Point) -> RegionIndex {
        let layer = self.layers.region_index_at(p);
        let inside = self.cylinder.contains(p) || self.cylinder.on_boundary(p);
        if inside || !self.layers.is_tissue_layer(layer) { layer } else { self.outside_index() }
    }

    fn next_boundary(&self, p: Point, direction: Vector, region: RegionIndex) -> Option<BoundaryHit> {
        if region == self.outside_index() { return None }
        let face = self.layers.layer_boundary(p, direction, region);
        if !self.layers.is_tissue_layer(region) { return face }
        let wall = self.cylinder.distance_to_exit(p, direction);
        match face {
            Some(hit) if hit.distance <= wall => Some(hit),
            _ if wall.is_finite() => Some(BoundaryHit {
                distance: wall,
                neighbor: self.outside_index(),
                normal: self.cylinder.outward_normal(p + direction * wall),
            }),
            _ => face,
        }
    }

    fn domain_exit(&self, region: RegionIndex) -> Option<DomainExit> {
        if region == self.outside_index() { Some(DomainExit::BoundingVolume) }
        else                               { self.layers.domain_exit(region) }
    }

    fn is_cylindrically_symmetric(&self) -> bool {
        self.cylinder.center.x == 0.0 && self.cylinder.center.y == 0.0
    }
}
