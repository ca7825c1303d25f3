use geometry::Slab;
use crate::optics::OpticalProperties;
use crate::types::{Length, Point, RegionIndex, Vector};
use super::{BoundaryHit, DomainExit, LayerInput, Tissue, TissueError, TissueRegion, RegionShape};

/// Stack of infinite horizontal slabs. The first layer starts at `z = 0`; `z`
/// increases into the tissue.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiLayerTissue {
    regions: Vec<TissueRegion>,
    slabs  : Vec<Slab>,
}

impl MultiLayerTissue {

    pub fn new(layers: &[LayerInput], above: OpticalProperties, below: OpticalProperties) -> Result<Self, TissueError> {
        if layers.is_empty() { return Err(TissueError::NoLayers) }
        let mut regions = Vec::with_capacity(layers.len() + 2);
        regions.push(TissueRegion::layer(Slab::new(Length::NEG_INFINITY, 0.0), above));
        let mut top = 0.0;
        for (index, LayerInput { thickness, optical_properties }) in layers.iter().enumerate() {
            if !(thickness.is_finite() && *thickness >= 0.0) {
                return Err(TissueError::BadThickness { index, thickness: *thickness })
            }
            regions.push(TissueRegion::layer(Slab::new(top, top + thickness), *optical_properties));
            top += thickness;
        }
        regions.push(TissueRegion::layer(Slab::new(top, Length::INFINITY), below));
        let slabs = regions.iter()
            .filter_map(|r| match r.shape { RegionShape::Layer(slab) => Some(slab), _ => None })
            .collect();
        Ok(Self { regions, slabs })
    }

    /// Depth of the lower tissue surface
    pub fn bottom(&self) -> Length { self.slab(self.regions.len() - 1).start }

    /// Index of the ambient region below the tissue
    pub fn below_index(&self) -> RegionIndex { self.regions.len() - 1 }

    pub fn slab(&self, region: RegionIndex) -> Slab { self.slabs[region] }

    pub fn layer_index_at_z(&self, z: Length) -> RegionIndex {
        (0..self.regions.len())
            .find(|&r| self.slab(r).contains_z(z))
            .unwrap_or(self.below_index())
    }

    /// Is `region` one of the stacked layers (rather than an inclusion or
    /// something else layered upon the stack)?
    pub fn is_layer(&self, region: RegionIndex) -> bool { region < self.regions.len() }

    /// Is `region` a tissue layer, rather than an ambient medium?
    pub fn is_tissue_layer(&self, region: RegionIndex) -> bool {
        region > 0 && region < self.below_index()
    }

    /// The face of layer `region` towards which the photon is travelling.
    /// Layers of zero thickness are skipped.
    pub fn layer_boundary(&self, p: Point, direction: Vector, region: RegionIndex) -> Option<BoundaryHit> {
        let uz = direction.z;
        if uz == 0.0 { return None }
        let distance = self.slab(region).distance_to_face(p.z, uz);
        if !distance.is_finite() { return None }
        let has_thickness = |r: &RegionIndex| self.slab(*r).thickness() > 0.0;
        let neighbor = if uz > 0.0 {
            (region + 1..self.regions.len()).find(has_thickness).unwrap_or(self.below_index())
        } else {
            (0..region).rev().find(has_thickness).unwrap_or(0)
        };
        Some(BoundaryHit {
            distance: distance.max(0.0),
            neighbor,
            normal: Vector::new(0.0, 0.0, uz.signum()),
        })
    }
}

impl Tissue for MultiLayerTissue {

    fn regions(&self) -> &[TissueRegion] { &self.regions }

    fn region_index_at(&self, p: Point) -> RegionIndex { self.layer_index_at_z(p.z) }

    fn next_boundary(&self, p: Point, direction: Vector, region: RegionIndex) -> Option<BoundaryHit> {
        self.layer_boundary(p, direction, region)
    }

    fn domain_exit(&self, region: RegionIndex) -> Option<DomainExit> {
        if      region == 0                 { Some(DomainExit::Top) }
        else if region == self.below_index() { Some(DomainExit::Bottom) }
        else                                 { None }
    }

    fn is_cylindrically_symmetric(&self) -> bool { true }
}
