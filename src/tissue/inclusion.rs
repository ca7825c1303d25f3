use serde::{Deserialize, Serialize};

use geometry::Shape;
use crate::optics::OpticalProperties;
use crate::types::{Point, RegionIndex, Vector};
use super::{BoundaryHit, DomainExit, InclusionShape, MultiLayerTissue, RegionShape, Tissue, TissueError, TissueRegion};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InclusionInput {
    pub shape: InclusionShape,
    pub optical_properties: OpticalProperties,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Inclusion {
    shape: InclusionShape,
    /// The layer which surrounds the inclusion
    host: RegionIndex,
}

/// Layered tissue with any number of non-overlapping inclusions (ellipsoids,
/// voxels, infinite cylinders), each wholly contained in one tissue layer.
#[derive(Clone, Debug, PartialEq)]
pub struct InclusionTissue {
    layers: MultiLayerTissue,
    inclusions: Vec<Inclusion>,
    regions: Vec<TissueRegion>,
}

impl InclusionTissue {

    pub fn new(layers: MultiLayerTissue, inputs: &[InclusionInput]) -> Result<Self, TissueError> {
        let inclusions = inputs.iter().enumerate()
            .map(|(index, input)| {
                let host = host_layer(&layers, &input.shape).ok_or(TissueError::InclusionOutsideLayer { index })?;
                Ok(Inclusion { shape: input.shape, host })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some((a, b)) = first_overlap(inputs.iter().map(|i| &i.shape)) {
            return Err(TissueError::OverlappingInclusions(a, b))
        }
        let regions = layers.regions().iter().copied()
            .chain(inputs.iter().map(|i| TissueRegion {
                shape: RegionShape::Inclusion(i.shape),
                optical_properties: i.optical_properties,
            }))
            .collect();
        Ok(Self { layers, inclusions, regions })
    }

    fn first_inclusion_region(&self) -> RegionIndex { self.layers.regions().len() }

    fn inclusion(&self, region: RegionIndex) -> Option<&Inclusion> {
        region.checked_sub(self.first_inclusion_region()).and_then(|k| self.inclusions.get(k))
    }
}

/// The tissue layer which wholly contains `shape`, if any
pub(super) fn host_layer(layers: &MultiLayerTissue, shape: &InclusionShape) -> Option<RegionIndex> {
    let (top, bottom) = shape.z_extent();
    let host = layers.layer_index_at_z(0.5 * (top + bottom));
    let slab = layers.slab(host);
    (layers.is_tissue_layer(host) && slab.start <= top && bottom <= slab.stop).then_some(host)
}

/// First pair of shapes whose bounding boxes overlap
fn first_overlap<'s>(shapes: impl Iterator<Item = &'s InclusionShape> + Clone) -> Option<(usize, usize)> {
    let boxes: Vec<_> = shapes.map(InclusionShape::bounding_box).collect();
    let overlap = |a: &[(f64, f64); 3], b: &[(f64, f64); 3]| {
        a.iter().zip(b).all(|(p, q)| p.0 < q.1 && q.0 < p.1)
    };
    (0..boxes.len())
        .flat_map(|i| (i + 1..boxes.len()).map(move |j| (i, j)))
        .find(|&(i, j)| overlap(&boxes[i], &boxes[j]))
}

impl Tissue for InclusionTissue {

    fn regions(&self) -> &[TissueRegion] { &self.regions }

    fn region_index_at(&self, p: Point) -> RegionIndex {
        self.inclusions.iter()
            .position(|inclusion| inclusion.shape.contains(p))
            .map_or_else(|| self.layers.region_index_at(p), |k| self.first_inclusion_region() + k)
    }

    fn next_boundary(&self, p: Point, direction: Vector, region: RegionIndex) -> Option<BoundaryHit> {
        if let Some(inclusion) = self.inclusion(region) {
            let distance = inclusion.shape.distance_to_exit(p, direction);
            if !distance.is_finite() { return None }
            let normal = inclusion.shape.outward_normal(p + direction * distance);
            return Some(BoundaryHit { distance, neighbor: inclusion.host, normal })
        }
        let mut nearest = self.layers.layer_boundary(p, direction, region);
        for (k, inclusion) in self.inclusions.iter().enumerate().filter(|(_, i)| i.host == region) {
            let Some(distance) = inclusion.shape.distance_to_entry(p, direction) else { continue };
            if nearest.map_or(true, |hit| distance < hit.distance) {
                let normal = -inclusion.shape.outward_normal(p + direction * distance);
                nearest = Some(BoundaryHit { distance, neighbor: self.first_inclusion_region() + k, normal });
            }
        }
        nearest
    }

    fn domain_exit(&self, region: RegionIndex) -> Option<DomainExit> {
        if self.inclusion(region).is_some() { None } else { self.layers.domain_exit(region) }
    }

    fn is_cylindrically_symmetric(&self) -> bool {
        self.inclusions.iter().all(|i| match i.shape {
            InclusionShape::Ellipsoid(e) => e.center.x == 0.0 && e.center.y == 0.0 && e.dx == e.dy,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::LayerInput;
    use float_eq::assert_float_eq;
    use geometry::{Cuboid, Ellipsoid, InfiniteCylinder};
    use rstest::rstest;

    fn op(mua: f64) -> OpticalProperties { OpticalProperties::new(mua, 1.0, 0.8, 1.4) }

    fn layers() -> MultiLayerTissue {
        let layers = [
            LayerInput { thickness: 1.0, optical_properties: op(0.1) },
            LayerInput { thickness: 9.0, optical_properties: op(0.2) },
        ];
        MultiLayerTissue::new(&layers, OpticalProperties::air(), OpticalProperties::air()).unwrap()
    }

    fn inclusion(shape: InclusionShape) -> InclusionInput { InclusionInput { shape, optical_properties: op(1.0) } }

    fn sphere(x: f64, z: f64, r: f64) -> InclusionShape {
        InclusionShape::Ellipsoid(Ellipsoid::sphere(Point::new(x, 0.0, z), r))
    }

    fn tissue() -> InclusionTissue {
        InclusionTissue::new(layers(), &[inclusion(sphere(0.0, 5.0, 1.0)),
                                         inclusion(InclusionShape::Voxel(Cuboid::new([2.0, 3.0], [-1.0, 1.0], [2.0, 3.0])))])
            .unwrap()
    }

    #[test]
    fn enters_and_leaves_sphere() {
        let t = tissue();
        let down = Vector::unit_z();
        let hit = t.next_boundary(Point::new(0.0, 0.0, 2.0), down, 2).unwrap();
        assert_float_eq!(hit.distance, 2.0, abs <= 1e-12);
        assert_eq!(hit.neighbor, 4);
        assert_float_eq!(hit.normal.z, 1.0, abs <= 1e-12);
        // Now inside, starting on its surface
        let hit = t.next_boundary(Point::new(0.0, 0.0, 4.0), down, 4).unwrap();
        assert_float_eq!(hit.distance, 2.0, abs <= 1e-12);
        assert_eq!(hit.neighbor, 2);
        // Back in the layer, on the sphere's surface: the layer face is next
        let hit = t.next_boundary(Point::new(0.0, 0.0, 6.0), down, 2).unwrap();
        assert_float_eq!(hit.distance, 4.0, abs <= 1e-12);
        assert_eq!(hit.neighbor, 3);
    }

    #[test]
    fn voxel_normal_points_into_voxel() {
        let t = tissue();
        let hit = t.next_boundary(Point::new(0.0, 0.0, 2.5), Vector::new(1.0, 0.0, 0.0), 2).unwrap();
        assert_float_eq!(hit.distance, 1.0, abs <= 1e-12);
        assert_eq!(hit.neighbor, 5);
        assert_float_eq!(hit.normal.x, 1.0, abs <= 1e-12);
    }

    #[rstest(/**/    x,   y,   z, expected,
             case( 0.0, 0.0, 5.0, 4),
             case( 2.5, 0.0, 2.5, 5),
             case( 0.0, 0.0, 0.5, 1),
             case( 0.0, 0.0, 8.0, 2),
             case( 0.0, 0.0,-1.0, 0),
    )]
    fn region_lookup(x: f64, y: f64, z: f64, expected: RegionIndex) {
        assert_eq!(tissue().region_index_at(Point::new(x, y, z)), expected);
    }

    #[rstest(/**/ shapes, expected,
        case(vec![sphere(0.0, 1.0, 0.5)],                        TissueError::InclusionOutsideLayer { index: 0 }),
        case(vec![sphere(0.0, 5.0, 0.5), sphere(0.0, 9.9, 0.5)], TissueError::InclusionOutsideLayer { index: 1 }),
        case(vec![sphere(0.0, 5.0, 1.0), sphere(1.5, 5.0, 1.0)], TissueError::OverlappingInclusions(0, 1)),
    )]
    fn invalid_placement(shapes: Vec<InclusionShape>, expected: TissueError) {
        let inputs: Vec<_> = shapes.into_iter().map(inclusion).collect();
        assert_eq!(InclusionTissue::new(layers(), &inputs), Err(expected));
    }

    #[test]
    fn infinite_cylinder_along_its_axis_never_exits() {
        let cyl = InclusionShape::InfiniteCylinder(InfiniteCylinder::new(Point::new(0.0, 0.0, 5.0), 1.0));
        let t = InclusionTissue::new(layers(), &[inclusion(cyl)]).unwrap();
        assert!(t.next_boundary(Point::new(0.0, 0.0, 5.0), Vector::new(0.0, 1.0, 0.0), 4).is_none());
        assert!(!t.is_cylindrically_symmetric());
    }
}
