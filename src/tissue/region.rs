use serde::{Deserialize, Serialize};

use geometry::{Cuboid, Ellipsoid, InfiniteCylinder, Shape, Slab, Span, VerticalCylinder};
use crate::optics::OpticalProperties;
use crate::types::{Length, Point, Vector};

/// One layer of a layered tissue, as written in input files
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerInput {
    #[serde(deserialize_with = "crate::config::deserialize_length")]
    pub thickness: Length,
    pub optical_properties: OpticalProperties,
}

/// Shapes which can be embedded in a layer
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InclusionShape {
    Ellipsoid(Ellipsoid),
    Voxel(Cuboid),
    InfiniteCylinder(InfiniteCylinder),
}

impl InclusionShape {

    /// `(min, max)` of the z-coordinates covered by the shape
    pub fn z_extent(&self) -> (Length, Length) {
        match self {
            Self::Ellipsoid(e)        => (e.top(), e.bottom()),
            Self::Voxel(c)            => (c.z[0], c.z[1]),
            Self::InfiniteCylinder(c) => (c.center.z - c.radius, c.center.z + c.radius),
        }
    }

    /// Axis-aligned bounding box `[x, y, z]` ranges
    pub fn bounding_box(&self) -> [(Length, Length); 3] {
        let z = self.z_extent();
        match self {
            Self::Ellipsoid(e) => [(e.center.x - e.dx, e.center.x + e.dx),
                                   (e.center.y - e.dy, e.center.y + e.dy), z],
            Self::Voxel(c) => [(c.x[0], c.x[1]), (c.y[0], c.y[1]), z],
            Self::InfiniteCylinder(c) => [(c.center.x - c.radius, c.center.x + c.radius),
                                          (Length::NEG_INFINITY, Length::INFINITY), z],
        }
    }
}

/// Geometric predicate of a tissue region
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RegionShape {
    Layer(Slab),
    Inclusion(InclusionShape),
    /// Everything outside a vertical cylinder
    OutsideCylinder(VerticalCylinder),
}

impl Shape for InclusionShape {
    fn span(&self, origin: Point, direction: Vector) -> Option<Span> {
        match self {
            Self::Ellipsoid(s)        => s.span(origin, direction),
            Self::Voxel(s)            => s.span(origin, direction),
            Self::InfiniteCylinder(s) => s.span(origin, direction),
        }
    }

    fn contains(&self, p: Point) -> bool {
        match self {
            Self::Ellipsoid(s)        => s.contains(p),
            Self::Voxel(s)            => s.contains(p),
            Self::InfiniteCylinder(s) => s.contains(p),
        }
    }

    fn on_boundary(&self, p: Point) -> bool {
        match self {
            Self::Ellipsoid(s)        => s.on_boundary(p),
            Self::Voxel(s)            => s.on_boundary(p),
            Self::InfiniteCylinder(s) => s.on_boundary(p),
        }
    }

    fn outward_normal(&self, p: Point) -> Vector {
        match self {
            Self::Ellipsoid(s)        => s.outward_normal(p),
            Self::Voxel(s)            => s.outward_normal(p),
            Self::InfiniteCylinder(s) => s.outward_normal(p),
        }
    }
}

impl RegionShape {
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Self::Layer(slab)          => slab.contains_z(p.z),
            Self::Inclusion(shape)     => shape.contains(p),
            Self::OutsideCylinder(cyl) => !cyl.contains(p),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TissueRegion {
    pub shape: RegionShape,
    pub optical_properties: OpticalProperties,
}

impl TissueRegion {
    pub fn layer(slab: Slab, optical_properties: OpticalProperties) -> Self {
        Self { shape: RegionShape::Layer(slab), optical_properties }
    }

    pub fn is_air(&self) -> bool { self.optical_properties.is_air() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest(/**/ shape, expected,
        case(InclusionShape::Ellipsoid(Ellipsoid::new(Point::new(0.0, 0.0, 3.0), 1.0, 1.0, 0.5)), (2.5, 3.5)),
        case(InclusionShape::Voxel(Cuboid::new([-1.0, 1.0], [-1.0, 1.0], [0.2, 0.4])),            (0.2, 0.4)),
        case(InclusionShape::InfiniteCylinder(InfiniteCylinder::new(Point::new(0.0, 0.0, 1.0), 0.25)), (0.75, 1.25)),
    )]
    fn vertical_extent(shape: InclusionShape, expected: (f64, f64)) {
        assert_eq!(shape.z_extent(), expected);
    }

    #[test]
    fn layer_membership_is_half_open() {
        let region = TissueRegion::layer(Slab::new(0.0, 1.0), OpticalProperties::air());
        assert!( region.shape.contains(Point::new(5.0, 5.0, 0.0)));
        assert!(!region.shape.contains(Point::new(5.0, 5.0, 1.0)));
    }
}
