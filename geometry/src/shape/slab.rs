use serde::{Deserialize, Serialize};
use units::Length;
use crate::{Point, Shape, Span, Vector, EPSILON};

/// Infinite horizontal slab `start <= z <= stop`. Either bound may be infinite.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Slab {
    pub start: Length,
    pub stop : Length,
}

impl Slab {
    pub fn new(start: Length, stop: Length) -> Self { Self { start, stop } }

    pub fn thickness(&self) -> Length { self.stop - self.start }

    /// Half-open membership `start <= z < stop`, so that stacked slabs
    /// partition the z-axis without overlap.
    pub fn contains_z(&self, z: Length) -> bool { self.start <= z && z < self.stop }

    /// Distance along `direction` to whichever face the ray is heading for.
    pub fn distance_to_face(&self, z: Length, uz: f64) -> Length {
        if      uz > 0.0 { (self.stop  - z) / uz }
        else if uz < 0.0 { (self.start - z) / uz }
        else             { Length::INFINITY }
    }
}

impl Shape for Slab {

    fn span(&self, origin: Point, direction: Vector) -> Option<Span> {
        let uz = direction.z;
        if uz == 0.0 {
            return if self.start <= origin.z && origin.z <= self.stop { Some(Span::everywhere()) }
                   else                                               { None };
        }
        let a = (self.start - origin.z) / uz;
        let b = (self.stop  - origin.z) / uz;
        Some(Span::new(a.min(b), a.max(b)))
    }

    fn contains(&self, p: Point) -> bool { self.start < p.z && p.z < self.stop }

    fn on_boundary(&self, p: Point) -> bool {
        (p.z - self.start).abs() < EPSILON || (p.z - self.stop).abs() < EPSILON
    }

    fn outward_normal(&self, p: Point) -> Vector {
        if (p.z - self.start).abs() < (p.z - self.stop).abs() { Vector::new(0.0, 0.0, -1.0) }
        else                                                   { Vector::new(0.0, 0.0,  1.0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rstest::rstest;

    #[rstest(/**/   z,    uz,  expected,
             case(0.5,   1.0,  1.5),
             case(0.5,  -1.0,  0.5),
             case(0.5,   0.5,  3.0),
             case(0.0,  -1.0,  0.0),
    )]
    fn distance_to_face(z: f64, uz: f64, expected: f64) {
        let slab = Slab::new(0.0, 2.0);
        assert_float_eq!(slab.distance_to_face(z, uz), expected, ulps <= 1);
    }

    #[test]
    fn horizontal_ray_never_leaves() {
        let slab = Slab::new(0.0, 2.0);
        let d = slab.distance_to_exit(Point::new(0.0, 0.0, 1.0), Vector::new(1.0, 0.0, 0.0));
        assert!(d.is_infinite());
        assert_eq!(slab.distance_to_face(1.0, 0.0), f64::INFINITY);
    }

    #[test]
    fn semi_infinite_slab() {
        let air = Slab::new(f64::NEG_INFINITY, 0.0);
        assert!(air.contains_z(-1e6));
        assert!(!air.contains_z(0.0));
        assert_eq!(air.outward_normal(Point::new(0.0, 0.0, 0.0)), Vector::unit_z());
    }
}
