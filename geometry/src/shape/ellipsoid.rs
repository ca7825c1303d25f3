use serde::{Deserialize, Serialize};
use units::Length;
use crate::{Dot, Point, Shape, Span, Vector};
use super::quadratic_roots;

/// Axis-aligned ellipsoid
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ellipsoid {
    pub center: Point,
    /// Semi-axes along x, y and z
    pub dx: Length,
    pub dy: Length,
    pub dz: Length,
}

// Relative tolerance on the implicit function when deciding whether a point
// lies on the surface.
const SURFACE_TOLERANCE: f64 = 1e-9;

impl Ellipsoid {

    pub fn new(center: Point, dx: Length, dy: Length, dz: Length) -> Self {
        Self { center, dx, dy, dz }
    }

    pub fn sphere(center: Point, r: Length) -> Self { Self::new(center, r, r, r) }

    /// Map into the frame where the ellipsoid is the unit sphere
    fn scale(&self, v: Vector) -> Vector {
        Vector::new(v.x / self.dx, v.y / self.dy, v.z / self.dz)
    }

    /// `< 1` inside, `1` on the surface, `> 1` outside
    fn implicit(&self, p: Point) -> f64 {
        let q = self.scale(p - self.center);
        q.dot(q)
    }

    pub fn top   (&self) -> Length { self.center.z - self.dz }
    pub fn bottom(&self) -> Length { self.center.z + self.dz }
}

impl Shape for Ellipsoid {

    fn span(&self, origin: Point, direction: Vector) -> Option<Span> {
        let o = self.scale(origin - self.center);
        let d = self.scale(direction);
        let a = d.dot(d);
        let b = 2.0 * o.dot(d);
        let c = o.dot(o) - 1.0;
        let (t1, t2) = quadratic_roots(a, b, c)?;
        Some(Span::new(t1, t2))
    }

    fn contains(&self, p: Point) -> bool { self.implicit(p) < 1.0 - SURFACE_TOLERANCE }

    fn on_boundary(&self, p: Point) -> bool { (self.implicit(p) - 1.0).abs() <= SURFACE_TOLERANCE }

    fn outward_normal(&self, p: Point) -> Vector {
        let q = p - self.center;
        Vector::new(q.x / (self.dx * self.dx),
                    q.y / (self.dy * self.dy),
                    q.z / (self.dz * self.dz)).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn sphere() -> Ellipsoid { Ellipsoid::sphere(Point::new(0.0, 0.0, 5.0), 2.0) }

    #[rstest(/**/   x,    y,    z,    ux,   uy,   uz, expected,
             case( 0.0,  0.0,  0.0,  0.0,  0.0,  1.0, Some(3.0)), // straight down the axis
             case( 0.0,  0.0,  0.0,  0.0,  0.0, -1.0, None     ), // heading away
             case( 3.0,  0.0,  0.0,  0.0,  0.0,  1.0, None     ), // misses on the side
             case( 2.0,  0.0,  0.0,  0.0,  0.0,  1.0, None     ), // tangent
             case(-5.0,  0.0,  5.0,  1.0,  0.0,  0.0, Some(3.0)), // horizontally through centre
    )]
    fn sphere_entry(x: f64, y: f64, z: f64, ux: f64, uy: f64, uz: f64, expected: Option<f64>) {
        let d = sphere().distance_to_entry(Point::new(x, y, z), Vector::new(ux, uy, uz));
        match (d, expected) {
            (Some(d), Some(e)) => assert_float_eq!(d, e, abs <= 1e-12),
            (d, e) => assert_eq!(d, e),
        }
    }

    #[test]
    fn leaving_from_surface_does_not_reenter() {
        let s = sphere();
        let on_top = Point::new(0.0, 0.0, 3.0);
        assert!(s.on_boundary(on_top));
        assert_eq!(s.distance_to_entry(on_top, Vector::new(0.0, 0.0, -1.0)), None);
        assert_float_eq!(s.distance_to_exit(on_top, Vector::unit_z()), 4.0, abs <= 1e-12);
    }

    #[test]
    fn normal_of_ellipsoid() {
        let e = Ellipsoid::new(Point::zero(), 1.0, 2.0, 3.0);
        let n = e.outward_normal(Point::new(0.0, 2.0, 0.0));
        assert_float_eq!((n.x, n.y, n.z), (0.0, 1.0, 0.0), abs <= (1e-15, 1e-15, 1e-15));
    }

    proptest! {
        #[test]
        fn exit_point_lies_on_surface(
            x in -0.5..0.5_f64, y in -0.5..0.5_f64, z in 4.5..5.5_f64,
            theta in 0.0..std::f64::consts::PI, phi in 0.0..std::f64::consts::TAU,
        ) {
            let e = Ellipsoid::new(Point::new(0.0, 0.0, 5.0), 1.0, 2.0, 3.0);
            let p = Point::new(x, y, z);
            let d = Vector::from_angles(theta, phi);
            let s = e.distance_to_exit(p, d);
            prop_assert!(e.on_boundary(p + d * s));
        }
    }
}
