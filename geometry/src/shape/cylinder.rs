use serde::{Deserialize, Serialize};
use units::Length;
use crate::{Point, Shape, Span, Vector, EPSILON};
use super::quadratic_roots;

/// Circular cylinder of infinite length whose axis is parallel to the y-axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfiniteCylinder {
    /// Any point on the axis; its y component is irrelevant
    pub center: Point,
    pub radius: Length,
}

/// Circular cylinder of infinite length whose axis is parallel to the z-axis.
/// Used to bound the lateral extent of layered tissue.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerticalCylinder {
    /// Any point on the axis; its z component is irrelevant
    pub center: Point,
    pub radius: Length,
}

/// Both cylinders reduce to a circle in the plane perpendicular to the axis:
/// `(a, b)` are the two coordinates in that plane.
fn circle_span(
    (oa, ob): (f64, f64),
    (da, db): (f64, f64),
    radius: Length,
) -> Option<Span> {
    let a = da * da + db * db;
    let c = oa * oa + ob * ob - radius * radius;
    // Ray parallel to the axis: inside for ever, or never
    if a < EPSILON * EPSILON {
        return if c < 0.0 { Some(Span::everywhere()) } else { None };
    }
    let b = 2.0 * (oa * da + ob * db);
    let (t1, t2) = quadratic_roots(a, b, c)?;
    Some(Span::new(t1, t2))
}

fn circle_radius_sq((a, b): (f64, f64)) -> f64 { a * a + b * b }

impl InfiniteCylinder {
    pub fn new(center: Point, radius: Length) -> Self { Self { center, radius } }
    fn in_plane(&self, p: Point) -> (f64, f64) { (p.x - self.center.x, p.z - self.center.z) }
}

impl VerticalCylinder {
    pub fn new(center: Point, radius: Length) -> Self { Self { center, radius } }
    fn in_plane(&self, p: Point) -> (f64, f64) { (p.x - self.center.x, p.y - self.center.y) }
}

impl Shape for InfiniteCylinder {

    fn span(&self, origin: Point, direction: Vector) -> Option<Span> {
        circle_span(self.in_plane(origin), (direction.x, direction.z), self.radius)
    }

    fn contains(&self, p: Point) -> bool {
        circle_radius_sq(self.in_plane(p)) < self.radius * self.radius * (1.0 - 1e-9)
    }

    fn on_boundary(&self, p: Point) -> bool {
        (circle_radius_sq(self.in_plane(p)).sqrt() - self.radius).abs() < 1e-9 * self.radius.max(1.0)
    }

    fn outward_normal(&self, p: Point) -> Vector {
        let (a, b) = self.in_plane(p);
        Vector::new(a, 0.0, b).normalize()
    }
}

impl Shape for VerticalCylinder {

    fn span(&self, origin: Point, direction: Vector) -> Option<Span> {
        circle_span(self.in_plane(origin), (direction.x, direction.y), self.radius)
    }

    fn contains(&self, p: Point) -> bool {
        circle_radius_sq(self.in_plane(p)) < self.radius * self.radius * (1.0 - 1e-9)
    }

    fn on_boundary(&self, p: Point) -> bool {
        (circle_radius_sq(self.in_plane(p)).sqrt() - self.radius).abs() < 1e-9 * self.radius.max(1.0)
    }

    fn outward_normal(&self, p: Point) -> Vector {
        let (a, b) = self.in_plane(p);
        Vector::new(a, b, 0.0).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rstest::rstest;

    #[rstest(/**/   x1,   z1,   ux,   uz,  r, expected,
             case(-10.0,  0.0,  1.0,  0.0, 4.0, Some(6.0)), // along horizontal diameter
             case(  0.0,-10.0,  0.0,  1.0, 3.0, Some(7.0)), // along vertical diameter
             case( 10.0,-10.0,  0.0,  1.0, 1.0, None     ), // miss completely on right
             case(  4.0,-10.0,  0.0,  1.0, 4.0, None     ), // tangent
    )]
    fn infinite_cylinder_entry(x1: f64, z1: f64, ux: f64, uz: f64, r: f64, expected: Option<f64>) {
        let c = InfiniteCylinder::new(Point::zero(), r);
        let d = c.distance_to_entry(Point::new(x1, 123.0, z1), Vector::new(ux, 0.0, uz));
        match (d, expected) {
            (Some(d), Some(e)) => assert_float_eq!(d, e, abs <= 1e-12),
            (d, e) => assert_eq!(d, e),
        }
    }

    #[test]
    fn ray_along_axis_stays_inside() {
        let c = InfiniteCylinder::new(Point::zero(), 1.0);
        let d = c.distance_to_exit(Point::new(0.5, 0.0, 0.0), Vector::new(0.0, 1.0, 0.0));
        assert!(d.is_infinite());
        assert_eq!(c.distance_to_entry(Point::new(5.0, 0.0, 0.0), Vector::new(0.0, 1.0, 0.0)), None);
    }

    #[test]
    fn at_45_degrees_to_axis() {
        // Chord through the axis is the diameter, stretched by the obliquity
        let c = VerticalCylinder::new(Point::zero(), 2.0);
        let d = Vector::new(1.0, 0.0, 1.0).normalize();
        let exit = c.distance_to_exit(Point::zero(), d);
        assert_float_eq!(exit, 2.0 * 2.0_f64.sqrt(), rmax <= 1e-12);
        let n = c.outward_normal(Point::zero() + d * exit);
        assert_float_eq!((n.x, n.y, n.z), (1.0, 0.0, 0.0), abs <= (1e-12, 1e-12, 1e-12));
    }
}
