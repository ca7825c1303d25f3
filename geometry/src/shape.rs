//! Closed shapes which can be intersected with rays.
//!
//! Every shape answers the same questions about a ray, given by an `origin`
//! and a (normalized) `direction`:
//!
//! + `span`: the interval of ray parameters over which the *line* lies inside
//!   the shape, ignoring whether those parameters are before or after the
//!   origin.
//!
//! + `distance_to_exit` and `distance_to_entry`, derived from `span`, with
//!   the epsilon bias which prevents a ray that starts on a surface from
//!   hitting that same surface again.

mod slab;
mod cuboid;
mod ellipsoid;
mod cylinder;

pub use slab::Slab;
pub use cuboid::Cuboid;
pub use ellipsoid::Ellipsoid;
pub use cylinder::{InfiniteCylinder, VerticalCylinder};

use units::Length;
use crate::{Point, Vector, EPSILON};

/// Range of ray parameters for which the ray lies inside a shape. Either bound
/// may be infinite, for shapes which are unbounded along the ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    pub entry: Length,
    pub exit : Length,
}

impl Span {
    pub fn new(entry: Length, exit: Length) -> Self { Self { entry, exit } }
    pub fn everywhere() -> Self { Self::new(Length::NEG_INFINITY, Length::INFINITY) }
    pub fn length(&self) -> Length { self.exit - self.entry }
}

pub trait Shape {

    /// Where the line through `origin` along `direction` is inside the shape.
    fn span(&self, origin: Point, direction: Vector) -> Option<Span>;

    /// Strictly inside, surface excluded
    fn contains(&self, p: Point) -> bool;

    /// Within a small tolerance of the surface
    fn on_boundary(&self, p: Point) -> bool;

    /// Unit normal at (or near) a point on the surface, pointing away from the
    /// interior
    fn outward_normal(&self, p: Point) -> Vector;

    /// Distance to the surface for a ray which is known to be inside the
    /// shape. Infinite if the ray never leaves.
    fn distance_to_exit(&self, origin: Point, direction: Vector) -> Length {
        match self.span(origin, direction) {
            Some(span) => span.exit.max(0.0),
            None       => Length::INFINITY,
        }
    }

    /// Distance to the surface for a ray which is known to be outside the
    /// shape, or `None` if the ray misses it. Tangent rays are treated as
    /// misses; rays starting on the surface only count if they head inwards.
    fn distance_to_entry(&self, origin: Point, direction: Vector) -> Option<Length> {
        let span = self.span(origin, direction)?;
        if span.length() <= EPSILON { return None }
        if span.entry >  EPSILON { return Some(span.entry) }
        if span.entry > -EPSILON && span.exit > EPSILON { return Some(0.0) }
        None
    }
}

/// Roots of `a t² + b t + c = 0` in ascending order, if real.
pub(crate) fn quadratic_roots(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 { return None }
    // Numerically stable form: avoid cancellation between -b and the root
    let q = -0.5 * (b + b.signum() * discriminant.sqrt());
    let (t1, t2) = if q == 0.0 {
        let t = (-c / a).max(0.0).sqrt();
        (-t, t)
    } else {
        (q / a, c / q)
    };
    Some(if t1 <= t2 { (t1, t2) } else { (t2, t1) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rstest::rstest;

    #[rstest(/**/ a,    b,    c,   t1,   t2,
             case(1.0, -3.0,  2.0, 1.0,  2.0),
             case(1.0,  0.0, -4.0,-2.0,  2.0),
             case(2.0,  4.0,  2.0,-1.0, -1.0),
             case(1.0,  1.0, -0.0,-1.0,  0.0),
    )]
    fn roots_of_quadratic(a: f64, b: f64, c: f64, t1: f64, t2: f64) {
        let (r1, r2) = quadratic_roots(a, b, c).unwrap();
        assert_float_eq!((r1, r2), (t1, t2), abs <= (1e-12, 1e-12));
    }

    #[test]
    fn complex_roots_are_none() {
        assert!(quadratic_roots(1.0, 0.0, 1.0).is_none());
    }
}
