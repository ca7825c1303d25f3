use serde::{Deserialize, Serialize};
use units::Length;
use crate::{Point, Shape, Span, Vector, EPSILON};

/// Axis-aligned box (a single voxel), given by its extent along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cuboid {
    pub x: [Length; 2],
    pub y: [Length; 2],
    pub z: [Length; 2],
}

impl Cuboid {
    pub fn new(x: [Length; 2], y: [Length; 2], z: [Length; 2]) -> Self { Self { x, y, z } }

    fn bounds(&self) -> [[Length; 2]; 3] { [self.x, self.y, self.z] }
}

impl Shape for Cuboid {

    // Slab method: intersect the three parameter intervals
    fn span(&self, origin: Point, direction: Vector) -> Option<Span> {
        let mut span = Span::everywhere();
        for (axis, [lo, hi]) in self.bounds().into_iter().enumerate() {
            let (o, d) = (origin[axis], direction[axis]);
            if d == 0.0 {
                if o < lo || o > hi { return None }
                continue;
            }
            let a = (lo - o) / d;
            let b = (hi - o) / d;
            span.entry = span.entry.max(a.min(b));
            span.exit  = span.exit .min(a.max(b));
        }
        if span.entry > span.exit { None } else { Some(span) }
    }

    fn contains(&self, p: Point) -> bool {
        self.bounds().into_iter().enumerate()
            .all(|(axis, [lo, hi])| lo < p[axis] && p[axis] < hi)
    }

    fn on_boundary(&self, p: Point) -> bool {
        let within = |axis: usize, [lo, hi]: [Length; 2]| lo - EPSILON <= p[axis] && p[axis] <= hi + EPSILON;
        let bounds = self.bounds();
        let inside_closure = bounds.into_iter().enumerate().all(|(axis, b)| within(axis, b));
        let on_a_face = bounds.into_iter().enumerate()
            .any(|(axis, [lo, hi])| (p[axis] - lo).abs() < EPSILON || (p[axis] - hi).abs() < EPSILON);
        inside_closure && on_a_face
    }

    // The face closest to the point
    fn outward_normal(&self, p: Point) -> Vector {
        let mut best = (Length::INFINITY, Vector::unit_z());
        for (axis, [lo, hi]) in self.bounds().into_iter().enumerate() {
            for (face, sign) in [(lo, -1.0), (hi, 1.0)] {
                let gap = (p[axis] - face).abs();
                if gap < best.0 {
                    let mut n = [0.0; 3];
                    n[axis] = sign;
                    best = (gap, Vector::new(n[0], n[1], n[2]));
                }
            }
        }
        best.1
    }
}
