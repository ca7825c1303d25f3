mod point;
mod vector;

pub use point::Point;
pub use vector::{Vector, Dot};

pub mod shape;

pub use shape::{Shape, Span, Slab, Cuboid, Ellipsoid, InfiniteCylinder, VerticalCylinder};

/// Distances (in mm) smaller than this are treated as zero when deciding
/// whether a ray starting on a surface actually meets that surface again.
pub const EPSILON: units::Length = 1e-9;
