/// Units which are simply type aliases for `f64` rather than having an
/// implementation as a `uom` `Quantity`.
///
/// These are the quantities pushed around in the photon transport loop, where
/// every nanosecond counts. The aliases carry no checking, but still give
/// clues in the source as to what a number represents, and in which fixed
/// unit.

pub type Length    = f64; // mm
pub type Time      = f64; // ps
pub type PerLength = f64; // mm⁻¹
pub type Weight    = f64;
pub type Ratio     = f64;
pub type Angle     = f64; // radian
