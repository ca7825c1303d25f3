//! Units used throughout the photon transport code.
//!
//! The transport loop is far too hot to pay for `uom` `Quantity` arithmetic,
//! so the quantities it manipulates are plain `f64`s with fixed units:
//!
//! + lengths in `mm`
//!
//! + times in `ps`
//!
//! + attenuation coefficients in `mm⁻¹`
//!
//! `uom` is used at the edges, where humans write quantities with arbitrary
//! units (`"2 cm"`, `"0.1 ns"`) which must be converted into the fixed units
//! above.

pub mod plain;

pub use plain::{Angle, Length, PerLength, Ratio, Time, Weight};

pub use float_eq;
pub use uom;

use uom::si::f64::{Length as UomLength, Time as UomTime};

mod si {
  pub use uom::si::{length::{micrometer, millimeter, centimeter},
                    time  ::{picosecond, nanosecond}};
}

/// Speed of light in vacuum, in mm / ps
#[allow(clippy::excessive_precision)] // Stick to official definition of c
pub const C: Length = 0.299_792_458;

pub const TWOPI: Angle = std::f64::consts::TAU;

/// Generate a function called NAME which returns an `f64` in the fixed units
/// of QUANTITY, by interpreting its argument as UNIT
///
/// wrap!(NAME QUANTITY UNIT FIXED);
macro_rules! wrap {
  ($name:ident $quantity:ident $unit:ident $fixed:ident) => {
    pub fn $name(x: f64) -> f64 { $quantity::new::<si::$unit>(x).get::<si::$fixed>() }
  };
}

wrap!(um UomLength micrometer millimeter);
wrap!(cm UomLength centimeter millimeter);
wrap!(ns UomTime   nanosecond picosecond);

pub fn mm(x: f64) -> Length { x }
pub fn ps(x: f64) -> Time   { x }

/// Error produced when a string cannot be interpreted as a quantity
#[derive(Debug, Clone, PartialEq)]
pub struct ParseUnitError {
  pub input: String,
  pub reason: String,
}

impl std::fmt::Display for ParseUnitError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "cannot interpret `{}` as a quantity: {}", self.input, self.reason)
  }
}

impl std::error::Error for ParseUnitError {}

/// Parse a length such as `"3 mm"` or `"0.2 cm"`, returning it in mm. A bare
/// number is taken to be in mm already.
pub fn parse_length(s: &str) -> Result<Length, ParseUnitError> {
  parse_with(s, |s| s.parse::<UomLength>().map(|l| l.get::<si::millimeter>()))
}

/// Parse a time such as `"20 ps"` or `"1.5 ns"`, returning it in ps. A bare
/// number is taken to be in ps already.
pub fn parse_time(s: &str) -> Result<Time, ParseUnitError> {
  parse_with(s, |s| s.parse::<UomTime>().map(|t| t.get::<si::picosecond>()))
}

fn parse_with<E: std::fmt::Debug>(
  s: &str,
  parse_quantity: impl Fn(&str) -> Result<f64, E>,
) -> Result<f64, ParseUnitError> {
  let trimmed = s.trim();
  if let Ok(bare) = trimmed.parse::<f64>() { return Ok(bare) }
  parse_quantity(trimmed)
    .map_err(|e| ParseUnitError { input: s.to_string(), reason: format!("{e:?}") })
}

#[macro_export]
macro_rules! assert_mm_eq {
  ($lhs:expr, $rhs:expr, $algo:ident <= $tol:expr) => {
    $crate::float_eq::assert_float_eq!($lhs, $rhs, $algo <= $tol)
  };
}
