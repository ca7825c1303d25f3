//! Tabulated phase functions: an empirical CDF of the polar scattering angle
//! (and optionally of the azimuth), inverted by linear interpolation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use units::TWOPI;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupTableInput {
    /// Polar angles in radians, ascending, within `[0, π]`
    pub theta: Vec<f64>,
    /// CDF of the polar angle at each `theta`: from 0 to 1, non-decreasing
    pub cdf: Vec<f64>,
    /// Uniform azimuth if absent
    #[serde(default)]
    pub azimuthal: Option<AzimuthalTable>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AzimuthalTable {
    /// Azimuthal angles in radians, ascending, within `[0, 2π]`
    pub phi: Vec<f64>,
    pub cdf: Vec<f64>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("{name} table needs at least two entries, got {len}")]
    TooShort { name: &'static str, len: usize },
    #[error("{name} table has {angles} angles but {cdf} CDF values")]
    LengthMismatch { name: &'static str, angles: usize, cdf: usize },
    #[error("{name} angles must be ascending and within [0, {max}]")]
    BadAngles { name: &'static str, max: f64 },
    #[error("{name} CDF must rise monotonically from 0 to 1")]
    BadCdf { name: &'static str },
}

/// One validated `(angle, cdf)` table
#[derive(Clone, Debug, PartialEq)]
struct Table {
    angle: Vec<f64>,
    cdf  : Vec<f64>,
}

impl Table {

    fn new(name: &'static str, angle: &[f64], cdf: &[f64], max: f64) -> Result<Self, TableError> {
        if angle.len() != cdf.len() {
            return Err(TableError::LengthMismatch { name, angles: angle.len(), cdf: cdf.len() })
        }
        if angle.len() < 2 { return Err(TableError::TooShort { name, len: angle.len() }) }
        let ascending = |v: &[f64]| v.windows(2).all(|w| w[0] <= w[1]);
        let angles_ok = angle.iter().all(|a| (0.0..=max).contains(a))
            && ascending(angle)
            && angle.first() < angle.last();
        if !angles_ok { return Err(TableError::BadAngles { name, max }) }
        let ends = (cdf[0], cdf[cdf.len() - 1]);
        let cdf_ok = ascending(cdf)
            && ends.0.abs() < 1e-9
            && (ends.1 - 1.0).abs() < 1e-9;
        if !cdf_ok { return Err(TableError::BadCdf { name }) }
        Ok(Self { angle: angle.to_vec(), cdf: cdf.to_vec() })
    }

    /// Angle at which the CDF reaches `u`
    fn invert(&self, u: f64) -> f64 {
        let n = self.cdf.len();
        // First index whose CDF exceeds u, so that cdf[i-1] <= u < cdf[i]
        let i = self.cdf.partition_point(|&c| c <= u).clamp(1, n - 1);
        let (c0, c1) = (self.cdf[i - 1], self.cdf[i]);
        let (a0, a1) = (self.angle[i - 1], self.angle[i]);
        if c1 == c0 { return a0 }
        a0 + (u - c0) / (c1 - c0) * (a1 - a0)
    }

    /// The CDF itself, interpolated linearly between tabulated points
    fn cdf_at(&self, angle: f64) -> f64 {
        let n = self.angle.len();
        if angle <= self.angle[0]     { return 0.0 }
        if angle >= self.angle[n - 1] { return 1.0 }
        let i = self.angle.partition_point(|&a| a <= angle).clamp(1, n - 1);
        let (a0, a1) = (self.angle[i - 1], self.angle[i]);
        self.cdf[i - 1] + (angle - a0) / (a1 - a0) * (self.cdf[i] - self.cdf[i - 1])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LookupTable {
    polar    : Table,
    azimuthal: Option<Table>,
}

impl LookupTable {

    pub fn new(input: &LookupTableInput) -> Result<Self, TableError> {
        let polar = Table::new("polar", &input.theta, &input.cdf, std::f64::consts::PI)?;
        let azimuthal = input.azimuthal.as_ref()
            .map(|t| Table::new("azimuthal", &t.phi, &t.cdf, TWOPI))
            .transpose()?;
        Ok(Self { polar, azimuthal })
    }

    /// Build a polar table from an (unnormalized) PDF over `theta`, integrated
    /// with the trapezium rule.
    pub fn input_from_pdf(theta: Vec<f64>, pdf: &[f64]) -> LookupTableInput {
        let mut cdf = Vec::with_capacity(theta.len());
        let mut total = 0.0;
        cdf.push(0.0);
        for i in 1..theta.len().min(pdf.len()) {
            total += 0.5 * (pdf[i] + pdf[i - 1]) * (theta[i] - theta[i - 1]);
            cdf.push(total);
        }
        if total > 0.0 { cdf.iter_mut().for_each(|c| *c /= total) }
        LookupTableInput { theta, cdf, azimuthal: None }
    }

    /// Draw `(cos θ, φ)`, polar first
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        let theta = self.polar.invert(rng.gen());
        let phi = match &self.azimuthal {
            Some(table) => table.invert(rng.gen()),
            None        => TWOPI * rng.gen::<f64>(),
        };
        // A malformed table must never yield an impossible cosine
        (theta.cos().clamp(-1.0, 1.0), phi)
    }

    /// CDF of the polar angle
    pub fn polar_cdf(&self, theta: f64) -> f64 { self.polar.cdf_at(theta) }
}
