//! Optical properties of tissue regions, and the Fresnel equations governing
//! what happens at interfaces between them.

use serde::{Deserialize, Serialize};
use crate::types::{PerLength, Ratio};

/// Optical properties of a homogeneous region.
///
/// The scattering coefficient is stored in its *reduced* form `μs' = μs (1-g)`,
/// which is what tissue optics people usually quote.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpticalProperties {
    /// Absorption coefficient μa in mm⁻¹
    pub mua: PerLength,
    /// Reduced scattering coefficient μs' in mm⁻¹
    pub musp: PerLength,
    /// Scattering anisotropy: mean cosine of the scattering angle
    pub g: Ratio,
    /// Refractive index
    pub n: Ratio,
}

impl OpticalProperties {

    pub fn new(mua: PerLength, musp: PerLength, g: Ratio, n: Ratio) -> Self {
        Self { mua, musp, g, n }
    }

    /// Non-absorbing, non-scattering medium with refractive index 1
    pub fn air() -> Self { Self::new(0.0, 1e-10, 1.0, 1.0) }

    pub fn from_mus(mua: PerLength, mus: PerLength, g: Ratio, n: Ratio) -> Self {
        Self::new(mua, mus * (1.0 - g), g, n)
    }

    /// Scattering coefficient μs in mm⁻¹
    pub fn mus(&self) -> PerLength {
        if self.g == 1.0 { self.musp } else { self.musp / (1.0 - self.g) }
    }

    /// Total attenuation coefficient μt = μa + μs in mm⁻¹
    pub fn r#mut(&self) -> PerLength { self.mua + self.mus() }

    /// Single-scattering albedo μs / μt
    pub fn albedo(&self) -> Ratio {
        let mut_ = self.r#mut();
        if mut_ > 0.0 { self.mus() / mut_ } else { 0.0 }
    }

    /// Air-like regions neither absorb nor (noticeably) scatter
    pub fn is_air(&self) -> bool { self.mua == 0.0 && self.mus() <= 1e-10 }

    pub fn is_physical(&self) -> bool {
        [self.mua, self.musp, self.n].iter().all(|x| x.is_finite() && *x >= 0.0)
            && (-1.0..=1.0).contains(&self.g)
    }
}

impl std::fmt::Display for OpticalProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "μa={} μs'={} g={} n={}", self.mua, self.musp, self.g, self.n)
    }
}

// Cosines closer to 1 / 0 than these are treated as normal / grazing incidence
const COS_ZERO: f64 = 1.0 - 1e-12;
const COS_90  : f64 = 1e-6;

/// Fresnel reflection probability for unpolarized light travelling from index
/// `n1` into index `n2`, with `cos_i` the (non-negative) cosine of the angle of
/// incidence. Also returns the cosine of the transmission angle.
pub fn fresnel(n1: Ratio, n2: Ratio, cos_i: f64) -> (Ratio, f64) {
    let cos_i = cos_i.clamp(0.0, 1.0);
    if n1 == n2 { return (0.0, cos_i) }
    if cos_i > COS_ZERO {
        let r = (n2 - n1) / (n2 + n1);
        return (r * r, cos_i)
    }
    if cos_i < COS_90 { return (1.0, 0.0) }
    let sin_i = (1.0 - cos_i * cos_i).sqrt();
    let sin_t = n1 * sin_i / n2;
    if sin_t >= 1.0 { return (1.0, 0.0) }
    let cos_t = (1.0 - sin_t * sin_t).sqrt();
    // cosines and sines of the sum and difference of the two angles
    let cap = cos_i * cos_t - sin_i * sin_t;
    let cam = cos_i * cos_t + sin_i * sin_t;
    let sap = sin_i * cos_t + cos_i * sin_t;
    let sam = sin_i * cos_t - cos_i * sin_t;
    let r = 0.5 * sam * sam * (cam * cam + cap * cap) / (sap * sap * cam * cam);
    (r.clamp(0.0, 1.0), cos_t)
}

/// Cosine of the critical angle for total internal reflection going from `n1`
/// into `n2`; zero if there is none.
pub fn critical_cosine(n1: Ratio, n2: Ratio) -> f64 {
    if n1 > n2 { (1.0 - (n2 / n1).powi(2)).sqrt() } else { 0.0 }
}
