use rand::Rng;
use units::TWOPI;

use super::hg;

/// Reynolds-McCormick (Gegenbauer kernel) phase function. The extra shape
/// parameter `alpha` generalizes Henyey-Greenstein, which is the special case
/// `alpha = 1/2`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReynoldsMcCormick {
    pub g    : f64,
    pub alpha: f64,
}

impl ReynoldsMcCormick {

    pub fn new(g: f64, alpha: f64) -> Self { Self { g, alpha } }

    /// Same variate order as `HenyeyGreenstein::sample`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        let cos_theta = cos_theta(self.g, self.alpha, rng.gen());
        let phi = TWOPI * rng.gen::<f64>();
        (cos_theta, phi)
    }
}

/// Inverse CDF of the RM distribution of `cos θ`. Valid for `alpha > -1/2`,
/// `alpha != 0`.
pub fn cos_theta(g: f64, alpha: f64, u: f64) -> f64 {
    if alpha == 0.5 { return hg::cos_theta(g, u) }
    if g == 0.0 { return 2.0 * u - 1.0 }
    let lo = (1.0 + g).powf(-2.0 * alpha);
    let hi = (1.0 - g).powf(-2.0 * alpha);
    let t = (lo + u * (hi - lo)).powf(-1.0 / alpha);
    ((1.0 + g * g - t) / (2.0 * g)).clamp(-1.0, 1.0)
}
