use rand::Rng;
use units::TWOPI;

/// Henyey-Greenstein phase function with anisotropy `g`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HenyeyGreenstein {
    pub g: f64,
}

impl HenyeyGreenstein {

    pub fn new(g: f64) -> Self { Self { g } }

    /// Draw `(cos θ, φ)`: first the polar, then the azimuthal variate.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        let cos_theta = cos_theta(self.g, rng.gen());
        let phi = TWOPI * rng.gen::<f64>();
        (cos_theta, phi)
    }
}

/// Inverse CDF of the HG distribution of `cos θ`, evaluated at `u ∈ [0,1)`
pub fn cos_theta(g: f64, u: f64) -> f64 {
    if g == 0.0 { return 2.0 * u - 1.0 }
    let temp = (1.0 - g * g) / (1.0 - g + 2.0 * g * u);
    ((1.0 + g * g - temp * temp) / (2.0 * g)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rand::SeedableRng;
    use rand_isaac::Isaac64Rng;
    use rstest::rstest;

    #[rstest(/**/  g,    u,   expected,
             case( 0.0,  0.0, -1.0),
             case( 0.0,  0.5,  0.0),
             case( 0.9,  0.0, -1.0),
             case( 0.9,  1.0,  1.0),
             case(-0.5,  1.0,  1.0),
    )]
    fn inverse_cdf_limits(g: f64, u: f64, expected: f64) {
        assert_float_eq!(cos_theta(g, u), expected, abs <= 1e-12);
    }

    #[rstest(/**/ g, case(0.0), case(0.5), case(0.9), case(-0.3))]
    fn mean_cosine_is_g(g: f64) {
        let mut rng = Isaac64Rng::seed_from_u64(123);
        let pf = HenyeyGreenstein::new(g);
        let n = 200_000;
        let mean = (0..n).map(|_| pf.sample(&mut rng).0).sum::<f64>() / n as f64;
        assert_float_eq!(mean, g, abs <= 0.01);
    }
}
