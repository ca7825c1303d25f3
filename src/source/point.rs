use rand::Rng;
use serde::{Deserialize, Serialize};
use units::TWOPI;

use crate::rng::McRng;
use crate::types::{Angle, Point, RegionIndex, Vector};
use super::{default_region, Emission, Source};

/// Pencil beam from a single point
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectionalPoint {
    pub position: Point,
    pub direction: Vector,
    #[serde(default = "default_region")]
    pub initial_region: RegionIndex,
}

impl DirectionalPoint {
    /// Normally incident at the origin, from the ambient medium above
    pub fn normal() -> Self {
        Self { position: Point::zero(), direction: Vector::unit_z(), initial_region: 0 }
    }

    /// Incident at the origin, `theta` away from the normal in the x-z plane
    pub fn angled(theta: Angle) -> Self {
        Self { direction: Vector::from_angles(theta, 0.0), ..Self::normal() }
    }
}

impl Source for DirectionalPoint {
    fn emit(&self, _rng: &mut McRng) -> Emission {
        Emission { position: self.position, direction: self.direction.normalize(), region: self.initial_region }
    }

    fn is_cylindrically_symmetric(&self) -> bool {
        self.position.rho() == 0.0 && self.direction.x == 0.0 && self.direction.y == 0.0
    }

    fn initial_region(&self) -> RegionIndex { self.initial_region }
}

/// Emits uniformly into all directions
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsotropicPoint {
    pub position: Point,
    #[serde(default = "default_region")]
    pub initial_region: RegionIndex,
}

impl Source for IsotropicPoint {
    fn emit(&self, rng: &mut McRng) -> Emission {
        let direction = uniform_direction(rng, (-1.0, 1.0), (0.0, TWOPI));
        Emission { position: self.position, direction, region: self.initial_region }
    }

    fn is_cylindrically_symmetric(&self) -> bool { self.position.rho() == 0.0 }

    fn initial_region(&self) -> RegionIndex { self.initial_region }
}

/// Emits uniformly over a patch of solid angle, bounded by polar angles
/// (measured from +z) and azimuthal angles, in radians
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomPoint {
    pub position: Point,
    pub polar: (Angle, Angle),
    pub azimuthal: (Angle, Angle),
    #[serde(default = "default_region")]
    pub initial_region: RegionIndex,
}

impl Source for CustomPoint {
    fn emit(&self, rng: &mut McRng) -> Emission {
        let (theta_min, theta_max) = self.polar;
        let direction = uniform_direction(rng, (theta_max.cos(), theta_min.cos()), self.azimuthal);
        Emission { position: self.position, direction, region: self.initial_region }
    }

    fn is_cylindrically_symmetric(&self) -> bool {
        let (lo, hi) = self.azimuthal;
        self.position.rho() == 0.0 && (hi - lo - TWOPI).abs() < 1e-12
    }

    fn initial_region(&self) -> RegionIndex { self.initial_region }
}

/// Uniform over solid angle: `cos θ` uniform in `cos_range`, `φ` in `phi_range`
fn uniform_direction(rng: &mut McRng, (cos_lo, cos_hi): (f64, f64), (phi_lo, phi_hi): (Angle, Angle)) -> Vector {
    let cos_theta = cos_lo + (cos_hi - cos_lo) * rng.gen::<f64>();
    let phi       = phi_lo + (phi_hi - phi_lo) * rng.gen::<f64>();
    Vector::from_angles(cos_theta.clamp(-1.0, 1.0).acos(), phi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngType;
    use float_eq::assert_float_eq;

    #[test]
    fn angled_source_direction() {
        let s = DirectionalPoint::angled(std::f64::consts::FRAC_PI_4);
        let e = s.emit(&mut McRng::seed_from_u64(RngType::Std, 1));
        assert_float_eq!((e.direction.x, e.direction.z), (0.5_f64.sqrt(), 0.5_f64.sqrt()), abs <= (1e-15, 1e-15));
        assert!(!s.is_cylindrically_symmetric());
        assert!(DirectionalPoint::normal().is_cylindrically_symmetric());
    }

    #[test]
    fn isotropic_directions_average_to_zero() {
        let s = IsotropicPoint { position: Point::new(0.0, 0.0, 1.0), initial_region: 1 };
        let mut rng = McRng::seed_from_u64(RngType::Isaac64, 5);
        let n = 100_000;
        let sum = (0..n).map(|_| s.emit(&mut rng).direction).fold(Vector::zero(), |a, b| a + b);
        assert_float_eq!((sum.x / n as f64, sum.y / n as f64, sum.z / n as f64), (0.0, 0.0, 0.0),
                         abs <= (0.01, 0.01, 0.01));
    }

    #[test]
    fn custom_point_stays_within_cone() {
        let s = CustomPoint {
            position: Point::zero(),
            polar: (0.0, 0.3),
            azimuthal: (0.0, TWOPI),
            initial_region: 0,
        };
        let mut rng = McRng::seed_from_u64(RngType::Isaac64, 9);
        for _ in 0..1000 {
            let d = s.emit(&mut rng).direction;
            assert!(d.z >= 0.3_f64.cos() - 1e-12);
        }
        assert!(s.is_cylindrically_symmetric());
    }
}
