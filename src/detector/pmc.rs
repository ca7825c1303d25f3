//! Perturbation Monte Carlo: reflectance of a tissue whose optical properties
//! differ from those of the simulated one, estimated by reweighting the
//! simulated histories.
//!
//! A history which spent path length `L` and made `c` collisions in a region
//! with scattering and attenuation coefficients `μs`, `μt` is `(μs'/μs)^c
//! exp(-(μt' - μt) L)` times as likely, weight included, in the perturbed
//! region. The same factor holds for discrete and continuous absorption
//! weighting.

use crate::optics::OpticalProperties;
use crate::photon::CollisionInfo;
use crate::types::RegionIndex;
use crate::virtual_boundary::VirtualBoundaryType;
use super::{Binning, Coordinate, Detector, DetectorContext, DetectorError, TallyData, TallyEvent, MAX_AXES};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PmcQuantity {
    Reflectance,
    /// Derivative of reflectance with respect to the perturbed μa
    DerivativeMua,
    /// Derivative of reflectance with respect to the perturbed μs
    DerivativeMus,
}

/// Ratio of the probabilities of a history in the perturbed and reference
/// tissues, over the regions in `perturbed_regions`
pub fn perturbation_factor(
    reference: &[OpticalProperties],
    perturbed: &[OpticalProperties],
    perturbed_regions: &[RegionIndex],
    collision_info: &CollisionInfo,
) -> f64 {
    perturbed_regions.iter()
        .map(|&r| {
            let (op, op_p, info) = (&reference[r], &perturbed[r], &collision_info[r]);
            let scattering = if info.collisions == 0 { 1.0 }
                             else { (op_p.mus() / op.mus()).powf(info.collisions as f64) };
            scattering * (-(op_p.r#mut() - op.r#mut()) * info.path_length).exp()
        })
        .product()
}

#[derive(Clone, Debug)]
pub struct PmcDetector {
    name: String,
    type_name: &'static str,
    quantity: PmcQuantity,
    coordinates: Vec<Coordinate>,
    reference: Vec<OpticalProperties>,
    perturbed: Vec<OpticalProperties>,
    perturbed_regions: Vec<RegionIndex>,
    data: TallyData,
}

impl PmcDetector {

    /// `perturbed` holds the perturbed optical properties of every region;
    /// only those of `perturbed_regions` are used.
    pub fn new(
        name: String,
        type_name: &'static str,
        quantity: PmcQuantity,
        binning: Binning,
        perturbed: &[OpticalProperties],
        perturbed_regions: &[RegionIndex],
        ctx: &DetectorContext,
    ) -> Result<Self, DetectorError> {
        let n = ctx.number_of_regions();
        if perturbed.len() != n {
            return Err(DetectorError::BadPerturbation(
                format!("{} perturbed optical properties given for {n} regions", perturbed.len())))
        }
        if let Some(r) = perturbed_regions.iter().find(|&&r| r >= n || !ctx.in_domain[r]) {
            return Err(DetectorError::BadPerturbation(format!("region {r} is not a tissue region")))
        }
        Ok(Self {
            name, type_name, quantity,
            coordinates: binning.axes().iter().map(|a| a.coordinate).collect(),
            reference: ctx.optical_properties.clone(),
            perturbed: perturbed.to_vec(),
            perturbed_regions: perturbed_regions.to_vec(),
            data: TallyData::new(binning),
        })
    }

    fn derivative_term(&self, collision_info: &CollisionInfo) -> f64 {
        self.perturbed_regions.iter()
            .map(|&r| {
                let info = &collision_info[r];
                match self.quantity {
                    PmcQuantity::Reflectance   => 0.0,
                    PmcQuantity::DerivativeMua => -info.path_length,
                    PmcQuantity::DerivativeMus => info.collisions as f64 / self.perturbed[r].mus() - info.path_length,
                }
            })
            .sum()
    }
}

impl Detector for PmcDetector {
    fn name(&self) -> &str { &self.name }

    fn type_name(&self) -> &'static str { self.type_name }

    fn virtual_boundary(&self) -> VirtualBoundaryType { VirtualBoundaryType::PmcDiffuseReflectance }

    fn tally(&mut self, event: &TallyEvent) {
        let TallyEvent { dp, collision_info, .. } = event;
        let factor = perturbation_factor(&self.reference, &self.perturbed, &self.perturbed_regions, collision_info);
        let weight = match self.quantity {
            PmcQuantity::Reflectance => dp.weight * factor,
            _                        => dp.weight * factor * self.derivative_term(collision_info),
        };
        let mut values = [0.0; MAX_AXES];
        for (v, c) in values.iter_mut().zip(&self.coordinates) {
            *v = c.of(dp).unwrap_or(f64::NAN);
        }
        self.data.tally(&values[..self.coordinates.len()], weight);
    }

    fn tally_data(&self) -> &TallyData { &self.data }

    fn tally_data_mut(&mut self) -> &mut TallyData { &mut self.data }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::absorption::AbsorptionWeightingType;
    use crate::photon::{PhotonDataPoint, PhotonHistory, PhotonStatus};
    use crate::types::{Point, Range, Vector};
    use float_eq::assert_float_eq;
    use proptest::prelude::*;

    fn ctx() -> DetectorContext {
        DetectorContext {
            optical_properties: vec![OpticalProperties::air(),
                                     OpticalProperties::from_mus(0.01, 10.0, 0.8, 1.4),
                                     OpticalProperties::air()],
            in_domain: vec![false, true, false],
            absorption_weighting: AbsorptionWeightingType::Discrete,
        }
    }

    fn collision_info(path_length: f64, collisions: u64) -> CollisionInfo {
        let mut ci = CollisionInfo::new(3);
        ci.add_path(1, path_length);
        (0..collisions).for_each(|_| ci.add_collision(1));
        ci
    }

    proptest! {
        #[test]
        fn unperturbed_factor_is_exactly_one(path_length in 0.0..100.0, collisions in 0..1000_u64) {
            let ops = ctx().optical_properties;
            let f = perturbation_factor(&ops, &ops, &[1], &collision_info(path_length, collisions));
            prop_assert_eq!(f, 1.0);
        }
    }

    #[test]
    fn absorption_perturbation_attenuates_by_path_length() {
        let reference = ctx().optical_properties;
        let mut perturbed = reference.clone();
        perturbed[1].mua = 0.11;
        let f = perturbation_factor(&reference, &perturbed, &[1], &collision_info(2.0, 7));
        assert_float_eq!(f, (-0.2_f64).exp(), rmax <= 1e-12);
    }

    #[test]
    fn collision_counts_beyond_i32_are_not_truncated() {
        let reference = ctx().optical_properties;
        let mut perturbed = reference.clone();
        // Half the scattering, same total attenuation
        perturbed[1].musp /= 2.0;
        perturbed[1].mua += reference[1].mus() / 2.0;
        assert_float_eq!(perturbed[1].r#mut(), reference[1].r#mut(), rmax <= 1e-12);
        let mut ci = CollisionInfo::new(3);
        ci.0[1].collisions = i32::MAX as u64 + 1;
        let f = perturbation_factor(&reference, &perturbed, &[1], &ci);
        assert!(f.is_finite());
        assert!(f < 1e-300);
    }

    #[test]
    fn derivatives() {
        let reference = ctx().optical_properties;
        let binning = Binning::new(&[(Coordinate::Rho, Range::new(0.0, 10.0, 11))]).unwrap();
        let event_dp = PhotonDataPoint {
            position: Point::new(1.5, 0.0, 0.0), direction: -Vector::unit_z(), weight: 0.5,
            total_time: 0.0, region: 1, status: PhotonStatus::ExitedTop,
        };
        let ci = collision_info(2.0, 4);
        let history = PhotonHistory::default();
        let event = TallyEvent { dp: &event_dp, collision_info: &ci, history: &history };
        let run = |quantity| {
            let mut d = PmcDetector::new("d".into(), "dMC", quantity, binning.clone(), &reference, &[1], &ctx()).unwrap();
            d.tally(&event);
            d.end_photon();
            d.tally_data().mean().as_slice().unwrap()[1]
        };
        assert_float_eq!(run(PmcQuantity::Reflectance),   0.5,                    ulps <= 1);
        assert_float_eq!(run(PmcQuantity::DerivativeMua), -0.5 * 2.0,             ulps <= 1);
        assert_float_eq!(run(PmcQuantity::DerivativeMus), 0.5 * (4.0 / 10.0 - 2.0), rmax <= 1e-12);
    }

    #[test]
    fn perturbed_region_must_be_tissue() {
        let reference = ctx().optical_properties;
        let binning = Binning::scalar();
        let make = |regions: &[usize], ops: &[OpticalProperties]|
            PmcDetector::new("d".into(), "pMCROfRho", PmcQuantity::Reflectance, binning.clone(), ops, regions, &ctx());
        assert!(make(&[0], &reference).is_err());
        assert!(make(&[5], &reference).is_err());
        assert!(make(&[1], &reference[..2]).is_err());
        assert!(make(&[1], &reference).is_ok());
    }
}
