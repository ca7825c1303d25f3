//! Reflectance resolved by how photons divided their travel between tissue
//! regions.

use geometry::Dot;
use units::C;

use crate::photon::PhotonStatus;
use crate::virtual_boundary::VirtualBoundaryType;
use super::{Binning, Detector, DetectorContext, DetectorError, TallyData, TallyEvent};

/// Reflected weight binned by exit radius, region, and the time spent in
/// that region (`L n / c`, from the region's path length).
#[derive(Clone, Debug)]
pub struct ReflectedTimeDetector {
    name: String,
    refractive_indices: Vec<f64>,
    in_domain: Vec<bool>,
    data: TallyData,
}

impl ReflectedTimeDetector {
    /// `binning` axes: rho, subregion, time
    pub fn new(name: String, binning: Binning, ctx: &DetectorContext) -> Self {
        Self {
            name,
            refractive_indices: ctx.optical_properties.iter().map(|op| op.n).collect(),
            in_domain: ctx.in_domain.clone(),
            data: TallyData::new(binning),
        }
    }
}

impl Detector for ReflectedTimeDetector {
    fn name(&self) -> &str { &self.name }

    fn type_name(&self) -> &'static str { "ReflectedTimeOfRhoAndSubregionHist" }

    fn virtual_boundary(&self) -> VirtualBoundaryType { VirtualBoundaryType::DiffuseReflectance }

    fn tally(&mut self, event: &TallyEvent) {
        let TallyEvent { dp, collision_info, .. } = event;
        let rho = dp.position.rho();
        for (region, info) in collision_info.iter().enumerate() {
            if !self.in_domain.get(region).copied().unwrap_or(false) { continue }
            let time = info.path_length * self.refractive_indices[region] / C;
            self.data.tally(&[rho, Binning::subregion_value(region), time], dp.weight);
        }
    }

    fn tally_data(&self) -> &TallyData { &self.data }

    fn tally_data_mut(&mut self) -> &mut TallyData { &mut self.data }
}

/// Reflected weight binned by exit radius, region, and the momentum
/// transferred to moving scatterers in that region.
///
/// At each collision in region `r` the momentum transfer `1 - cos θ` is
/// weighted by the region's blood volume fraction: the expected share of
/// scattering events involving moving red blood cells.
#[derive(Clone, Debug)]
pub struct ReflectedMTDetector {
    name: String,
    blood_volume_fractions: Vec<f64>,
    in_domain: Vec<bool>,
    data: TallyData,
}

impl ReflectedMTDetector {
    /// `binning` axes: rho, subregion, momentum transfer
    pub fn new(name: String, binning: Binning, blood_volume_fractions: &[f64], ctx: &DetectorContext) -> Result<Self, DetectorError> {
        let n = ctx.number_of_regions();
        if blood_volume_fractions.len() != n || blood_volume_fractions.iter().any(|f| !(0.0..=1.0).contains(f)) {
            return Err(DetectorError::BadBloodVolumeFractions(n))
        }
        Ok(Self {
            name,
            blood_volume_fractions: blood_volume_fractions.to_vec(),
            in_domain: ctx.in_domain.clone(),
            data: TallyData::new(binning),
        })
    }

    /// Momentum transfer accumulated in each region over a history
    pub fn momentum_transfer(&self, event: &TallyEvent) -> Vec<f64> {
        let mut mt = vec![0.0; self.blood_volume_fractions.len()];
        for (previous, current) in event.history.segments() {
            if current.status != PhotonStatus::Alive { continue }
            let Some(total) = mt.get_mut(current.region) else { continue };
            let cos_theta = previous.direction.dot(current.direction).clamp(-1.0, 1.0);
            *total += self.blood_volume_fractions[current.region] * (1.0 - cos_theta);
        }
        mt
    }
}

impl Detector for ReflectedMTDetector {
    fn name(&self) -> &str { &self.name }

    fn type_name(&self) -> &'static str { "ReflectedMTOfRhoAndSubregionHist" }

    fn virtual_boundary(&self) -> VirtualBoundaryType { VirtualBoundaryType::DiffuseReflectance }

    fn needs_history(&self) -> bool { true }

    fn tally(&mut self, event: &TallyEvent) {
        let rho = event.dp.position.rho();
        for (region, mt) in self.momentum_transfer(event).into_iter().enumerate() {
            if !self.in_domain[region] { continue }
            self.data.tally(&[rho, Binning::subregion_value(region), mt], event.dp.weight);
        }
    }

    fn tally_data(&self) -> &TallyData { &self.data }

    fn tally_data_mut(&mut self) -> &mut TallyData { &mut self.data }
}
