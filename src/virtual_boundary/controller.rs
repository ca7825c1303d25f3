use std::collections::BTreeSet;

use crate::detector::{Detector, DetectorError, TallyEvent};
use crate::photon::{CollisionInfo, Photon, PhotonDataPoint, PhotonHistory};
use crate::types::Length;
use super::VirtualBoundaryType;

/// Owns the detectors of one partition of a run and fans every photon event
/// out to the detectors of the virtual boundary concerned.
pub struct DetectorController {
    detectors: Vec<Box<dyn Detector>>,
    /// Distinct depths of the internal-surface boundaries, ascending
    planes: Vec<Length>,
    no_collisions: CollisionInfo,
    no_history: PhotonHistory,
}

impl DetectorController {

    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        let mut planes: Vec<Length> = detectors.iter().filter_map(|d| d.internal_surface()).collect();
        planes.sort_by(f64::total_cmp);
        planes.dedup();
        Self { detectors, planes, no_collisions: CollisionInfo::default(), no_history: PhotonHistory::default() }
    }

    pub fn detectors(&self) -> &[Box<dyn Detector>] { &self.detectors }

    pub fn into_detectors(self) -> Vec<Box<dyn Detector>> { self.detectors }

    pub fn internal_surfaces(&self) -> &[Length] { &self.planes }

    pub fn needs_history(&self) -> bool { self.detectors.iter().any(|d| d.needs_history()) }

    pub fn virtual_boundaries(&self) -> BTreeSet<VirtualBoundaryType> {
        self.detectors.iter().map(|d| d.virtual_boundary()).collect()
    }

    /// Weight reflected specularly as the photon entered the tissue
    pub fn tally_specular(&mut self, dp: &PhotonDataPoint) {
        let event = TallyEvent { dp, collision_info: &self.no_collisions, history: &self.no_history };
        Self::dispatch(&mut self.detectors, &event, |_| true);
    }

    /// A crossing of the internal surface `plane` (an index into
    /// `internal_surfaces`)
    pub fn tally_internal_surface(&mut self, plane: usize, dp: &PhotonDataPoint) {
        let Some(&z) = self.planes.get(plane) else { return };
        let event = TallyEvent { dp, collision_info: &self.no_collisions, history: &self.no_history };
        Self::dispatch(&mut self.detectors, &event, |d| d.internal_surface() == Some(z));
    }

    /// A photon whose history has ended
    pub fn tally_photon(&mut self, photon: &Photon) {
        self.tally_terminal(&photon.dp, &photon.collision_info, &photon.history)
    }

    /// The final state of a history, which may come from a photon database
    /// rather than from transport
    pub fn tally_terminal(&mut self, dp: &PhotonDataPoint, collision_info: &CollisionInfo, history: &PhotonHistory) {
        let event = TallyEvent { dp, collision_info, history };
        Self::dispatch(&mut self.detectors, &event, |_| true);
    }

    fn dispatch(detectors: &mut [Box<dyn Detector>], event: &TallyEvent, also: impl Fn(&dyn Detector) -> bool) {
        for d in detectors.iter_mut() {
            if d.virtual_boundary().accepts(event.dp.status) && also(&**d) { d.tally(event) }
        }
    }

    pub fn end_photon(&mut self) { self.detectors.iter_mut().for_each(|d| d.end_photon()) }

    /// The current photon was abandoned: none of its events count
    pub fn discard_photon(&mut self) { self.detectors.iter_mut().for_each(|d| d.discard_photon()) }

    /// Add the sums of another partition built from the same detector inputs
    pub fn merge(&mut self, other: &Self) -> Result<(), DetectorError> {
        if self.detectors.len() != other.detectors.len() {
            return Err(DetectorError::IncompatibleBinning)
        }
        self.detectors.iter_mut().zip(&other.detectors)
            .try_for_each(|(mine, theirs)| mine.merge(theirs.as_ref()))
    }

    pub fn normalize(&mut self, n: u64) -> Result<(), DetectorError> {
        self.detectors.iter_mut().try_for_each(|d| d.normalize(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::absorption::AbsorptionWeightingType;
    use crate::detector::{DetectorContext, DetectorInput, DetectorKind};
    use crate::optics::OpticalProperties;
    use crate::photon::PhotonStatus;
    use crate::tissue::TissueInput;
    use crate::types::{Point, Range, Vector};

    fn controller(kinds: Vec<DetectorKind>) -> DetectorController {
        let tissue = TissueInput::single_layer(10.0, OpticalProperties::new(0.01, 1.0, 0.8, 1.4)).build().unwrap();
        let ctx = DetectorContext::new(tissue.as_ref(), AbsorptionWeightingType::Discrete);
        DetectorController::new(kinds.into_iter()
            .map(|k| DetectorInput::new(k).build(&ctx).unwrap())
            .collect())
    }

    fn dp(z: f64, uz: f64, status: PhotonStatus) -> PhotonDataPoint {
        PhotonDataPoint {
            position: Point::new(1.0, 0.0, z), direction: Vector::new(0.0, 0.0, uz),
            weight: 0.5, total_time: 0.0, region: 1, status,
        }
    }

    #[test]
    fn events_reach_only_their_boundary() {
        let mut c = controller(vec![DetectorKind::RDiffuse, DetectorKind::TDiffuse, DetectorKind::RSpecular]);
        c.tally_specular(&dp(0.0, -1.0, PhotonStatus::PseudoSpecular));
        let (ci, history) = (CollisionInfo::new(3), PhotonHistory::default());
        c.tally_terminal(&dp(0.0, -1.0, PhotonStatus::ExitedTop), &ci, &history);
        c.tally_terminal(&dp(5.0, 1.0, PhotonStatus::Absorbed), &ci, &history);
        c.end_photon();
        let sums: Vec<f64> = c.detectors().iter().map(|d| d.tally_data().mean().sum()).collect();
        assert_eq!(sums, vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn internal_surfaces_are_collected_once() {
        let radiance = |z| DetectorKind::RadianceOfRhoAtZ { rho: Range::new(0.0, 5.0, 6), z };
        let mut c = controller(vec![radiance(2.0), radiance(1.0), radiance(2.0)]);
        assert_eq!(c.internal_surfaces(), &[1.0, 2.0]);
        c.tally_internal_surface(1, &dp(2.0, 1.0, PhotonStatus::PseudoInternalSurface));
        c.end_photon();
        let sums: Vec<f64> = c.detectors().iter().map(|d| d.tally_data().mean().sum()).collect();
        assert_eq!(sums, vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn abandoned_photon_is_not_tallied() {
        let radiance = DetectorKind::RadianceOfRhoAtZ { rho: Range::new(0.0, 5.0, 6), z: 2.0 };
        let mut c = controller(vec![radiance, DetectorKind::RSpecular]);
        c.tally_internal_surface(0, &dp(2.0, 1.0, PhotonStatus::PseudoInternalSurface));
        c.end_photon();
        let before: Vec<f64> = c.detectors().iter().map(|d| d.tally_data().mean().sum()).collect();

        c.tally_specular(&dp(0.0, -1.0, PhotonStatus::PseudoSpecular));
        c.tally_internal_surface(0, &dp(2.0, 1.0, PhotonStatus::PseudoInternalSurface));
        c.discard_photon();
        c.end_photon();
        let after: Vec<f64> = c.detectors().iter().map(|d| d.tally_data().mean().sum()).collect();
        assert_eq!(before, vec![0.5, 0.0]);
        assert_eq!(after, before);
    }

    #[test]
    fn normalizing_twice_is_rejected() {
        let mut c = controller(vec![DetectorKind::RDiffuse]);
        c.normalize(10).unwrap();
        assert_eq!(c.normalize(10), Err(DetectorError::AlreadyNormalized));
    }
}
