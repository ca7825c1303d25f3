//! The photon transport state machine.
//!
//! A photon is launched by a source, then alternates free flights and events
//! until it reaches a terminal state. Each free flight ends at whichever comes
//! first of
//!
//! + the next collision, sampled from the remaining optical depth,
//!
//! + the next physical boundary between tissue regions,
//!
//! + the next internal-surface virtual boundary.
//!
//! The optical depth not used up when a flight is cut short by a boundary is
//! carried into the next region.

mod data;

pub use data::{CollisionInfo, PhotonDataPoint, PhotonHistory, PhotonStatus, SubRegionCollisionInfo};

use rand::Rng;
use rand_distr::Exp1;
use thiserror::Error;

use geometry::EPSILON;
use units::C;
use crate::absorption::AbsorptionWeightingType;
use crate::optics::{fresnel, OpticalProperties};
use crate::phase_function::PhaseFunction;
use crate::rng::McRng;
use crate::source::Emission;
use crate::tissue::{BoundaryHit, DomainExit, Tissue};
use crate::types::{Length, RegionIndex};

/// Survival probability of photons subjected to Russian roulette
pub const CHANCE: f64 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub struct TransportOptions {
    pub absorption_weighting: AbsorptionWeightingType,
    /// Russian roulette is played once the weight falls below this; zero
    /// disables it
    pub russian_roulette_threshold: f64,
    pub maximum_collisions: u64,
    pub maximum_path_length: Option<Length>,
    /// Keep every event of each history, for history detectors
    pub track_history: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            absorption_weighting: AbsorptionWeightingType::Discrete,
            russian_roulette_threshold: 0.0,
            maximum_collisions: 100_000_000,
            maximum_path_length: None,
            track_history: false,
        }
    }
}

/// Everything, apart from the photon itself, that transport depends upon
pub struct TransportContext<'a> {
    pub tissue: &'a dyn Tissue,
    /// One per tissue region
    pub phase_functions: &'a [PhaseFunction],
    pub options: &'a TransportOptions,
    /// Depths of internal-surface virtual boundaries
    pub internal_surfaces: &'a [Length],
}

/// Defects which make a history meaningless. The affected photon is abandoned
/// without being tallied.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("region index {region} out of range (tissue has {regions} regions)")]
    BadRegion { region: RegionIndex, regions: usize },
    #[error("invalid step length {0}")]
    BadStep(Length),
    #[error("photon left the real numbers at {0:?}")]
    NonFinite(PhotonDataPoint),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum StepEnd {
    Collision,
    Boundary(BoundaryHit),
    InternalSurface(usize),
}

#[derive(Clone, Debug)]
pub struct Photon {
    pub dp: PhotonDataPoint,
    pub collision_info: CollisionInfo,
    pub history: PhotonHistory,
    pub collisions: u64,
    pub path_length: Length,
    /// Dimensionless optical depth left before the next collision
    optical_depth: f64,
    track_history: bool,
}

impl Photon {

    /// Create a photon at the source. If it starts in an ambient region and
    /// heads for the tissue, it is moved onto the tissue surface and enters
    /// it; the specularly reflected weight is returned as a separate data
    /// point.
    pub fn launch(emission: Emission, ctx: &TransportContext, rng: &mut McRng) -> (Self, Option<PhotonDataPoint>) {
        let tissue = ctx.tissue;
        let mut photon = Self {
            dp: PhotonDataPoint {
                position  : emission.position,
                direction : emission.direction,
                weight    : 1.0,
                total_time: 0.0,
                region    : emission.region,
                status    : PhotonStatus::Alive,
            },
            collision_info: CollisionInfo::new(tissue.regions().len()),
            history: PhotonHistory::default(),
            collisions: 0,
            path_length: 0.0,
            optical_depth: 0.0,
            track_history: ctx.options.track_history,
        };
        let mut specular = None;
        if emission.region < tissue.regions().len() && tissue.domain_exit(emission.region).is_some() {
            match tissue.next_boundary(emission.position, emission.direction, emission.region) {
                Some(hit) => {
                    photon.dp.position += photon.dp.direction * hit.distance;
                    let n1 = tissue.optical_properties(emission.region).n;
                    let n2 = tissue.optical_properties(hit.neighbor).n;
                    let cos_i = tissue.angle_relative_to_boundary_normal(photon.dp.direction, &hit);
                    let (r, cos_t) = fresnel(n1, n2, cos_i);
                    if r > 0.0 {
                        specular = Some(PhotonDataPoint { weight: r, status: PhotonStatus::PseudoSpecular, ..photon.dp });
                    }
                    if n1 != n2 {
                        photon.dp.direction = tissue.refracted_direction(photon.dp.direction, &hit, n1, n2, cos_t);
                    }
                    photon.dp.weight = 1.0 - r;
                    photon.dp.region = hit.neighbor;
                }
                // Pointing away from the tissue: leaves immediately
                None => photon.dp.status = exit_status(tissue.domain_exit(emission.region)),
            }
        }
        photon.record();
        (photon, specular)
    }

    pub fn region(&self) -> RegionIndex { self.dp.region }

    pub fn is_alive(&self) -> bool { !self.dp.status.is_terminal() }

    /// Run the history to its end. `on_internal_surface` is told about every
    /// crossing of an internal-surface virtual boundary.
    pub fn transport(
        &mut self,
        ctx: &TransportContext,
        rng: &mut McRng,
        on_internal_surface: &mut dyn FnMut(usize, &PhotonDataPoint),
    ) -> Result<(), TransportError> {
        while self.is_alive() {
            self.step(ctx, rng, on_internal_surface)?;
        }
        Ok(())
    }

    fn step(
        &mut self,
        ctx: &TransportContext,
        rng: &mut McRng,
        on_internal_surface: &mut dyn FnMut(usize, &PhotonDataPoint),
    ) -> Result<(), TransportError> {
        let tissue = ctx.tissue;
        let region = self.dp.region;
        let regions = tissue.regions().len();
        if region >= regions { return Err(TransportError::BadRegion { region, regions }) }
        let op = *tissue.optical_properties(region);
        let awt = ctx.options.absorption_weighting;
        let mu = awt.sampling_coefficient(&op);

        if self.optical_depth <= 0.0 { self.optical_depth = rng.sample(Exp1) }
        let mut distance = if mu > 0.0 { self.optical_depth / mu } else { Length::INFINITY };
        let mut end = StepEnd::Collision;
        if let Some(hit) = tissue.next_boundary(self.dp.position, self.dp.direction, region) {
            if hit.distance < distance { distance = hit.distance; end = StepEnd::Boundary(hit) }
        }
        // A plane on (or within EPSILON beyond) a boundary is reported before the
        // boundary is crossed; the crossing then follows at zero distance.
        if let Some((plane, d)) = self.nearest_internal_surface(ctx.internal_surfaces) {
            if d <= distance + EPSILON { distance = d; end = StepEnd::InternalSurface(plane) }
        }
        if distance.is_nan() || distance < 0.0 { return Err(TransportError::BadStep(distance)) }
        if distance.is_infinite() {
            // Nothing can ever stop it: e.g. horizontal flight in a non-scattering layer
            log::debug!("Photon would fly for ever at {:?}", self.dp);
            self.terminate(PhotonStatus::KilledOverMaximumPathLength);
            return Ok(())
        }

        self.advance(distance, mu, &op, awt);
        if !(self.dp.position.is_finite() && self.dp.direction.is_finite() && self.dp.weight.is_finite()) {
            return Err(TransportError::NonFinite(self.dp))
        }
        if let Some(max) = ctx.options.maximum_path_length {
            if self.path_length >= max {
                self.terminate(PhotonStatus::KilledOverMaximumPathLength);
                return Ok(())
            }
        }

        match end {
            StepEnd::Collision => {
                self.optical_depth = 0.0;
                self.collide(ctx, rng);
            }
            StepEnd::Boundary(hit) => self.cross_boundary(&hit, ctx, rng),
            StepEnd::InternalSurface(plane) => {
                let crossing = PhotonDataPoint { status: PhotonStatus::PseudoInternalSurface, ..self.dp };
                on_internal_surface(plane, &crossing);
            }
        }
        Ok(())
    }

    fn nearest_internal_surface(&self, planes: &[Length]) -> Option<(usize, Length)> {
        let Self { dp: PhotonDataPoint { position, direction, .. }, .. } = self;
        if direction.z == 0.0 { return None }
        planes.iter().enumerate()
            .map(|(i, z)| (i, (z - position.z) / direction.z))
            .filter(|(_, d)| *d > EPSILON)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Free flight of length `distance` through the current region
    fn advance(&mut self, distance: Length, mu: f64, op: &OpticalProperties, awt: AbsorptionWeightingType) {
        let dp = &mut self.dp;
        dp.position += dp.direction * distance;
        dp.total_time += distance * op.n / C;
        self.path_length += distance;
        self.collision_info.add_path(dp.region, distance);
        self.optical_depth = (self.optical_depth - distance * mu).max(0.0);
        if awt == AbsorptionWeightingType::Continuous {
            dp.weight *= (-op.mua * distance).exp();
        }
    }

    fn collide(&mut self, ctx: &TransportContext, rng: &mut McRng) {
        let region = self.dp.region;
        let op = ctx.tissue.optical_properties(region);
        self.collisions += 1;
        self.collision_info.add_collision(region);
        match ctx.options.absorption_weighting {
            AbsorptionWeightingType::Analog => {
                if rng.gen::<f64>() < op.mua / op.r#mut() {
                    return self.terminate(PhotonStatus::Absorbed)
                }
            }
            AbsorptionWeightingType::Discrete   => self.dp.weight *= op.albedo(),
            AbsorptionWeightingType::Continuous => {}
        }
        self.dp.direction = ctx.phase_functions[region].scatter(self.dp.direction, rng);
        self.dp.status = PhotonStatus::Alive;
        let survived = self.play_russian_roulette(ctx.options.russian_roulette_threshold, rng);
        self.record();
        if !survived {
            self.terminate(PhotonStatus::KilledRussianRoulette)
        } else if self.collisions >= ctx.options.maximum_collisions {
            self.terminate(PhotonStatus::KilledOverMaximumCollisions)
        }
    }

    /// Returns whether the photon survives. Survivors carry the weight of
    /// those that were killed.
    fn play_russian_roulette(&mut self, threshold: f64, rng: &mut McRng) -> bool {
        if threshold <= 0.0 || self.dp.weight >= threshold { return true }
        if rng.gen::<f64>() < CHANCE {
            self.dp.weight /= CHANCE;
            true
        } else {
            false
        }
    }

    /// Fresnel reflection or refraction at a physical boundary. Reaching the
    /// bounding volume's wall ends the history without reflection.
    fn cross_boundary(&mut self, hit: &BoundaryHit, ctx: &TransportContext, rng: &mut McRng) {
        let tissue = ctx.tissue;
        let exit = tissue.domain_exit(hit.neighbor);
        if exit == Some(DomainExit::BoundingVolume) {
            return self.terminate(PhotonStatus::ExitedBoundingVolume)
        }
        let n1 = tissue.optical_properties(self.dp.region).n;
        let n2 = tissue.optical_properties(hit.neighbor).n;
        let cos_i = tissue.angle_relative_to_boundary_normal(self.dp.direction, hit);
        let (r, cos_t) = fresnel(n1, n2, cos_i);
        if r > 0.0 && rng.gen::<f64>() < r {
            self.dp.direction = tissue.reflected_direction(self.dp.direction, hit);
            self.dp.status = PhotonStatus::PseudoTissueBoundary;
            return self.record()
        }
        if n1 != n2 {
            self.dp.direction = tissue.refracted_direction(self.dp.direction, hit, n1, n2, cos_t);
        }
        match exit {
            Some(exit) => self.terminate(exit_status(Some(exit))),
            None => {
                self.dp.status = PhotonStatus::PseudoTissueBoundary;
                self.record();
                self.dp.region = hit.neighbor;
            }
        }
    }

    fn terminate(&mut self, status: PhotonStatus) {
        self.dp.status = status;
        self.record();
    }

    fn record(&mut self) {
        if self.track_history { self.history.push(self.dp) }
    }
}

fn exit_status(exit: Option<DomainExit>) -> PhotonStatus {
    match exit {
        Some(DomainExit::Top)            => PhotonStatus::ExitedTop,
        Some(DomainExit::Bottom)         => PhotonStatus::ExitedBottom,
        Some(DomainExit::BoundingVolume) => PhotonStatus::ExitedBoundingVolume,
        None                             => PhotonStatus::KilledOverMaximumPathLength,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase_function::HenyeyGreenstein;
    use crate::rng::RngType;
    use crate::tissue::{LayerInput, MultiLayerTissue};
    use crate::types::{Point, Vector};
    use float_eq::assert_float_eq;
    use rstest::rstest;

    fn tissue(op: OpticalProperties, thickness: f64, ambient_n: f64) -> MultiLayerTissue {
        let ambient = OpticalProperties { n: ambient_n, ..OpticalProperties::air() };
        MultiLayerTissue::new(&[LayerInput { thickness, optical_properties: op }], ambient, ambient).unwrap()
    }

    fn phase_functions(t: &MultiLayerTissue) -> Vec<PhaseFunction> {
        t.regions().iter()
            .map(|r| PhaseFunction::HenyeyGreenstein(HenyeyGreenstein::new(r.optical_properties.g)))
            .collect()
    }

    fn normal_emission() -> Emission {
        Emission { position: Point::zero(), direction: Vector::unit_z(), region: 0 }
    }

    #[test]
    fn specular_reflection_at_launch() {
        let t = tissue(OpticalProperties::new(0.01, 1.0, 0.8, 1.4), 10.0, 1.0);
        let pfs = phase_functions(&t);
        let options = TransportOptions::default();
        let ctx = TransportContext { tissue: &t, phase_functions: &pfs, options: &options, internal_surfaces: &[] };
        let mut rng = McRng::seed_from_u64(RngType::Isaac64, 0);
        let (photon, specular) = Photon::launch(normal_emission(), &ctx, &mut rng);
        let r = (0.4_f64 / 2.4).powi(2);
        let specular = specular.unwrap();
        assert_float_eq!(specular.weight, r, rmax <= 1e-12);
        assert_eq!(specular.status, PhotonStatus::PseudoSpecular);
        assert_float_eq!(photon.dp.weight, 1.0 - r, rmax <= 1e-12);
        assert_eq!(photon.region(), 1);
    }

    #[test]
    fn ballistic_photon_in_transparent_layer_crosses_with_exact_time() {
        // Non-scattering, non-absorbing layer with matched ambient media
        let t = tissue(OpticalProperties::new(0.0, 0.0, 0.0, 1.0), 3.0, 1.0);
        let pfs = phase_functions(&t);
        let options = TransportOptions { track_history: true, ..TransportOptions::default() };
        let ctx = TransportContext { tissue: &t, phase_functions: &pfs, options: &options, internal_surfaces: &[] };
        let mut rng = McRng::seed_from_u64(RngType::Isaac64, 0);
        let (mut photon, specular) = Photon::launch(normal_emission(), &ctx, &mut rng);
        assert!(specular.is_none());
        photon.transport(&ctx, &mut rng, &mut |_, _| {}).unwrap();
        assert_eq!(photon.dp.status, PhotonStatus::ExitedBottom);
        assert_float_eq!(photon.dp.total_time, 3.0 / C, rmax <= 1e-12);
        assert_float_eq!(photon.collision_info[1].path_length, 3.0, rmax <= 1e-12);
        assert_eq!(photon.collisions, 0);
        assert_eq!(photon.history.points.len(), 2);
    }

    #[test]
    fn internal_surface_is_reported_without_disturbing_flight() {
        let t = tissue(OpticalProperties::new(0.0, 0.0, 0.0, 1.0), 3.0, 1.0);
        let pfs = phase_functions(&t);
        let options = TransportOptions::default();
        let planes = [1.0, 2.0];
        let ctx = TransportContext { tissue: &t, phase_functions: &pfs, options: &options, internal_surfaces: &planes };
        let mut rng = McRng::seed_from_u64(RngType::Isaac64, 0);
        let (mut photon, _) = Photon::launch(normal_emission(), &ctx, &mut rng);
        let mut crossings = vec![];
        photon.transport(&ctx, &mut rng, &mut |plane, dp| crossings.push((plane, dp.position.z))).unwrap();
        assert_eq!(photon.dp.status, PhotonStatus::ExitedBottom);
        assert_eq!(crossings.len(), 2);
        assert_eq!(crossings[0].0, 0);
        assert_float_eq!(crossings[1].1, 2.0, abs <= 1e-12);
    }

    #[rstest(/**/ n_below,
             case(1.0),
             case(1.4),
    )]
    fn internal_surface_on_layer_interface_is_reported_once(n_below: f64) {
        let below = OpticalProperties { n: n_below, ..OpticalProperties::air() };
        let layers = [
            LayerInput { thickness: 1.5, optical_properties: OpticalProperties::new(0.0, 0.0, 0.0, 1.0) },
            LayerInput { thickness: 1.5, optical_properties: OpticalProperties::new(0.0, 0.0, 0.0, n_below) },
        ];
        let t = MultiLayerTissue::new(&layers, OpticalProperties::air(), below).unwrap();
        let pfs = phase_functions(&t);
        let options = TransportOptions::default();
        let planes = [1.5];
        let ctx = TransportContext { tissue: &t, phase_functions: &pfs, options: &options, internal_surfaces: &planes };
        for i in 0..20 {
            let mut rng = McRng::for_photon(RngType::Isaac64, 5, i);
            let (mut photon, _) = Photon::launch(normal_emission(), &ctx, &mut rng);
            let mut crossings = vec![];
            photon.transport(&ctx, &mut rng, &mut |plane, dp| crossings.push((plane, dp.position.z))).unwrap();
            assert_eq!(crossings.len(), 1);
            assert_eq!(crossings[0].0, 0);
            assert_float_eq!(crossings[0].1, 1.5, abs <= 1e-12);
            assert!(matches!(photon.dp.status, PhotonStatus::ExitedTop | PhotonStatus::ExitedBottom));
        }
    }

    #[rstest(/**/ awt,
             case(AbsorptionWeightingType::Analog),
             case(AbsorptionWeightingType::Discrete),
             case(AbsorptionWeightingType::Continuous),
    )]
    fn every_history_terminates(awt: AbsorptionWeightingType) {
        let t = tissue(OpticalProperties::new(0.1, 1.0, 0.8, 1.4), 2.0, 1.0);
        let pfs = phase_functions(&t);
        let options = TransportOptions {
            absorption_weighting: awt,
            russian_roulette_threshold: 0.01,
            track_history: true,
            ..TransportOptions::default()
        };
        let ctx = TransportContext { tissue: &t, phase_functions: &pfs, options: &options, internal_surfaces: &[] };
        for i in 0..200 {
            let mut rng = McRng::for_photon(RngType::Isaac64, 17, i);
            let (mut photon, _) = Photon::launch(normal_emission(), &ctx, &mut rng);
            photon.transport(&ctx, &mut rng, &mut |_, _| {}).unwrap();
            assert!(photon.dp.status.is_terminal());
            assert!(photon.dp.weight >= 0.0);
            let last = photon.history.points.last().unwrap();
            assert_eq!(last.status, photon.dp.status);
            assert_float_eq!(photon.collision_info.total_path_length(), photon.path_length, rmax <= 1e-9);
        }
    }

    #[test]
    fn collision_limit_ends_history() {
        let t = tissue(OpticalProperties::from_mus(0.0, 10.0, 0.0, 1.0), 1000.0, 1.0);
        let pfs = phase_functions(&t);
        let options = TransportOptions { maximum_collisions: 5, ..TransportOptions::default() };
        let ctx = TransportContext { tissue: &t, phase_functions: &pfs, options: &options, internal_surfaces: &[] };
        let mut rng = McRng::seed_from_u64(RngType::Isaac64, 1);
        let (mut photon, _) = Photon::launch(normal_emission(), &ctx, &mut rng);
        photon.transport(&ctx, &mut rng, &mut |_, _| {}).unwrap();
        // May escape through the top first
        assert!(matches!(photon.dp.status, PhotonStatus::KilledOverMaximumCollisions | PhotonStatus::ExitedTop));
        assert!(photon.collisions <= 5);
    }

    #[test]
    fn bad_region_is_reported() {
        let t = tissue(OpticalProperties::new(0.1, 1.0, 0.8, 1.4), 2.0, 1.0);
        let pfs = phase_functions(&t);
        let options = TransportOptions::default();
        let ctx = TransportContext { tissue: &t, phase_functions: &pfs, options: &options, internal_surfaces: &[] };
        let mut rng = McRng::seed_from_u64(RngType::Isaac64, 1);
        let emission = Emission { region: 99, ..normal_emission() };
        let (mut photon, _) = Photon::launch(emission, &ctx, &mut rng);
        let result = photon.transport(&ctx, &mut rng, &mut |_, _| {});
        assert_eq!(result, Err(TransportError::BadRegion { region: 99, regions: 3 }));
    }
}
