//! Running simulations.
//!
//! The photons of a run are split into contiguous ranges, one per partition.
//! Partitions run in parallel, each with its own detectors and database
//! writers; their sums are merged in partition order and normalized once by
//! the number of photons launched. Every photon draws from its own random
//! stream, so a run's photons do not depend on how it was partitioned.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::ArrayD;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::absorption::AbsorptionWeightingType;
use crate::config::SimulationInput;
use crate::database::{self, DatabaseError, DatabaseType, DatabaseWriter};
use crate::detector::{unique_names, Detector, DetectorContext, DetectorError};
use crate::phase_function::{PhaseFunction, PhaseFunctionInput, TableError};
use crate::photon::{Photon, PhotonStatus, TransportContext, TransportOptions};
use crate::rng::{resolve_seed, McRng, RngType};
use crate::tissue::{Tissue, TissueError};
use crate::types::{Length, PhotonIndex};
use crate::validation::{validate, ValidationResult};
use crate::virtual_boundary::DetectorController;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationOptions {
    #[serde(default)]
    pub rng_type: RngType,
    /// Drawn at random, and recorded in the output, if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub absorption_weighting: AbsorptionWeightingType,
    #[serde(default)]
    pub phase_function: PhaseFunctionInput,
    /// Weight below which Russian roulette is played; 0 disables it
    #[serde(default)]
    pub russian_roulette_threshold: f64,
    #[serde(default = "default_maximum_collisions")]
    pub maximum_collisions: u64,
    #[serde(default, deserialize_with = "crate::config::deserialize_length_opt", skip_serializing_if = "Option::is_none")]
    pub maximum_path_length: Option<Length>,
    /// Photon databases to write next to the results
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<DatabaseType>,
}

fn default_maximum_collisions() -> u64 { TransportOptions::default().maximum_collisions }

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            rng_type: RngType::default(),
            seed: None,
            absorption_weighting: AbsorptionWeightingType::default(),
            phase_function: PhaseFunctionInput::default(),
            russian_roulette_threshold: 0.0,
            maximum_collisions: default_maximum_collisions(),
            maximum_path_length: None,
            databases: vec![],
        }
    }
}

/// How the photons of a run ended
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotonStatistics {
    pub launched: u64,
    pub exited_top: u64,
    pub exited_bottom: u64,
    pub exited_bounding_volume: u64,
    pub absorbed: u64,
    pub killed_russian_roulette: u64,
    pub killed_over_maximum_collisions: u64,
    pub killed_over_maximum_path_length: u64,
    /// Abandoned because of a numerical defect; never tallied
    pub aborted: u64,
    pub specular_weight: f64,
    pub collisions: u64,
    pub path_length: Length,
}

impl PhotonStatistics {

    fn record(&mut self, photon: &Photon) {
        use PhotonStatus::*;
        let count = match photon.dp.status {
            ExitedTop                   => &mut self.exited_top,
            ExitedBottom                => &mut self.exited_bottom,
            ExitedBoundingVolume        => &mut self.exited_bounding_volume,
            Absorbed                    => &mut self.absorbed,
            KilledRussianRoulette       => &mut self.killed_russian_roulette,
            KilledOverMaximumCollisions => &mut self.killed_over_maximum_collisions,
            KilledOverMaximumPathLength => &mut self.killed_over_maximum_path_length,
            _                           => &mut self.aborted,
        };
        *count += 1;
        self.collisions  += photon.collisions;
        self.path_length += photon.path_length;
    }

    pub fn merge(&mut self, other: &Self) {
        self.launched                        += other.launched;
        self.exited_top                      += other.exited_top;
        self.exited_bottom                   += other.exited_bottom;
        self.exited_bounding_volume          += other.exited_bounding_volume;
        self.absorbed                        += other.absorbed;
        self.killed_russian_roulette         += other.killed_russian_roulette;
        self.killed_over_maximum_collisions  += other.killed_over_maximum_collisions;
        self.killed_over_maximum_path_length += other.killed_over_maximum_path_length;
        self.aborted                         += other.aborted;
        self.specular_weight                 += other.specular_weight;
        self.collisions                      += other.collisions;
        self.path_length                     += other.path_length;
    }

    /// Photons which reached a terminal state, plus those aborted
    pub fn accounted_for(&self) -> u64 {
        self.exited_top + self.exited_bottom + self.exited_bounding_volume + self.absorbed
            + self.killed_russian_roulette + self.killed_over_maximum_collisions
            + self.killed_over_maximum_path_length + self.aborted
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid input:{0}")]
    Invalid(ValidationResult),
    #[error(transparent)]
    Tissue(#[from] TissueError),
    #[error(transparent)]
    PhaseFunction(#[from] TableError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("photon databases requested, but no directory to write them in")]
    NoDatabaseDirectory,
    #[error("run cancelled")]
    Cancelled,
}

/// Run-time knobs which do not affect results
#[derive(Clone, Default)]
pub struct RunControl {
    /// Checked before each photon is launched
    pub cancel: Arc<AtomicBool>,
    /// Where photon databases are written
    pub database_dir: Option<PathBuf>,
    /// Defaults to the number of threads in the current rayon pool
    pub partitions: Option<usize>,
    /// Told how many photons have just been completed
    pub progress: Option<Arc<dyn Fn(u64) + Send + Sync>>,
}

impl RunControl {
    pub fn cancel(&self) { self.cancel.store(true, Ordering::Relaxed) }

    pub fn is_cancelled(&self) -> bool { self.cancel.load(Ordering::Relaxed) }
}

pub struct SimulationOutput {
    /// The input as run: seed resolved, detector names made unique
    pub input: SimulationInput,
    pub statistics: PhotonStatistics,
    pub detectors: Vec<Box<dyn Detector>>,
    pub databases: Vec<PathBuf>,
}

impl SimulationOutput {

    pub fn detector(&self, name: &str) -> Option<&dyn Detector> {
        self.detectors.iter().find(|d| d.name() == name).map(|d| d.as_ref())
    }

    pub fn mean(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.detector(name).map(|d| d.tally_data().mean())
    }

    pub fn second_moment(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.detector(name).map(|d| d.tally_data().second_moment())
    }
}

/// A validated input, with everything that all partitions of its run share
pub struct Simulation {
    input: SimulationInput,
    seed: u64,
    tissue: Box<dyn Tissue>,
    phase_functions: Vec<PhaseFunction>,
    options: TransportOptions,
    detector_context: DetectorContext,
}

impl Simulation {

    pub fn new(mut input: SimulationInput) -> Result<Self, SimulationError> {
        let validation = validate(&input);
        if !validation.is_valid() { return Err(SimulationError::Invalid(validation)) }
        for (old, new) in unique_names(&mut input.detectors) {
            log::info!("Detector '{old}' renamed '{new}'");
        }
        let seed = resolve_seed(input.options.seed);
        input.options.seed = Some(seed);
        let tissue = input.tissue.build()?;
        let phase_functions = tissue.regions().iter()
            .map(|r| PhaseFunction::new(&input.options.phase_function, &r.optical_properties))
            .collect::<Result<_, _>>()?;
        let opts = &input.options;
        let mut options = TransportOptions {
            absorption_weighting: opts.absorption_weighting,
            russian_roulette_threshold: opts.russian_roulette_threshold,
            maximum_collisions: opts.maximum_collisions,
            maximum_path_length: opts.maximum_path_length,
            track_history: false,
        };
        let detector_context = DetectorContext::new(tissue.as_ref(), opts.absorption_weighting);
        let probe = DetectorController::new(build_detectors(&input, &detector_context)?);
        options.track_history = probe.needs_history();
        Ok(Self { input, seed, tissue, phase_functions, options, detector_context })
    }

    pub fn input(&self) -> &SimulationInput { &self.input }

    pub fn seed(&self) -> u64 { self.seed }

    pub fn run(&self, control: &RunControl) -> Result<SimulationOutput, SimulationError> {
        let n = self.input.n;
        let databases = &self.input.options.databases;
        let db_dir = match (databases.is_empty(), &control.database_dir) {
            (true, _)          => None,
            (false, Some(dir)) => Some(dir.as_path()),
            (false, None)      => return Err(SimulationError::NoDatabaseDirectory),
        };
        let partitions = control.partitions
            .unwrap_or_else(rayon::current_num_threads)
            .clamp(1, n.max(1) as usize);
        log::info!("Running {n} photons in {partitions} partitions with seed {}", self.seed);
        let output = self.run_partitions(partitions, db_dir, control);
        if let (Err(e), Some(dir)) = (&output, db_dir) {
            log::debug!("Removing partial databases after: {e}");
            for &kind in databases { database::remove_parts(dir, kind, partitions) }
        }
        output
    }

    fn run_partitions(&self, partitions: usize, db_dir: Option<&Path>, control: &RunControl) -> Result<SimulationOutput, SimulationError> {
        let n = self.input.n;
        let results = (0..partitions)
            .into_par_iter()
            .map(|k| self.run_partition(k, photon_range(n, partitions, k), db_dir, control))
            .collect::<Result<Vec<_>, _>>()?;

        let mut parts = results.into_iter();
        let (mut controller, mut statistics) = parts.next()
            .map(|p| (p.controller, p.statistics))
            .unwrap_or_else(|| (DetectorController::new(vec![]), PhotonStatistics::default()));
        for part in parts {
            controller.merge(&part.controller)?;
            statistics.merge(&part.statistics);
        }
        controller.normalize(n)?;

        let mut written = vec![];
        if let Some(dir) = db_dir {
            for &kind in &self.input.options.databases {
                written.push(database::assemble(dir, kind, self.tissue.regions().len(), partitions)?);
            }
        }
        if statistics.aborted > 0 {
            log::warn!("{} photons abandoned because of numerical defects", statistics.aborted);
        }
        Ok(SimulationOutput {
            input: self.input.clone(),
            statistics,
            detectors: controller.into_detectors(),
            databases: written,
        })
    }

    fn run_partition(
        &self,
        partition: usize,
        photons: Range<PhotonIndex>,
        db_dir: Option<&Path>,
        control: &RunControl,
    ) -> Result<Partition, SimulationError> {
        let mut controller = DetectorController::new(build_detectors(&self.input, &self.detector_context)?);
        let mut writers = match db_dir {
            Some(dir) => self.input.options.databases.iter()
                .map(|&kind| DatabaseWriter::create_part(dir, kind, partition))
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![],
        };
        let planes = controller.internal_surfaces().to_vec();
        let ctx = TransportContext {
            tissue: self.tissue.as_ref(),
            phase_functions: &self.phase_functions,
            options: &self.options,
            internal_surfaces: &planes,
        };
        let source = self.input.source.as_source();
        let rng_type = self.input.options.rng_type;
        let mut statistics = PhotonStatistics::default();
        let mut done_since_report = 0;

        for index in photons {
            if control.is_cancelled() { return Err(SimulationError::Cancelled) }
            let mut rng = McRng::for_photon(rng_type, self.seed, index);
            let (mut photon, specular) = Photon::launch(source.emit(&mut rng), &ctx, &mut rng);
            statistics.launched += 1;
            if let Some(dp) = &specular { controller.tally_specular(dp) }
            match photon.transport(&ctx, &mut rng, &mut |plane, dp| controller.tally_internal_surface(plane, dp)) {
                Ok(()) => {
                    controller.tally_photon(&photon);
                    controller.end_photon();
                    statistics.record(&photon);
                    statistics.specular_weight += specular.map_or(0.0, |dp| dp.weight);
                    for w in &mut writers { w.write(&photon.dp, &photon.collision_info)? }
                }
                Err(e) => {
                    log::warn!("Photon {index} abandoned: {e}");
                    controller.discard_photon();
                    statistics.aborted += 1;
                }
            }
            done_since_report += 1;
            if done_since_report == 1000 {
                if let Some(report) = &control.progress { report(done_since_report) }
                done_since_report = 0;
            }
        }
        if let Some(report) = &control.progress { report(done_since_report) }
        for w in writers { w.finish()?; }
        Ok(Partition { controller, statistics })
    }
}

struct Partition {
    controller: DetectorController,
    statistics: PhotonStatistics,
}

fn build_detectors(input: &SimulationInput, ctx: &DetectorContext) -> Result<Vec<Box<dyn Detector>>, DetectorError> {
    input.detectors.iter().map(|d| d.build(ctx)).collect()
}

/// The photons of partition `k` out of `partitions`
fn photon_range(n: u64, partitions: usize, k: usize) -> Range<PhotonIndex> {
    let (p, k) = (partitions as u64, k as u64);
    (n * k / p)..(n * (k + 1) / p)
}

/// Validate and run a single input
pub fn run(input: SimulationInput, control: &RunControl) -> Result<SimulationOutput, SimulationError> {
    Simulation::new(input)?.run(control)
}

/// Run independent simulations concurrently. Results are in input order.
pub fn run_batch(inputs: Vec<SimulationInput>, control: &RunControl) -> Vec<Result<SimulationOutput, SimulationError>> {
    inputs.into_par_iter()
        .map(|input| {
            let control = RunControl {
                database_dir: control.database_dir.as_ref().map(|d| d.join(&input.output_name)),
                ..control.clone()
            };
            if let Some(dir) = &control.database_dir {
                if !input.options.databases.is_empty() {
                    std::fs::create_dir_all(dir).map_err(|source| DatabaseError::Io { path: dir.clone(), source })?;
                }
            }
            run(input, &control)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{DetectorInput, DetectorKind};
    use crate::optics::OpticalProperties;
    use crate::tissue::TissueInput;
    use crate::types::Range as Bins;
    use float_eq::assert_float_eq;

    fn input(n: u64, detectors: Vec<DetectorKind>) -> SimulationInput {
        SimulationInput {
            n,
            options: SimulationOptions { seed: Some(0), ..SimulationOptions::default() },
            tissue: TissueInput::single_layer(10.0, OpticalProperties::new(0.1, 1.0, 0.8, 1.4)),
            detectors: detectors.into_iter().map(DetectorInput::new).collect(),
            ..SimulationInput::default()
        }
    }

    fn control(partitions: usize) -> RunControl {
        RunControl { partitions: Some(partitions), ..RunControl::default() }
    }

    #[test]
    fn partitions_cover_every_photon_once() {
        for (n, p) in [(100, 3), (10, 10), (7, 4), (1000, 1)] {
            let ranges: Vec<_> = (0..p).map(|k| photon_range(n, p, k)).collect();
            assert_eq!(ranges[0].start, 0);
            assert_eq!(ranges[p - 1].end, n);
            assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
        }
    }

    #[test]
    fn every_photon_is_accounted_for() {
        let out = run(input(100, vec![DetectorKind::RDiffuse]), &control(3)).unwrap();
        let s = &out.statistics;
        assert_eq!(s.launched, 100);
        assert_eq!(s.accounted_for(), 100);
    }

    #[test]
    fn weight_is_conserved() {
        let kinds = vec![DetectorKind::RSpecular, DetectorKind::RDiffuse, DetectorKind::TDiffuse, DetectorKind::ATotal];
        let out = run(input(200, kinds), &control(4)).unwrap();
        let total: f64 = ["RSpecular", "RDiffuse", "TDiffuse", "ATotal"].iter()
            .map(|name| out.mean(name).unwrap().sum())
            .sum();
        assert_float_eq!(total, 1.0, abs <= 1e-9);
        // Normal incidence from air onto n = 1.4
        let r = ((1.4 - 1.0) / (1.4 + 1.0_f64)).powi(2);
        assert_float_eq!(out.mean("RSpecular").unwrap().sum(), r, rmax <= 1e-12);
        assert_float_eq!(out.statistics.specular_weight, 200.0 * r, rmax <= 1e-12);
    }

    #[test]
    fn results_do_not_depend_on_partitioning() {
        let kinds = || vec![DetectorKind::ROfRho { rho: Bins::new(0.0, 5.0, 11) }];
        let a = run(input(300, kinds()), &control(1)).unwrap();
        let b = run(input(300, kinds()), &control(7)).unwrap();
        let (a, b) = (a.mean("ROfRho").unwrap(), b.mean("ROfRho").unwrap());
        assert!(a.sum() > 0.0);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_float_eq!(*x, *y, rmax <= 1e-12);
        }
        assert_eq!(a.shape(), b.shape());
    }

    #[test]
    fn invalid_input_is_not_run() {
        match run(input(5, vec![]), &control(1)) {
            Err(SimulationError::Invalid(result)) => assert!(!result.is_valid()),
            _ => panic!("input with 5 photons was run"),
        }
    }

    #[test]
    fn cancelled_run_stops() {
        let control = control(2);
        control.cancel();
        assert!(matches!(run(input(100, vec![]), &control), Err(SimulationError::Cancelled)));
    }

    #[test]
    fn cancelled_run_leaves_no_partial_databases() {
        let mut i = input(100, vec![]);
        i.options.databases = vec![DatabaseType::DiffuseReflectance, DatabaseType::PmcDiffuseReflectance];
        let dir = tempfile::tempdir().unwrap();
        let control = RunControl { database_dir: Some(dir.path().into()), ..control(3) };
        control.cancel();
        assert!(matches!(run(i, &control), Err(SimulationError::Cancelled)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn seed_is_recorded() {
        let mut i = input(20, vec![]);
        i.options.seed = None;
        let out = run(i, &control(1)).unwrap();
        assert!(out.input.options.seed.is_some());
    }

    #[test]
    fn databases_need_a_directory() {
        let mut i = input(20, vec![]);
        i.options.databases = vec![DatabaseType::DiffuseReflectance];
        assert!(matches!(run(i.clone(), &control(2)), Err(SimulationError::NoDatabaseDirectory)));
        let dir = tempfile::tempdir().unwrap();
        let control = RunControl { database_dir: Some(dir.path().into()), ..control(2) };
        let out = run(i, &control).unwrap();
        assert_eq!(out.databases, vec![DatabaseType::DiffuseReflectance.path(dir.path())]);
        let (_, records) = database::read_database(&out.databases[0]).unwrap();
        assert_eq!(records.count() as u64, out.statistics.exited_top);
    }

    #[test]
    fn batch_runs_keep_input_order() {
        let inputs: Vec<_> = [10, 20, 30].into_iter().map(|n| input(n, vec![])).collect();
        let launched: Vec<u64> = run_batch(inputs, &control(2)).into_iter()
            .map(|r| r.unwrap().statistics.launched)
            .collect();
        assert_eq!(launched, vec![10, 20, 30]);
    }
}
