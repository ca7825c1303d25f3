//! Filling detectors from a photon database written by an earlier run.
//!
//! No photons are transported: every stored exit state is passed to the new
//! detectors as if it had just happened. Perturbation detectors thereby give
//! the reflectance of tissues other than the one simulated. Results are
//! normalized by the number of photons launched in the original run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{read_input_file, ConfigError, SimulationInput};
use crate::database::{read_database, DatabaseError, DatabaseType};
use crate::detector::{unique_names, Detector, DetectorContext, DetectorError, DetectorInput, DetectorKind};
use crate::photon::{PhotonHistory, PhotonStatus};
use crate::tissue::TissueError;
use crate::validation::{validate, ValidationResult};
use crate::virtual_boundary::{DetectorController, VirtualBoundaryType};

/// Name of the file, in a run's output directory, echoing the run's input
pub const RUN_INPUT_FILE: &str = "input.toml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostProcessorInput {
    #[serde(default = "default_output_name")]
    pub output_name: String,
    /// Output directory of the run which wrote the database
    pub input_folder: PathBuf,
    pub database: DatabaseType,
    pub detectors: Vec<DetectorInput>,
}

fn default_output_name() -> String { "postprocessed".into() }

#[derive(Debug, Error)]
pub enum PostProcessError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    Tissue(#[from] TissueError),
    #[error("invalid detectors:{0}")]
    Invalid(ValidationResult),
    #[error("'{detector}' cannot be filled from a {database} database")]
    Unsupported { detector: String, database: DatabaseType },
    #[error("{path}: database holds {found:?} photons, {expected} requested")]
    WrongDatabase { path: PathBuf, expected: DatabaseType, found: Option<DatabaseType> },
    #[error("database records {database} regions, but the run's tissue has {tissue}")]
    RegionMismatch { database: usize, tissue: usize },
}

pub struct PostProcessorOutput {
    /// The original run's input
    pub base: SimulationInput,
    /// Photons replayed from the database
    pub replayed: u64,
    pub detectors: Vec<Box<dyn Detector>>,
}

/// Whether the records of `database` carry what `detector` needs
pub fn can_replay(detector: &DetectorInput, database: DatabaseType) -> bool {
    let kind = &detector.kind;
    let vb_ok = match kind.virtual_boundary() {
        VirtualBoundaryType::DiffuseReflectance | VirtualBoundaryType::PmcDiffuseReflectance =>
            database.accepts(PhotonStatus::ExitedTop),
        VirtualBoundaryType::DiffuseTransmittance =>
            database.accepts(PhotonStatus::ExitedBottom),
        _ => false,
    };
    let needs_collision_info = kind.perturbation().is_some() || kind.is_path_length_history();
    let needs_history = matches!(kind, DetectorKind::ReflectedMTOfRhoAndSubregionHist { .. });
    vb_ok && !needs_history && (database.has_collision_info() || !needs_collision_info)
}

pub fn post_process(input: &PostProcessorInput) -> Result<PostProcessorOutput, PostProcessError> {
    let base = read_input_file(input.input_folder.join(RUN_INPUT_FILE))?;
    let database = input.database.path(&input.input_folder);
    replay(base, &database, input.database, input.detectors.clone())
}

/// Feed every record of the database at `path`, written by the run described
/// by `base`, to the detectors described by `detectors`.
pub fn replay(
    base: SimulationInput,
    path: &Path,
    kind: DatabaseType,
    mut detectors: Vec<DetectorInput>,
) -> Result<PostProcessorOutput, PostProcessError> {
    unique_names(&mut detectors);
    let check = validate(&SimulationInput { detectors: detectors.clone(), ..base.clone() });
    if !check.is_valid() { return Err(PostProcessError::Invalid(check)) }
    if let Some(d) = detectors.iter().find(|d| !can_replay(d, kind)) {
        return Err(PostProcessError::Unsupported { detector: d.name().into(), database: kind })
    }

    let tissue = base.tissue.build()?;
    let ctx = DetectorContext::new(tissue.as_ref(), base.options.absorption_weighting);
    let mut controller = DetectorController::new(
        detectors.iter().map(|d| d.build(&ctx)).collect::<Result<_, _>>()?
    );

    let (header, records) = read_database(path)?;
    if header.kind() != Some(kind) {
        return Err(PostProcessError::WrongDatabase { path: path.into(), expected: kind, found: header.kind() })
    }
    let regions = ctx.number_of_regions();
    if header.number_of_regions as usize != regions {
        return Err(PostProcessError::RegionMismatch { database: header.number_of_regions as usize, tissue: regions })
    }

    let no_history = PhotonHistory::default();
    let mut replayed = 0;
    for record in records {
        let (dp, collision_info) = record?;
        controller.tally_terminal(&dp, &collision_info, &no_history);
        controller.end_photon();
        replayed += 1;
    }
    log::info!("Replayed {replayed} photons from {}", path.display());
    controller.normalize(base.n)?;
    Ok(PostProcessorOutput { base, replayed, detectors: controller.into_detectors() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Perturbation;
    use crate::optics::OpticalProperties;
    use crate::simulation::{run, RunControl, SimulationOptions};
    use crate::tissue::TissueInput;
    use crate::types::Range;
    use float_eq::assert_float_eq;
    use tempfile::tempdir;

    fn rho() -> Range { Range::new(0.0, 10.0, 21) }

    fn op() -> OpticalProperties { OpticalProperties::new(0.01, 1.0, 0.8, 1.4) }

    fn base(databases: Vec<DatabaseType>) -> SimulationInput {
        SimulationInput {
            n: 500,
            options: SimulationOptions { seed: Some(1), databases, ..SimulationOptions::default() },
            tissue: TissueInput::single_layer(20.0, op()),
            detectors: vec![DetectorInput::new(DetectorKind::ROfRho { rho: rho() })],
            ..SimulationInput::default()
        }
    }

    fn pmc(mua: f64) -> DetectorKind {
        DetectorKind::PmcROfRho { rho: rho(), perturbation: Perturbation {
            regions: vec![1],
            optical_properties: vec![OpticalProperties::air(), OpticalProperties { mua, ..op() }, OpticalProperties::air()],
        }}
    }

    #[test]
    fn replay_reproduces_live_tally() -> Result<(), PostProcessError> {
        let dir = tempdir().unwrap();
        let base = base(vec![DatabaseType::PmcDiffuseReflectance]);
        let control = RunControl { database_dir: Some(dir.path().into()), partitions: Some(3), ..RunControl::default() };
        let live = run(base.clone(), &control).unwrap();
        let path = &live.databases[0];
        let detectors = vec![
            DetectorInput::new(DetectorKind::ROfRho { rho: rho() }),
            DetectorInput::named("identity", pmc(0.01)),
        ];
        let post = replay(live.input.clone(), path, DatabaseType::PmcDiffuseReflectance, detectors)?;
        assert_eq!(post.replayed, live.statistics.exited_top);
        let expected = live.mean("ROfRho").unwrap();
        for d in &post.detectors {
            for (a, b) in d.tally_data().mean().iter().zip(expected.iter()) {
                assert_float_eq!(*a, *b, rmax <= 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn extra_absorption_lowers_reflectance() -> Result<(), PostProcessError> {
        let dir = tempdir().unwrap();
        let control = RunControl { database_dir: Some(dir.path().into()), ..RunControl::default() };
        let live = run(base(vec![DatabaseType::PmcDiffuseReflectance]), &control).unwrap();
        let post = replay(live.input.clone(), &live.databases[0], DatabaseType::PmcDiffuseReflectance,
                          vec![DetectorInput::new(pmc(0.1))])?;
        let perturbed = post.detectors[0].tally_data().mean().sum();
        let reference = live.mean("ROfRho").unwrap().sum();
        assert!(perturbed < reference);
        Ok(())
    }

    #[test]
    fn perturbation_needs_collision_info() {
        let d = DetectorInput::new(pmc(0.01));
        assert!(!can_replay(&d, DatabaseType::DiffuseReflectance));
        assert!( can_replay(&d, DatabaseType::PmcDiffuseReflectance));
        assert!(!can_replay(&d, DatabaseType::PmcDiffuseTransmittance));
        let t = DetectorInput::new(DetectorKind::TDiffuse);
        assert!( can_replay(&t, DatabaseType::DiffuseTransmittance));
        assert!(!can_replay(&DetectorInput::new(DetectorKind::ATotal), DatabaseType::PmcDiffuseReflectance));
    }

    #[test]
    fn unsupported_detector_is_rejected() {
        let dir = tempdir().unwrap();
        let control = RunControl { database_dir: Some(dir.path().into()), ..RunControl::default() };
        let live = run(base(vec![DatabaseType::DiffuseReflectance]), &control).unwrap();
        let result = replay(live.input, &live.databases[0], DatabaseType::DiffuseReflectance, vec![DetectorInput::new(pmc(0.01))]);
        assert!(matches!(result, Err(PostProcessError::Unsupported { .. })));
    }
}
