//! Writing results to disk.
//!
//! A results directory holds the input as run (`input.toml`), the photon
//! statistics (`statistics.toml`) and, for each detector, its mean and second
//! moment as raw little-endian `f64` arrays in row-major order (`<name>` and
//! `<name>_2`) plus a description of their binning (`<name>.toml`).

pub mod raw;

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{to_toml_string, write_input_file, ConfigError};
use crate::detector::{Coordinate, Detector};
use crate::postprocess::{PostProcessorInput, PostProcessorOutput, RUN_INPUT_FILE};
use crate::simulation::SimulationOutput;
use crate::types::Range;

pub const STATISTICS_FILE: &str = "statistics.toml";
pub const POSTPROCESSOR_INPUT_FILE: &str = "postprocessor_input.toml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisMetadata {
    pub coordinate: Coordinate,
    pub range: Range,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub shape: Vec<usize>,
    pub axes: Vec<AxisMetadata>,
    /// Events tallied, over all photons
    pub tally_count: u64,
}

impl DetectorMetadata {
    pub fn of(detector: &dyn Detector) -> Self {
        let data = detector.tally_data();
        Self {
            name: detector.name().into(),
            type_name: detector.type_name().into(),
            shape: data.mean().shape().to_vec(),
            axes: data.binning().axes().iter()
                .map(|a| AxisMetadata { coordinate: a.coordinate, range: a.range })
                .collect(),
            tally_count: data.tally_count(),
        }
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{path}: {source}")]
    Metadata { path: PathBuf, source: toml::de::Error },
    #[error("{path}: data does not fit shape {shape:?}")]
    Shape { path: PathBuf, shape: Vec<usize> },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
    move |source| OutputError::Io { path: path.into(), source }
}

pub fn write_detector(dir: &Path, detector: &dyn Detector) -> Result<(), OutputError> {
    let name = detector.name();
    let data = detector.tally_data();
    let mean = dir.join(name);
    let second = dir.join(format!("{name}_2"));
    let meta = dir.join(format!("{name}.toml"));
    raw::write(data.mean().iter().copied(), &mean).map_err(io_error(&mean))?;
    raw::write(data.second_moment().iter().copied(), &second).map_err(io_error(&second))?;
    fs::write(&meta, to_toml_string(&DetectorMetadata::of(detector))?).map_err(io_error(&meta))
}

pub fn write_detectors(dir: &Path, detectors: &[Box<dyn Detector>]) -> Result<(), OutputError> {
    fs::create_dir_all(dir).map_err(io_error(dir))?;
    detectors.iter().try_for_each(|d| write_detector(dir, d.as_ref()))
}

pub fn write_simulation_output(dir: &Path, output: &SimulationOutput) -> Result<(), OutputError> {
    write_detectors(dir, &output.detectors)?;
    write_input_file(&output.input, dir.join(RUN_INPUT_FILE))?;
    let stats = dir.join(STATISTICS_FILE);
    fs::write(&stats, to_toml_string(&output.statistics)?).map_err(io_error(&stats))
}

pub fn write_postprocessor_output(dir: &Path, input: &PostProcessorInput, output: &PostProcessorOutput) -> Result<(), OutputError> {
    write_detectors(dir, &output.detectors)?;
    let path = dir.join(POSTPROCESSOR_INPUT_FILE);
    fs::write(&path, to_toml_string(input)?).map_err(io_error(&path))
}

/// Mean and second moment of the detector `name` in the results directory `dir`
pub fn read_detector(dir: &Path, name: &str) -> Result<(DetectorMetadata, ArrayD<f64>, ArrayD<f64>), OutputError> {
    let meta_path = dir.join(format!("{name}.toml"));
    let text = fs::read_to_string(&meta_path).map_err(io_error(&meta_path))?;
    let meta: DetectorMetadata = toml::from_str(&text)
        .map_err(|source| OutputError::Metadata { path: meta_path.clone(), source })?;
    let read_array = |path: PathBuf| -> Result<ArrayD<f64>, OutputError> {
        let data = raw::read(&path).and_then(|it| it.collect::<Result<Vec<_>, _>>()).map_err(io_error(&path))?;
        ArrayD::from_shape_vec(IxDyn(&meta.shape), data)
            .map_err(|_| OutputError::Shape { path, shape: meta.shape.clone() })
    };
    let mean = read_array(dir.join(name))?;
    let second = read_array(dir.join(format!("{name}_2")))?;
    Ok((meta, mean, second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationInput;
    use crate::simulation::{run, RunControl, SimulationOptions};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn results_directory_round_trip() -> Result<(), OutputError> {
        let input = SimulationInput {
            n: 50,
            options: SimulationOptions { seed: Some(3), ..SimulationOptions::default() },
            ..SimulationInput::default()
        };
        let output = run(input, &RunControl::default()).unwrap();
        let dir = tempdir().unwrap();
        write_simulation_output(dir.path(), &output)?;

        let (meta, mean, second) = read_detector(dir.path(), "ROfRho")?;
        assert_eq!(meta.type_name, "ROfRho");
        assert_eq!(meta.axes, vec![AxisMetadata { coordinate: Coordinate::Rho, range: Range::new(0.0, 10.0, 101) }]);
        assert_eq!(&mean, output.mean("ROfRho").unwrap());
        assert_eq!(&second, output.second_moment("ROfRho").unwrap());

        let (meta, mean, _) = read_detector(dir.path(), "RDiffuse")?;
        assert_eq!(meta.shape, Vec::<usize>::new());
        assert_eq!(mean.len(), 1);

        let echoed = crate::config::read_input_file(dir.path().join(RUN_INPUT_FILE))?;
        assert_eq!(echoed, output.input);
        assert!(dir.path().join(STATISTICS_FILE).exists());
        Ok(())
    }
}
