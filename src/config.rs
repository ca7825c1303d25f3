//! Simulation input files.
//!
//! Inputs are TOML. Lengths and times may be written as plain numbers (mm and
//! ps) or as strings carrying their own units: `thickness = "2 cm"`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, de};
use thiserror::Error;

use crate::absorption::AbsorptionWeightingType;
use crate::database::DatabaseType;
use crate::detector::{DetectorInput, DetectorKind, Perturbation};
use crate::optics::OpticalProperties;
use crate::simulation::SimulationOptions;
use crate::source::{BeamProfile, DirectionalCircular, DirectionalPoint, IsotropicPoint, SourceInput};
use crate::tissue::{InclusionInput, InclusionShape, LayerInput, TissueInput};
use crate::types::{Length, Point, Range, Time, Vector};
use geometry::{Ellipsoid, VerticalCylinder};
use units::ParseUnitError;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn parse_quantity<'d, D>(deserializer: D, parse: fn(&str) -> Result<f64, ParseUnitError>) -> Result<f64, D::Error>
where
    D: Deserializer<'d>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(x) => Ok(x),
        NumberOrText::Text(s)   => parse(&s).map_err(de::Error::custom),
    }
}

pub fn deserialize_length<'d, D: Deserializer<'d>>(deserializer: D) -> Result<Length, D::Error> {
    parse_quantity(deserializer, units::parse_length)
}

pub fn deserialize_time<'d, D: Deserializer<'d>>(deserializer: D) -> Result<Time, D::Error> {
    parse_quantity(deserializer, units::parse_time)
}

pub fn deserialize_length_opt<'d, D: Deserializer<'d>>(deserializer: D) -> Result<Option<Length>, D::Error> {
    Option::<NumberOrText>::deserialize(deserializer)?
        .map(|v| match v {
            NumberOrText::Number(x) => Ok(x),
            NumberOrText::Text(s)   => units::parse_length(&s),
        })
        .transpose()
        .map_err(de::Error::custom)
}

/// Everything needed to run one simulation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationInput {
    /// Stem of the output directory and of the input file written by `infiles`
    #[serde(default = "default_output_name")]
    pub output_name: String,
    /// Number of photons to launch
    pub n: u64,
    #[serde(default)]
    pub options: SimulationOptions,
    #[serde(default)]
    pub source: SourceInput,
    pub tissue: TissueInput,
    #[serde(default)]
    pub detectors: Vec<DetectorInput>,
}

fn default_output_name() -> String { "results".into() }

impl Default for SimulationInput {
    /// 100 photons normally incident on a semi-infinite-looking 100 mm slab
    fn default() -> Self {
        Self {
            output_name: default_output_name(),
            n: 100,
            options: SimulationOptions::default(),
            source: SourceInput::default(),
            tissue: TissueInput::single_layer(100.0, OpticalProperties::new(0.01, 1.0, 0.8, 1.4)),
            detectors: vec![
                DetectorInput::new(DetectorKind::RDiffuse),
                DetectorInput::new(DetectorKind::ROfRho { rho: Range::new(0.0, 10.0, 101) }),
                DetectorInput::new(DetectorKind::TDiffuse),
                DetectorInput::new(DetectorKind::RSpecular),
            ],
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read or write `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid input in `{path}`: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("invalid input: {0}")]
    ParseText(#[from] toml::de::Error),
    #[error("couldn't express input as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub fn read_input_file(path: impl AsRef<Path>) -> Result<SimulationInput, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.into(), source })?;
    toml::from_str(&text)
        .map_err(|source| ConfigError::Parse { path: path.into(), source })
}

pub fn write_input_file(input: &SimulationInput, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    fs::write(path, to_toml_string(input)?)
        .map_err(|source| ConfigError::Io { path: path.into(), source })
}

/// Nested tables must follow plain values in TOML, which serializing via a
/// `toml::Value` takes care of.
pub fn to_toml_string<T: Serialize>(x: &T) -> Result<String, ConfigError> {
    Ok(toml::to_string(&toml::Value::try_from(x)?)?)
}

pub fn from_toml_str(text: &str) -> Result<SimulationInput, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Sample inputs covering every family of source, tissue and detector
pub fn example_inputs() -> Vec<SimulationInput> {
    let tissue_op = OpticalProperties::new(0.01, 1.0, 0.8, 1.4);
    let rho = Range::new(0.0, 10.0, 101);
    let z = Range::new(0.0, 10.0, 101);
    let time = Range::new(0.0, 1000.0, 101);
    let angle = Range::new(0.0, std::f64::consts::FRAC_PI_2, 11);
    let xy = Range::new(-10.0, 10.0, 81);
    let d = DetectorInput::new;
    let two_layers = TissueInput::MultiLayer {
        layers: vec![
            LayerInput { thickness:   1.5, optical_properties: OpticalProperties::new(0.01, 1.0, 0.8, 1.4) },
            LayerInput { thickness: 100.0, optical_properties: OpticalProperties::new(0.02, 1.5, 0.8, 1.4) },
        ],
        above: OpticalProperties::air(),
        below: OpticalProperties::air(),
    };
    let base = SimulationInput::default();
    vec![
        SimulationInput {
            output_name: "one_layer_all_detectors".into(),
            detectors: vec![
                d(DetectorKind::RDiffuse),
                d(DetectorKind::ROfRho { rho }),
                d(DetectorKind::ROfAngle { angle }),
                d(DetectorKind::ROfRhoAndTime { rho, time }),
                d(DetectorKind::ROfRhoAndAngle { rho, angle }),
                d(DetectorKind::ROfXAndY { x: xy, y: xy }),
                d(DetectorKind::ROfFx { fx: Range::new(0.0, 0.5, 51) }),
                d(DetectorKind::TDiffuse),
                d(DetectorKind::TOfRho { rho }),
                d(DetectorKind::TOfAngle { angle }),
                d(DetectorKind::TOfRhoAndAngle { rho, angle }),
                d(DetectorKind::TOfXAndY { x: xy, y: xy }),
                d(DetectorKind::RSpecular),
                d(DetectorKind::RadianceOfRhoAtZ { rho, z: 1.0 }),
                d(DetectorKind::ATotal),
                d(DetectorKind::AOfRhoAndZ { rho, z }),
                d(DetectorKind::AOfXAndYAndZ { x: xy, y: xy, z }),
                d(DetectorKind::FluenceOfRhoAndZ { rho, z }),
                d(DetectorKind::FluenceOfXAndYAndZ { x: xy, y: xy, z }),
                d(DetectorKind::FluenceOfRhoAndZAndTime { rho, z, time }),
            ],
            ..base.clone()
        },
        SimulationInput {
            output_name: "two_layer_ROfRho".into(),
            tissue: two_layers.clone(),
            detectors: vec![
                d(DetectorKind::RDiffuse),
                d(DetectorKind::ROfRho { rho }),
                d(DetectorKind::ReflectedTimeOfRhoAndSubregionHist { rho, time }),
                d(DetectorKind::ReflectedMTOfRhoAndSubregionHist {
                    rho,
                    mt: Range::new(0.0, 500.0, 51),
                    blood_volume_fractions: vec![0.0, 0.03, 0.05, 0.0],
                }),
            ],
            ..base.clone()
        },
        SimulationInput {
            output_name: "one_layer_ROfRho_DAW_database".into(),
            options: SimulationOptions {
                databases: vec![DatabaseType::PmcDiffuseReflectance],
                ..SimulationOptions::default()
            },
            detectors: vec![
                d(DetectorKind::ROfRho { rho }),
                d(DetectorKind::PmcROfRho { rho, perturbation: Perturbation {
                    regions: vec![1],
                    optical_properties: vec![
                        OpticalProperties::air(),
                        OpticalProperties::new(0.02, 1.0, 0.8, 1.4),
                        OpticalProperties::air(),
                    ],
                }}),
                d(DetectorKind::DmcdROfRhodMua { rho, perturbation: Perturbation {
                    regions: vec![1],
                    optical_properties: vec![OpticalProperties::air(), tissue_op, OpticalProperties::air()],
                }}),
            ],
            ..base.clone()
        },
        SimulationInput {
            output_name: "ellipsoid_FluenceOfRhoAndZ_CAW".into(),
            options: SimulationOptions {
                absorption_weighting: AbsorptionWeightingType::Continuous,
                ..SimulationOptions::default()
            },
            tissue: TissueInput::Inclusion {
                layers: vec![LayerInput { thickness: 100.0, optical_properties: tissue_op }],
                inclusions: vec![InclusionInput {
                    shape: InclusionShape::Ellipsoid(Ellipsoid::sphere(Point::new(0.0, 0.0, 3.0), 1.0)),
                    optical_properties: OpticalProperties::new(0.05, 1.0, 0.8, 1.4),
                }],
                above: OpticalProperties::air(),
                below: OpticalProperties::air(),
            },
            detectors: vec![
                d(DetectorKind::ATotal),
                d(DetectorKind::FluenceOfRhoAndZ { rho, z }),
            ],
            ..base.clone()
        },
        SimulationInput {
            output_name: "bounding_cylinder_analog".into(),
            options: SimulationOptions {
                absorption_weighting: AbsorptionWeightingType::Analog,
                ..SimulationOptions::default()
            },
            tissue: TissueInput::BoundingCylinder {
                layers: vec![LayerInput { thickness: 20.0, optical_properties: tissue_op }],
                cylinder: VerticalCylinder::new(Point::zero(), 15.0),
                above: OpticalProperties::air(),
                below: OpticalProperties::air(),
            },
            detectors: vec![
                d(DetectorKind::RDiffuse),
                d(DetectorKind::TDiffuse),
                d(DetectorKind::ATotal),
                d(DetectorKind::ATotalBoundingVolume),
            ],
            ..base.clone()
        },
        SimulationInput {
            output_name: "gaussian_beam_two_layer".into(),
            source: SourceInput::DirectionalCircular(DirectionalCircular {
                center: Point::zero(),
                radius: 3.0,
                direction: Vector::unit_z(),
                profile: BeamProfile::Gaussian { fwhm: 2.0 },
                initial_region: 0,
            }),
            tissue: two_layers,
            detectors: vec![d(DetectorKind::ROfXAndY { x: xy, y: xy })],
            ..base.clone()
        },
        SimulationInput {
            output_name: "isotropic_point_in_tissue".into(),
            source: SourceInput::IsotropicPoint(IsotropicPoint { position: Point::new(0.0, 0.0, 5.0), initial_region: 1 }),
            detectors: vec![d(DetectorKind::RDiffuse), d(DetectorKind::TDiffuse), d(DetectorKind::ATotal)],
            ..base.clone()
        },
        SimulationInput {
            output_name: "angled_source_ROfXAndY".into(),
            source: SourceInput::DirectionalPoint(DirectionalPoint::angled(std::f64::consts::FRAC_PI_6)),
            detectors: vec![d(DetectorKind::ROfXAndY { x: xy, y: xy }), d(DetectorKind::RSpecular)],
            ..base
        },
    ]
}
