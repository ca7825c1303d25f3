//! Checks of a `SimulationInput` made before anything is run.
//!
//! Each failed check yields a remark naming the rule broken and how to fix
//! the input. Errors prevent the run; warnings are logged and the run goes
//! ahead.

use std::collections::HashSet;
use std::fmt;

use geometry::EPSILON;

use crate::absorption::AbsorptionWeightingType;
use crate::config::SimulationInput;
use crate::database::DatabaseType;
use crate::detector::{DetectorContext, DetectorError, DetectorInput, DetectorKind};
use crate::phase_function::{PhaseFunction, PhaseFunctionInput};
use crate::rng::{McRng, RngType};
use crate::source::{Emission, SourceInput};
use crate::tissue::{Tissue, TissueError, TissueInput};
use crate::virtual_boundary::VirtualBoundaryType;

pub const MINIMUM_PHOTONS: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rule {
    PhotonCount,
    OpticalProperties,
    TissueLayout,
    InclusionPlacement,
    SourceRegion,
    RussianRoulette,
    DetectorBinning,
    AbsorptionWeightingCapability,
    PerturbedRegion,
    BloodVolumeFraction,
    TransmittanceInAir,
    DatabaseCombination,
    PhaseFunctionTable,
    DuplicateDetectorName,
    CylindricalSymmetry,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Remark {
    pub rule: Rule,
    pub message: String,
    pub remedy: String,
}

impl fmt::Display for Remark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {} ({})", self.rule, self.message, self.remedy)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<Remark>,
    pub warnings: Vec<Remark>,
}

impl ValidationResult {

    pub fn is_valid(&self) -> bool { self.errors.is_empty() }

    pub fn broken_rules(&self) -> Vec<Rule> { self.errors.iter().map(|r| r.rule).collect() }

    pub fn warned_rules(&self) -> Vec<Rule> { self.warnings.iter().map(|r| r.rule).collect() }

    fn error(&mut self, rule: Rule, message: impl Into<String>, remedy: impl Into<String>) {
        self.errors.push(Remark { rule, message: message.into(), remedy: remedy.into() })
    }

    fn warn(&mut self, rule: Rule, message: impl Into<String>, remedy: impl Into<String>) {
        self.warnings.push(Remark { rule, message: message.into(), remedy: remedy.into() })
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() { write!(f, "input is valid")? }
        for e in &self.errors   { write!(f, "\n  error: {e}")? }
        for w in &self.warnings { write!(f, "\n  warning: {w}")? }
        Ok(())
    }
}

/// Whether detectors of kind `kind` give meaningful results under absorption
/// weighting `awt`
pub fn supports(kind: &DetectorKind, awt: AbsorptionWeightingType) -> bool {
    use AbsorptionWeightingType::*;
    let pmc = kind.perturbation().is_some();
    let path_length = kind.is_path_length_history();
    match awt {
        Analog     => !pmc && !path_length,
        Continuous => !path_length,
        Discrete   => true,
    }
}

/// Check every rule; warnings are also logged
pub fn validate(input: &SimulationInput) -> ValidationResult {
    let mut result = ValidationResult::default();
    check_photon_count(input, &mut result);
    check_optical_properties(&input.tissue, &mut result);
    check_russian_roulette(input, &mut result);
    check_phase_function(input, &mut result);
    check_databases(input, &mut result);
    match input.tissue.build() {
        Ok(tissue) => {
            check_source(input, tissue.as_ref(), &mut result);
            check_detectors(input, tissue.as_ref(), &mut result);
        }
        Err(e) => tissue_error(e, &mut result),
    }
    for w in &result.warnings { log::warn!("{w}") }
    result
}

fn check_photon_count(input: &SimulationInput, result: &mut ValidationResult) {
    if input.n < MINIMUM_PHOTONS {
        result.error(Rule::PhotonCount,
                     format!("{} photons requested", input.n),
                     format!("launch at least {MINIMUM_PHOTONS} photons"));
    }
}

fn check_optical_properties(tissue: &TissueInput, result: &mut ValidationResult) {
    for (region, op) in tissue.region_optical_properties().iter().enumerate() {
        if !op.is_physical() || op.n <= 0.0 {
            result.error(Rule::OpticalProperties,
                         format!("region {region} has unphysical optical properties {op}"),
                         "use non-negative μa and μs', -1 ≤ g ≤ 1 and n > 0");
        }
    }
}

fn tissue_error(e: TissueError, result: &mut ValidationResult) {
    let rule = match e {
        TissueError::InclusionOutsideLayer { .. } |
        TissueError::OverlappingInclusions(..) => Rule::InclusionPlacement,
        _                                      => Rule::TissueLayout,
    };
    let remedy = match rule {
        Rule::InclusionPlacement => "place each inclusion entirely inside one layer, apart from the others",
        _                        => "give at least one layer, each with finite non-negative thickness",
    };
    result.error(rule, e.to_string(), remedy);
}

fn check_source(input: &SimulationInput, tissue: &dyn Tissue, result: &mut ValidationResult) {
    let source = input.source.as_source();
    let region = source.initial_region();
    let regions = tissue.regions().len();
    if region >= regions {
        return result.error(Rule::SourceRegion,
                            format!("source starts in region {region}, but the tissue has {regions} regions"),
                            "set initial_region to the index of the region containing the source");
    }
    // A source on a boundary belongs to the region it emits from
    let Emission { position, direction, .. } = source.emit(&mut McRng::seed_from_u64(RngType::default(), 0));
    if let TissueInput::BoundingCylinder { cylinder, .. } = &input.tissue {
        // The whole beam, not just the point sampled above
        let (center, radius) = match &input.source {
            SourceInput::DirectionalCircular(beam) => (beam.center, beam.radius),
            _                                      => (position, 0.0),
        };
        let offset = (center.x - cylinder.center.x).hypot(center.y - cylinder.center.y);
        if offset + radius > cylinder.radius {
            return result.error(Rule::SourceRegion,
                                format!("source reaches {} mm from the axis of a bounding cylinder of radius {} mm",
                                        offset + radius, cylinder.radius),
                                "shrink or move the source so that it lies inside the bounding cylinder");
        }
    }
    let actual = tissue.region_index_at(position);
    if actual != region && tissue.region_index_at(position + direction * -EPSILON) != region {
        result.error(Rule::SourceRegion,
                     format!("source is declared in region {region} but lies in region {actual}"),
                     format!("set initial_region = {actual}"));
    }
}

fn check_russian_roulette(input: &SimulationInput, result: &mut ValidationResult) {
    let threshold = input.options.russian_roulette_threshold;
    if !(0.0..1.0).contains(&threshold) {
        result.error(Rule::RussianRoulette,
                     format!("Russian roulette threshold {threshold} is outside [0, 1)"),
                     "use 0 to disable Russian roulette, or a small weight such as 0.001");
    } else if threshold > 0.0 && input.options.absorption_weighting == AbsorptionWeightingType::Analog {
        result.error(Rule::RussianRoulette,
                     "Russian roulette has no effect under analog absorption",
                     "set russian_roulette_threshold = 0");
    }
}

fn check_phase_function(input: &SimulationInput, result: &mut ValidationResult) {
    let pf = &input.options.phase_function;
    if let PhaseFunctionInput::ReynoldsMcCormick { alpha } = pf {
        if !(*alpha > -0.5 && *alpha != 0.0) {
            result.error(Rule::PhaseFunctionTable,
                         format!("Reynolds-McCormick alpha = {alpha}"),
                         "use alpha > -1/2, alpha ≠ 0");
        }
    }
    if let Some(op) = input.tissue.region_optical_properties().first() {
        if let Err(e) = PhaseFunction::new(pf, op) {
            result.error(Rule::PhaseFunctionTable, e.to_string(),
                         "tabulate angles ascending with a CDF rising from 0 to 1");
        }
    }
}

fn check_databases(input: &SimulationInput, result: &mut ValidationResult) {
    let databases = &input.options.databases;
    let distinct: HashSet<_> = databases.iter().collect();
    if distinct.len() != databases.len() {
        result.error(Rule::DatabaseCombination, "a photon database is requested more than once",
                     "list each database once");
    }
    use DatabaseType::*;
    for (plain, pmc) in [(DiffuseReflectance, PmcDiffuseReflectance), (DiffuseTransmittance, PmcDiffuseTransmittance)] {
        if distinct.contains(&plain) && distinct.contains(&pmc) {
            result.error(Rule::DatabaseCombination,
                         format!("{plain} and {pmc} databases requested together"),
                         format!("{pmc} contains everything in {plain}: request only {pmc}"));
        }
    }
    if input.options.absorption_weighting == AbsorptionWeightingType::Analog
        && databases.iter().any(|d| d.has_collision_info())
    {
        result.error(Rule::DatabaseCombination,
                     "perturbation databases cannot be replayed under analog absorption",
                     "use Discrete or Continuous absorption weighting");
    }
}

fn check_detectors(input: &SimulationInput, tissue: &dyn Tissue, result: &mut ValidationResult) {
    let awt = input.options.absorption_weighting;
    let ctx = DetectorContext::new(tissue, awt);
    let mut names = HashSet::new();
    for d in &input.detectors {
        let name = d.name();
        if !names.insert(name) {
            result.warn(Rule::DuplicateDetectorName,
                        format!("more than one detector is called '{name}'"),
                        "duplicates are renamed with a numeric suffix");
        }
        if !supports(&d.kind, awt) {
            result.error(Rule::AbsorptionWeightingCapability,
                         format!("{} detectors do not support {awt} absorption weighting", d.kind.type_name()),
                         "use Discrete absorption weighting");
        }
        if let Some(p) = d.kind.perturbation() {
            if p.regions.len() != 1 {
                result.error(Rule::PerturbedRegion,
                             format!("'{name}' perturbs {} regions", p.regions.len()),
                             "perturb exactly one tissue region");
            }
            if p.optical_properties.iter().any(|op| !op.is_physical() || op.n <= 0.0) {
                result.error(Rule::OpticalProperties,
                             format!("'{name}' has unphysical perturbed optical properties"),
                             "use non-negative μa and μs', -1 ≤ g ≤ 1 and n > 0");
            }
        }
        if is_transmittance(d) && !input_below_is_air(&input.tissue) {
            result.error(Rule::TransmittanceInAir,
                         format!("'{name}' measures transmittance into a turbid medium"),
                         "make the medium below the tissue air-like (μa = 0, μs' ≈ 0)");
        }
        if d.kind.is_cylindrical()
            && !(tissue.is_cylindrically_symmetric() && input.source.as_source().is_cylindrically_symmetric())
        {
            result.warn(Rule::CylindricalSymmetry,
                        format!("'{name}' bins in rho, but the problem is not cylindrically symmetric"),
                        "use a detector binned in x and y");
        }
        if let Err(e) = d.build(&ctx) { detector_error(name, e, result) }
    }
}

fn detector_error(name: &str, e: DetectorError, result: &mut ValidationResult) {
    let (rule, remedy) = match e {
        DetectorError::BadPerturbation(_) =>
            (Rule::PerturbedRegion, "give perturbed optical properties for every region and perturb a tissue region"),
        DetectorError::BadBloodVolumeFractions(_) =>
            (Rule::BloodVolumeFraction, "give one blood volume fraction in [0, 1] for every region"),
        _ => (Rule::DetectorBinning, "use count ≥ 2 and stop > start"),
    };
    result.error(rule, format!("'{name}': {e}"), remedy);
}

fn is_transmittance(d: &DetectorInput) -> bool {
    d.kind.virtual_boundary() == VirtualBoundaryType::DiffuseTransmittance
}

fn input_below_is_air(tissue: &TissueInput) -> bool {
    let ops = tissue.region_optical_properties();
    let below = ops[tissue.layers().len() + 1];
    below.mua == 0.0 && below.mus() <= 1e-10
}
