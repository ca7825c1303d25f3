use ndarray::Dimension;
use mcphoton::config::{from_toml_str, to_toml_string, SimulationInput};
use mcphoton::absorption::AbsorptionWeightingType;
use mcphoton::detector::{DetectorError, DetectorInput, DetectorKind, Perturbation};
use mcphoton::optics::OpticalProperties;
use mcphoton::phase_function::PhaseFunctionInput;
use mcphoton::simulation::SimulationOptions;
use mcphoton::tissue::{LayerInput, TissueInput};
use mcphoton::{run, Range, RunControl};

use float_eq::assert_float_eq;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn op(mua: f64) -> OpticalProperties { OpticalProperties::new(mua, 1.0, 0.8, 1.4) }

fn rho() -> Range { Range::new(0.0, 10.0, 51) }

fn layers(layers: Vec<LayerInput>, n: u64, detectors: Vec<DetectorKind>) -> SimulationInput {
    SimulationInput {
        n,
        options: SimulationOptions { seed: Some(12345), ..SimulationOptions::default() },
        tissue: TissueInput::MultiLayer {
            layers,
            above: OpticalProperties::air(),
            below: OpticalProperties::air(),
        },
        detectors: detectors.into_iter().map(DetectorInput::new).collect(),
        ..SimulationInput::default()
    }
}

fn layer(thickness: f64, optical_properties: OpticalProperties) -> LayerInput {
    LayerInput { thickness, optical_properties }
}

#[test]
fn every_photon_is_accounted_for() {
    let input = layers(vec![layer(5.0, op(0.01))], 100, vec![DetectorKind::RDiffuse]);
    let output = run(input, &RunControl::default()).unwrap();
    let s = &output.statistics;
    assert_eq!(s.launched, 100);
    assert_eq!(s.accounted_for(), 100);
}

#[rstest(/**/ absorption_weighting,
         case(AbsorptionWeightingType::Discrete),
         case(AbsorptionWeightingType::Continuous),
)]
fn roulette_kills_are_accounted_for(absorption_weighting: AbsorptionWeightingType) {
    let matched = OpticalProperties { n: 1.4, ..OpticalProperties::air() };
    let input = SimulationInput {
        n: 100,
        options: SimulationOptions {
            seed: Some(2024),
            absorption_weighting,
            russian_roulette_threshold: 0.001,
            ..SimulationOptions::default()
        },
        tissue: TissueInput::MultiLayer { layers: vec![layer(5.0, op(1.0))], above: matched, below: matched },
        detectors: vec![DetectorInput::new(DetectorKind::RDiffuse), DetectorInput::new(DetectorKind::RSpecular)],
        ..SimulationInput::default()
    };
    let output = run(input, &RunControl::default()).unwrap();
    let s = &output.statistics;
    assert_eq!(s.launched, 100);
    assert_eq!(s.specular_weight, 0.0);
    assert_eq!(output.mean("RSpecular").unwrap().sum(), 0.0);
    assert!(s.killed_russian_roulette > 0);
    assert_eq!(s.exited_top + s.exited_bottom + s.killed_russian_roulette, 100);
    assert_eq!(s.accounted_for(), 100);
}

#[test]
fn radiance_plane_on_layer_interface_is_tallied() {
    let radiance = DetectorKind::RadianceOfRhoAtZ { rho: rho(), z: 1.5 };
    let input = layers(vec![layer(1.5, op(0.01)), layer(3.0, op(0.02))], 300, vec![radiance]);
    let output = run(input, &RunControl::default()).unwrap();
    assert!(output.mean("RadianceOfRhoAtZ").unwrap().sum() > 0.0);
}

#[test]
fn surface_total_equals_sum_over_rho_bins() {
    let input = layers(vec![layer(5.0, op(0.01))], 2000,
                       vec![DetectorKind::RDiffuse, DetectorKind::ROfRho { rho: rho() }]);
    let output = run(input, &RunControl::default()).unwrap();
    let total = output.mean("RDiffuse").unwrap().sum();
    let rofrho = output.detector("ROfRho").unwrap();
    let binned: f64 = rofrho.tally_data().mean().indexed_iter()
        .map(|(i, m)| m * rofrho.binning().normalization_factor(i.slice()))
        .sum();
    assert_float_eq!(binned, total, rmax <= 1e-10);
}

#[test]
fn empty_layer_changes_nothing() {
    let detectors = || vec![DetectorKind::ROfRho { rho: rho() }, DetectorKind::TDiffuse];
    let plain = layers(vec![layer(2.0, op(0.01)), layer(3.0, op(0.02))], 500, detectors());
    let padded = layers(vec![layer(2.0, op(0.01)), layer(0.0, op(5.0)), layer(3.0, op(0.02))], 500, detectors());
    let control = RunControl { partitions: Some(2), ..RunControl::default() };
    let plain  = run(plain,  &control).unwrap();
    let padded = run(padded, &control).unwrap();
    for name in ["ROfRho", "TDiffuse"] {
        for (a, b) in plain.mean(name).unwrap().iter().zip(padded.mean(name).unwrap()) {
            assert_float_eq!(*a, *b, rmax <= 1e-12);
        }
    }
}

#[test]
fn unperturbed_pmc_matches_analog_tally() {
    let ops = vec![OpticalProperties::air(), op(0.01), OpticalProperties::air()];
    let pmc = DetectorKind::PmcROfRho { rho: rho(), perturbation: Perturbation { regions: vec![1], optical_properties: ops } };
    let input = layers(vec![layer(20.0, op(0.01))], 1000, vec![DetectorKind::ROfRho { rho: rho() }, pmc]);
    let output = run(input, &RunControl::default()).unwrap();
    for (a, b) in output.mean("ROfRho").unwrap().iter().zip(output.mean("pMCROfRho").unwrap()) {
        assert_float_eq!(*a, *b, rmax <= 1e-12);
    }
}

#[rstest(/**/ alpha, case(0.5))]
fn reynolds_mccormick_reduces_to_henyey_greenstein(alpha: f64) {
    let input = |phase_function| SimulationInput {
        options: SimulationOptions { seed: Some(7), phase_function, ..SimulationOptions::default() },
        ..layers(vec![layer(10.0, op(0.01))], 300, vec![DetectorKind::ROfRho { rho: rho() }])
    };
    let hg = run(input(PhaseFunctionInput::HenyeyGreenstein), &RunControl::default()).unwrap();
    let rm = run(input(PhaseFunctionInput::ReynoldsMcCormick { alpha }), &RunControl::default()).unwrap();
    assert_eq!(hg.mean("ROfRho"), rm.mean("ROfRho"));
}

#[test]
fn results_are_normalized_once() {
    let input = layers(vec![layer(5.0, op(0.01))], 50, vec![DetectorKind::RDiffuse]);
    let mut output = run(input, &RunControl::default()).unwrap();
    assert_eq!(output.detectors[0].normalize(50), Err(DetectorError::AlreadyNormalized));
}

#[test]
fn run_input_survives_toml() {
    let input = layers(vec![layer(5.0, op(0.01))], 10, vec![DetectorKind::RDiffuse]);
    let output = run(input, &RunControl::default()).unwrap();
    let text = to_toml_string(&output.input).unwrap();
    assert_eq!(from_toml_str(&text).unwrap(), output.input);
}
