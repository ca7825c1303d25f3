pub mod types;
pub use types::*;

pub mod optics;
pub mod rng;
pub mod phase_function;
pub mod tissue;
pub mod source;
pub mod photon;
pub mod absorption;
pub mod virtual_boundary;
pub mod detector;
pub mod database;

pub mod config;
pub mod validation;
pub mod simulation;
pub mod postprocess;
pub mod io;
pub mod utils;

pub use config::SimulationInput;
pub use simulation::{run, run_batch, RunControl, Simulation, SimulationOutput};
pub use postprocess::{post_process, PostProcessorInput, PostProcessorOutput};
pub use validation::{validate, ValidationResult};
