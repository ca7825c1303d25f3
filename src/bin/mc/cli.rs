/// Command line interface for `mc` executable
#[derive(clap::Parser, Debug, Clone)]
#[clap(
    name = "mc",
    about = "Monte Carlo photon transport in layered tissue",
)]
pub (super) struct Cli {
    /// Maximum number of rayon threads
    #[clap(short = 'j', long, default_value = "4")]
    pub threads: usize,

    #[clap(subcommand)]
    pub (super) command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub (super) enum Command {

    /// Transport photons through the tissues described in TOML input files
    Run {
        /// Simulation input files
        #[clap(required = true)]
        infiles: Vec<PathBuf>,

        /// Each input's results go to `<out>/<output_name>/`
        #[clap(short, long, default_value = ".")]
        out: PathBuf,

        /// Number of photon partitions per simulation [default: number of threads]
        #[clap(short, long)]
        partitions: Option<usize>,
    },

    /// Fill new detectors from a photon database written by an earlier run
    Post {
        /// Post-processor input file
        infile: PathBuf,

        /// Results go to `<out>/<output_name>/`
        #[clap(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Check input files without running them
    Check {
        #[clap(required = true)]
        infiles: Vec<PathBuf>,
    },

    /// Write a set of example input files
    Infiles {
        /// Directory in which to write the files
        #[clap(short, long, default_value = ".")]
        out: PathBuf,
    },
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::path::PathBuf;
