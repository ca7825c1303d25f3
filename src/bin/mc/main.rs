mod cli;
mod progress;

type Res<T> = Result<T, Box<dyn Error>>;

fn main() -> Res<()> {
    env_logger::init();
    let args = Cli::parse();
    rayon::ThreadPoolBuilder::new().num_threads(args.threads).build_global()?;
    match args.command {
        Command::Run { infiles, out, partitions } => run(&infiles, &out, partitions),
        Command::Post { infile, out } => post(&infile, &out),
        Command::Check { infiles } => check(&infiles),
        Command::Infiles { out } => write_examples(&out),
    }
}

fn run(infiles: &[PathBuf], out: &Path, partitions: Option<usize>) -> Res<()> {
    let inputs = infiles.iter()
        .map(read_input_file)
        .collect::<Result<Vec<_>, _>>()?;

    // Make sure results can be written before starting the potentially long computation
    std::fs::create_dir_all(out)
        .map_err(|e| format!("Can't write to {}: {e}", out.display()))?;

    let total = inputs.iter().map(|i| i.n).sum();
    let progress = Arc::new(progress::Progress::new(total));
    let bar = Arc::clone(&progress);
    let report: Arc<dyn Fn(u64) + Send + Sync> = Arc::new(move |n| bar.photons_done(n));
    let control = RunControl {
        database_dir: Some(out.into()),
        partitions,
        progress: Some(report),
        ..RunControl::default()
    };

    let mut timing = Progress::new();
    let outputs = run_batch(inputs, &control);
    progress.final_report();
    timing.done_with_message("Transport");

    let mut failed = 0;
    for (infile, output) in infiles.iter().zip(outputs) {
        match output {
            Ok(output) => {
                let dir = out.join(&output.input.output_name);
                timing.start(&format!("Writing results to {}", dir.display()));
                write_simulation_output(&dir, &output)?;
                timing.done();
                report_statistics(&output.statistics);
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}: {e}", infile.display());
            }
        }
    }
    if failed > 0 { Err(format!("{failed} of {} simulations failed", infiles.len()).into()) }
    else          { Ok(()) }
}

fn report_statistics(s: &PhotonStatistics) {
    println!("  launched {:>12}  reflected {:>12}  transmitted {:>12}  absorbed {:>12}  killed {:>12}",
             group_digits(s.launched),
             group_digits(s.exited_top),
             group_digits(s.exited_bottom),
             group_digits(s.absorbed),
             group_digits(s.killed_russian_roulette
                          + s.killed_over_maximum_collisions
                          + s.killed_over_maximum_path_length));
    if s.aborted > 0 { println!("  {} photons aborted", group_digits(s.aborted)) }
}

fn post(infile: &Path, out: &Path) -> Res<()> {
    let text = std::fs::read_to_string(infile)?;
    let input: PostProcessorInput = toml::from_str(&text)
        .map_err(|e| format!("{}: {e}", infile.display()))?;
    let mut timing = Progress::new();
    timing.start(&format!("Replaying {} database from {}", input.database, input.input_folder.display()));
    let output = post_process(&input)?;
    timing.done();
    println!("{} photons replayed", group_digits(output.replayed));
    let dir = out.join(&input.output_name);
    write_postprocessor_output(&dir, &input, &output)?;
    println!("Results written to {}", dir.display());
    Ok(())
}

fn check(infiles: &[PathBuf]) -> Res<()> {
    let mut invalid = 0;
    for infile in infiles {
        let result = validate(&read_input_file(infile)?);
        if result.is_valid() { println!("{}: OK", infile.display()) }
        else                 { invalid += 1 }
        if !result.is_valid() || !result.warnings.is_empty() {
            println!("{}:{result}", infile.display());
        }
    }
    if invalid > 0 { Err(format!("{invalid} invalid input files").into()) }
    else           { Ok(()) }
}

fn write_examples(out: &Path) -> Res<()> {
    std::fs::create_dir_all(out)?;
    for input in example_inputs() {
        let path = out.join(format!("infile_{}.toml", input.output_name));
        write_input_file(&input, &path)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::Arc,
};
use clap::Parser;
use cli::{Cli, Command};
use mcphoton::{
    config::{example_inputs, read_input_file, write_input_file},
    io::{write_postprocessor_output, write_simulation_output},
    simulation::PhotonStatistics,
    utils::{group_digits, timing::Progress},
    post_process, run_batch, validate, PostProcessorInput, RunControl,
};
