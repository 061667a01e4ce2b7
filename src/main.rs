use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use stinet::log::{info, level_for_verbosity};
use stinet::params::ParameterPack;
use stinet::random::SeedGenerator;
use stinet::report::ReportSink;
use stinet::simulation::Simulation;
use stinet::StinetError;

/// Individual-based simulation of HIV and gonorrhea spread over a dynamic
/// MSM partnership network.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Random seed; the system time is used when omitted.
    #[arg(short, long)]
    random_seed: Option<u32>,

    /// Path to a JSON parameter file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Days to simulate.
    #[arg(short, long, default_value_t = 365 * 680)]
    days: i32,

    /// Directory for report files; stdout when omitted.
    #[arg(short, long = "output")]
    output_dir: Option<PathBuf>,

    /// Prefix for report files.
    #[arg(long = "prefix", default_value = "stinet")]
    file_prefix: String,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(args: Args) -> Result<(), StinetError> {
    stinet::log::init(level_for_verbosity(args.verbose));

    let params = match &args.config {
        Some(path) => ParameterPack::from_json_file(path)?,
        None => ParameterPack::default(),
    };
    let seed = args
        .random_seed
        .unwrap_or_else(SeedGenerator::seed_from_system_time);
    let mut reports = match &args.output_dir {
        Some(directory) => ReportSink::to_files(directory, &args.file_prefix)?,
        None => ReportSink::to_stdout(),
    };

    info!("simulating {} days with seed {seed}", args.days);
    let mut simulation = Simulation::new(params, seed);
    simulation.run(args.days, &mut reports)
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}
