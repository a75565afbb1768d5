mod canon;
mod error;
mod frontier;
mod inputs;
mod report;
mod search;
mod solution;
mod summa;

use std::error::Error;
use std::thread;

use summa::Summa;

use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(version, about = "Summa", long_about = None)]
#[command(
    after_help = "Example:\n  ./summa --values 1 2 3 4 5 6 --totals 12 9"
)]
struct Args {
    /// Constituent values
    #[arg(
        short = 'v',
        long = "values",
        num_args = 1..,
        allow_negative_numbers = true,
        conflicts_with = "values_path",
        required_unless_present = "values_path"
    )]
    values: Vec<f64>,

    /// Target totals
    #[arg(
        short = 't',
        long = "totals",
        num_args = 1..,
        allow_negative_numbers = true,
        conflicts_with = "totals_path",
        required_unless_present = "totals_path"
    )]
    totals: Vec<f64>,

    /// Path to values. File should contain one float per line.
    #[arg(long = "values-path")]
    values_path: Option<String>,

    /// Path to totals. File should contain one float per line.
    #[arg(long = "totals-path")]
    totals_path: Option<String>,

    /// Acceptable tolerance when comparing floats
    #[arg(long, default_value_t = 1e-4)]
    tolerance: f64,

    /// Number of decimal places in the rendered output
    #[arg(short = 'p', long, default_value_t = 2)]
    precision: usize,

    /// Output file
    #[arg(short = 'o', long = "out", default_value = "solutions.txt")]
    output_file: String,

    /// Number of threads
    #[arg(short = 'j', long = "thr", default_value_t = thread::available_parallelism().map(|n| n.get()).unwrap_or(1))]
    num_threads: usize,

    /// Stop after visiting this many search nodes
    #[arg(long = "max-nodes")]
    max_nodes: Option<u64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Command line parsing
    let args = Args::parse();

    // Resolve inline lists vs. value files
    let values = match &args.values_path {
        Some(path) => inputs::read_values_file(path)?,
        None => args.values.clone(),
    };
    let totals = match &args.totals_path {
        Some(path) => inputs::read_values_file(path)?,
        None => args.totals.clone(),
    };

    // Initialize Summa
    let mut sm = Summa::new();
    sm.set_options(
        &values,
        &totals,
        &args.output_file,
        args.tolerance,
        args.precision,
        args.num_threads as u64,
        args.max_nodes,
    )?;

    // Run the search
    let summary = sm.solve()?;
    println!(
        "\nFound {} unique solution(s). Output written to {}.",
        summary.found, args.output_file
    );
    if !summary.complete {
        println!("Search incomplete: the node budget ran out before the space was covered.");
    }

    // Success return
    Ok(())
}
