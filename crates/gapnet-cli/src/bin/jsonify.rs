//! # jsonify
//!
//! Converts a NEURON run's time and voltage dumps (one value per line) into
//! the JSON layout used for comparison with `arb_cell<i>_v.json`.

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "jsonify")]
#[command(about = "Convert NEURON time/voltage dumps to a JSON trace", long_about = None)]
struct Cli {
    /// Time steps, one per line
    time: PathBuf,
    /// Voltage measurements, one per line
    voltage: PathBuf,
    /// Output JSON file
    output: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
        }
    };

    match gapnet::jsonify(&cli.time, &cli.voltage, &cli.output) {
        Ok(trace) => {
            println!("{} {} samples", "Converted".green().bold(), trace.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", "jsonify failed:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}
