//! # GapNet CLI
//!
//! Runs the gap junction miniapp and writes `arb_cell<i>_v.json` into the
//! current directory.
//!
//! Takes at most one positional argument, the JSON parameter file. There are
//! no flags: anything given on the command line is taken as a path. Exits
//! with status 1 on any error.

use clap::Parser;
use colored::Colorize;
use gapnet::{read_options, simulate, write_trace_json, GapParams};
use gapnet_sim::{make_context, MeterManager};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gapnet")]
#[command(about = "Two branching cells coupled by gap junctions", long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// JSON parameter file (defaults are used when omitted)
    #[arg(value_name = "CONFIG", allow_hyphen_values = true, trailing_var_arg = true)]
    config: Vec<PathBuf>,
}

fn print_params(params: &GapParams) {
    println!("{}", "Parameters:".green().bold());
    println!("  {:<14}{}", "name", params.name.cyan());
    println!("  {:<14}{}", "cells", params.num_cells);
    println!("  {:<14}{}", "gap junctions", params.num_gj);
    println!("  {:<14}{} ms", "duration", params.duration);
    println!("  {:<14}{}", "stim-tuft", params.stim_tuft);
    println!("  {:<14}{}", "tweak", params.tweak);
    println!("  {:<14}{}", "gj enabled", params.gj);
    println!();
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::try_parse()?;

    let context = make_context()?;
    let params = read_options(&cli.config)?;
    print_params(&params);

    let mut meters = MeterManager::new();
    let traces = simulate(&params, &context, &mut meters)?;

    let written = write_trace_json(&traces, Path::new("."))?;
    println!("{} {} trace files", "Wrote".green().bold(), written.len());

    print!("{}", meters.report());
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", "exception caught in gap junction example:".red().bold());
            eprintln!("{:#}", e);
            ExitCode::from(1)
        }
    }
}
