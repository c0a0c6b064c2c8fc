//! Headless runner CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rp_headless::{run, RunConfig};

/// Run the simulation core without a renderer and print a JSON report.
#[derive(Debug, Parser)]
#[command(name = "rp_headless", version, about)]
struct Args {
    /// Extra template file (RON) merged over the standard set.
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Number of fixed-step ticks to run.
    #[arg(long, default_value_t = 400)]
    ticks: u32,

    /// Seconds of simulation time per tick.
    #[arg(long, default_value_t = 0.05)]
    dt: f32,

    /// Number of scouts in the skirmish.
    #[arg(long, default_value_t = 4)]
    scouts: u32,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = RunConfig {
        templates: args.templates,
        ticks: args.ticks,
        dt: args.dt,
        scouts: args.scouts,
    };

    let report = match run(&config) {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(%err, "headless run failed");
            return ExitCode::FAILURE;
        }
    };

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match json {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(%err, "failed to encode report");
            ExitCode::FAILURE
        }
    }
}
