//! cpsched CLI - construction scheduling engine front end.
//!
//! Loads a JSON scenario file, builds a `SchedulingContext`, runs the
//! engine, and reports the resulting schedule as text or JSON. This crate
//! owns the only wire format the engine has: the core never deserialises
//! anything itself.

mod scenario;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scenario::ScenarioInput;

#[derive(Parser)]
#[command(name = "cpsched")]
#[command(author, version, about = "Construction project scheduling engine", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a scenario file without scheduling.
    Check {
        /// Input scenario file (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Schedule a project from a scenario file.
    Schedule {
        /// Input scenario file (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show only the critical path
        #[arg(long)]
        critical_only: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry().with(fmt::layer()).with(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { file } => cmd_check(&file),
        Commands::Schedule { file, format, output, critical_only } => {
            cmd_schedule(&file, &format, output.as_deref(), critical_only)
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }

    Ok(())
}

fn load_context(file: &PathBuf) -> Result<cpsched_core::SchedulingContext> {
    let raw = std::fs::read_to_string(file).with_context(|| format!("reading scenario file {}", file.display()))?;
    let input: ScenarioInput =
        serde_json::from_str(&raw).with_context(|| format!("parsing scenario file {}", file.display()))?;
    input.into_context().context("translating scenario into a scheduling context")
}

fn cmd_check(file: &PathBuf) -> Result<()> {
    let ctx = load_context(file)?;
    ctx.validate().context("scenario failed validation")?;
    let instances = cpsched_engine::generator::generate(&ctx).context("generating task instances")?;
    cpsched_engine::generator::validate(&instances).context("validating generated task graph")?;
    println!("ok: {} task instances, no cycles, all predecessors resolved", instances.len());
    Ok(())
}

fn cmd_schedule(file: &PathBuf, format: &str, output: Option<&std::path::Path>, critical_only: bool) -> Result<()> {
    let ctx = load_context(file)?;
    let schedule = cpsched_engine::run_schedule(&ctx).context("running scheduling engine")?;

    let tasks: Vec<_> = if critical_only { schedule.critical_tasks().into_iter().cloned().collect() } else { schedule.tasks.clone() };

    let rendered = match format {
        "json" => serde_json::to_string_pretty(&tasks).context("serialising schedule as JSON")?,
        _ => render_text(&tasks),
    };

    match output {
        Some(path) => std::fs::write(path, rendered).with_context(|| format!("writing output to {}", path.display()))?,
        None => println!("{rendered}"),
    }

    Ok(())
}

fn render_text(tasks: &[cpsched_core::ScheduledTask]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<24} {:<12} {:<12} {:>6} {:>6}\n", "task", "start", "end", "crews", "float"));
    for task in tasks {
        out.push_str(&format!(
            "{:<24} {:<12} {:<12} {:>6} {:>6}\n",
            task.id, task.start_date, task.end_date, task.allocated_crews, task.float
        ));
    }
    out
}
