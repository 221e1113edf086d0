//! arbor - behaviour tree runner.
//!
//! - `arbor check <tree>` - validate a tree document
//! - `arbor inspect <tree>` - print the instantiated node layout
//! - `arbor run <tree>` - tick a tree and report the result

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use arbor_bt::{instantiate_with, InstanceOptions};
use arbor_cli::{describe, load_template, run, RunnerConfig};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Load, validate and tick behaviour trees", version)]
struct Cli {
    /// Runner config (defaults to arbor.yaml next to the tree)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a tree document
    Check { tree: PathBuf },

    /// Print every node with its depth, kind and call stack
    Inspect { tree: PathBuf },

    /// Tick a tree until it completes or the tick limit is hit
    Run {
        tree: PathBuf,

        /// Maximum number of ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Seconds per tick
        #[arg(long)]
        dt: Option<f32>,

        /// Seed for random selectors
        #[arg(long)]
        seed: Option<u64>,

        /// Print trace events
        #[arg(long)]
        trace: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Check { tree } => {
            let template = load_template(&tree)?;
            let runtime = template.instantiate()?;
            println!(
                "{}: ok ({} nodes, {} call stacks)",
                tree.display(),
                runtime.len(),
                runtime.stack_count()
            );
            Ok(())
        }
        Commands::Inspect { tree } => {
            let config = RunnerConfig::load_for_tree(&tree, cli.config.as_deref())?;
            let template = load_template(&tree)?;
            let runtime = instantiate_with(&template, InstanceOptions::with_seed(config.seed))?;
            for line in describe(&runtime) {
                println!("{line}");
            }
            for property in runtime.blackboard().properties() {
                println!("bb {} = {:?}", property.key, property.value);
            }
            Ok(())
        }
        Commands::Run {
            tree,
            ticks,
            dt,
            seed,
            trace,
        } => {
            let mut config = RunnerConfig::load_for_tree(&tree, cli.config.as_deref())?;
            if let Some(ticks) = ticks {
                config.max_ticks = ticks;
            }
            if let Some(dt) = dt {
                config.dt_seconds = dt;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            tracing::info!(tree = %tree.display(), ?config, "Starting run");

            let template = load_template(&tree)?;
            let summary = run(&template, &config, trace)?;
            for event in &summary.trace.events {
                println!("{:>6} {:<16} {} {}", event.tick, event.tag, event.a, event.b);
            }
            println!("{:?} after {} ticks", summary.status, summary.ticks);
            for property in summary.blackboard.properties() {
                println!("bb {} = {:?}", property.key, property.value);
            }
            Ok(())
        }
    }
}
