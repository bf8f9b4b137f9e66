//! Pepper reach environment CLI.
//!
//! Provides two modes of operation:
//! - `run`: make a task on the kinematic backend, reset, and step it with
//!   uniform random actions, timing each phase
//! - `info`: print registered tasks and crate versions

mod stats;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pepper_core::prelude::*;
use pepper_env::prelude::*;
use pepper_sim::KinematicSession;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::stats::EpisodeStats;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Pepper reach/touch task environment.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Step a task with random actions and print timings.
    Run {
        /// Task id.
        #[arg(short, long, default_value = PEPPER_REACH)]
        task: String,

        /// Number of steps.
        #[arg(short = 'n', long, default_value_t = 1000)]
        steps: u32,

        /// Random seed for the environment and the action sampler.
        #[arg(short, long)]
        seed: Option<u64>,

        /// TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print registered tasks and crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn run(task: &str, steps: u32, seed: Option<u64>, config: Option<&Path>) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => EnvConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EnvConfig::default(),
    };

    let start = Instant::now();
    let session = KinematicSession::from_config(&config).context("building robot model")?;
    let mut env = make(task, config.clone(), Box::new(session))?;
    println!("=== Make === {:?}", start.elapsed());

    let start = Instant::now();
    env.reset(seed)?;
    println!("=== Reset === {:?}", start.elapsed());

    let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or(config.simulation.seed));
    let mut stats = EpisodeStats::new();
    let success_reward = config.reward.success;

    let start = Instant::now();
    for _ in 0..steps {
        let action = env.action_space().sample(&mut rng);
        let result = env.step(&action)?;
        stats.record(&result);

        if result.done() {
            env.reset(None)?;
        }
        if (result.reward - success_reward).abs() < f32::EPSILON {
            println!("Touch!");
        }
    }
    println!("=== Act === {:?}", start.elapsed());

    println!(
        "episodes={}, successes={}, safety_violations={}, steps={}",
        stats.episodes_completed, stats.successes, stats.safety_violations, stats.total_steps
    );
    if let (Some(length), Some(reward)) = (stats.mean_episode_length(), stats.mean_reward()) {
        println!("mean episode length={length:.1}, mean reward={reward:.3}");
    }

    env.close()?;
    info!(task, "run finished");
    Ok(())
}

fn run_info() {
    println!("pepper-reach v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("tasks:");
    let registry = Registry::with_defaults();
    for id in registry.ids() {
        if let Some(spec) = registry.get(id) {
            println!("  {id:<22} {:?}  {}", spec.mode, spec.description);
        }
    }
    println!();
    println!("crates:");
    println!("  pepper-core        {}", env!("CARGO_PKG_VERSION"));
    println!("  pepper-env         {}", env!("CARGO_PKG_VERSION"));
    println!("  pepper-sim         {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("edition: 2024");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            task,
            steps,
            seed,
            config,
        }) => run(&task, steps, seed, config.as_deref()),
        Some(Commands::Info) => {
            run_info();
            Ok(())
        }
        None => run(PEPPER_REACH, 1000, None, None),
    }
}
