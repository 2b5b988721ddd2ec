use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use evodrive::simulation::brain::Brain;
use evodrive::simulation::params::Params;
use evodrive::simulation::population::{Population, replay};
use evodrive::simulation::sensor::SensorEngine;
use evodrive::simulation::track::Track;

#[derive(Parser)]
#[command(about = "Evolve neural-network drivers for a 2D track")]
struct Cli {
    /// JSON parameter file; defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// JSON track file; a procedural oval is used when omitted.
    #[arg(long, global = true)]
    track: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a population.
    Train(TrainArgs),
    /// Drive a saved brain once and report how it did.
    Replay {
        /// Brain JSON file.
        brain: PathBuf,
    },
    /// Write the default parameters to a file.
    DumpConfig {
        /// Output path.
        path: PathBuf,
    },
}

#[derive(Args)]
struct TrainArgs {
    /// Generations to run; runs until interrupted when omitted.
    #[arg(long)]
    generations: Option<u32>,
    /// Override the population size.
    #[arg(long)]
    population: Option<usize>,
    /// Override the worker count.
    #[arg(long)]
    workers: Option<usize>,
    /// Directory for champion brains; nothing is saved when omitted.
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let params = match &cli.config {
        Some(path) => Params::load_from_file(&path.to_string_lossy())
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Params::default(),
    };

    match cli.command {
        Command::Train(args) => train(params, load_track(cli.track.as_deref())?, args),
        Command::Replay { brain } => replay_brain(params, load_track(cli.track.as_deref())?, &brain),
        Command::DumpConfig { path } => {
            params
                .save_to_file(&path.to_string_lossy())
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "wrote parameters");
            Ok(())
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

fn load_track(path: Option<&Path>) -> Result<Arc<Track>> {
    let track = match path {
        Some(path) => Track::load_from_file(&path.to_string_lossy())
            .with_context(|| format!("loading track {}", path.display()))?,
        None => Track::oval(800, 500, 60.0, 8).context("building the default track")?,
    };
    info!(
        width = track.width(),
        height = track.height(),
        checkpoints = track.checkpoints().len(),
        "track ready"
    );
    Ok(Arc::new(track))
}

fn train(mut params: Params, track: Arc<Track>, args: TrainArgs) -> Result<()> {
    if let Some(size) = args.population {
        params.population_size = size;
    }
    if args.workers.is_some() {
        params.workers = args.workers;
    }
    if let Some(dir) = &args.save_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut population = Population::new(track, params)?;
    info!("Starting training");

    loop {
        if args.generations.is_some_and(|limit| population.generation() >= limit) {
            break;
        }

        let previous_best = population.best_fitness();
        let summary = population.run_generation()?;

        if let (Some(dir), Some(champion)) = (&args.save_dir, population.champion()) {
            if summary.best_fitness > previous_best {
                save_champion(dir, summary.generation, champion.brain())?;
            }
        }
    }

    info!(
        generations = population.generation(),
        best = population.best_fitness(),
        cache = %population.sensors().stats(),
        "training finished"
    );
    Ok(())
}

fn save_champion(dir: &Path, generation: u32, brain: &Brain) -> Result<()> {
    let file = dir.join(format!(
        "champion-gen{}-{}.json",
        generation,
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));
    brain
        .save_to_file(&file.to_string_lossy())
        .with_context(|| format!("saving {}", file.display()))?;
    info!(path = %file.display(), "saved champion");
    Ok(())
}

fn replay_brain(params: Params, track: Arc<Track>, path: &Path) -> Result<()> {
    let brain = Brain::load_controller(&path.to_string_lossy())
        .with_context(|| format!("loading brain {}", path.display()))?;
    let sensors = SensorEngine::new(track, params.sensor.clone());
    let genome = replay(&sensors, &params.kinematics, brain)?;
    let agent = genome.agent();

    info!(
        score = agent.score(),
        lifetime = agent.lifetime(),
        checkpoints = agent.checkpoints_passed(),
        laps = agent.laps(),
        cause = ?agent.crash_cause(),
        "replay finished"
    );
    Ok(())
}
