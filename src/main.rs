mod trainer;
#[cfg(feature = "window")]
mod window;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use flappy::{EpisodeContext, GameConfig, NeverAbort, NullRenderer, PopulationEvaluator};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use trainer::Trainer;

#[derive(Parser)]
#[command(
    name = "flappy",
    version,
    about = "Evolve jump controllers for a side-scrolling obstacle game"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evolve a population of feed-forward controllers.
    Train(TrainArgs),
    /// Play a single actor yourself (Space flaps, R restarts, Escape quits).
    Play(PlayArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// JSON file overriding the built-in configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    generations: Option<u32>,
    #[arg(long)]
    population: Option<usize>,
    /// Ticks after which an episode stops even with actors alive.
    #[arg(long)]
    max_steps: Option<u64>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Evaluate policies on the rayon pool.
    #[arg(long)]
    parallel: bool,
    /// Watch training in a window at the configured tick rate.
    #[arg(long)]
    window: bool,
    /// Draw lines from each actor to the gap it is aiming for.
    #[arg(long)]
    draw_lines: bool,
}

#[derive(Args)]
struct PlayArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long)]
    draw_lines: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Train(args) => train(args),
        Command::Play(args) => play(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GameConfig> {
    match path {
        Some(path) => GameConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(GameConfig::default()),
    }
}

fn train(args: TrainArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(generations) = args.generations {
        config.episode.generations = generations;
    }
    if let Some(population) = args.population {
        config.episode.population = population;
    }
    if args.max_steps.is_some() {
        config.episode.max_steps = args.max_steps;
    }
    config.episode.parallel_policies |= args.parallel;
    config.field.draw_lines |= args.draw_lines;

    let context = EpisodeContext::new(config, args.seed)?;
    let episode = &context.config().episode;
    let trainer = Trainer::new(episode.population, args.seed);
    info!(
        population = episode.population,
        generations = episode.generations,
        seed = args.seed,
        "training started"
    );

    if args.window {
        return train_windowed(context, trainer);
    }
    train_headless(context, trainer)
}

fn train_headless(mut context: EpisodeContext, mut trainer: Trainer) -> anyhow::Result<()> {
    for _ in 0..context.config().episode.generations {
        let evaluator = PopulationEvaluator::new(&mut context, trainer.policies())?;
        let outcome = evaluator.run(&mut NeverAbort, &mut NullRenderer);
        trainer.evolve(&outcome);
    }
    if let Some(best) = trainer.history().iter().max_by(|a, b| a.best.total_cmp(&b.best)) {
        info!(
            generation = best.generation,
            fitness = best.best,
            score = best.score,
            "best generation"
        );
    }
    Ok(())
}

#[cfg(feature = "window")]
fn train_windowed(context: EpisodeContext, trainer: Trainer) -> anyhow::Result<()> {
    window::run(context, window::Mode::Train(trainer))
}

#[cfg(not(feature = "window"))]
fn train_windowed(_: EpisodeContext, _: Trainer) -> anyhow::Result<()> {
    anyhow::bail!("built without the `window` feature")
}

fn play(args: PlayArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    config.episode.population = 1;
    config.episode.max_steps = None;
    config.field.draw_lines |= args.draw_lines;
    play_windowed(EpisodeContext::new(config, args.seed)?)
}

#[cfg(feature = "window")]
fn play_windowed(context: EpisodeContext) -> anyhow::Result<()> {
    window::run(context, window::Mode::Play)
}

#[cfg(not(feature = "window"))]
fn play_windowed(_: EpisodeContext) -> anyhow::Result<()> {
    anyhow::bail!("built without the `window` feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_flags_parse() {
        let cli = Cli::try_parse_from(["flappy", "train", "--population", "8", "--max-steps", "90"])
            .unwrap();
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.population, Some(8));
        assert_eq!(args.max_steps, Some(90));
        assert!(!args.window);
    }

    #[test]
    fn networks_are_not_written_to_disk() {
        assert!(Cli::try_parse_from(["flappy", "train", "--save", "best.json"]).is_err());
    }
}
