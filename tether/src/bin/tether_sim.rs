use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use std::sync::Arc;
use tether::{
    record::BufferedRecorder, run_episodes, EpisodeReport, LocalBus, PdController, Pendulum,
    SimConfig, Subscription as _,
};

/// Balance a simulated pendulum with a controller attached over an in-process bus
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of episodes
    #[arg(short, long, default_value_t = 3)]
    n_episodes: usize,

    /// Seed of the first episode
    #[arg(short, long, default_value_t = 42)]
    seed: i64,

    /// Path to a YAML configuration, defaults are used if omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Writes the configuration in use to this path and exits
    #[arg(long)]
    save_config: Option<String>,
}

fn summary(reports: &[EpisodeReport]) -> String {
    let n_failed = reports.iter().filter(|r| r.is_failure()).count();
    let mean = if reports.is_empty() {
        0.0
    } else {
        reports.iter().map(|r| r.total_reward).sum::<f32>() / reports.len() as f32
    };
    format!(
        "{} episodes, {} failed, mean total reward: {:.1}",
        reports.len(),
        n_failed,
        mean
    )
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(path) = &args.save_config {
        config.save(path)?;
        info!("Saved configuration to {}", path);
        return Ok(());
    }
    if config.controller.codec.format != config.episode.codec.format {
        bail!("payload formats of episodes and controller differ");
    }

    let bus = Arc::new(LocalBus::new(config.bus.clone()));
    let mut controller = PdController::new(config.controller.clone()).attach(bus.clone())?;
    let mut recorder = BufferedRecorder::new();

    let reports = run_episodes::<Pendulum, _, _>(
        &config.env,
        args.seed,
        args.n_episodes,
        bus.as_ref(),
        &config.episode,
        &mut recorder,
    )?;

    controller.cancel();
    bus.close();
    info!("{}", summary(&reports));

    Ok(())
}
