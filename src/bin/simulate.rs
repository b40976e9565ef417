//! Batch match simulator.
//!
//! Plays automated matches between two in-process devices joined by an
//! in-memory link, checks that both boards agree at the end of every match,
//! and writes one JSON record per match.
//!
//! Usage:
//!   cargo run --release --bin simulate -- [OPTIONS]

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use borderlink::autoplay::Strategy;
use borderlink::config::{load_settings, Settings};
use borderlink::simulate::{self, SimError};

#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(about = "Play automated borderlink matches and record the results as JSONL")]
struct Args {
    /// Number of matches to play
    #[arg(short, long)]
    games: Option<usize>,

    /// Number of matches played at once
    #[arg(short, long)]
    threads: Option<usize>,

    /// Random seed, 0 for entropy
    #[arg(short, long)]
    seed: Option<u64>,

    /// Turn cap per match
    #[arg(long)]
    max_turns: Option<u32>,

    /// Strategy for player one
    #[arg(long, value_enum)]
    first: Option<Strategy>,

    /// Strategy for player two
    #[arg(long, value_enum)]
    second: Option<Strategy>,

    /// Map file (the built-in duel map if omitted)
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file path (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Suppress progress and summary output
    #[arg(short, long)]
    quiet: bool,
}

fn apply(args: &Args, settings: &mut Settings) {
    let sim = &mut settings.sim;
    if let Some(v) = args.games {
        sim.games = v;
    }
    if let Some(v) = args.threads {
        sim.threads = v;
    }
    if let Some(v) = args.seed {
        sim.seed = v;
    }
    if let Some(v) = args.max_turns {
        sim.max_turns = v;
    }
    if let Some(v) = args.first {
        sim.first = v;
    }
    if let Some(v) = args.second {
        sim.second = v;
    }
    if let Some(v) = &args.map {
        sim.map = Some(v.clone());
    }
    sim.quiet |= args.quiet;
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = match &args.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };
    apply(&args, &mut settings);
    let config = &settings.sim;
    let board = simulate::load_board(config)?;

    if !config.quiet {
        log::info!(
            "Simulating {} matches, {:?} vs {:?}, {} turn cap, {} threads",
            config.games,
            config.first,
            config.second,
            config.max_turns,
            config.threads
        );
    }

    let start = Instant::now();
    let games = simulate::run_simulation(config, &board, &settings.link)?;
    let elapsed = start.elapsed();

    if !config.quiet {
        log::info!(
            "Completed {} matches in {:.1}s",
            games.len(),
            elapsed.as_secs_f64()
        );
        simulate::print_summary(&games);
    }

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            simulate::write_jsonl(&games, &mut writer)?;
            if !config.quiet {
                log::info!("Wrote {} matches to {}", games.len(), path.display());
            }
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            simulate::write_jsonl(&games, &mut writer)?;
        }
    }

    let diverged = games.iter().filter(|g| !g.converged).count();
    if diverged > 0 {
        return Err(format!("{} matches ended with diverged boards", diverged).into());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(SimError::Device { game_id, .. }) = e.downcast_ref::<SimError>() {
                log::error!("match {} could not be completed", game_id);
            }
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
