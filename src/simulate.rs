//! Batch matches between two automated devices.
//!
//! Each match runs two [`Device`]s on their own threads, joined by an
//! in-memory link, exactly as two handsets would play over a cable. When a
//! match ends both boards are compared; any difference means the link
//! protocol let the copies drift apart. Matches are independent and run in
//! parallel on a rayon pool.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::autoplay::Strategy;
use crate::board::{Board, MapError, Player, ALL_PLAYERS};
use crate::engine::{Device, DeviceConfig, DeviceError};
use crate::link::{LinkConfig, MemoryLink};

/// Map used when no map file is configured.
pub const BUILTIN_MAP: &str = include_str!("../maps/duel.map");

/// Configuration for a batch of simulated matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of matches to play.
    pub games: usize,
    /// Number of matches played at once.
    pub threads: usize,
    /// Random seed (0 = use entropy).
    pub seed: u64,
    /// Turn cap per match.
    pub max_turns: u32,
    /// Strategy for player one.
    pub first: Strategy,
    /// Strategy for player two.
    pub second: Strategy,
    /// Map file; the built-in map when unset.
    pub map: Option<PathBuf>,
    /// Suppress per-match progress output.
    pub quiet: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            games: 10,
            threads: 4,
            seed: 0,
            max_turns: 200,
            first: Strategy::Greedy,
            second: Strategy::Random,
            map: None,
            quiet: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error("match {game_id}: {player:?} device failed: {source}")]
    Device {
        game_id: usize,
        player: Player,
        #[source]
        source: DeviceError,
    },

    #[error("match {0}: device thread panicked")]
    DevicePanicked(usize),

    #[error("failed to build thread pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// One finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: usize,
    pub winner: Option<Player>,
    /// Turns taken by both players.
    pub turns: u32,
    /// Territories held by each player at the end.
    pub final_counts: [u32; 2],
    /// Captures made by each player.
    pub captures: [usize; 2],
    /// Link exchanges that had to be restarted.
    pub retries: u32,
    /// Whether both devices ended with identical boards.
    pub converged: bool,
    pub elapsed_ms: u64,
}

/// Totals over a batch of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimSummary {
    pub games: usize,
    pub wins: [usize; 2],
    pub unfinished: usize,
    pub diverged: usize,
    pub avg_turns: f64,
    pub retries: u32,
}

/// Loads the configured map, or the built-in one.
pub fn load_board(config: &SimConfig) -> Result<Board, SimError> {
    let board = match &config.map {
        Some(path) => crate::board::load_map(path)?,
        None => crate::board::parse_map(BUILTIN_MAP)?,
    };
    Ok(board)
}

fn match_rng(config: &SimConfig, game_id: usize) -> SmallRng {
    if config.seed != 0 {
        SmallRng::seed_from_u64(config.seed.wrapping_add(game_id as u64))
    } else {
        SmallRng::from_entropy()
    }
}

/// Plays one match between two devices over an in-memory link.
pub fn play_match(
    board: &Board,
    link: &LinkConfig,
    config: &SimConfig,
    game_id: usize,
    rng: &mut SmallRng,
) -> Result<GameRecord, SimError> {
    let start = Instant::now();
    let (first_link, second_link) = MemoryLink::pair();
    // odd seeds are never zero, which would mean "entropy"
    let first_cfg = DeviceConfig {
        strategy: config.first,
        max_turns: config.max_turns,
        seed: rng.gen::<u64>() | 1,
    };
    let second_cfg = DeviceConfig {
        strategy: config.second,
        max_turns: config.max_turns,
        seed: rng.gen::<u64>() | 1,
    };

    let (first, second) = thread::scope(|s| {
        let handle = s.spawn(|| {
            let mut dev = Device::new(Player::Two, board.clone(), second_link, link.clone(), second_cfg);
            dev.run().map(|outcome| (outcome, dev.into_board()))
        });
        let mut dev = Device::new(Player::One, board.clone(), first_link, link.clone(), first_cfg);
        // dropping the device closes the link, so a failure here ends the peer too
        let first = dev.run().map(|outcome| (outcome, dev.into_board()));
        (first, handle.join())
    });

    let (first_outcome, first_board) = first.map_err(|source| SimError::Device {
        game_id,
        player: Player::One,
        source,
    })?;
    let (second_outcome, second_board) = second
        .map_err(|_| SimError::DevicePanicked(game_id))?
        .map_err(|source| SimError::Device {
            game_id,
            player: Player::Two,
            source,
        })?;

    let converged = first_board.same_state(&second_board) && first_outcome.turns == second_outcome.turns;
    if !converged {
        log::warn!("match {}: boards diverged", game_id);
    }
    Ok(GameRecord {
        game_id,
        winner: first_outcome.winner,
        turns: first_outcome.turns,
        final_counts: [first_board.count(Player::One), first_board.count(Player::Two)],
        captures: [first_outcome.captures, second_outcome.captures],
        retries: first_outcome.retries + second_outcome.retries,
        converged,
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}

fn report_progress(config: &SimConfig, n: usize, game: &GameRecord) {
    if config.quiet {
        return;
    }
    let outcome = match game.winner {
        Some(w) => format!("{} wins", w.name()),
        None => "unfinished".to_string(),
    };
    log::info!(
        "match {}/{}: {} after {} turns ({} ms)",
        n,
        config.games,
        outcome,
        game.turns,
        game.elapsed_ms
    );
}

/// Plays every configured match and returns the records in completion order.
pub fn run_simulation(config: &SimConfig, board: &Board, link: &LinkConfig) -> Result<Vec<GameRecord>, SimError> {
    let mut games = Vec::with_capacity(config.games);
    run_simulation_with_callback(config, board, link, |game| games.push(game))?;
    Ok(games)
}

/// Plays every configured match, handing each record to `on_game` as soon
/// as it finishes. Stops reporting at the first failed match.
pub fn run_simulation_with_callback<F>(
    config: &SimConfig,
    board: &Board,
    link: &LinkConfig,
    on_game: F,
) -> Result<(), SimError>
where
    F: FnMut(GameRecord) + Send,
{
    if config.threads > 1 {
        run_parallel(config, board, link, on_game)
    } else {
        run_sequential(config, board, link, on_game)
    }
}

fn run_sequential<F>(config: &SimConfig, board: &Board, link: &LinkConfig, mut on_game: F) -> Result<(), SimError>
where
    F: FnMut(GameRecord),
{
    for i in 0..config.games {
        let mut rng = match_rng(config, i);
        let game = play_match(board, link, config, i, &mut rng)?;
        report_progress(config, i + 1, &game);
        on_game(game);
    }
    Ok(())
}

fn run_parallel<F>(config: &SimConfig, board: &Board, link: &LinkConfig, mut on_game: F) -> Result<(), SimError>
where
    F: FnMut(GameRecord) + Send,
{
    use rayon::prelude::*;
    use std::sync::mpsc;

    let completed = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<Result<GameRecord, SimError>>();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()?;

    thread::scope(|s| {
        s.spawn(|| {
            pool.install(|| {
                (0..config.games).into_par_iter().for_each_with(tx, |tx, i| {
                    let mut rng = match_rng(config, i);
                    let game = play_match(board, link, config, i, &mut rng);
                    if let Ok(g) = &game {
                        let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        report_progress(config, n, g);
                    }
                    let _ = tx.send(game);
                });
            });
        });

        let mut first_err = None;
        for game in rx {
            match game {
                Ok(g) if first_err.is_none() => on_game(g),
                Ok(_) => {}
                Err(e) => {
                    log::error!("{}", e);
                    first_err.get_or_insert(e);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    })
}

/// Writes one JSON object per match, one per line.
pub fn write_jsonl<W: Write>(games: &[GameRecord], out: &mut W) -> std::io::Result<()> {
    for game in games {
        serde_json::to_writer(&mut *out, game)?;
        writeln!(out)?;
    }
    out.flush()
}

pub fn summarize(games: &[GameRecord]) -> SimSummary {
    let mut summary = SimSummary {
        games: games.len(),
        ..Default::default()
    };
    let mut total_turns = 0u64;
    for game in games {
        total_turns += game.turns as u64;
        summary.retries += game.retries;
        match game.winner {
            Some(w) => summary.wins[w.index()] += 1,
            None => summary.unfinished += 1,
        }
        if !game.converged {
            summary.diverged += 1;
        }
    }
    if !games.is_empty() {
        summary.avg_turns = total_turns as f64 / games.len() as f64;
    }
    summary
}

/// Logs a summary of a batch.
pub fn print_summary(games: &[GameRecord]) {
    let s = summarize(games);
    log::info!("=== Simulation Summary ===");
    log::info!("Matches: {}", s.games);
    for p in ALL_PLAYERS {
        let pct = if s.games > 0 {
            s.wins[p.index()] as f64 / s.games as f64 * 100.0
        } else {
            0.0
        };
        log::info!("  {:<5} wins: {:>4} ({:.1}%)", p.name(), s.wins[p.index()], pct);
    }
    log::info!("  unfinished: {}", s.unfinished);
    log::info!("Avg turns: {:.1}", s.avg_turns);
    log::info!("Link retries: {}", s.retries);
    if s.diverged > 0 {
        log::warn!("{} matches ended with diverged boards", s.diverged);
    }
}
