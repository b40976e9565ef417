//! Borderlink device: plays one side of a match against a peer device over
//! TCP, standing in for the handset on one end of the serial cable.
//!
//! One device listens, the other connects. Player 1 moves first. When the
//! game ends the outcome is printed to stdout as one JSON line.

use std::error::Error;
use std::net::TcpStream;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;

use borderlink::autoplay::Strategy;
use borderlink::board::{encode_map, load_map, parse_map, Player};
use borderlink::config::{load_settings, Settings};
use borderlink::engine::Device;
use borderlink::link::TcpLink;
use borderlink::simulate::BUILTIN_MAP;

/// Attempts to reach a peer that is not listening yet.
const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "borderlink")]
#[command(about = "Play one side of a borderlink match over TCP")]
struct Args {
    /// Map file (the built-in duel map if omitted)
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// Wait for the peer on this address
    #[arg(long, conflicts_with = "connect", required_unless_present = "connect")]
    listen: Option<String>,

    /// Connect to a peer listening on this address
    #[arg(long)]
    connect: Option<String>,

    /// Side this device plays; player 1 moves first
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=2))]
    player: u32,

    /// Move selection strategy
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Stop after this many turns by either side
    #[arg(long)]
    max_turns: Option<u32>,

    /// Random seed (uses entropy if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the final board in map format after the outcome
    #[arg(long)]
    dump: bool,
}

fn connect(addr: &str) -> std::io::Result<TcpLink> {
    let mut attempt = 1;
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => return TcpLink::from_stream(stream),
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                log::debug!("connect to {} failed ({}), retrying", addr, e);
                attempt += 1;
                thread::sleep(CONNECT_BACKOFF);
            }
            Err(e) => return Err(e),
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut settings = match &args.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };
    if let Some(strategy) = args.strategy {
        settings.device.strategy = strategy;
    }
    if let Some(max_turns) = args.max_turns {
        settings.device.max_turns = max_turns;
    }
    if let Some(seed) = args.seed {
        settings.device.seed = seed;
    }

    let board = match &args.map {
        Some(path) => load_map(path)?,
        None => parse_map(BUILTIN_MAP)?,
    };
    let player = Player::from_code(args.player).ok_or("player must be 1 or 2")?;

    let link = match (&args.listen, &args.connect) {
        (Some(addr), _) => {
            log::info!("waiting for peer on {}", addr);
            TcpLink::accept(addr.as_str())?
        }
        (None, Some(addr)) => connect(addr)?,
        (None, None) => return Err("either --listen or --connect is required".into()),
    };

    log::info!("playing as {} with {:?}", player.name(), settings.device.strategy);
    let mut device = Device::new(player, board, link, settings.link, settings.device);
    let outcome = device.run()?;
    println!("{}", serde_json::to_string(&outcome)?);
    if args.dump {
        print!("{}", encode_map(device.board()));
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
