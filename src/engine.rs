//! One device: a player, its own copy of the board, and the link to the
//! other device.
//!
//! Turns alternate. Player one moves first; every turn is played locally
//! and then sent whole to the peer, which overwrites its copy before taking
//! its own turn. Both devices count turns the same way, so both stop after
//! the same turn when a winner appears or the turn cap is hit.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::autoplay::{play_turn, Strategy, TurnSummary};
use crate::board::{Board, CombatError, Player};
use crate::link::{Link, LinkConfig, LinkError, LinkSynchronizer, SyncReport};

/// The player who takes the first turn.
pub const FIRST_PLAYER: Player = Player::One;

/// How a device plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub strategy: Strategy,
    /// Turns (by either player) after which the game is abandoned.
    pub max_turns: u32,
    /// RNG seed for combat rolls and strategy choices (0 = entropy).
    pub seed: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            strategy: Strategy::Greedy,
            max_turns: 200,
            seed: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("link failed: {0}")]
    Link(#[from] LinkError),

    #[error("illegal move: {0}")]
    Combat(#[from] CombatError),
}

/// How a game ended, from one device's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub player: Player,
    pub winner: Option<Player>,
    /// Turns taken by both players.
    pub turns: u32,
    pub captures: usize,
    /// Exchanges that had to be started again.
    pub retries: u32,
}

pub struct Device<L> {
    player: Player,
    board: Board,
    sync: LinkSynchronizer<L>,
    config: DeviceConfig,
    rng: SmallRng,
    turns: u32,
    captures: usize,
    retries: u32,
}

impl<L: Link> Device<L> {
    pub fn new(player: Player, board: Board, link: L, link_config: LinkConfig, config: DeviceConfig) -> Self {
        let rng = if config.seed != 0 {
            SmallRng::seed_from_u64(config.seed)
        } else {
            SmallRng::from_entropy()
        };
        Device {
            player,
            board,
            sync: LinkSynchronizer::new(link, link_config),
            config,
            rng,
            turns: 0,
            captures: 0,
            retries: 0,
        }
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    fn finished(&self) -> bool {
        self.board.winner().is_some() || self.turns >= self.config.max_turns
    }

    /// Waits for the peer's turn and applies it.
    pub fn receive(&mut self) -> Result<SyncReport, DeviceError> {
        let report = self.sync.receive_turn(&mut self.board)?;
        self.turns += 1;
        self.retries += report.attempts.saturating_sub(1);
        Ok(report)
    }

    /// Plays a local turn and sends the resulting board to the peer.
    pub fn play_and_send(&mut self) -> Result<TurnSummary, DeviceError> {
        let summary = play_turn(&mut self.board, self.player, self.config.strategy, &mut self.rng)?;
        self.captures += summary.captured;
        let attempts = self.sync.send_turn(&self.board)?;
        self.turns += 1;
        self.retries += attempts.saturating_sub(1);
        log::info!(
            "turn {}: {} captured {} territories, holds {}",
            self.turns,
            self.player.name(),
            summary.captured,
            self.board.count(self.player)
        );
        Ok(summary)
    }

    /// Plays until someone wins or the turn cap is reached.
    pub fn run(&mut self) -> Result<GameOutcome, DeviceError> {
        if self.player != FIRST_PLAYER && !self.finished() {
            self.receive()?;
        }
        while !self.finished() {
            self.play_and_send()?;
            if self.finished() {
                break;
            }
            self.receive()?;
        }

        let winner = self.board.winner();
        match winner {
            Some(w) => log::info!("{}: game over after {} turns, {} wins", self.player.name(), self.turns, w.name()),
            None => log::info!("{}: turn cap of {} reached", self.player.name(), self.config.max_turns),
        }
        Ok(GameOutcome {
            player: self.player,
            winner,
            turns: self.turns,
            captures: self.captures,
            retries: self.retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Territory;
    use crate::link::MemoryLink;
    use std::thread;

    fn board() -> Board {
        let owners = [Player::One, Player::One, Player::Two, Player::Two, Player::Two];
        let terrs = (0..5)
            .map(|i| Territory::new(i as u8, owners[i], (i / 3) as u8).with_power(3))
            .collect();
        Board::new(terrs, &[(0, 1), (1, 2), (2, 3), (3, 4), (0, 4)], 2).unwrap()
    }

    fn link_config() -> LinkConfig {
        LinkConfig {
            token_timeout_ms: 200,
            ..Default::default()
        }
    }

    fn play(max_turns: u32, seed: u64) -> (GameOutcome, Board, GameOutcome, Board) {
        let (a, b) = MemoryLink::pair();
        let config = move |s| DeviceConfig { max_turns, seed: s, ..Default::default() };
        let second = thread::spawn(move || {
            let mut dev = Device::new(Player::Two, board(), b, link_config(), config(seed + 1));
            let outcome = dev.run().unwrap();
            (outcome, dev.into_board())
        });
        let mut first = Device::new(Player::One, board(), a, link_config(), config(seed));
        let first_outcome = first.run().unwrap();
        let (second_outcome, second_board) = second.join().unwrap();
        (first_outcome, first.into_board(), second_outcome, second_board)
    }

    #[test]
    fn devices_agree_at_the_end() {
        let (a, board_a, b, board_b) = play(40, 9);
        assert_eq!(a.turns, b.turns);
        assert_eq!(a.winner, b.winner);
        assert!(board_a.same_state(&board_b));
        assert!(board_a.invariants_hold());
    }

    #[test]
    fn turn_cap_stops_both() {
        let (a, _, b, _) = play(3, 21);
        assert!(a.turns <= 3);
        assert_eq!(a.turns, b.turns);
    }

    #[test]
    fn zero_turns_plays_nothing() {
        let (a, board_a, b, board_b) = play(0, 5);
        assert_eq!(a.turns, 0);
        assert_eq!(b.turns, 0);
        assert!(board_a.same_state(&board_b));
    }
}
