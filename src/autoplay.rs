//! Automated players.
//!
//! A turn is played in the same order a person would play it on the device:
//! place the turn's reinforcements, attack, then (greedy only) pull idle
//! troops from interior territories up to the front.

use std::cmp::Reverse;

use clap::ValueEnum;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{
    reinforce, resolve_attack, transfer, AttackOutcome, AttackReport, Board, CombatError, Player,
    TerritoryId,
};

/// Hard cap on attacks in a single turn.
pub const MAX_ATTACKS: usize = 32;

/// Chance that the random player keeps attacking after each attack.
const RANDOM_CONTINUE: f64 = 0.75;

/// How an automated player chooses its moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Uniformly random placements and attacks.
    Random,
    /// Reinforces its strongest front, attacks only with a clear advantage.
    #[default]
    Greedy,
}

/// Everything that happened during one automated turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnSummary {
    pub player: Player,
    pub reinforcements: u32,
    pub attacks: Vec<AttackReport>,
    pub captured: usize,
    pub transfers: u32,
    pub winner: Option<Player>,
}

fn is_frontier(board: &Board, player: Player, id: TerritoryId) -> bool {
    board
        .neighbors(id)
        .any(|n| board.territory(n).is_some_and(|t| t.owner != player))
}

fn frontier(board: &Board, player: Player) -> Vec<TerritoryId> {
    board
        .owned_by(player)
        .map(|t| t.id)
        .filter(|&id| is_frontier(board, player, id))
        .collect()
}

fn power(board: &Board, id: TerritoryId) -> u32 {
    board.territory(id).map_or(0, |t| t.power)
}

fn pick_reinforcement<R: Rng>(
    board: &Board,
    player: Player,
    strategy: Strategy,
    rng: &mut R,
) -> Option<TerritoryId> {
    let front = frontier(board, player);
    match strategy {
        Strategy::Random => {
            if front.is_empty() {
                let owned: Vec<_> = board.owned_by(player).map(|t| t.id).collect();
                owned.choose(rng).copied()
            } else {
                front.choose(rng).copied()
            }
        }
        Strategy::Greedy => front
            .into_iter()
            .max_by_key(|&id| (power(board, id), Reverse(id)))
            .or_else(|| board.owned_by(player).map(|t| t.id).next()),
    }
}

/// Every legal `(from, to)` attack with the two troop counts.
fn attack_options(board: &Board, player: Player) -> Vec<(TerritoryId, TerritoryId, u32, u32)> {
    let mut options = Vec::new();
    for t in board.owned_by(player).filter(|t| t.power > 1) {
        for n in board.neighbors(t.id) {
            if let Some(target) = board.territory(n).filter(|d| d.owner != player) {
                options.push((t.id, n, t.power, target.power));
            }
        }
    }
    options
}

fn pick_attack<R: Rng>(
    board: &Board,
    player: Player,
    strategy: Strategy,
    rng: &mut R,
) -> Option<(TerritoryId, TerritoryId)> {
    let options = attack_options(board, player);
    match strategy {
        Strategy::Random => {
            if options.is_empty() || !rng.gen_bool(RANDOM_CONTINUE) {
                return None;
            }
            options.choose(rng).map(|&(from, to, _, _)| (from, to))
        }
        Strategy::Greedy => options
            .into_iter()
            .filter(|&(_, _, atk, def)| atk >= def + 2)
            .max_by_key(|&(from, to, atk, def)| (atk - def, Reverse(from), Reverse(to)))
            .map(|(from, to, _, _)| (from, to)),
    }
}

/// Moves spare troops from interior territories to an adjacent front-line
/// territory. Returns the number of troops moved.
fn fortify(board: &mut Board, player: Player) -> Result<u32, CombatError> {
    let view: &Board = board;
    let interior: Vec<TerritoryId> = view
        .owned_by(player)
        .filter(|t| t.power > 1)
        .map(|t| t.id)
        .filter(|&id| !is_frontier(view, player, id))
        .collect();

    let mut moved = 0;
    for id in interior {
        let view: &Board = board;
        let target = view
            .graph()
            .same_owner_neighbors(id)
            .filter(|&n| is_frontier(view, player, n))
            .min();
        let Some(target) = target else { continue };
        while power(board, id) > 1 {
            transfer(board, player, id, target)?;
            moved += 1;
        }
    }
    Ok(moved)
}

/// Plays one complete local turn for `player`.
pub fn play_turn<R: Rng>(
    board: &mut Board,
    player: Player,
    strategy: Strategy,
    rng: &mut R,
) -> Result<TurnSummary, CombatError> {
    let troops = board.reinforcements(player);
    let mut summary = TurnSummary {
        player,
        reinforcements: troops,
        attacks: Vec::new(),
        captured: 0,
        transfers: 0,
        winner: board.winner(),
    };
    if summary.winner.is_some() {
        return Ok(summary);
    }

    for _ in 0..troops {
        let Some(id) = pick_reinforcement(board, player, strategy, rng) else { break };
        reinforce(board, player, id)?;
    }

    while summary.attacks.len() < MAX_ATTACKS && board.winner().is_none() {
        let Some((from, to)) = pick_attack(board, player, strategy, rng) else { break };
        let report = resolve_attack(board, player, from, to, rng)?;
        if report.outcome == AttackOutcome::Captured {
            summary.captured += 1;
        }
        summary.attacks.push(report);
    }

    if strategy == Strategy::Greedy && board.winner().is_none() {
        summary.transfers = fortify(board, player)?;
    }

    summary.winner = board.winner();
    log::debug!(
        "{} ({:?}) placed {}, attacked {} times, captured {}, moved {}",
        player.name(),
        strategy,
        troops,
        summary.attacks.len(),
        summary.captured,
        summary.transfers
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Territory;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    /// Line 0-1-2-3, player one holds the left half.
    fn line(powers: [u32; 4]) -> Board {
        let owners = [Player::One, Player::One, Player::Two, Player::Two];
        let terrs = (0..4)
            .map(|i| Territory::new(i as u8, owners[i], 0).with_power(powers[i]))
            .collect();
        Board::new(terrs, &[(0, 1), (1, 2), (2, 3)], 1).unwrap()
    }

    #[test]
    fn greedy_holds_back_and_fortifies() {
        let mut board = line([3, 1, 50, 50]);
        let mut rng = SmallRng::seed_from_u64(1);
        let troops = board.reinforcements(Player::One);
        let summary = play_turn(&mut board, Player::One, Strategy::Greedy, &mut rng).unwrap();
        assert_eq!(summary.reinforcements, troops);
        assert!(summary.attacks.is_empty());
        assert_eq!(summary.transfers, 2);
        assert_eq!(board.territory(0).unwrap().power, 1);
        assert_eq!(board.territory(1).unwrap().power, 1 + troops + 2);
        assert!(board.invariants_hold());
    }

    #[test]
    fn greedy_attacks_weak_neighbor() {
        let mut board = line([1, 40, 1, 30]);
        let mut rng = SmallRng::seed_from_u64(3);
        let summary = play_turn(&mut board, Player::One, Strategy::Greedy, &mut rng).unwrap();
        assert!(!summary.attacks.is_empty());
        assert_eq!(summary.attacks[0].attacker, 1);
        assert_eq!(summary.attacks[0].defender, 2);
        assert!(board.invariants_hold());
    }

    #[test]
    fn random_turns_keep_board_consistent() {
        for seed in 0..32 {
            let mut board = line([2, 6, 4, 3]);
            let mut rng = SmallRng::seed_from_u64(seed);
            let before = board.count(Player::One) + board.count(Player::Two);
            let summary = play_turn(&mut board, Player::Two, Strategy::Random, &mut rng).unwrap();
            assert!(summary.attacks.len() <= MAX_ATTACKS);
            assert_eq!(board.count(Player::One) + board.count(Player::Two), before);
            assert!(board.territories().iter().all(|t| t.power >= 1));
            assert!(board.invariants_hold());
        }
    }

    #[test]
    fn finished_board_is_left_alone() {
        let terrs = vec![
            Territory::new(0, Player::One, 0).with_power(3),
            Territory::new(1, Player::One, 0).with_power(2),
        ];
        let mut board = Board::new(terrs, &[(0, 1)], 1).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        let summary = play_turn(&mut board, Player::Two, Strategy::Greedy, &mut rng).unwrap();
        assert_eq!(summary.winner, Some(Player::One));
        assert_eq!(board.territory(0).unwrap().power, 3);
    }

    #[test]
    fn strategy_names_parse() {
        let s: Strategy = serde_json::from_str("\"random\"").unwrap();
        assert_eq!(s, Strategy::Random);
        assert_eq!(Strategy::default(), Strategy::Greedy);
    }
}
