//! Local gameplay mutations: attacks, reinforcement, and troop transfers.
//!
//! Attacks are fought round by round with a percentile roll. Each round one
//! side loses a troop, two on a critical roll, until the defender is wiped
//! out (and captured) or the attacker is down to a single troop.

use rand::Rng;
use serde::Serialize;

use super::state::{Board, BoardError};
use super::territory::{Player, TerritoryId};

/// Rolls below this win the round for the attacker.
pub const ATTACKER_CHANCE: u32 = 50;
/// Attacker rolls at or below this cost the defender two troops.
pub const ATTACKER_CRITICAL: u32 = 4;
/// Defender rolls at or above this cost the attacker two troops.
pub const DEFENDER_CRITICAL: u32 = 97;

/// Errors raised when a move breaks the rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    #[error("territory {0} is not owned by {1:?}")]
    NotOwner(TerritoryId, Player),

    #[error("territories {0} and {1} are not adjacent")]
    NotAdjacent(TerritoryId, TerritoryId),

    #[error("territory {0} already belongs to the attacker")]
    FriendlyTarget(TerritoryId),

    #[error("territory {id} holds {power} troops, needs at least two")]
    TooFewTroops { id: TerritoryId, power: u32 },

    #[error("territories {0} and {1} are not joined by a same-owner road")]
    NotLinked(TerritoryId, TerritoryId),

    #[error(transparent)]
    Board(#[from] BoardError),
}

/// How an attack ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackOutcome {
    Captured,
    Repelled,
}

/// Result of one resolved attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttackReport {
    pub attacker: TerritoryId,
    pub defender: TerritoryId,
    pub outcome: AttackOutcome,
    pub rounds: u32,
}

fn owned(board: &Board, player: Player, id: TerritoryId) -> Result<u32, CombatError> {
    let t = board
        .territory(id)
        .ok_or(BoardError::UnknownTerritory(id as u32))?;
    if t.owner != player {
        return Err(CombatError::NotOwner(id, player));
    }
    Ok(t.power)
}

/// Attacks `defender` from `attacker` until one side breaks.
///
/// On capture the defender keeps all but one of the attacker's surviving
/// troops, the attacker keeps one, and the board flips the defender to
/// `player`.
pub fn resolve_attack<R: Rng>(
    board: &mut Board,
    player: Player,
    attacker: TerritoryId,
    defender: TerritoryId,
    rng: &mut R,
) -> Result<AttackReport, CombatError> {
    let mut atk = owned(board, player, attacker)?;
    let target = board
        .territory(defender)
        .ok_or(BoardError::UnknownTerritory(defender as u32))?;
    if target.owner == player {
        return Err(CombatError::FriendlyTarget(defender));
    }
    if !board.is_adjacent(attacker, defender) {
        return Err(CombatError::NotAdjacent(attacker, defender));
    }
    if atk <= 1 {
        return Err(CombatError::TooFewTroops { id: attacker, power: atk });
    }
    let mut def = target.power;

    // The defender only loses troops in rounds the attacker survives whole,
    // so `atk >= 2` whenever `def` reaches 0. An empty defender falls at once.
    let mut rounds = 0;
    let outcome = loop {
        if def == 0 {
            def = atk - 1;
            atk = 1;
            break AttackOutcome::Captured;
        }
        if atk <= 1 {
            atk = 1;
            break AttackOutcome::Repelled;
        }

        rounds += 1;
        let roll: u32 = rng.gen_range(1..100);
        if roll < ATTACKER_CHANCE {
            let loss = if roll <= ATTACKER_CRITICAL { 2 } else { 1 };
            def = def.saturating_sub(loss);
        } else {
            let loss = if roll >= DEFENDER_CRITICAL { 2 } else { 1 };
            atk = atk.saturating_sub(loss);
        }
    };

    board.set_power(attacker, atk)?;
    board.set_power(defender, def)?;
    if outcome == AttackOutcome::Captured {
        board.set_owner(defender, player)?;
    }
    log::debug!(
        "{:?} attacked {} from {}: {:?} after {} rounds",
        player,
        defender,
        attacker,
        outcome,
        rounds
    );

    Ok(AttackReport {
        attacker,
        defender,
        outcome,
        rounds,
    })
}

/// Places one reinforcement on a territory `player` owns. Returns the new
/// troop count.
pub fn reinforce(board: &mut Board, player: Player, id: TerritoryId) -> Result<u32, CombatError> {
    let power = owned(board, player, id)? + 1;
    board.set_power(id, power)?;
    Ok(power)
}

/// Moves one troop between two territories joined by a same-owner road,
/// always leaving at least one behind.
pub fn transfer(
    board: &mut Board,
    player: Player,
    from: TerritoryId,
    to: TerritoryId,
) -> Result<(), CombatError> {
    let from_power = owned(board, player, from)?;
    let to_power = owned(board, player, to)?;
    if !board.graph().is_same_owner_edge(from, to) {
        return Err(CombatError::NotLinked(from, to));
    }
    if from_power <= 1 {
        return Err(CombatError::TooFewTroops { id: from, power: from_power });
    }
    board.set_power(from, from_power - 1)?;
    board.set_power(to, to_power + 1)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::territory::Territory;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn duel(attacker_power: u32, defender_power: u32) -> Board {
        let terrs = vec![
            Territory::new(0, Player::One, 0).with_power(attacker_power),
            Territory::new(1, Player::Two, 0).with_power(defender_power),
            Territory::new(2, Player::One, 0).with_power(1),
        ];
        Board::new(terrs, &[(0, 1), (0, 2)], 1).unwrap()
    }

    #[test]
    fn attack_ends_with_capture_or_one_troop() {
        for seed in 0..64 {
            let mut board = duel(8, 3);
            let mut rng = SmallRng::seed_from_u64(seed);
            let report = resolve_attack(&mut board, Player::One, 0, 1, &mut rng).unwrap();
            assert!(report.rounds >= 1);
            let atk = board.territory(0).unwrap();
            let def = board.territory(1).unwrap();
            assert_eq!(atk.power, 1);
            match report.outcome {
                AttackOutcome::Captured => {
                    assert_eq!(def.owner, Player::One);
                    assert!(def.power >= 1);
                }
                AttackOutcome::Repelled => {
                    assert_eq!(def.owner, Player::Two);
                    assert!(def.power >= 1);
                }
            }
            assert!(board.invariants_hold());
        }
    }

    #[test]
    fn overwhelming_attack_usually_captures() {
        let captures = (0..32)
            .filter(|&seed| {
                let mut board = duel(60, 1);
                let mut rng = SmallRng::seed_from_u64(seed);
                resolve_attack(&mut board, Player::One, 0, 1, &mut rng).unwrap().outcome
                    == AttackOutcome::Captured
            })
            .count();
        assert!(captures >= 30);
    }

    #[test]
    fn empty_defender_falls_without_a_fight() {
        for seed in 0..400 {
            let mut board = duel(2, 0);
            let mut rng = SmallRng::seed_from_u64(seed);
            let report = resolve_attack(&mut board, Player::One, 0, 1, &mut rng).unwrap();
            assert_eq!(report.outcome, AttackOutcome::Captured);
            assert_eq!(report.rounds, 0);
            assert_eq!(board.territory(0).unwrap().power, 1);
            let taken = board.territory(1).unwrap();
            assert_eq!(taken.owner, Player::One);
            assert_eq!(taken.power, 1);
            assert!(board.invariants_hold());
        }
    }

    #[test]
    fn capture_flips_graph_and_ends_game() {
        let mut board = duel(200, 1);
        let mut rng = SmallRng::seed_from_u64(7);
        let report = resolve_attack(&mut board, Player::One, 0, 1, &mut rng).unwrap();
        assert_eq!(report.outcome, AttackOutcome::Captured);
        assert!(board.graph().is_same_owner_edge(0, 1));
        assert_eq!(board.winner(), Some(Player::One));
    }

    #[test]
    fn rule_violations_rejected() {
        let mut board = duel(1, 3);
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(
            resolve_attack(&mut board, Player::One, 0, 1, &mut rng),
            Err(CombatError::TooFewTroops { id: 0, power: 1 })
        );
        assert_eq!(
            resolve_attack(&mut board, Player::Two, 0, 1, &mut rng),
            Err(CombatError::NotOwner(0, Player::Two))
        );
        assert_eq!(
            resolve_attack(&mut board, Player::One, 0, 2, &mut rng),
            Err(CombatError::FriendlyTarget(2))
        );
        assert_eq!(
            resolve_attack(&mut board, Player::Two, 1, 2, &mut rng),
            Err(CombatError::NotAdjacent(1, 2))
        );
    }

    #[test]
    fn reinforce_own_territory_only() {
        let mut board = duel(2, 2);
        assert_eq!(reinforce(&mut board, Player::One, 0), Ok(3));
        assert_eq!(
            reinforce(&mut board, Player::One, 1),
            Err(CombatError::NotOwner(1, Player::One))
        );
    }

    #[test]
    fn transfer_needs_link_and_spare_troop() {
        let mut board = duel(3, 2);
        transfer(&mut board, Player::One, 0, 2).unwrap();
        assert_eq!(board.territory(0).unwrap().power, 2);
        assert_eq!(board.territory(2).unwrap().power, 2);
        assert_eq!(
            transfer(&mut board, Player::One, 0, 1),
            Err(CombatError::NotOwner(1, Player::One))
        );
        board.set_power(2, 1).unwrap();
        assert_eq!(
            transfer(&mut board, Player::One, 2, 0),
            Err(CombatError::TooFewTroops { id: 2, power: 1 })
        );
    }
}
