//! The board: every territory record plus the ownership graph built over
//! them.
//!
//! A `Board` is owned by exactly one device. Local gameplay and the link
//! receive step both mutate it through `&mut Board`, never concurrently.
//! Owner changes go through [`Board::set_owner`] so the graph is flipped in
//! the same call.

use super::territory::{ContinentId, Player, Territory, TerritoryId, ALL_PLAYERS};
use crate::graph::{GraphError, OwnershipGraph};

/// Troops every player receives per turn before bonuses.
pub const BASE_REINFORCEMENTS: u32 = 4;

/// Errors raised by board construction and mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("territory {0} is not on the board")]
    UnknownTerritory(u32),

    #[error("territory at index {index} carries id {id}")]
    MisplacedTerritory { index: usize, id: TerritoryId },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// What an incoming territory state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateChange {
    pub power_changed: bool,
    pub flipped: bool,
}

/// Territories and the graph that tracks their ownership.
#[derive(Debug, Clone)]
pub struct Board {
    pub(super) territories: Vec<Territory>,
    graph: OwnershipGraph,
    /// Territory ids sorted by x coordinate, for touch lookup.
    pub(super) x_order: Vec<TerritoryId>,
}

impl Board {
    /// Builds a board from territory records (index `i` must carry id `i`)
    /// and the paths between them.
    pub fn new(
        territories: Vec<Territory>,
        paths: &[(TerritoryId, TerritoryId)],
        continent_count: usize,
    ) -> Result<Board, BoardError> {
        for (index, t) in territories.iter().enumerate() {
            if t.id as usize != index {
                return Err(BoardError::MisplacedTerritory { index, id: t.id });
            }
        }

        let mut graph = OwnershipGraph::new(territories.len(), continent_count)?;
        for t in &territories {
            graph.add_vertex(t)?;
        }
        for &(a, b) in paths {
            let from = territories
                .get(a as usize)
                .ok_or(BoardError::UnknownTerritory(a as u32))?;
            let to = territories
                .get(b as usize)
                .ok_or(BoardError::UnknownTerritory(b as u32))?;
            graph.add_edge(from, to)?;
        }

        let mut x_order: Vec<TerritoryId> = territories.iter().map(|t| t.id).collect();
        x_order.sort_by_key(|&id| (territories[id as usize].x, id));

        Ok(Board {
            territories,
            graph,
            x_order,
        })
    }

    pub fn territories(&self) -> &[Territory] {
        &self.territories
    }

    pub fn territory(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(id as usize)
    }

    pub fn graph(&self) -> &OwnershipGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.territories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }

    pub fn continent_count(&self) -> usize {
        self.graph.continent_count()
    }

    fn index_of(&self, id: u32) -> Result<usize, BoardError> {
        let idx = id as usize;
        if idx < self.territories.len() {
            Ok(idx)
        } else {
            Err(BoardError::UnknownTerritory(id))
        }
    }

    /// Changes a territory's owner and flips it in the graph. Returns false if
    /// `owner` already held it.
    pub fn set_owner(&mut self, id: TerritoryId, owner: Player) -> Result<bool, BoardError> {
        let idx = self.index_of(id as u32)?;
        if self.territories[idx].owner == owner {
            return Ok(false);
        }
        self.territories[idx].owner = owner;
        self.graph.flip(&self.territories[idx], &self.territories)?;
        Ok(true)
    }

    /// Sets a territory's troop count. Returns false if it was unchanged.
    pub fn set_power(&mut self, id: TerritoryId, power: u32) -> Result<bool, BoardError> {
        let idx = self.index_of(id as u32)?;
        if self.territories[idx].power == power {
            return Ok(false);
        }
        self.territories[idx].power = power;
        Ok(true)
    }

    /// Overwrites a territory with state received from the peer: power first,
    /// then owner (flipping the graph when it differs).
    pub fn apply_state(&mut self, id: u32, power: u32, owner: Player) -> Result<StateChange, BoardError> {
        let idx = self.index_of(id)?;
        let id = idx as TerritoryId;
        Ok(StateChange {
            power_changed: self.set_power(id, power)?,
            flipped: self.set_owner(id, owner)?,
        })
    }

    pub fn winner(&self) -> Option<Player> {
        self.graph.winner()
    }

    pub fn count(&self, player: Player) -> u32 {
        self.graph.count(player)
    }

    pub fn continent_bonus(&self, player: Player) -> i32 {
        self.graph.continent_bonus(player, &self.territories)
    }

    pub fn controlled_continents(&self, player: Player) -> Vec<ContinentId> {
        self.graph.controlled_continents(player, &self.territories)
    }

    /// Troops `player` distributes at the start of a turn.
    pub fn reinforcements(&self, player: Player) -> u32 {
        BASE_REINFORCEMENTS + self.continent_bonus(player).max(0) as u32
    }

    pub fn is_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.graph.base().is_edge(a, b)
    }

    pub fn neighbors(&self, id: TerritoryId) -> impl Iterator<Item = TerritoryId> + '_ {
        self.graph.base().neighbors(id)
    }

    pub fn owned_by(&self, player: Player) -> impl Iterator<Item = &Territory> + '_ {
        self.territories.iter().filter(move |t| t.owner == player)
    }

    /// Same-owner edges recomputed from scratch, sorted.
    fn expected_same_owner_edges(&self) -> Vec<(TerritoryId, TerritoryId)> {
        let mut edges: Vec<_> = self
            .graph
            .base()
            .edges()
            .filter(|&(u, v)| self.territories[u as usize].owner == self.territories[v as usize].owner)
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Checks the derived graph state against a full recomputation: the
    /// same-owner edge set and the per-player counts.
    pub fn invariants_hold(&self) -> bool {
        let counts_ok = ALL_PLAYERS
            .iter()
            .all(|&p| self.graph.count(p) as usize == self.owned_by(p).count());
        counts_ok && self.graph.same_owner_edges() == self.expected_same_owner_edges()
    }

    /// Whether two boards agree on every territory record and on all derived
    /// ownership state.
    pub fn same_state(&self, other: &Board) -> bool {
        self.territories == other.territories
            && self.graph.same_owner_edges() == other.graph.same_owner_edges()
            && ALL_PLAYERS.iter().all(|&p| {
                self.graph.count(p) == other.graph.count(p)
                    && self.graph.fertile_bonus(p) == other.graph.fertile_bonus(p)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::territory::SpecialKind;

    fn line_board() -> Board {
        let terrs = vec![
            Territory::new(0, Player::One, 0).with_power(3),
            Territory::new(1, Player::One, 0),
            Territory::new(2, Player::Two, 1).with_special(SpecialKind::FertileLand, 2),
            Territory::new(3, Player::Two, 1),
        ];
        Board::new(terrs, &[(0, 1), (1, 2), (2, 3)], 2).unwrap()
    }

    #[test]
    fn builds_from_records() {
        let board = line_board();
        assert_eq!(board.len(), 4);
        assert_eq!(board.count(Player::One), 2);
        assert_eq!(board.count(Player::Two), 2);
        assert!(board.is_adjacent(1, 2));
        assert!(board.invariants_hold());
    }

    #[test]
    fn rejects_misplaced_ids() {
        let terrs = vec![Territory::new(1, Player::One, 0)];
        assert_eq!(
            Board::new(terrs, &[], 1).unwrap_err(),
            BoardError::MisplacedTerritory { index: 0, id: 1 }
        );
    }

    #[test]
    fn rejects_path_to_nowhere() {
        let terrs = vec![Territory::new(0, Player::One, 0)];
        assert_eq!(
            Board::new(terrs, &[(0, 4)], 1).unwrap_err(),
            BoardError::UnknownTerritory(4)
        );
    }

    #[test]
    fn reinforcements_include_bonus() {
        let board = line_board();
        // 4 nodes, continent 1 lost: 4 - 2 = 2
        assert_eq!(board.continent_bonus(Player::One), 2);
        assert_eq!(board.reinforcements(Player::One), BASE_REINFORCEMENTS + 2);
        // 4 nodes + 2 fertile - continent 0 (2)
        assert_eq!(board.continent_bonus(Player::Two), 4);
    }

    #[test]
    fn set_owner_flips_graph() {
        let mut board = line_board();
        assert!(board.set_owner(2, Player::One).unwrap());
        assert!(!board.set_owner(2, Player::One).unwrap());
        assert!(board.graph().is_same_owner_edge(1, 2));
        assert_eq!(board.graph().fertile_bonus(Player::One), 2);
        assert!(board.invariants_hold());
    }

    #[test]
    fn apply_state_reports_changes() {
        let mut board = line_board();
        let change = board.apply_state(3, 7, Player::Two).unwrap();
        assert_eq!(change, StateChange { power_changed: true, flipped: false });
        let change = board.apply_state(3, 7, Player::One).unwrap();
        assert_eq!(change, StateChange { power_changed: false, flipped: true });
        assert_eq!(board.territory(3).unwrap().power, 7);
        assert_eq!(board.apply_state(9, 1, Player::One), Err(BoardError::UnknownTerritory(9)));
    }

    #[test]
    fn same_state_after_identical_changes() {
        let mut a = line_board();
        let mut b = line_board();
        a.set_owner(1, Player::Two).unwrap();
        assert!(!a.same_state(&b));
        b.set_owner(1, Player::Two).unwrap();
        assert!(a.same_state(&b));
    }
}
