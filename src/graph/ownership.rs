//! Team-aware map graph.
//!
//! Wraps the full adjacency graph together with a second graph that holds
//! only the edges whose endpoints share an owner. The same-owner edge set is
//! always exactly `{(u, v) in base : owner(u) == owner(v)}`; every owner
//! change must go through [`OwnershipGraph::flip`] before anything queries
//! counts, bonuses, or same-owner adjacency.
//!
//! Derived state is maintained incrementally: per-player territory counts,
//! per-player fertile-land bonus, and per-continent membership lists.

use std::collections::VecDeque;

use super::adjacency::{AdjacencyGraph, GraphError};
use crate::board::territory::{ContinentId, Player, Territory, TerritoryId, MAX_TERRITORIES};
use crate::collections::GrowableBuffer;

/// Map graph plus ownership-derived state.
#[derive(Debug, Clone)]
pub struct OwnershipGraph {
    base: AdjacencyGraph,
    same_owner: AdjacencyGraph,
    counts: [u32; 2],
    fertile: [i32; 2],
    continents: Vec<Option<GrowableBuffer<TerritoryId>>>,
}

impl OwnershipGraph {
    pub fn new(node_count: usize, continent_count: usize) -> Result<Self, GraphError> {
        if continent_count > MAX_TERRITORIES {
            return Err(GraphError::TooManyContinents {
                requested: continent_count,
                max: MAX_TERRITORIES,
            });
        }
        Ok(OwnershipGraph {
            base: AdjacencyGraph::new(node_count)?,
            same_owner: AdjacencyGraph::new(node_count)?,
            counts: [0; 2],
            fertile: [0; 2],
            continents: vec![None; continent_count],
        })
    }

    /// The full adjacency graph.
    pub fn base(&self) -> &AdjacencyGraph {
        &self.base
    }

    /// The subgraph of edges between territories of the same owner.
    pub fn same_owner(&self) -> &AdjacencyGraph {
        &self.same_owner
    }

    pub fn node_count(&self) -> usize {
        self.base.node_count()
    }

    pub fn continent_count(&self) -> usize {
        self.continents.len()
    }

    /// Registers a territory. Counts, fertile bonus, and continent membership
    /// are updated only the first time an id is seen.
    pub fn add_vertex(&mut self, t: &Territory) -> Result<(), GraphError> {
        let continent = t.continent as usize;
        if continent >= self.continents.len() {
            return Err(GraphError::UnknownContinent(continent));
        }
        self.same_owner.add_vertex(t.id)?;
        if !self.base.add_vertex(t.id)? {
            return Ok(());
        }
        let owner = t.owner.index();
        self.counts[owner] += 1;
        self.fertile[owner] += t.fertile_yield();
        self.continents[continent]
            .get_or_insert_with(GrowableBuffer::new)
            .push(t.id);
        log::trace!("territory {} added for {:?}", t.id, t.owner);
        Ok(())
    }

    /// Connects two territories. The same-owner edge is added only if both
    /// currently share an owner; later convergence is handled by `flip`.
    pub fn add_edge(&mut self, t: &Territory, other: &Territory) -> Result<(), GraphError> {
        if !self.base.is_vertex(t.id) {
            self.add_vertex(t)?;
        }
        if !self.base.is_vertex(other.id) {
            self.add_vertex(other)?;
        }
        self.base.add_edge(t.id, other.id)?;
        if t.owner == other.owner {
            self.same_owner.add_edge(t.id, other.id)?;
        }
        Ok(())
    }

    /// Applies an owner change that has already been written to `t`.
    ///
    /// `t.owner` is the new owner and `all` holds the current records of every
    /// territory, indexed by id. Runs in O(degree).
    pub fn flip(&mut self, t: &Territory, all: &[Territory]) -> Result<(), GraphError> {
        if !self.base.is_vertex(t.id) {
            return Err(GraphError::MissingVertex(t.id));
        }
        if all.len() < self.node_count() {
            return Err(GraphError::ShortRecords {
                given: all.len(),
                expected: self.node_count(),
            });
        }
        let gained = t.owner;
        let lost = gained.opponent();

        self.counts[lost.index()] = self.counts[lost.index()]
            .checked_sub(1)
            .ok_or(GraphError::CountUnderflow(lost))?;
        self.counts[gained.index()] += 1;

        let yield_ = t.fertile_yield();
        self.fertile[lost.index()] -= yield_;
        self.fertile[gained.index()] += yield_;

        for n in self.base.neighbors(t.id) {
            if self.same_owner.is_edge(t.id, n) {
                self.same_owner.remove_edge(t.id, n)?;
            } else {
                let neighbour = all.get(n as usize).ok_or(GraphError::MissingVertex(n))?;
                if neighbour.owner == gained {
                    self.same_owner.add_edge(t.id, n)?;
                }
            }
        }

        log::debug!(
            "territory {} flipped to {:?} ({} vs {})",
            t.id,
            gained,
            self.counts[0],
            self.counts[1]
        );
        Ok(())
    }

    /// Number of territories owned by `player`.
    pub fn count(&self, player: Player) -> u32 {
        self.counts[player.index()]
    }

    /// Sum of fertile-land magnitudes owned by `player`.
    pub fn fertile_bonus(&self, player: Player) -> i32 {
        self.fertile[player.index()]
    }

    /// The surviving player once the other owns nothing, else `None`.
    pub fn winner(&self) -> Option<Player> {
        if self.counts[Player::One.index()] == 0 {
            Some(Player::Two)
        } else if self.counts[Player::Two.index()] == 0 {
            Some(Player::One)
        } else {
            None
        }
    }

    /// Members of continent `c` in insertion order. Empty for a continent that
    /// has no territories.
    pub fn continent_members(&self, c: ContinentId) -> &[TerritoryId] {
        match self.continents.get(c as usize) {
            Some(Some(members)) => members.as_slice(),
            _ => &[],
        }
    }

    fn controls(&self, members: &GrowableBuffer<TerritoryId>, player: Player, all: &[Territory]) -> bool {
        members
            .iter()
            .all(|&id| all.get(id as usize).is_some_and(|t| t.owner == player))
    }

    /// Per-turn bonus: the node count plus the player's fertile bonus, less the
    /// size of every continent the player does not fully control.
    pub fn continent_bonus(&self, player: Player, all: &[Territory]) -> i32 {
        let mut bonus = self.node_count() as i32 + self.fertile[player.index()];
        for members in self.continents.iter().flatten() {
            if !self.controls(members, player, all) {
                bonus -= members.len() as i32;
            }
        }
        bonus
    }

    /// Continents every member of which is owned by `player`.
    pub fn controlled_continents(&self, player: Player, all: &[Territory]) -> Vec<ContinentId> {
        self.continents
            .iter()
            .enumerate()
            .filter_map(|(c, slot)| match slot {
                Some(members) if self.controls(members, player, all) => Some(c as ContinentId),
                _ => None,
            })
            .collect()
    }

    pub fn is_same_owner_edge(&self, u: TerritoryId, v: TerritoryId) -> bool {
        self.same_owner.is_edge(u, v)
    }

    pub fn same_owner_neighbors(&self, id: TerritoryId) -> impl Iterator<Item = TerritoryId> + '_ {
        self.same_owner.neighbors(id)
    }

    /// All same-owner edges as sorted `(u, v)` pairs with `u < v`.
    pub fn same_owner_edges(&self) -> Vec<(TerritoryId, TerritoryId)> {
        let mut edges: Vec<_> = self.same_owner.edges().collect();
        edges.sort_unstable();
        edges
    }

    /// Whether `to` can be reached from `from` without leaving territory of a
    /// single owner.
    pub fn same_owner_connected(&self, from: TerritoryId, to: TerritoryId) -> bool {
        if !self.same_owner.is_vertex(from) || !self.same_owner.is_vertex(to) {
            return false;
        }
        let mut visited = vec![false; self.node_count()];
        let mut queue = VecDeque::from([from]);
        visited[from as usize] = true;
        while let Some(id) = queue.pop_front() {
            if id == to {
                return true;
            }
            for n in self.same_owner.neighbors(id) {
                if !visited[n as usize] {
                    visited[n as usize] = true;
                    queue.push_back(n);
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::territory::SpecialKind;

    /// Chain 0-1-2-3 on one continent, node 3 owned by player two.
    fn chain() -> (OwnershipGraph, Vec<Territory>) {
        let mut terrs: Vec<Territory> = (0..4).map(|i| Territory::new(i, Player::One, 0)).collect();
        terrs[3].owner = Player::Two;
        let mut g = OwnershipGraph::new(4, 1).unwrap();
        for t in &terrs {
            g.add_vertex(t).unwrap();
        }
        for (a, b) in [(0, 1), (1, 2), (2, 3)] {
            g.add_edge(&terrs[a], &terrs[b]).unwrap();
        }
        (g, terrs)
    }

    #[test]
    fn counts_follow_initial_owners() {
        let (g, _) = chain();
        assert_eq!(g.count(Player::One), 3);
        assert_eq!(g.count(Player::Two), 1);
        assert_eq!(g.winner(), None);
    }

    #[test]
    fn add_vertex_counts_once() {
        let (mut g, terrs) = chain();
        g.add_vertex(&terrs[0]).unwrap();
        assert_eq!(g.count(Player::One), 3);
        assert_eq!(g.continent_members(0), &[0, 1, 2, 3]);
    }

    #[test]
    fn same_owner_edges_only_between_allies() {
        let (g, _) = chain();
        assert_eq!(g.same_owner_edges(), vec![(0, 1), (1, 2)]);
        assert!(g.base().is_edge(2, 3));
        assert!(!g.is_same_owner_edge(2, 3));
    }

    #[test]
    fn foreign_member_costs_whole_continent() {
        let (g, terrs) = chain();
        assert_eq!(g.continent_bonus(Player::One, &terrs), 0);
        assert!(g.controlled_continents(Player::One, &terrs).is_empty());
    }

    #[test]
    fn flip_completes_continent_and_links_edge() {
        let (mut g, mut terrs) = chain();
        terrs[3].owner = Player::One;
        g.flip(&terrs[3], &terrs).unwrap();

        assert_eq!(g.continent_bonus(Player::One, &terrs), 4);
        assert_eq!(g.controlled_continents(Player::One, &terrs), vec![0]);
        assert!(g.is_same_owner_edge(2, 3));
        assert!(g.is_same_owner_edge(3, 2));
        assert_eq!(g.count(Player::One), 4);
        assert_eq!(g.count(Player::Two), 0);
        assert_eq!(g.winner(), Some(Player::One));
    }

    #[test]
    fn flip_away_cuts_edges() {
        let (mut g, mut terrs) = chain();
        terrs[1].owner = Player::Two;
        g.flip(&terrs[1], &terrs).unwrap();
        assert_eq!(g.same_owner_edges(), Vec::<(u8, u8)>::new());
        assert_eq!(g.count(Player::One), 2);
        assert_eq!(g.count(Player::Two), 2);
        assert!(!g.same_owner_connected(0, 2));
    }

    #[test]
    fn flip_transfers_fertile_bonus() {
        let mut terrs = vec![
            Territory::new(0, Player::One, 0).with_special(SpecialKind::FertileLand, 2),
            Territory::new(1, Player::Two, 1),
        ];
        let mut g = OwnershipGraph::new(2, 2).unwrap();
        g.add_vertex(&terrs[0]).unwrap();
        g.add_vertex(&terrs[1]).unwrap();
        g.add_edge(&terrs[0], &terrs[1]).unwrap();
        assert_eq!(g.fertile_bonus(Player::One), 2);
        // 2 nodes + 2 fertile - continent 1 (size 1)
        assert_eq!(g.continent_bonus(Player::One, &terrs), 3);

        terrs[0].owner = Player::Two;
        g.flip(&terrs[0], &terrs).unwrap();
        assert_eq!(g.fertile_bonus(Player::One), 0);
        assert_eq!(g.fertile_bonus(Player::Two), 2);
        assert!(g.is_same_owner_edge(0, 1));
        assert_eq!(g.winner(), Some(Player::Two));
    }

    #[test]
    fn rejects_unknown_continent() {
        let mut g = OwnershipGraph::new(2, 1).unwrap();
        let t = Territory::new(0, Player::One, 1);
        assert_eq!(g.add_vertex(&t), Err(GraphError::UnknownContinent(1)));
    }

    #[test]
    fn flip_of_missing_vertex_fails() {
        let mut g = OwnershipGraph::new(2, 1).unwrap();
        let t = Territory::new(1, Player::One, 0);
        assert_eq!(g.flip(&t, &[t]), Err(GraphError::MissingVertex(1)));
    }

    #[test]
    fn flip_with_short_records_changes_nothing() {
        let (mut g, mut terrs) = chain();
        terrs[2].owner = Player::Two;
        assert_eq!(
            g.flip(&terrs[2], &terrs[..2]),
            Err(GraphError::ShortRecords { given: 2, expected: 4 })
        );
        assert_eq!(g.count(Player::One), 3);
        assert_eq!(g.count(Player::Two), 1);
        assert!(g.is_same_owner_edge(1, 2));
        assert!(!g.is_same_owner_edge(2, 3));
    }

    #[test]
    fn rejects_oversized_continent_count() {
        assert!(matches!(
            OwnershipGraph::new(1, usize::MAX),
            Err(GraphError::TooManyContinents { .. })
        ));
        assert!(OwnershipGraph::new(1, MAX_TERRITORIES).is_ok());
    }

    #[test]
    fn connected_through_allies_only() {
        let (g, _) = chain();
        assert!(g.same_owner_connected(0, 2));
        assert!(!g.same_owner_connected(0, 3));
        assert!(g.same_owner_connected(3, 3));
    }

    #[test]
    fn empty_side_loses() {
        let g = OwnershipGraph::new(0, 0).unwrap();
        assert_eq!(g.winner(), Some(Player::Two));
    }
}
