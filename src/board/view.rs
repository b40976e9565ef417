//! Read-only surface for the rendering and touch-input layer.
//!
//! The display code draws from [`TerritoryView`]s and [`Board::roads`], and
//! turns a touch into a territory with [`Board::terr_touched`]. Nothing here
//! mutates the board.

use serde::Serialize;

use super::state::Board;
use super::territory::{ContinentId, Player, SpecialKind, TerritoryId};

/// Width of a territory tile in map coordinates.
pub const TILE_WIDTH: i32 = 25;
/// Height of a territory tile in map coordinates.
pub const TILE_HEIGHT: i32 = 25;

/// What the display needs to draw one territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TerritoryView {
    pub id: TerritoryId,
    pub x: i32,
    pub y: i32,
    pub owner: Player,
    pub continent: ContinentId,
    pub special: SpecialKind,
    pub power: u32,
}

impl Board {
    /// Drawing data for every territory, in id order.
    pub fn views(&self) -> impl Iterator<Item = TerritoryView> + '_ {
        self.territories.iter().map(|t| TerritoryView {
            id: t.id,
            x: t.x,
            y: t.y,
            owner: t.owner,
            continent: t.continent,
            special: t.special,
            power: t.power,
        })
    }

    /// Every connection once, as `(a, b)` with `a < b`.
    pub fn roads(&self) -> impl Iterator<Item = (TerritoryId, TerritoryId)> + '_ {
        self.graph().base().edges()
    }

    /// Returns the territory whose tile strictly contains `(x, y)`.
    ///
    /// Binary search over the x-sorted ids finds the last tile starting left
    /// of the point, then walks back while tiles can still cover it.
    pub fn terr_touched(&self, x: i32, y: i32) -> Option<TerritoryId> {
        let end = self
            .x_order
            .partition_point(|&id| self.territories[id as usize].x < x);
        self.x_order[..end]
            .iter()
            .rev()
            .map(|&id| &self.territories[id as usize])
            .take_while(|t| x < t.x + TILE_WIDTH)
            .find(|t| t.y < y && y < t.y + TILE_HEIGHT)
            .map(|t| t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::territory::Territory;

    fn board() -> Board {
        let terrs = vec![
            Territory::new(0, Player::One, 0).with_position(100, 10),
            Territory::new(1, Player::Two, 0).with_position(10, 10),
            Territory::new(2, Player::One, 1).with_position(10, 60),
            Territory::new(3, Player::Two, 1).with_position(20, 100),
        ];
        Board::new(terrs, &[(0, 1), (1, 2), (2, 3)], 2).unwrap()
    }

    #[test]
    fn touch_inside_tile() {
        let b = board();
        assert_eq!(b.terr_touched(112, 20), Some(0));
        assert_eq!(b.terr_touched(11, 11), Some(1));
        assert_eq!(b.terr_touched(30, 70), Some(2));
        assert_eq!(b.terr_touched(30, 110), Some(3));
    }

    #[test]
    fn touch_on_edge_misses() {
        let b = board();
        assert_eq!(b.terr_touched(10, 20), None);
        assert_eq!(b.terr_touched(35, 20), None);
        assert_eq!(b.terr_touched(20, 10), None);
    }

    #[test]
    fn touch_in_gap_misses() {
        let b = board();
        assert_eq!(b.terr_touched(60, 20), None);
        assert_eq!(b.terr_touched(500, 500), None);
        assert_eq!(b.terr_touched(-5, 20), None);
    }

    #[test]
    fn overlapping_columns_resolved_by_y() {
        // tiles 1 and 2 share x = 10; tile 3 at x = 20 overlaps both columns
        let b = board();
        assert_eq!(b.terr_touched(25, 15), Some(1));
        assert_eq!(b.terr_touched(25, 65), Some(2));
    }

    #[test]
    fn views_in_id_order() {
        let b = board();
        let views: Vec<_> = b.views().collect();
        assert_eq!(views.len(), 4);
        assert_eq!(views[1].x, 10);
        assert_eq!(views[3].owner, Player::Two);
        assert_eq!(views[2].continent, 1);
    }

    #[test]
    fn roads_listed_once() {
        let mut roads: Vec<_> = board().roads().collect();
        roads.sort_unstable();
        assert_eq!(roads, vec![(0, 1), (1, 2), (2, 3)]);
    }
}
