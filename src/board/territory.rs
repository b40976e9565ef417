//! Territory records, players, and special tile kinds.
//!
//! A territory's id doubles as its index everywhere: in the board's territory
//! vector, in both graphs, and on the wire. Ids are dense and fit in a byte,
//! so a map holds at most [`MAX_TERRITORIES`] territories.

use serde::{Deserialize, Serialize};

/// Territory identifier, dense from 0.
pub type TerritoryId = u8;

/// Continent identifier, dense from 0.
pub type ContinentId = u8;

/// The largest number of territories a map may hold.
pub const MAX_TERRITORIES: usize = 256;

/// One of the two players. Wire and map files use codes 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    One,
    Two,
}

/// Both players in code order.
pub const ALL_PLAYERS: [Player; 2] = [Player::One, Player::Two];

impl Player {
    /// Returns the numeric code used in map files and link messages.
    pub const fn code(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    /// Parses a numeric player code.
    pub fn from_code(code: u32) -> Option<Player> {
        match code {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }

    /// Zero-based index for per-player arrays.
    pub const fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    pub const fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Display colour name.
    pub const fn name(self) -> &'static str {
        match self {
            Player::One => "blue",
            Player::Two => "red",
        }
    }
}

/// Special property a territory may carry.
///
/// Only fertile land affects the rules (its magnitude feeds the owner's
/// reinforcement bonus); the others are carried for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialKind {
    #[default]
    None,
    Hazard,
    Dam,
    Fortress,
    FertileLand,
}

impl SpecialKind {
    /// Returns the numeric code used in map files.
    pub const fn code(self) -> u8 {
        match self {
            SpecialKind::None => 0,
            SpecialKind::Hazard => 1,
            SpecialKind::Dam => 2,
            SpecialKind::Fortress => 3,
            SpecialKind::FertileLand => 4,
        }
    }

    /// Parses a numeric special-kind code.
    pub fn from_code(code: u32) -> Option<SpecialKind> {
        match code {
            0 => Some(SpecialKind::None),
            1 => Some(SpecialKind::Hazard),
            2 => Some(SpecialKind::Dam),
            3 => Some(SpecialKind::Fortress),
            4 => Some(SpecialKind::FertileLand),
            _ => None,
        }
    }
}

/// A node of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    /// Upper-left corner of the territory tile, in map coordinates.
    pub x: i32,
    pub y: i32,
    pub owner: Player,
    pub continent: ContinentId,
    pub special: SpecialKind,
    pub magnitude: i32,
    /// Troop count.
    pub power: u32,
}

impl Territory {
    /// Creates a plain territory at the origin holding one troop.
    pub fn new(id: TerritoryId, owner: Player, continent: ContinentId) -> Self {
        Territory {
            id,
            x: 0,
            y: 0,
            owner,
            continent,
            special: SpecialKind::None,
            magnitude: 0,
            power: 1,
        }
    }

    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_special(mut self, special: SpecialKind, magnitude: i32) -> Self {
        self.special = special;
        self.magnitude = magnitude;
        self
    }

    pub fn with_power(mut self, power: u32) -> Self {
        self.power = power;
        self
    }

    /// The magnitude this territory adds to its owner's fertile-land bonus.
    pub fn fertile_yield(&self) -> i32 {
        if self.special == SpecialKind::FertileLand {
            self.magnitude
        } else {
            0
        }
    }
}
