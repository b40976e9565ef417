//! Board representation and gameplay rules.
//!
//! Contains territory records, the board that ties them to the ownership
//! graph, the map file format, local gameplay moves, and the read-only view
//! used by the display layer.

pub mod combat;
pub mod map;
pub mod state;
pub mod territory;
pub mod view;

pub use combat::{
    reinforce, resolve_attack, transfer, AttackOutcome, AttackReport, CombatError,
};
pub use map::{encode_map, load_map, parse_map, MapError};
pub use state::{Board, BoardError, StateChange, BASE_REINFORCEMENTS};
pub use territory::{
    ContinentId, Player, SpecialKind, Territory, TerritoryId, ALL_PLAYERS, MAX_TERRITORIES,
};
pub use view::{TerritoryView, TILE_HEIGHT, TILE_WIDTH};
