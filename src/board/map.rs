//! Map file loading and writing.
//!
//! A map is a whitespace-separated token stream:
//!
//! ```text
//! B <territories> <paths> <continents>
//! T <x> <y> <id> <owner> <continent> <special> <magnitude> <power>   (per territory)
//! P <a> <b>                                                          (per path)
//! E                                                                  (optional)
//! ```
//!
//! Any deviation is a [`MapError`]; a map that fails to load halts startup.

use std::fmt::Write as _;
use std::path::Path;
use std::str::SplitWhitespace;

use super::state::{Board, BoardError};
use super::territory::{
    ContinentId, Player, SpecialKind, Territory, TerritoryId, MAX_TERRITORIES,
};

/// Errors that can occur while loading a map.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("expected marker '{expected}', found '{found}'")]
    UnexpectedMarker { expected: char, found: String },

    #[error("map ended early, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("invalid {field}: '{token}'")]
    InvalidNumber { field: &'static str, token: String },

    #[error("a map holds at most {max} territories, header declares {0}", max = MAX_TERRITORIES)]
    TooManyTerritories(usize),

    #[error("a map holds at most {max} continents, header declares {0}", max = MAX_TERRITORIES)]
    TooManyContinents(usize),

    #[error("territory {0} starts with no troops")]
    EmptyTerritory(u32),

    #[error("territory id {id} is outside 0..{count}")]
    TerritoryOutOfRange { id: u32, count: usize },

    #[error("territory {0} is declared twice")]
    DuplicateTerritory(u32),

    #[error("territory {0} is never declared")]
    MissingTerritory(usize),

    #[error("invalid owner code {0}")]
    InvalidOwner(u32),

    #[error("invalid special kind code {0}")]
    InvalidSpecial(u32),

    #[error("continent {continent} is outside 0..{count}")]
    ContinentOutOfRange { continent: u32, count: usize },

    #[error("unexpected data after end of map: '{0}'")]
    TrailingData(String),

    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Board(#[from] BoardError),
}

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn next(&mut self, expected: &'static str) -> Result<&'a str, MapError> {
        self.inner.next().ok_or(MapError::UnexpectedEnd(expected))
    }

    fn marker(&mut self, marker: char) -> Result<(), MapError> {
        let tok = self.inner.next().ok_or(MapError::UnexpectedEnd("a marker"))?;
        let mut chars = tok.chars();
        if chars.next() == Some(marker) && chars.next().is_none() {
            Ok(())
        } else {
            Err(MapError::UnexpectedMarker {
                expected: marker,
                found: tok.to_string(),
            })
        }
    }

    fn number<T: std::str::FromStr>(&mut self, field: &'static str) -> Result<T, MapError> {
        let tok = self.next(field)?;
        tok.parse().map_err(|_| MapError::InvalidNumber {
            field,
            token: tok.to_string(),
        })
    }
}

/// Parses map text into a board.
pub fn parse_map(text: &str) -> Result<Board, MapError> {
    let mut tokens = Tokens {
        inner: text.split_whitespace(),
    };

    tokens.marker('B')?;
    let count: usize = tokens.number("territory count")?;
    let path_count: usize = tokens.number("path count")?;
    let continent_count: usize = tokens.number("continent count")?;
    if count > MAX_TERRITORIES {
        return Err(MapError::TooManyTerritories(count));
    }
    if continent_count > MAX_TERRITORIES {
        return Err(MapError::TooManyContinents(continent_count));
    }

    let mut slots: Vec<Option<Territory>> = vec![None; count];
    for _ in 0..count {
        tokens.marker('T')?;
        let x: i32 = tokens.number("x")?;
        let y: i32 = tokens.number("y")?;
        let id: u32 = tokens.number("territory id")?;
        let owner: u32 = tokens.number("owner")?;
        let continent: u32 = tokens.number("continent")?;
        let special: u32 = tokens.number("special kind")?;
        let magnitude: i32 = tokens.number("magnitude")?;
        let power: u32 = tokens.number("power")?;

        let idx = id as usize;
        if idx >= count {
            return Err(MapError::TerritoryOutOfRange { id, count });
        }
        if slots[idx].is_some() {
            return Err(MapError::DuplicateTerritory(id));
        }
        if continent as usize >= continent_count {
            return Err(MapError::ContinentOutOfRange {
                continent,
                count: continent_count,
            });
        }
        if power == 0 {
            return Err(MapError::EmptyTerritory(id));
        }
        let owner = Player::from_code(owner).ok_or(MapError::InvalidOwner(owner))?;
        let special = SpecialKind::from_code(special).ok_or(MapError::InvalidSpecial(special))?;

        slots[idx] = Some(
            Territory::new(idx as TerritoryId, owner, continent as ContinentId)
                .with_position(x, y)
                .with_special(special, magnitude)
                .with_power(power),
        );
    }

    let mut paths = Vec::with_capacity(path_count);
    for _ in 0..path_count {
        tokens.marker('P')?;
        let a: u32 = tokens.number("path start")?;
        let b: u32 = tokens.number("path end")?;
        for id in [a, b] {
            if id as usize >= count {
                return Err(MapError::TerritoryOutOfRange { id, count });
            }
        }
        paths.push((a as TerritoryId, b as TerritoryId));
    }

    match tokens.inner.next() {
        None | Some("E") => {}
        Some(other) => return Err(MapError::TrailingData(other.to_string())),
    }
    if let Some(other) = tokens.inner.next() {
        return Err(MapError::TrailingData(other.to_string()));
    }

    let territories = slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| slot.ok_or(MapError::MissingTerritory(i)))
        .collect::<Result<Vec<_>, _>>()?;

    let board = Board::new(territories, &paths, continent_count)?;
    log::info!(
        "map loaded: {} territories, {} paths, {} continents",
        count,
        path_count,
        continent_count
    );
    Ok(board)
}

/// Reads and parses a map file.
pub fn load_map(path: impl AsRef<Path>) -> Result<Board, MapError> {
    let text = std::fs::read_to_string(path)?;
    parse_map(&text)
}

/// Writes a board back out in map format, one record per line.
pub fn encode_map(board: &Board) -> String {
    let roads: Vec<_> = board.roads().collect();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "B {} {} {}",
        board.len(),
        roads.len(),
        board.continent_count()
    );
    for t in board.territories() {
        let _ = writeln!(
            out,
            "T {} {} {} {} {} {} {} {}",
            t.x,
            t.y,
            t.id,
            t.owner.code(),
            t.continent,
            t.special.code(),
            t.magnitude,
            t.power
        );
    }
    for (a, b) in roads {
        let _ = writeln!(out, "P {} {}", a, b);
    }
    out.push_str("E\n");
    out
}
