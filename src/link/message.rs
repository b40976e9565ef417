//! Wire encoding of a full board-state message.
//!
//! ```text
//! B T <id> <power> <owner> T <id> <power> <owner> ...
//! ```
//!
//! One `T` entry per territory in id order. Tokens are separated by spaces
//! or newlines and empty tokens are skipped, so the same reader accepts
//! text built in memory and bytes trickling in over a link.

use serde::{Deserialize, Serialize};

use super::error::LinkError;
use crate::board::{Board, Player, StateChange, TerritoryId};

/// Sent by a device that wants to transmit.
pub const READY: u8 = b'A';
/// Go-ahead after a ready, and acknowledgement after a message.
pub const GO: u8 = b'R';

pub const MESSAGE_MARKER: &str = "B";
pub const ENTRY_MARKER: &str = "T";

pub(crate) fn is_separator(b: u8) -> bool {
    matches!(b, b' ' | b'\n' | b'\r' | b'\t')
}

/// The state of one territory as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryState {
    pub id: TerritoryId,
    pub power: u32,
    pub owner: Player,
}

/// Per-territory state for the whole board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMessage {
    pub states: Vec<TerritoryState>,
}

/// What applying a received message changed on the local board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Territories whose troop count was overwritten.
    pub power_updates: usize,
    /// Territories that changed hands, in the order they were applied.
    pub flipped: Vec<TerritoryId>,
    /// Exchanges started before one completed.
    pub attempts: u32,
}

impl SyncReport {
    fn record(&mut self, id: TerritoryId, change: StateChange) {
        if change.power_changed {
            self.power_updates += 1;
        }
        if change.flipped {
            self.flipped.push(id);
        }
    }
}

impl LinkMessage {
    pub fn from_board(board: &Board) -> Self {
        LinkMessage {
            states: board
                .territories()
                .iter()
                .map(|t| TerritoryState {
                    id: t.id,
                    power: t.power,
                    owner: t.owner,
                })
                .collect(),
        }
    }

    /// Wire text for this message. Starts with a line break so the marker
    /// never runs into a byte the peer sent earlier.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(3 + self.states.len() * 12);
        out.push('\n');
        out.push_str(MESSAGE_MARKER);
        out.push(' ');
        for s in &self.states {
            out.push_str(&format!(
                "{} {} {} {} ",
                ENTRY_MARKER,
                s.id,
                s.power,
                s.owner.code()
            ));
        }
        out
    }

    /// Applies every entry to `board`, in order.
    pub fn apply(&self, board: &mut Board) -> Result<SyncReport, LinkError> {
        let mut report = SyncReport::default();
        for s in &self.states {
            let change = board.apply_state(s.id as u32, s.power, s.owner)?;
            report.record(s.id, change);
        }
        Ok(report)
    }
}

/// Something that yields whitespace-separated tokens.
pub trait TokenSource {
    /// Returns the next non-empty token. `expected` names what the caller
    /// is looking for, for error messages.
    fn next_token(&mut self, expected: &'static str) -> Result<String, LinkError>;
}

/// Tokens from text already in memory.
pub struct TextTokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> TextTokens<'a> {
    pub fn new(text: &'a str) -> Self {
        TextTokens {
            inner: text.split_whitespace(),
        }
    }
}

impl TokenSource for TextTokens<'_> {
    fn next_token(&mut self, expected: &'static str) -> Result<String, LinkError> {
        self.inner
            .next()
            .map(str::to_owned)
            .ok_or(LinkError::Desync {
                expected,
                found: String::from("end of input"),
            })
    }
}

fn expect_marker<S: TokenSource>(src: &mut S, marker: &'static str) -> Result<(), LinkError> {
    let tok = src.next_token(marker)?;
    if tok != marker {
        return Err(LinkError::Desync {
            expected: marker,
            found: tok,
        });
    }
    Ok(())
}

fn number<S: TokenSource>(src: &mut S, field: &'static str) -> Result<u32, LinkError> {
    let tok = src.next_token(field)?;
    tok.parse()
        .map_err(|_| LinkError::Desync { expected: field, found: tok })
}

/// Reads the message marker, skipping any stray ready tokens left over from
/// a retried handshake.
fn read_header<S: TokenSource>(src: &mut S) -> Result<(), LinkError> {
    loop {
        let tok = src.next_token(MESSAGE_MARKER)?;
        if tok == MESSAGE_MARKER {
            return Ok(());
        }
        if !tok.bytes().all(|b| b == READY) {
            return Err(LinkError::Desync {
                expected: MESSAGE_MARKER,
                found: tok,
            });
        }
        log::debug!("skipping stale ready token '{}'", tok);
    }
}

/// Reads one `T id power owner` entry for a board of `node_count` territories.
pub fn read_entry<S: TokenSource>(src: &mut S, node_count: usize) -> Result<TerritoryState, LinkError> {
    expect_marker(src, ENTRY_MARKER)?;
    let id = number(src, "a territory id")?;
    if id as usize >= node_count {
        return Err(LinkError::Desync {
            expected: "a territory id on this map",
            found: id.to_string(),
        });
    }
    let power = number(src, "a troop count")?;
    let code = number(src, "an owner code")?;
    let owner = Player::from_code(code).ok_or(LinkError::Desync {
        expected: "owner 1 or 2",
        found: code.to_string(),
    })?;
    Ok(TerritoryState {
        id: id as TerritoryId,
        power,
        owner,
    })
}

/// Reads a whole message from `src`, applying each entry to `board` as soon
/// as it is read. On error the entries already applied stay applied; the
/// next full message overwrites them.
pub fn receive_into<S: TokenSource>(src: &mut S, board: &mut Board) -> Result<SyncReport, LinkError> {
    read_header(src)?;
    let n = board.len();
    let mut report = SyncReport::default();
    for _ in 0..n {
        let s = read_entry(src, n)?;
        let change = board.apply_state(s.id as u32, s.power, s.owner)?;
        log::debug!(
            "territory {} <- power {} owner {:?}{}",
            s.id,
            s.power,
            s.owner,
            if change.flipped { " (flipped)" } else { "" }
        );
        report.record(s.id, change);
    }
    Ok(report)
}

/// Parses message text for a board of `node_count` territories.
pub fn parse_message(text: &str, node_count: usize) -> Result<LinkMessage, LinkError> {
    let mut src = TextTokens::new(text);
    read_header(&mut src)?;
    let states = (0..node_count)
        .map(|_| read_entry(&mut src, node_count))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LinkMessage { states })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Territory;

    fn pair_board(p0: u32, p1: u32) -> Board {
        let terrs = vec![
            Territory::new(0, Player::One, 0).with_power(p0),
            Territory::new(1, Player::Two, 0).with_power(p1),
        ];
        Board::new(terrs, &[(0, 1)], 1).unwrap()
    }

    #[test]
    fn encodes_in_id_order() {
        let msg = LinkMessage::from_board(&pair_board(5, 3));
        assert_eq!(msg.encode(), "\nB T 0 5 1 T 1 3 2 ");
    }

    #[test]
    fn round_trip_without_flips() {
        let sender = pair_board(5, 3);
        let mut receiver = pair_board(1, 1);
        let text = LinkMessage::from_board(&sender).encode();
        let report = receive_into(&mut TextTokens::new(&text), &mut receiver).unwrap();
        assert_eq!(report.power_updates, 2);
        assert!(report.flipped.is_empty());
        assert!(receiver.same_state(&sender));
        assert!(receiver.graph().base().is_edge(0, 1));
        assert!(!receiver.graph().is_same_owner_edge(0, 1));
    }

    #[test]
    fn owner_change_flips() {
        let mut receiver = pair_board(2, 2);
        let report = receive_into(
            &mut TextTokens::new("B T 0 2 1 T 1 4 1"),
            &mut receiver,
        )
        .unwrap();
        assert_eq!(report.flipped, vec![1]);
        assert!(receiver.graph().is_same_owner_edge(0, 1));
        assert_eq!(receiver.winner(), Some(Player::One));
    }

    #[test]
    fn empty_tokens_skipped() {
        let msg = parse_message("  B\n\nT 0  5 1\nT 1 3 2\n", 2).unwrap();
        assert_eq!(msg.states.len(), 2);
        assert_eq!(msg.states[1], TerritoryState { id: 1, power: 3, owner: Player::Two });
    }

    #[test]
    fn stale_ready_tokens_before_header() {
        let msg = parse_message("A AA B T 0 5 1 T 1 3 2", 2).unwrap();
        assert_eq!(msg.states[0].power, 5);
    }

    #[test]
    fn bad_markers_desync() {
        let err = parse_message("X T 0 5 1 T 1 3 2", 2).unwrap_err();
        assert!(matches!(err, LinkError::Desync { expected: "B", .. }));
        let err = parse_message("B T 0 5 1 Q 1 3 2", 2).unwrap_err();
        assert!(matches!(err, LinkError::Desync { expected: "T", .. }));
    }

    #[test]
    fn bad_fields_desync() {
        for text in [
            "B T 0 five 1 T 1 3 2",
            "B T 0 5 3 T 1 3 2",
            "B T 0 5 0 T 1 3 2",
            "B T 9 5 1 T 1 3 2",
            "B T 0 5 1",
        ] {
            let err = parse_message(text, 2).unwrap_err();
            assert!(matches!(err, LinkError::Desync { .. }), "{text}: {err}");
            assert!(err.is_recoverable());
        }
    }

    #[test]
    fn partial_apply_then_error() {
        let mut receiver = pair_board(1, 1);
        let err = receive_into(&mut TextTokens::new("B T 0 7 1 T 1 x 2"), &mut receiver).unwrap_err();
        assert!(matches!(err, LinkError::Desync { .. }));
        assert_eq!(receiver.territory(0).unwrap().power, 7);
        assert!(receiver.invariants_hold());
    }

    #[test]
    fn apply_parsed_message() {
        let mut receiver = pair_board(1, 1);
        let msg = parse_message("B T 0 2 2 T 1 6 2", 2).unwrap();
        let report = msg.apply(&mut receiver).unwrap();
        assert_eq!(report.flipped, vec![0]);
        assert_eq!(receiver.count(Player::Two), 2);
    }
}
