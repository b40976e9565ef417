//! Turn-by-turn reconciliation of the two board copies.
//!
//! A transmitting device sends `A`, waits for `R`, sends the full state
//! message and waits for a second `R` acknowledging it. The receiving device
//! answers the first `A` with `R`, applies the message as it streams in and
//! replies `R` once it is complete. Any desync or timeout abandons the
//! exchange and both sides start over; the next full message repairs whatever
//! a broken one left behind.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::LinkError;
use super::message::{is_separator, receive_into, LinkMessage, SyncReport, TokenSource, GO, READY};
use super::transport::Link;
use crate::board::Board;

/// Tokens longer than this are treated as line noise.
const MAX_TOKEN_LEN: usize = 16;

/// Timing and retry limits for the link protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Bound on each single-byte read while waiting for a token.
    pub token_timeout_ms: u64,
    /// How long a sender waits for the acknowledgement of a whole message.
    pub ack_timeout_ms: u64,
    /// Ready waits before a receive gives up. `None` waits forever.
    pub ready_attempts: Option<u32>,
    /// Handshakes (and full send attempts) before a send gives up.
    pub handshake_attempts: Option<u32>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            token_timeout_ms: 1000,
            ack_timeout_ms: 10_000,
            ready_attempts: None,
            handshake_attempts: None,
        }
    }
}

impl LinkConfig {
    pub fn token_timeout(&self) -> Duration {
        Duration::from_millis(self.token_timeout_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

/// Tokens read byte by byte from a link.
struct LinkTokens<'a, L> {
    link: &'a mut L,
    timeout: Duration,
}

impl<L: Link> TokenSource for LinkTokens<'_, L> {
    fn next_token(&mut self, expected: &'static str) -> Result<String, LinkError> {
        let mut tok = Vec::new();
        loop {
            let b = match self.link.read_byte(self.timeout)? {
                Some(b) => b,
                None => return Err(LinkError::Timeout(expected)),
            };
            if is_separator(b) {
                if tok.is_empty() {
                    continue;
                }
                break;
            }
            tok.push(b);
            if tok.len() > MAX_TOKEN_LEN {
                return Err(LinkError::Desync {
                    expected,
                    found: String::from_utf8_lossy(&tok).into_owned(),
                });
            }
        }
        Ok(String::from_utf8_lossy(&tok).into_owned())
    }
}

/// Runs the link protocol for one device.
#[derive(Debug)]
pub struct LinkSynchronizer<L> {
    link: L,
    config: LinkConfig,
}

impl<L: Link> LinkSynchronizer<L> {
    pub fn new(link: L, config: LinkConfig) -> Self {
        LinkSynchronizer { link, config }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }

    /// Reads until `target`, skipping whitespace. Each byte read is bounded by
    /// `timeout`.
    fn wait_for(&mut self, target: u8, timeout: Duration, what: &'static str) -> Result<(), LinkError> {
        loop {
            match self.link.read_byte(timeout)? {
                None => return Err(LinkError::Timeout(what)),
                Some(b) if b == target => return Ok(()),
                Some(b) if is_separator(b) => continue,
                Some(b) => return Err(LinkError::UnexpectedByte(b, target as char)),
            }
        }
    }

    /// Repeats `op` while it fails recoverably, at most `cap` times.
    fn retry<T>(
        &mut self,
        cap: Option<u32>,
        what: &str,
        mut op: impl FnMut(&mut Self) -> Result<T, LinkError>,
    ) -> Result<T, LinkError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match op(self) {
                Ok(v) => return Ok(v),
                Err(e) if e.is_recoverable() => {
                    if cap.is_some_and(|c| attempts >= c) {
                        log::warn!("{} failed {} times, giving up: {}", what, attempts, e);
                        return Err(LinkError::RetriesExhausted { attempts });
                    }
                    log::debug!("{} attempt {} failed: {}", what, attempts, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Drops whatever the peer has already sent. Returns whether a ready
    /// token was among it.
    fn discard_pending(&mut self) -> Result<bool, LinkError> {
        let mut n = 0;
        let mut saw_ready = false;
        while let Some(b) = self.link.read_byte(Duration::ZERO)? {
            saw_ready |= b == READY;
            n += 1;
        }
        if n > 0 {
            log::debug!("discarded {} stale bytes", n);
        }
        Ok(saw_ready)
    }

    /// Waits once for the peer's ready token.
    pub fn await_ready(&mut self) -> Result<(), LinkError> {
        let timeout = self.config.token_timeout();
        self.wait_for(READY, timeout, "ready")
    }

    /// Grants the peer permission to transmit, or acknowledges a message.
    pub fn send_go(&mut self) -> Result<(), LinkError> {
        self.link.write_bytes(&[GO])?;
        Ok(())
    }

    /// Reads one message, applying it to `board` as it arrives.
    pub fn receive_state(&mut self, board: &mut Board) -> Result<SyncReport, LinkError> {
        let timeout = self.config.token_timeout();
        let mut tokens = LinkTokens {
            link: &mut self.link,
            timeout,
        };
        receive_into(&mut tokens, board)
    }

    /// Receives the peer's turn: waits for ready, grants it, applies the
    /// message, and acknowledges it. Broken exchanges start over.
    pub fn receive_turn(&mut self, board: &mut Board) -> Result<SyncReport, LinkError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let cap = self.config.ready_attempts;
            self.retry(cap, "ready wait", |s| s.await_ready())?;
            // duplicate readies from the peer's retries
            self.discard_pending()?;
            self.send_go()?;
            match self.receive_state(board) {
                Ok(mut report) => {
                    self.send_go()?;
                    report.attempts = attempts;
                    log::info!(
                        "received turn: {} power updates, {} flips, {} attempts",
                        report.power_updates,
                        report.flipped.len(),
                        attempts
                    );
                    return Ok(report);
                }
                Err(e) if e.is_recoverable() => {
                    log::warn!("receive attempt {} abandoned: {}", attempts, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One handshake: ready out, go-ahead back.
    pub fn handshake(&mut self) -> Result<(), LinkError> {
        self.link.write_bytes(&[READY])?;
        let timeout = self.config.token_timeout();
        self.wait_for(GO, timeout, "go-ahead")
    }

    /// One send attempt: handshake, transmit, wait for the acknowledgement.
    /// A ready token from the peer after the message went out at least once
    /// surfaces as `UnexpectedByte(READY, ..)`.
    fn try_send(&mut self, payload: &[u8], transmitted: &mut bool) -> Result<(), LinkError> {
        if self.discard_pending()? && *transmitted {
            return Err(LinkError::UnexpectedByte(READY, GO as char));
        }
        self.handshake()?;
        self.link.write_bytes(payload)?;
        *transmitted = true;
        let timeout = self.config.ack_timeout();
        self.wait_for(GO, timeout, "acknowledgement")
    }

    /// Transmits the full board state and waits for the acknowledgement.
    /// Returns the number of attempts it took.
    ///
    /// The peer only starts transmitting after it has accepted a message, so
    /// once ours has gone out a ready token from the peer also counts as the
    /// acknowledgement. This covers a lost acknowledgement byte.
    pub fn send_turn(&mut self, board: &Board) -> Result<u32, LinkError> {
        let payload = LinkMessage::from_board(board).encode();
        let cap = self.config.handshake_attempts;
        let mut transmitted = false;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.try_send(payload.as_bytes(), &mut transmitted) {
                Ok(()) => {
                    log::info!("sent turn: {} territories, {} attempts", board.len(), attempts);
                    return Ok(attempts);
                }
                Err(LinkError::UnexpectedByte(READY, _)) if transmitted => {
                    log::info!("peer is already transmitting, taking that as the acknowledgement");
                    return Ok(attempts);
                }
                Err(e) if e.is_recoverable() => {
                    if cap.is_some_and(|c| attempts >= c) {
                        log::warn!("send failed {} times, giving up: {}", attempts, e);
                        return Err(LinkError::RetriesExhausted { attempts });
                    }
                    log::warn!("send attempt {} abandoned: {}", attempts, e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
