//! Keeps the two devices' boards in step over a byte-stream link.
//!
//! Each turn the active device transmits its whole board state; the peer
//! overwrites its copy territory by territory and flips ownership as needed.

pub mod error;
pub mod message;
pub mod sync;
pub mod transport;

pub use error::LinkError;
pub use message::{
    parse_message, receive_into, LinkMessage, SyncReport, TerritoryState, TextTokens, TokenSource,
    GO, READY,
};
pub use sync::{LinkConfig, LinkSynchronizer};
pub use transport::{Link, MemoryLink, TcpLink};
