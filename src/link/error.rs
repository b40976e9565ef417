use std::io;

use crate::board::BoardError;

/// Errors raised while exchanging state over the link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("out of sync: expected {expected}, found '{found}'")]
    Desync { expected: &'static str, found: String },

    #[error("unexpected byte 0x{0:02x} while waiting for '{1}'")]
    UnexpectedByte(u8, char),

    #[error("gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("link closed by peer")]
    Disconnected,

    #[error("link i/o failed: {0}")]
    Io(#[source] io::Error),

    #[error(transparent)]
    Board(#[from] BoardError),
}

impl LinkError {
    /// Desyncs and timeouts abandon the current exchange, which is then
    /// restarted. Everything else ends the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LinkError::Timeout(_) | LinkError::Desync { .. } | LinkError::UnexpectedByte(..)
        )
    }
}

impl From<io::Error> for LinkError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => LinkError::Disconnected,
            _ => LinkError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_kinds() {
        assert!(LinkError::Timeout("ready").is_recoverable());
        assert!(LinkError::Desync { expected: "B", found: "X".into() }.is_recoverable());
        assert!(LinkError::UnexpectedByte(b'x', 'A').is_recoverable());
        assert!(!LinkError::Disconnected.is_recoverable());
        assert!(!LinkError::RetriesExhausted { attempts: 3 }.is_recoverable());
    }

    #[test]
    fn closed_pipe_is_disconnect() {
        let e: LinkError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(e, LinkError::Disconnected));
        let e: LinkError = io::Error::new(io::ErrorKind::PermissionDenied, "no").into();
        assert!(matches!(e, LinkError::Io(_)));
    }
}
