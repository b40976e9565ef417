//! Byte-stream transports the synchronizer runs over.
//!
//! A [`Link`] is a bidirectional byte pipe whose reads can time out. The
//! in-process [`MemoryLink`] pairs two endpoints with channels; [`TcpLink`]
//! wraps a socket with per-read timeouts.

use std::io::{self, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Shortest read timeout handed to a socket; zero means "block forever" there.
const MIN_SOCKET_TIMEOUT: Duration = Duration::from_millis(1);

/// A byte stream with timed reads.
pub trait Link {
    /// Reads one byte, waiting at most `timeout`. Returns `Ok(None)` when
    /// nothing arrived in time.
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>>;

    /// Writes all bytes and flushes them to the peer.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl<L: Link + ?Sized> Link for &mut L {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        (**self).read_byte(timeout)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_bytes(bytes)
    }
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        (**self).read_byte(timeout)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_bytes(bytes)
    }
}

/// One end of an in-process link.
#[derive(Debug)]
pub struct MemoryLink {
    tx: Sender<u8>,
    rx: Receiver<u8>,
}

impl MemoryLink {
    /// Creates two connected endpoints.
    pub fn pair() -> (MemoryLink, MemoryLink) {
        let (a_tx, b_rx) = mpsc::channel();
        let (b_tx, a_rx) = mpsc::channel();
        (
            MemoryLink { tx: a_tx, rx: a_rx },
            MemoryLink { tx: b_tx, rx: b_rx },
        )
    }
}

impl Link for MemoryLink {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        match self.rx.recv_timeout(timeout) {
            Ok(b) => Ok(Some(b)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "memory link peer dropped",
            )),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &b in bytes {
            self.tx
                .send(b)
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "memory link peer dropped"))?;
        }
        Ok(())
    }
}

/// A link over a TCP connection.
#[derive(Debug)]
pub struct TcpLink {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl TcpLink {
    pub fn from_stream(stream: TcpStream) -> io::Result<TcpLink> {
        stream.set_nodelay(true)?;
        let writer = stream.try_clone()?;
        Ok(TcpLink {
            reader: BufReader::new(stream),
            writer,
        })
    }

    /// Connects to a listening peer.
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<TcpLink> {
        Self::from_stream(TcpStream::connect(addr)?)
    }

    /// Waits for a single peer to connect on `addr`.
    pub fn accept(addr: impl ToSocketAddrs) -> io::Result<TcpLink> {
        let listener = TcpListener::bind(addr)?;
        let (stream, peer) = listener.accept()?;
        log::info!("peer connected from {}", peer);
        Self::from_stream(stream)
    }

    /// Waits for a single peer on an already bound listener.
    pub fn accept_on(listener: &TcpListener) -> io::Result<TcpLink> {
        let (stream, peer) = listener.accept()?;
        log::info!("peer connected from {}", peer);
        Self::from_stream(stream)
    }
}

impl Link for TcpLink {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        if self.reader.buffer().is_empty() {
            self.reader
                .get_ref()
                .set_read_timeout(Some(timeout.max(MIN_SOCKET_TIMEOUT)))?;
        }
        let mut byte = [0u8; 1];
        match self.reader.read(&mut byte) {
            Ok(0) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "tcp peer closed")),
            Ok(_) => Ok(Some(byte[0])),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }
}
