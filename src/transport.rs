//! Backing transports for [`Stream`](crate::stream::Stream)
//!
//! A stream wraps exactly one transport, picked when it is opened and never
//! changed afterwards. The set of transports is closed, so dispatch is a
//! plain `match` instead of a trait object.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::net::TcpStream;
use std::path::Path;

use crate::error::StreamError;

/// Which transport a stream is backed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    /// Borrowed in-memory byte slice
    Memory,
    /// Local file
    File,
    /// Connected TCP socket
    Socket,
}

/// Read-only view over a caller-owned byte slice.
#[derive(Debug)]
pub struct MemoryTransport<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MemoryTransport<'a> {
    /// Wrap a byte slice, positioned at its first byte.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        n
    }

    fn seek(&mut self, target: u64) -> Result<u64, StreamError> {
        if target > self.data.len() as u64 {
            return Err(StreamError::Unsupported("seek past end of memory"));
        }
        self.pos = target as usize;
        Ok(target)
    }
}

/// File handle with positional read/write/seek.
#[derive(Debug)]
pub struct FileTransport {
    file: File,
}

impl FileTransport {
    /// Open `path` for reading.
    pub fn open_read(path: &Path) -> Result<Self, StreamError> {
        let file = File::open(path)?;
        Ok(Self { file })
    }

    /// Open `path` for writing, creating it when missing.
    pub fn open_write(path: &Path, truncate: bool) -> Result<Self, StreamError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(truncate)
            .open(path)?;
        Ok(Self { file })
    }

    /// Wrap an already opened file.
    pub fn from_file(file: File) -> Self {
        Self { file }
    }
}

/// Connected socket. Reads may be partial and the transport is not seekable.
#[derive(Debug)]
pub struct SocketTransport {
    socket: TcpStream,
}

impl SocketTransport {
    /// Wrap a connected socket. Blocking behavior is whatever the socket was
    /// configured with; a non-blocking socket surfaces `WouldBlock`.
    pub fn new(socket: TcpStream) -> Self {
        Self { socket }
    }
}

/// The closed set of byte sources/sinks a stream can wrap.
#[derive(Debug)]
pub enum Transport<'a> {
    /// In-memory slice
    Memory(MemoryTransport<'a>),
    /// Local file
    File(FileTransport),
    /// TCP socket
    Socket(SocketTransport),
}

impl Transport<'_> {
    /// Transport discriminant.
    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Memory(_) => TransportKind::Memory,
            Transport::File(_) => TransportKind::File,
            Transport::Socket(_) => TransportKind::Socket,
        }
    }

    /// Whether `seek` can ever succeed on this transport.
    pub fn is_seekable(&self) -> bool {
        !matches!(self, Transport::Socket(_))
    }

    /// Read up to `buf.len()` bytes. `Ok(0)` means end of data.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        match self {
            Transport::Memory(mem) => Ok(mem.read(buf)),
            Transport::File(f) => retry_interrupted(|| f.file.read(buf)),
            Transport::Socket(s) => retry_interrupted(|| s.socket.read(buf)),
        }
    }

    /// Write all of `buf`.
    pub fn write_all(&mut self, buf: &[u8]) -> Result<(), StreamError> {
        match self {
            Transport::Memory(_) => Err(StreamError::Unsupported("memory transport is read-only")),
            Transport::File(f) => Ok(f.file.write_all(buf)?),
            Transport::Socket(s) => Ok(s.socket.write_all(buf)?),
        }
    }

    /// Flush transport-level buffers.
    pub fn flush(&mut self) -> Result<(), StreamError> {
        match self {
            Transport::Memory(_) => Ok(()),
            Transport::File(f) => Ok(f.file.flush()?),
            Transport::Socket(s) => Ok(s.socket.flush()?),
        }
    }

    /// Move to an absolute byte position.
    pub fn seek_to(&mut self, target: u64) -> Result<u64, StreamError> {
        match self {
            Transport::Memory(mem) => mem.seek(target),
            Transport::File(f) => Ok(f.file.seek(SeekFrom::Start(target))?),
            Transport::Socket(_) => {
                Err(StreamError::Unsupported("socket transport is not seekable"))
            }
        }
    }

    /// Total length in bytes, when the transport knows it.
    pub fn size(&self) -> Option<u64> {
        match self {
            Transport::Memory(mem) => Some(mem.data.len() as u64),
            Transport::File(f) => f.file.metadata().ok().map(|m| m.len()),
            Transport::Socket(_) => None,
        }
    }
}

fn retry_interrupted<F>(mut op: F) -> Result<usize, StreamError>
where
    F: FnMut() -> io::Result<usize>,
{
    loop {
        match op() {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            other => return other.map_err(StreamError::from),
        }
    }
}
