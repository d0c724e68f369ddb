//! Buffered byte stream over memory, file, or socket transports
//!
//! The stream owns a fixed-capacity read-ahead buffer. [`Stream::need`] is the
//! central primitive: it returns a borrowed view of at least `n` unread bytes
//! without consuming them, refilling from the transport when necessary.
//!
//! When compressed mode is active, raw transport bytes land in a secondary
//! buffer of the same capacity and are decoded into the primary buffer on
//! refill. Compression can be toggled only while the primary buffer is fully
//! drained.
//!
//! ```rust
//! use mu_xml::stream::{Stream, StreamFlags};
//!
//! let mut stream = Stream::from_memory(b"<a>hi</a>", StreamFlags::READ_ONLY).unwrap();
//! assert_eq!(&stream.need(3).unwrap()[..3], b"<a>");
//! stream.skip(3).unwrap();
//! assert_eq!(stream.offset(), 3);
//! ```

use std::fmt;
use std::fs::File;
use std::net::{TcpStream, ToSocketAddrs};
use std::ops::BitOr;
use std::path::Path;

use crate::error::StreamError;
use crate::filter::{DecompressFilter, ZlibFilter};
use crate::transport::{FileTransport, MemoryTransport, SocketTransport, Transport, TransportKind};

/// Capacity of the primary (and secondary) stream buffer.
#[cfg(feature = "small-memory")]
pub const STREAM_BUFFER_CAPACITY: usize = 4096;

/// Capacity of the primary (and secondary) stream buffer.
#[cfg(not(feature = "small-memory"))]
pub const STREAM_BUFFER_CAPACITY: usize = 8192;

/// Open-time configuration bits for a stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StreamFlags(u32);

impl StreamFlags {
    /// No flags set
    pub const NONE: StreamFlags = StreamFlags(0);
    /// Read-only access
    pub const READ_ONLY: StreamFlags = StreamFlags(1);
    /// Write-only access
    pub const WRITE_ONLY: StreamFlags = StreamFlags(2);
    /// Truncate on open (file transport only)
    pub const TRUNCATE: StreamFlags = StreamFlags(4);
    /// Decode zlib-compressed bytes from the transport
    pub const COMPRESSED: StreamFlags = StreamFlags(8);
    /// Block transport semantics (partial reads, not seekable)
    pub const BLOCK: StreamFlags = StreamFlags(16);

    /// Raw bit value.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set.
    pub fn contains(self, other: StreamFlags) -> bool {
        self.0 & other.0 == other.0
    }

    fn insert(&mut self, other: StreamFlags) {
        self.0 |= other.0;
    }

    fn remove(&mut self, other: StreamFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for StreamFlags {
    type Output = StreamFlags;

    fn bitor(self, rhs: StreamFlags) -> StreamFlags {
        StreamFlags(self.0 | rhs.0)
    }
}

/// Reference point for [`Stream::seek`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekOrigin {
    /// From the start of the stream
    Begin,
    /// From the current logical offset
    Current,
    /// From the end of the stream (requires a known size)
    End,
}

/// Buffered stream over a single transport.
pub struct Stream<'a> {
    flags: StreamFlags,
    url: String,
    transport: Transport<'a>,
    /// Primary buffer. Unread bytes are `data[pos..filled]`; when writing,
    /// pending bytes are `data[..filled]`.
    data: Box<[u8]>,
    pos: usize,
    filled: usize,
    /// Logical offset of `data[filled]` when reading, or bytes handed to the
    /// transport when writing.
    position: u64,
    /// Secondary buffer for compressed input, allocated on first use.
    zdata: Vec<u8>,
    zpos: usize,
    zfilled: usize,
    filter: Option<ZlibFilter>,
}

impl<'a> Stream<'a> {
    /// Open a stream over a borrowed byte slice.
    ///
    /// Memory streams are read-only; `WRITE_ONLY` is rejected.
    pub fn from_memory(data: &'a [u8], flags: StreamFlags) -> Result<Self, StreamError> {
        check_access(flags)?;
        if flags.contains(StreamFlags::WRITE_ONLY) {
            return Err(StreamError::Unsupported("memory transport is read-only"));
        }
        Self::with_transport(
            Transport::Memory(MemoryTransport::new(data)),
            format!("memory:{}", data.len()),
            flags,
        )
    }
}

impl Stream<'static> {
    /// Open a stream by resource identifier.
    ///
    /// `tcp://host:port` selects the socket transport; `file://path` or a bare
    /// path selects the file transport.
    pub fn open(url: &str, flags: StreamFlags) -> Result<Self, StreamError> {
        if let Some(addr) = url.strip_prefix("tcp://") {
            Self::connect(addr, flags)
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            Self::open_file(path, flags)
        }
    }

    /// Open a file. `TRUNCATE` applies only together with `WRITE_ONLY`.
    pub fn open_file<P: AsRef<Path>>(path: P, flags: StreamFlags) -> Result<Self, StreamError> {
        check_access(flags)?;
        let path = path.as_ref();
        let transport = if flags.contains(StreamFlags::WRITE_ONLY) {
            FileTransport::open_write(path, flags.contains(StreamFlags::TRUNCATE))?
        } else {
            FileTransport::open_read(path)?
        };
        Self::with_transport(
            Transport::File(transport),
            path.display().to_string(),
            flags,
        )
    }

    /// Wrap an already opened file.
    pub fn from_file(file: File, url: &str, flags: StreamFlags) -> Result<Self, StreamError> {
        check_access(flags)?;
        Self::with_transport(
            Transport::File(FileTransport::from_file(file)),
            url.to_string(),
            flags,
        )
    }

    /// Connect a TCP socket and wrap it.
    pub fn connect<A: ToSocketAddrs + fmt::Display>(
        addr: A,
        flags: StreamFlags,
    ) -> Result<Self, StreamError> {
        let url = format!("tcp://{}", addr);
        let socket = TcpStream::connect(addr)?;
        Self::from_tcp(socket, &url, flags)
    }

    /// Wrap a connected socket. The `BLOCK` flag is always set.
    pub fn from_tcp(socket: TcpStream, url: &str, flags: StreamFlags) -> Result<Self, StreamError> {
        check_access(flags)?;
        Self::with_transport(
            Transport::Socket(SocketTransport::new(socket)),
            url.to_string(),
            flags | StreamFlags::BLOCK,
        )
    }
}

impl<'a> Stream<'a> {
    fn with_transport(
        transport: Transport<'a>,
        url: String,
        flags: StreamFlags,
    ) -> Result<Self, StreamError> {
        let mut stream = Self {
            flags: StreamFlags(flags.bits() & !StreamFlags::COMPRESSED.bits()),
            url,
            transport,
            data: vec![0u8; STREAM_BUFFER_CAPACITY].into_boxed_slice(),
            pos: 0,
            filled: 0,
            position: 0,
            zdata: Vec::new(),
            zpos: 0,
            zfilled: 0,
            filter: None,
        };
        if flags.contains(StreamFlags::COMPRESSED) {
            stream.switch_compression(true)?;
        }
        log::debug!(
            "[STREAM] Opened {} ({:?}, flags={:#x})",
            stream.url,
            stream.transport.kind(),
            stream.flags.bits()
        );
        Ok(stream)
    }

    /// Resource identifier the stream was opened with.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current flags, including the live compression bit.
    pub fn flags(&self) -> StreamFlags {
        self.flags
    }

    /// Transport this stream wraps.
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Fixed buffer capacity; the ceiling for [`need`](Self::need).
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of unread bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.filled - self.pos
    }

    /// Logical offset of the next byte to be read (or written).
    pub fn offset(&self) -> u64 {
        if self.is_writer() {
            self.position + self.filled as u64
        } else {
            self.position - (self.filled - self.pos) as u64
        }
    }

    /// Total stream length, when the transport knows it.
    pub fn size(&self) -> Option<u64> {
        self.transport.size()
    }

    fn is_writer(&self) -> bool {
        self.flags.contains(StreamFlags::WRITE_ONLY)
    }

    fn ensure_readable(&self) -> Result<(), StreamError> {
        if self.is_writer() {
            Err(StreamError::AccessMode)
        } else {
            Ok(())
        }
    }

    /// Borrow at least `n` unread bytes without consuming them.
    ///
    /// Fails with `CapacityExceeded` when `n` is larger than the buffer and
    /// with `EndOfStream` when the transport runs dry first. Bytes that were
    /// buffered before a failure stay buffered.
    pub fn need(&mut self, n: usize) -> Result<&[u8], StreamError> {
        self.ensure_readable()?;
        if n > self.data.len() {
            return Err(StreamError::CapacityExceeded {
                requested: n,
                capacity: self.data.len(),
            });
        }
        if self.filled - self.pos < n {
            self.compact();
            while self.filled < n {
                if self.fill()? == 0 {
                    return Err(StreamError::EndOfStream);
                }
            }
        }
        Ok(&self.data[self.pos..self.filled])
    }

    /// Read up to `buf.len()` bytes. `Ok(0)` means end of data.
    ///
    /// Partial reads are normal: at most one transport refill happens per call.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.ensure_readable()?;
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pos == self.filled {
            self.pos = 0;
            self.filled = 0;
            if self.fill()? == 0 {
                return Ok(0);
            }
        }
        let n = buf.len().min(self.filled - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    /// Consume exactly `n` bytes, refilling as needed.
    ///
    /// Works on every transport, including non-seekable ones.
    pub fn skip(&mut self, mut n: usize) -> Result<(), StreamError> {
        self.ensure_readable()?;
        while n > 0 {
            if self.pos == self.filled {
                self.pos = 0;
                self.filled = 0;
                if self.fill()? == 0 {
                    return Err(StreamError::EndOfStream);
                }
            }
            let take = n.min(self.filled - self.pos);
            self.pos += take;
            n -= take;
        }
        Ok(())
    }

    /// Move the logical offset.
    ///
    /// Targets inside the buffered window only move the cursor. Otherwise the
    /// transport is repositioned and the buffer dropped. Socket transports and
    /// compressed mode cannot reposition the transport.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64, StreamError> {
        if !self.transport.is_seekable() {
            return Err(StreamError::Unsupported("socket transport is not seekable"));
        }
        let base = match origin {
            SeekOrigin::Begin => 0,
            SeekOrigin::Current => self.offset() as i64,
            SeekOrigin::End => self
                .size()
                .ok_or(StreamError::Unsupported("stream size is unknown"))?
                as i64,
        };
        let target = base
            .checked_add(offset)
            .filter(|t| *t >= 0)
            .ok_or(StreamError::Unsupported("seek before start of stream"))? as u64;

        if self.is_writer() {
            self.flush()?;
            self.position = self.transport.seek_to(target)?;
            return Ok(self.position);
        }

        let window_start = self.position - self.filled as u64;
        if (window_start..=self.position).contains(&target) {
            self.pos = (target - window_start) as usize;
            return Ok(target);
        }
        if self.filter.is_some() {
            return Err(StreamError::Unsupported(
                "seek outside the buffered window in compressed mode",
            ));
        }

        log::debug!("[STREAM] Repositioning {} to {}", self.url, target);
        self.position = self.transport.seek_to(target)?;
        self.pos = 0;
        self.filled = 0;
        Ok(self.position)
    }

    /// Buffer `buf` for writing. Returns the number of bytes accepted.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, StreamError> {
        if !self.is_writer() {
            return Err(StreamError::AccessMode);
        }
        if self.filled == 0 && buf.len() >= self.data.len() {
            self.transport.write_all(buf)?;
            self.position += buf.len() as u64;
            return Ok(buf.len());
        }

        let mut rest = buf;
        while !rest.is_empty() {
            let space = self.data.len() - self.filled;
            let take = space.min(rest.len());
            self.data[self.filled..self.filled + take].copy_from_slice(&rest[..take]);
            self.filled += take;
            rest = &rest[take..];
            if self.filled == self.data.len() {
                self.flush_buffer()?;
            }
        }
        Ok(buf.len())
    }

    /// Append formatted text, e.g. `stream.print(format_args!("<{}>", name))`.
    pub fn print(&mut self, args: fmt::Arguments<'_>) -> Result<usize, StreamError> {
        let text = fmt::format(args);
        self.write(text.as_bytes())
    }

    fn flush_buffer(&mut self) -> Result<(), StreamError> {
        if self.filled > 0 {
            self.transport.write_all(&self.data[..self.filled])?;
            self.position += self.filled as u64;
            self.filled = 0;
        }
        Ok(())
    }

    /// Hand buffered writes to the transport. A no-op for readers.
    pub fn flush(&mut self) -> Result<(), StreamError> {
        if !self.is_writer() {
            return Ok(());
        }
        self.flush_buffer()?;
        self.transport.flush()
    }

    /// Toggle compressed mode.
    ///
    /// Only allowed while every buffered byte has been consumed; otherwise
    /// fails with `PendingBytes` and leaves the stream untouched. Switching
    /// out of compressed mode hands raw bytes that followed the compressed
    /// frame back to the primary buffer.
    pub fn switch_compression(&mut self, enabled: bool) -> Result<(), StreamError> {
        if enabled == self.flags.contains(StreamFlags::COMPRESSED) {
            return Ok(());
        }
        if self.is_writer() {
            return Err(StreamError::Unsupported("compressed writes"));
        }
        if self.pos != self.filled {
            return Err(StreamError::PendingBytes {
                remaining: self.filled - self.pos,
            });
        }

        if enabled {
            let filter = ZlibFilter::new()?;
            if self.zdata.is_empty() {
                self.zdata = vec![0u8; self.data.len()];
            }
            self.zpos = 0;
            self.zfilled = 0;
            self.filter = Some(filter);
            self.flags.insert(StreamFlags::COMPRESSED);
        } else {
            if let Some(mut filter) = self.filter.take() {
                filter.reset();
            }
            let leftover = self.zfilled - self.zpos;
            self.data[..leftover].copy_from_slice(&self.zdata[self.zpos..self.zfilled]);
            self.pos = 0;
            self.filled = leftover;
            self.position += leftover as u64;
            self.zpos = 0;
            self.zfilled = 0;
            self.flags.remove(StreamFlags::COMPRESSED);
        }
        log::debug!(
            "[STREAM] {} compression {}",
            self.url,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Flush pending writes and release the transport.
    pub fn close(mut self) -> Result<(), StreamError> {
        let result = self.flush();
        log::debug!("[STREAM] Closed {}", self.url);
        result
    }

    /// Move unread bytes to the front of the buffer.
    fn compact(&mut self) {
        if self.pos > 0 {
            self.data.copy_within(self.pos..self.filled, 0);
            self.filled -= self.pos;
            self.pos = 0;
        }
    }

    /// Append bytes to `data[filled..]`. Returns 0 at end of data.
    fn fill(&mut self) -> Result<usize, StreamError> {
        let n = if self.filter.is_some() {
            self.fill_compressed()?
        } else {
            self.transport.read(&mut self.data[self.filled..])?
        };
        self.filled += n;
        self.position += n as u64;
        Ok(n)
    }

    fn fill_compressed(&mut self) -> Result<usize, StreamError> {
        let Stream {
            transport,
            data,
            filled,
            zdata,
            zpos,
            zfilled,
            filter,
            ..
        } = self;
        let Some(filter) = filter.as_mut() else {
            return Ok(0);
        };

        loop {
            if filter.is_finished() {
                return Ok(0);
            }
            if *zpos == *zfilled {
                let n = transport.read(&mut zdata[..])?;
                if n == 0 {
                    return Err(StreamError::Decompress("truncated compressed stream".into()));
                }
                *zpos = 0;
                *zfilled = n;
            }

            let step = filter.decode(&zdata[*zpos..*zfilled], &mut data[*filled..])?;
            *zpos += step.consumed;
            if step.produced > 0 {
                return Ok(step.produced);
            }
            if step.finished {
                return Ok(0);
            }
            if step.consumed == 0 && *zpos < *zfilled {
                return Err(StreamError::Decompress("decoder made no progress".into()));
            }
        }
    }
}

impl Drop for Stream<'_> {
    fn drop(&mut self) {
        if self.is_writer() && self.filled > 0 {
            if let Err(err) = self.flush() {
                log::warn!("[STREAM] Dropping {} lost buffered writes: {}", self.url, err);
            }
        }
    }
}

impl fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("url", &self.url)
            .field("flags", &self.flags)
            .field("transport", &self.transport.kind())
            .field("offset", &self.offset())
            .field("buffered", &self.buffered())
            .finish()
    }
}

fn check_access(flags: StreamFlags) -> Result<(), StreamError> {
    let ro = flags.contains(StreamFlags::READ_ONLY);
    let wo = flags.contains(StreamFlags::WRITE_ONLY);
    if ro == wo {
        return Err(StreamError::AccessMode);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(data: &[u8]) -> Stream<'_> {
        Stream::from_memory(data, StreamFlags::READ_ONLY).unwrap()
    }

    #[test]
    fn test_need_returns_lookahead_without_consuming() {
        let mut s = memory(b"hello world");
        assert_eq!(&s.need(5).unwrap()[..5], b"hello");
        assert_eq!(&s.need(5).unwrap()[..5], b"hello");
        assert_eq!(s.offset(), 0);

        let mut buf = [0u8; 6];
        assert_eq!(s.read(&mut buf).unwrap(), 6);
        assert_eq!(&buf, b"hello ");
        assert_eq!(&s.need(5).unwrap()[..5], b"world");
    }

    #[test]
    fn test_need_past_end_fails_but_keeps_bytes() {
        let mut s = memory(b"abc");
        assert_eq!(s.need(4).unwrap_err(), StreamError::EndOfStream);
        assert_eq!(s.buffered(), 3);
        assert_eq!(&s.need(3).unwrap()[..3], b"abc");
    }

    #[test]
    fn test_need_over_capacity_fails() {
        let mut s = memory(b"abc");
        let err = s.need(STREAM_BUFFER_CAPACITY + 1).unwrap_err();
        assert_eq!(
            err,
            StreamError::CapacityExceeded {
                requested: STREAM_BUFFER_CAPACITY + 1,
                capacity: STREAM_BUFFER_CAPACITY,
            }
        );
        assert_eq!(s.buffered(), 0);
    }

    #[test]
    fn test_need_compacts_across_buffer_boundary() {
        let data: Vec<u8> = (0..STREAM_BUFFER_CAPACITY * 2).map(|i| i as u8).collect();
        let mut s = memory(&data);
        s.skip(STREAM_BUFFER_CAPACITY - 2).unwrap();
        let view = s.need(8).unwrap();
        assert_eq!(&view[..8], &data[STREAM_BUFFER_CAPACITY - 2..STREAM_BUFFER_CAPACITY + 6]);
    }

    #[test]
    fn test_read_returns_zero_at_end() {
        let mut s = memory(b"ab");
        let mut buf = [0u8; 8];
        assert_eq!(s.read(&mut buf).unwrap(), 2);
        assert_eq!(s.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_seek_within_window_and_beyond() {
        let data: Vec<u8> = (0..STREAM_BUFFER_CAPACITY * 3).map(|i| (i % 251) as u8).collect();
        let mut s = memory(&data);
        s.need(4).unwrap();
        assert_eq!(s.seek(10, SeekOrigin::Begin).unwrap(), 10);
        assert_eq!(s.need(1).unwrap()[0], data[10]);

        let far = (STREAM_BUFFER_CAPACITY * 2 + 5) as i64;
        assert_eq!(s.seek(far, SeekOrigin::Begin).unwrap(), far as u64);
        assert_eq!(s.need(1).unwrap()[0], data[far as usize]);

        assert_eq!(s.seek(-1, SeekOrigin::End).unwrap(), data.len() as u64 - 1);
        assert_eq!(s.need(1).unwrap()[0], *data.last().unwrap());

        s.seek(-3, SeekOrigin::Current).unwrap();
        assert_eq!(s.offset(), data.len() as u64 - 4);
    }

    #[test]
    fn test_seek_before_start_fails() {
        let mut s = memory(b"abc");
        assert!(matches!(
            s.seek(-1, SeekOrigin::Begin),
            Err(StreamError::Unsupported(_))
        ));
    }

    #[test]
    fn test_memory_stream_rejects_writes() {
        assert!(Stream::from_memory(b"", StreamFlags::WRITE_ONLY).is_err());
        let mut s = memory(b"abc");
        assert_eq!(s.write(b"x").unwrap_err(), StreamError::AccessMode);
    }

    #[test]
    fn test_access_flags_are_exclusive() {
        let both = StreamFlags::READ_ONLY | StreamFlags::WRITE_ONLY;
        assert_eq!(
            Stream::from_memory(b"", both).unwrap_err(),
            StreamError::AccessMode
        );
        assert_eq!(
            Stream::from_memory(b"", StreamFlags::NONE).unwrap_err(),
            StreamError::AccessMode
        );
    }

    #[test]
    fn test_switch_rejected_with_pending_bytes() {
        let mut s = memory(b"raw bytes");
        s.need(3).unwrap();
        let before = s.flags();
        let err = s.switch_compression(true).unwrap_err();
        assert_eq!(err, StreamError::PendingBytes { remaining: 9 });
        assert_eq!(s.flags(), before);
        assert_eq!(s.buffered(), 9);
        assert_eq!(&s.need(3).unwrap()[..3], b"raw");
    }

    #[cfg(feature = "zlib")]
    #[test]
    fn test_compressed_memory_stream() {
        let plain = b"<root><x>1</x></root>".repeat(500);
        let packed = miniz_oxide::deflate::compress_to_vec_zlib(&plain, 6);
        let mut s =
            Stream::from_memory(&packed, StreamFlags::READ_ONLY | StreamFlags::COMPRESSED).unwrap();
        assert!(s.flags().contains(StreamFlags::COMPRESSED));

        let mut out = Vec::new();
        let mut buf = [0u8; 1000];
        loop {
            let n = s.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, plain);
    }

    #[cfg(feature = "zlib")]
    #[test]
    fn test_switch_out_keeps_trailing_raw_bytes() {
        let mut data = miniz_oxide::deflate::compress_to_vec_zlib(b"inner", 6);
        data.extend_from_slice(b"TAIL");

        let mut s = memory(&data);
        s.switch_compression(true).unwrap();
        assert_eq!(&s.need(5).unwrap()[..5], b"inner");
        s.skip(5).unwrap();
        assert_eq!(s.need(1).unwrap_err(), StreamError::EndOfStream);

        s.switch_compression(false).unwrap();
        assert!(!s.flags().contains(StreamFlags::COMPRESSED));
        assert_eq!(&s.need(4).unwrap()[..4], b"TAIL");
    }

    #[cfg(feature = "zlib")]
    #[test]
    fn test_truncated_compressed_frame_fails_after_prefix() {
        let plain: Vec<u8> = (0..STREAM_BUFFER_CAPACITY * 4)
            .map(|i| ((i * 7919) % 251) as u8)
            .collect();
        let packed = miniz_oxide::deflate::compress_to_vec_zlib(&plain, 6);
        let cut = &packed[..packed.len() / 2];
        let mut s =
            Stream::from_memory(cut, StreamFlags::READ_ONLY | StreamFlags::COMPRESSED).unwrap();

        let mut out = Vec::new();
        let mut buf = [0u8; 512];
        let err = loop {
            match s.read(&mut buf) {
                Ok(0) => panic!("truncated frame read to a clean end"),
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(err) => break err,
            }
        };
        assert_eq!(
            err,
            StreamError::Decompress("truncated compressed stream".into())
        );
        assert!(!out.is_empty());
        assert_eq!(out[..], plain[..out.len()]);
    }

    #[cfg(feature = "zlib")]
    #[test]
    fn test_compressed_seek_limited_to_window() {
        let plain = b"0123456789abcdef".repeat(STREAM_BUFFER_CAPACITY / 4);
        let packed = miniz_oxide::deflate::compress_to_vec_zlib(&plain, 6);
        let mut s =
            Stream::from_memory(&packed, StreamFlags::READ_ONLY | StreamFlags::COMPRESSED).unwrap();

        s.skip(STREAM_BUFFER_CAPACITY * 2 + 3).unwrap();
        let offset = s.offset();
        assert!(matches!(
            s.seek(0, SeekOrigin::Begin),
            Err(StreamError::Unsupported(_))
        ));
        assert_eq!(s.offset(), offset);

        // Targets inside the decoded window only move the cursor.
        s.need(4).unwrap();
        assert_eq!(s.seek(offset as i64 + 2, SeekOrigin::Begin).unwrap(), offset + 2);
        assert_eq!(s.need(1).unwrap()[0], plain[offset as usize + 2]);
        assert_eq!(s.seek(-2, SeekOrigin::Current).unwrap(), offset);
        assert_eq!(s.need(1).unwrap()[0], plain[offset as usize]);
    }

    #[test]
    fn test_writer_cannot_enter_compressed_mode() {
        let path =
            std::env::temp_dir().join(format!("mu_xml_zwrite_{}.bin", std::process::id()));
        let mut s =
            Stream::open_file(&path, StreamFlags::WRITE_ONLY | StreamFlags::TRUNCATE).unwrap();
        assert!(matches!(
            s.switch_compression(true),
            Err(StreamError::Unsupported(_))
        ));
        assert!(!s.flags().contains(StreamFlags::COMPRESSED));
        s.close().unwrap();

        let compressed_writer = StreamFlags::WRITE_ONLY | StreamFlags::COMPRESSED;
        assert!(matches!(
            Stream::open_file(&path, compressed_writer),
            Err(StreamError::Unsupported(_))
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_print_and_flush_to_file() {
        let path = std::env::temp_dir().join(format!("mu_xml_stream_{}.txt", std::process::id()));
        let mut s =
            Stream::open_file(&path, StreamFlags::WRITE_ONLY | StreamFlags::TRUNCATE).unwrap();
        s.print(format_args!("<{}>{}</{}>", "a", 42, "a")).unwrap();
        assert_eq!(s.offset(), 9);
        s.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"<a>42</a>");
        let _ = std::fs::remove_file(&path);
    }
}
