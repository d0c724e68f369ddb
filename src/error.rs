//! Unified error types for mu-xml
//!
//! Provides a top-level `XmlError` that wraps the stream and parse errors,
//! plus `From` impls so `?` works across module boundaries.

use std::fmt;
use std::io;

/// Errors surfaced by [`Stream`](crate::stream::Stream) operations.
///
/// Transport conditions are reported as-is and never retried by the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StreamError {
    /// The transport has no more data.
    EndOfStream,
    /// A non-blocking transport has no data available right now.
    WouldBlock,
    /// The operation is not supported by the transport or current mode.
    Unsupported(&'static str),
    /// A look-ahead request exceeded the fixed buffer capacity.
    CapacityExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// Fixed capacity of the stream buffer.
        capacity: usize,
    },
    /// The stream was opened with an access mode that forbids the operation,
    /// or with an invalid combination of access flags.
    AccessMode,
    /// The primary buffer still holds unread bytes.
    PendingBytes {
        /// Number of unread bytes left in the buffer.
        remaining: usize,
    },
    /// The compressed data could not be decoded.
    Decompress(String),
    /// I/O error (description only, since `std::io::Error` is not `Clone`)
    Io(String),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::EndOfStream => write!(f, "end of stream"),
            StreamError::WouldBlock => write!(f, "operation would block"),
            StreamError::Unsupported(what) => write!(f, "unsupported operation: {}", what),
            StreamError::CapacityExceeded {
                requested,
                capacity,
            } => write!(
                f,
                "requested {} bytes of look-ahead (buffer capacity: {})",
                requested, capacity
            ),
            StreamError::AccessMode => write!(f, "invalid access mode"),
            StreamError::PendingBytes { remaining } => {
                write!(f, "{} unread bytes still buffered", remaining)
            }
            StreamError::Decompress(msg) => write!(f, "decompression failed: {}", msg),
            StreamError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock => StreamError::WouldBlock,
            io::ErrorKind::UnexpectedEof => StreamError::EndOfStream,
            _ => StreamError::Io(err.to_string()),
        }
    }
}

/// Reasons the event reader stopped producing structured input.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// Input ended inside a `<...>` tag.
    UnterminatedTag,
    /// The `<?xml ...?>` declaration lacks a required attribute.
    MissingDeclarationAttribute(&'static str),
    /// The declaration names an encoding other than UTF-8.
    UnsupportedEncoding(String),
    /// A tag or text run is not valid UTF-8.
    InvalidUtf8,
    /// The underlying stream failed with something other than end-of-data.
    Stream(StreamError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnterminatedTag => write!(f, "input ended inside a tag"),
            ParseError::MissingDeclarationAttribute(name) => {
                write!(f, "xml declaration is missing '{}'", name)
            }
            ParseError::UnsupportedEncoding(enc) => {
                write!(f, "unsupported encoding '{}' (only utf-8)", enc)
            }
            ParseError::InvalidUtf8 => write!(f, "markup is not valid UTF-8"),
            ParseError::Stream(err) => write!(f, "stream error: {}", err),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Stream(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StreamError> for ParseError {
    fn from(err: StreamError) -> Self {
        ParseError::Stream(err)
    }
}

/// Top-level error type for mu-xml operations
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum XmlError {
    /// Stream/transport error
    Stream(StreamError),
    /// Markup parsing error
    Parse(ParseError),
    /// An absolute path was not found before input ran out
    PathNotFound(String),
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmlError::Stream(err) => write!(f, "Stream error: {}", err),
            XmlError::Parse(err) => write!(f, "Parse error: {}", err),
            XmlError::PathNotFound(path) => write!(f, "Path not found: {}", path),
        }
    }
}

impl std::error::Error for XmlError {}

impl From<StreamError> for XmlError {
    fn from(err: StreamError) -> Self {
        XmlError::Stream(err)
    }
}

impl From<ParseError> for XmlError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Stream(err) => XmlError::Stream(err),
            other => XmlError::Parse(other),
        }
    }
}

impl From<io::Error> for XmlError {
    fn from(err: io::Error) -> Self {
        XmlError::Stream(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_display() {
        let err = StreamError::CapacityExceeded {
            requested: 9000,
            capacity: 8192,
        };
        assert_eq!(
            format!("{}", err),
            "requested 9000 bytes of look-ahead (buffer capacity: 8192)"
        );
    }

    #[test]
    fn test_io_would_block_maps_to_would_block() {
        let err: StreamError = io::Error::from(io::ErrorKind::WouldBlock).into();
        assert_eq!(err, StreamError::WouldBlock);
    }

    #[test]
    fn test_io_other_maps_to_description() {
        let err: StreamError = io::Error::other("disk on fire").into();
        assert!(matches!(err, StreamError::Io(msg) if msg.contains("disk on fire")));
    }

    #[test]
    fn test_parse_error_stream_flattens_into_xml_error() {
        let err: XmlError = ParseError::Stream(StreamError::WouldBlock).into();
        assert_eq!(err, XmlError::Stream(StreamError::WouldBlock));
    }

    #[test]
    fn test_xml_error_display() {
        let err = XmlError::Parse(ParseError::UnsupportedEncoding("utf-16".into()));
        assert_eq!(
            format!("{}", err),
            "Parse error: unsupported encoding 'utf-16' (only utf-8)"
        );
    }
}
