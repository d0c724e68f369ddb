//! mu-xml -- Buffered byte streams and a pull-style XML event reader
//!
//! A [`Stream`] wraps memory, a file, or a TCP socket behind one fixed-capacity
//! read-ahead buffer, optionally decoding zlib-compressed input on the fly.
//! An [`XmlReader`] pulls markup events (declaration, element begin/end, text,
//! comment, CDATA) out of such a stream one at a time, and [`path::seek`]
//! navigates to an element by absolute path.
//!
//! # Features
//!
//! - `zlib` (default) -- transparent decompression via miniz_oxide
//! - `small-memory` -- 4 KiB stream buffers instead of 8 KiB
//! - `cli` -- the `mu-xml` command-line tool
//!
//! # Allocation Behavior
//!
//! Each stream allocates its primary buffer once on open, plus a secondary
//! buffer the first time compressed mode is entered. Attribute tables are
//! fixed-capacity (`MAX_ATTRIBUTES`); overflow is flagged, not grown.

#![warn(missing_docs)]
#![deny(clippy::large_enum_variant, clippy::large_stack_arrays, clippy::redundant_clone)]
#![warn(
    clippy::box_collection,
    clippy::needless_collect,
    clippy::map_clone,
    clippy::implicit_clone,
    clippy::inefficient_to_string
)]

pub mod attribute;
pub mod error;
pub mod filter;
pub mod path;
pub mod reader;
pub mod stream;
pub mod transport;

// Re-export key types for convenience
pub use attribute::{Attribute, AttributeTable, MAX_ATTRIBUTES};
pub use error::{ParseError, StreamError, XmlError};
pub use filter::{DecompressFilter, FilterProgress, ZlibFilter};
pub use path::ElementPath;
pub use reader::{Termination, XmlEvent, XmlReader};
pub use stream::{SeekOrigin, Stream, StreamFlags, STREAM_BUFFER_CAPACITY};
pub use transport::TransportKind;
