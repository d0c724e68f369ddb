//! Decompress filter used by compressed streams
//!
//! The filter is stateful: a compressed frame may be split across any number
//! of refills, and partial-frame state is carried between `decode` calls.
//! Uses zlib framing via miniz_oxide (feature `zlib`).

use crate::error::StreamError;

/// Outcome of one `decode` step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterProgress {
    /// Compressed input bytes consumed.
    pub consumed: usize,
    /// Decoded bytes written to the output.
    pub produced: usize,
    /// The compressed frame has ended; further input belongs to whatever follows.
    pub finished: bool,
}

/// Contract between a stream and its decompressor.
pub trait DecompressFilter {
    /// Decode as much of `input` into `output` as possible.
    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<FilterProgress, StreamError>;

    /// Whether the current frame has been fully decoded.
    fn is_finished(&self) -> bool;

    /// Drop all partial-frame state.
    fn reset(&mut self);
}

/// zlib decoder backed by miniz_oxide's streaming inflater.
#[cfg(feature = "zlib")]
pub struct ZlibFilter {
    state: Box<miniz_oxide::inflate::stream::InflateState>,
    finished: bool,
}

#[cfg(feature = "zlib")]
impl ZlibFilter {
    /// Create a filter ready for a fresh zlib frame.
    pub fn new() -> Result<Self, StreamError> {
        Ok(Self {
            state: miniz_oxide::inflate::stream::InflateState::new_boxed(
                miniz_oxide::DataFormat::Zlib,
            ),
            finished: false,
        })
    }
}

#[cfg(feature = "zlib")]
impl DecompressFilter for ZlibFilter {
    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<FilterProgress, StreamError> {
        use miniz_oxide::{MZError, MZFlush, MZStatus};

        if self.finished {
            return Ok(FilterProgress {
                finished: true,
                ..FilterProgress::default()
            });
        }

        let result =
            miniz_oxide::inflate::stream::inflate(&mut self.state, input, output, MZFlush::None);
        match result.status {
            Ok(MZStatus::StreamEnd) => self.finished = true,
            Ok(MZStatus::Ok) => {}
            // No progress possible with this input; the caller supplies more.
            Err(MZError::Buf) => {}
            Ok(MZStatus::NeedDict) => {
                return Err(StreamError::Decompress(
                    "preset dictionaries are not supported".into(),
                ))
            }
            Err(err) => return Err(StreamError::Decompress(format!("{:?}", err))),
        }

        Ok(FilterProgress {
            consumed: result.bytes_consumed,
            produced: result.bytes_written,
            finished: self.finished,
        })
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn reset(&mut self) {
        self.state = miniz_oxide::inflate::stream::InflateState::new_boxed(
            miniz_oxide::DataFormat::Zlib,
        );
        self.finished = false;
    }
}

/// Placeholder when the crate is built without the `zlib` feature.
#[cfg(not(feature = "zlib"))]
pub struct ZlibFilter {
    _private: (),
}

#[cfg(not(feature = "zlib"))]
impl ZlibFilter {
    /// Always fails: compression support was not compiled in.
    pub fn new() -> Result<Self, StreamError> {
        Err(StreamError::Unsupported("built without the `zlib` feature"))
    }
}

#[cfg(not(feature = "zlib"))]
impl DecompressFilter for ZlibFilter {
    fn decode(&mut self, _input: &[u8], _output: &mut [u8]) -> Result<FilterProgress, StreamError> {
        Err(StreamError::Unsupported("built without the `zlib` feature"))
    }

    fn is_finished(&self) -> bool {
        true
    }

    fn reset(&mut self) {}
}
