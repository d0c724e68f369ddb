//! Absolute-path navigation over an [`XmlReader`]
//!
//! Tracks the `/`-joined stack of open element names while driving the reader
//! forward. Forward-only: no backtracking, relative paths, or wildcards.

use crate::reader::{XmlEvent, XmlReader};

/// `/`-joined stack of currently open element names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementPath {
    path: String,
    /// Last entered tag was self-closing.
    pending_leave: bool,
}

impl ElementPath {
    /// Create an empty path (document level).
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `/name`.
    pub fn enter(&mut self, name: &str) {
        self.path.push('/');
        self.path.push_str(name);
    }

    /// Drop the last segment.
    pub fn leave(&mut self) {
        match self.path.rfind('/') {
            Some(pos) => self.path.truncate(pos),
            None => self.path.clear(),
        }
    }

    /// Nesting depth.
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }

    /// Current path, e.g. `/a/b`. Empty at document level.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Update the stack for the reader's current event.
    ///
    /// Returns `true` if a begin tag was entered. Self-closing tags are left
    /// again by the next call, so callers can still inspect the full path.
    pub fn track(&mut self, reader: &XmlReader<'_, '_>) -> bool {
        if self.pending_leave {
            self.leave();
            self.pending_leave = false;
        }
        match reader.event() {
            XmlEvent::ElementBegin => {
                let Some(name) = reader.element_name() else {
                    return false;
                };
                self.enter(name);
                self.pending_leave = reader.is_self_closing();
                true
            }
            XmlEvent::ElementEnd => {
                self.leave();
                false
            }
            _ => false,
        }
    }
}

/// Advance `reader` until the begin tag at absolute `path` (e.g. `/a/b/c`).
///
/// The current event is considered first. On success the reader is left at
/// the matching [`XmlEvent::ElementBegin`]; on failure the input is exhausted
/// and the reader is at [`XmlEvent::Null`].
pub fn seek(reader: &mut XmlReader<'_, '_>, path: &str) -> bool {
    let mut current = ElementPath::new();
    while reader.has_next() {
        if current.track(reader) && current.as_str() == path {
            log::debug!("[XML] Found {}", path);
            return true;
        }
        reader.advance();
    }
    log::debug!("[XML] Path {} not found", path);
    false
}
