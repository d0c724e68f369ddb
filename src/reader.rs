//! Pull-style XML event reader over a buffered [`Stream`]
//!
//! The reader borrows its stream for its whole lifetime and never closes it.
//! Nothing is parsed until the caller asks for the next event; opening the
//! reader materializes the first one.
//!
//! # Usage
//!
//! ```rust
//! use mu_xml::reader::{XmlEvent, XmlReader};
//! use mu_xml::stream::{Stream, StreamFlags};
//!
//! let mut stream = Stream::from_memory(b"<a>hi</a>", StreamFlags::READ_ONLY).unwrap();
//! let mut reader = XmlReader::open(&mut stream);
//!
//! assert_eq!(reader.event(), XmlEvent::ElementBegin);
//! assert_eq!(reader.element_name(), Some("a"));
//! assert_eq!(reader.advance(), XmlEvent::Text);
//! assert_eq!(reader.text(), Some("hi"));
//! assert_eq!(reader.advance(), XmlEvent::ElementEnd);
//! assert_eq!(reader.advance(), XmlEvent::Null);
//! assert!(!reader.has_next());
//! ```
//!
//! Not supported: DTDs, namespaces, entity expansion, and encodings other
//! than UTF-8. Text and attribute values are returned verbatim.

use std::fmt;

use crate::attribute::{Attribute, AttributeTable};
use crate::error::{ParseError, StreamError};
use crate::stream::Stream;

/// Kind of the most recently completed parse step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum XmlEvent {
    /// No more structured input (see [`XmlReader::termination`])
    Null,
    /// `<?xml version="..." encoding="..."?>`
    DocumentBegin,
    /// `<name ...>` or `<name .../>`
    ElementBegin,
    /// `</name>`
    ElementEnd,
    /// Character data between two tags
    Text,
    /// `<!-- ... -->`
    Comment,
    /// `<![CDATA[ ... ]]>`
    Cdata,
}

/// Why the reader reached [`XmlEvent::Null`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Input ended cleanly between tokens.
    EndOfInput,
    /// Parsing stopped on malformed or unsupported input.
    Failed(ParseError),
}

/// Pull parser producing one [`XmlEvent`] per [`advance`](XmlReader::advance).
pub struct XmlReader<'s, 'a> {
    stream: &'s mut Stream<'a>,
    /// One pushed-back byte.
    cache: Option<u8>,
    event: XmlEvent,
    /// Raw text between the last `<` and `>`.
    element: String,
    text: String,
    version: Option<String>,
    encoding: Option<String>,
    attributes: AttributeTable,
    /// Whether `attributes` was derived from the current `element`.
    attributes_current: bool,
    termination: Option<Termination>,
    scratch: Vec<u8>,
}

impl<'s, 'a> XmlReader<'s, 'a> {
    /// Attach to `stream` and parse the first event.
    pub fn open(stream: &'s mut Stream<'a>) -> Self {
        let mut reader = Self {
            stream,
            cache: None,
            event: XmlEvent::Null,
            element: String::new(),
            text: String::new(),
            version: None,
            encoding: None,
            attributes: AttributeTable::default(),
            attributes_current: false,
            termination: None,
            scratch: Vec::with_capacity(256),
        };
        reader.advance();
        reader
    }

    /// Detach from the stream without closing it.
    pub fn close(self) {
        log::debug!("[XML] Reader detached from {}", self.stream.url());
    }

    /// Whether the current event is not [`XmlEvent::Null`].
    pub fn has_next(&self) -> bool {
        self.event != XmlEvent::Null
    }

    /// Current event.
    pub fn event(&self) -> XmlEvent {
        self.event
    }

    /// Why parsing stopped, once the reader is at [`XmlEvent::Null`].
    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    /// Parse the next event. [`XmlEvent::Null`] is terminal.
    pub fn advance(&mut self) -> XmlEvent {
        self.event = XmlEvent::Null;
        self.attributes_current = false;
        if self.termination.is_some() {
            return XmlEvent::Null;
        }

        match self.step() {
            Ok(XmlEvent::Null) => self.termination = Some(Termination::EndOfInput),
            Ok(event) => {
                log::trace!("[XML] {:?}: {}", event, self.element);
                self.event = event;
            }
            Err(err) => {
                log::debug!(
                    "[XML] Stopped at offset {} in {}: {}",
                    self.stream.offset(),
                    self.stream.url(),
                    err
                );
                self.termination = Some(Termination::Failed(err));
            }
        }
        self.event
    }

    fn step(&mut self) -> Result<XmlEvent, ParseError> {
        let Some(ch) = self.peek_byte()? else {
            return Ok(XmlEvent::Null);
        };
        if ch == b'<' {
            self.parse_element()?;
            self.classify()
        } else if self.parse_text()? {
            Ok(XmlEvent::Text)
        } else {
            Ok(XmlEvent::Null)
        }
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, StreamError> {
        if let Some(ch) = self.cache {
            return Ok(Some(ch));
        }
        match self.stream.need(1) {
            Ok(view) => Ok(Some(view[0])),
            Err(StreamError::EndOfStream) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Append bytes up to `delim` to the scratch buffer and consume the
    /// delimiter. Returns `false` if input ends first.
    fn take_until(&mut self, delim: u8) -> Result<bool, StreamError> {
        if let Some(ch) = self.cache.take() {
            if ch == delim {
                return Ok(true);
            }
            self.scratch.push(ch);
        }
        loop {
            let view = match self.stream.need(1) {
                Ok(view) => view,
                Err(StreamError::EndOfStream) => return Ok(false),
                Err(err) => return Err(err),
            };
            match view.iter().position(|&b| b == delim) {
                Some(i) => {
                    self.scratch.extend_from_slice(&view[..i]);
                    self.stream.skip(i + 1)?;
                    return Ok(true);
                }
                None => {
                    let n = view.len();
                    self.scratch.extend_from_slice(view);
                    self.stream.skip(n)?;
                }
            }
        }
    }

    /// Read `<...>` into `element`.
    fn parse_element(&mut self) -> Result<(), ParseError> {
        self.scratch.clear();
        // Leading '<'.
        if !self.take_until(b'<')? {
            return Err(ParseError::UnterminatedTag);
        }
        self.scratch.clear();
        loop {
            if !self.take_until(b'>')? {
                return Err(ParseError::UnterminatedTag);
            }
            // Comments and CDATA may contain '>'; keep reading until framed.
            // A bare `<!-->` or `<!--->` ends at its first '>'.
            let open_comment = self.scratch.starts_with(b"!--")
                && !matches!(self.scratch.as_slice(), b"!--" | b"!---")
                && !is_framed(&self.scratch, b"!--", b"--");
            let open_cdata = self.scratch.starts_with(b"![CDATA[")
                && !is_framed(&self.scratch, b"![CDATA[", b"]]");
            if !(open_comment || open_cdata) {
                break;
            }
            self.scratch.push(b'>');
        }
        self.element.clear();
        self.element
            .push_str(core::str::from_utf8(&self.scratch).map_err(|_| ParseError::InvalidUtf8)?);
        Ok(())
    }

    /// Read character data up to the next `<`, which is pushed back.
    /// Returns `false` if nothing was read before end of input.
    fn parse_text(&mut self) -> Result<bool, ParseError> {
        self.scratch.clear();
        if self.take_until(b'<')? {
            self.cache = Some(b'<');
        }
        self.text.clear();
        self.text
            .push_str(core::str::from_utf8(&self.scratch).map_err(|_| ParseError::InvalidUtf8)?);
        Ok(!self.text.is_empty())
    }

    fn classify(&mut self) -> Result<XmlEvent, ParseError> {
        let e = self.element.as_bytes();
        let size = e.len();
        if size > 4 && e.starts_with(b"?xml") {
            self.parse_declaration()?;
            Ok(XmlEvent::DocumentBegin)
        } else if size > 1 && e[0] == b'/' {
            Ok(XmlEvent::ElementEnd)
        } else if size >= 5 && is_framed(e, b"!--", b"--") {
            Ok(XmlEvent::Comment)
        } else if size >= 10 && is_framed(e, b"![CDATA[", b"]]") {
            Ok(XmlEvent::Cdata)
        } else {
            Ok(XmlEvent::ElementBegin)
        }
    }

    fn parse_declaration(&mut self) -> Result<(), ParseError> {
        let table = AttributeTable::parse(&self.element);
        let version = table
            .value_by_name("version")
            .ok_or(ParseError::MissingDeclarationAttribute("version"))?;
        let encoding = table
            .value_by_name("encoding")
            .ok_or(ParseError::MissingDeclarationAttribute("encoding"))?;
        if !encoding.eq_ignore_ascii_case("utf-8") {
            log::warn!("[XML] Only utf-8 documents are supported, got '{}'", encoding);
            return Err(ParseError::UnsupportedEncoding(encoding.to_string()));
        }
        self.version = Some(version.to_string());
        self.encoding = Some(encoding.to_string());
        self.attributes = table;
        self.attributes_current = true;

        // Skip whatever precedes the first real tag.
        if self.peek_byte()? != Some(b'<') {
            self.parse_text()?;
        }
        Ok(())
    }

    /// Bytes consumed from the stream so far. A pushed-back byte counts as
    /// consumed.
    pub fn offset(&self) -> u64 {
        self.stream.offset()
    }

    /// Raw tag span of the last `<...>` consumed, without the brackets.
    pub fn raw_element(&self) -> &str {
        &self.element
    }

    /// Declared XML version; `None` until a declaration has been read.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Declared encoding; `None` until a declaration has been read.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Comment body, valid only at [`XmlEvent::Comment`].
    pub fn comment(&self) -> Option<&str> {
        debug_assert_eq!(self.event, XmlEvent::Comment, "comment() outside a comment");
        if self.event != XmlEvent::Comment || self.element.len() < 5 {
            return None;
        }
        Some(&self.element[3..self.element.len() - 2])
    }

    /// CDATA body, valid only at [`XmlEvent::Cdata`].
    pub fn cdata(&self) -> Option<&str> {
        debug_assert_eq!(self.event, XmlEvent::Cdata, "cdata() outside a CDATA section");
        if self.event != XmlEvent::Cdata || self.element.len() < 10 {
            return None;
        }
        Some(&self.element[8..self.element.len() - 2])
    }

    /// Character data, valid only at [`XmlEvent::Text`]. Not entity-decoded.
    pub fn text(&self) -> Option<&str> {
        debug_assert_eq!(self.event, XmlEvent::Text, "text() outside a text run");
        if self.event != XmlEvent::Text {
            return None;
        }
        Some(&self.text)
    }

    /// Element name, valid at [`XmlEvent::ElementBegin`] and [`XmlEvent::ElementEnd`].
    pub fn element_name(&self) -> Option<&str> {
        match self.event {
            XmlEvent::ElementEnd => {
                let name = self.element[1..].trim_end();
                (!name.is_empty()).then_some(name)
            }
            XmlEvent::ElementBegin => {
                let end = self
                    .element
                    .find(|c: char| c.is_ascii_whitespace() || c == '/')
                    .unwrap_or(self.element.len());
                (end > 0).then(|| &self.element[..end])
            }
            _ => {
                debug_assert!(false, "element_name() outside an element tag");
                None
            }
        }
    }

    /// Whether the current begin tag closes itself (`<name/>`).
    ///
    /// Self-closing tags produce no [`XmlEvent::ElementEnd`].
    pub fn is_self_closing(&self) -> bool {
        self.event == XmlEvent::ElementBegin && self.element.ends_with('/')
    }

    fn derive_attributes(&mut self) -> Option<&AttributeTable> {
        if !matches!(
            self.event,
            XmlEvent::ElementBegin | XmlEvent::DocumentBegin
        ) {
            debug_assert!(false, "attributes requested outside a begin tag");
            return None;
        }
        if !self.attributes_current {
            self.attributes = AttributeTable::parse(&self.element);
            self.attributes_current = true;
        }
        Some(&self.attributes)
    }

    /// Re-derive the attribute table from the current tag and count it.
    pub fn attribute_count(&mut self) -> usize {
        self.attributes_current = false;
        self.derive_attributes().map_or(0, AttributeTable::len)
    }

    /// Attribute table of the current begin tag or declaration.
    pub fn attributes(&mut self) -> Option<&AttributeTable> {
        self.derive_attributes()
    }

    /// Whether the current tag had more attributes than the table holds.
    pub fn attributes_truncated(&mut self) -> bool {
        self.derive_attributes()
            .is_some_and(AttributeTable::is_truncated)
    }

    /// Name of the attribute at `index`.
    pub fn attribute_name(&mut self, index: usize) -> Option<&str> {
        self.attribute(index).map(|a| a.name.as_str())
    }

    /// Value of the attribute at `index`.
    pub fn attribute_value(&mut self, index: usize) -> Option<&str> {
        self.attribute(index).map(|a| a.value.as_str())
    }

    fn attribute(&mut self, index: usize) -> Option<&Attribute> {
        self.derive_attributes()?.get(index)
    }

    /// First value whose attribute name matches exactly.
    pub fn attribute_value_by_name(&mut self, name: &str) -> Option<&str> {
        self.derive_attributes()?.value_by_name(name)
    }

    /// Advance until the begin tag at absolute `path` (e.g. `/a/b/c`).
    ///
    /// See [`crate::path::seek`].
    pub fn seek(&mut self, path: &str) -> bool {
        crate::path::seek(self, path)
    }

    /// Re-serialize every remaining event into `out`.
    pub fn dump<W: fmt::Write>(&mut self, out: &mut W) -> fmt::Result {
        while self.has_next() {
            match self.event {
                XmlEvent::DocumentBegin => writeln!(
                    out,
                    "<?xml version=\"{}\" encoding=\"{}\"?>",
                    self.version().unwrap_or_default(),
                    self.encoding().unwrap_or_default()
                )?,
                XmlEvent::ElementBegin => {
                    let name = self.element_name().unwrap_or_default().to_string();
                    let self_closing = self.is_self_closing();
                    write!(out, "<{}", name)?;
                    self.attribute_count();
                    for attr in self.attributes.iter() {
                        write!(out, " {}=\"{}\"", attr.name, attr.value)?;
                    }
                    out.write_str(if self_closing { "/>" } else { ">" })?;
                }
                XmlEvent::ElementEnd => {
                    write!(out, "</{}>", self.element_name().unwrap_or_default())?
                }
                XmlEvent::Text => out.write_str(self.text().unwrap_or_default())?,
                XmlEvent::Cdata => write!(out, "<![CDATA[{}]]>", self.cdata().unwrap_or_default())?,
                XmlEvent::Comment => write!(out, "<!--{}-->", self.comment().unwrap_or_default())?,
                XmlEvent::Null => {}
            }
            self.advance();
        }
        out.write_char('\n')
    }
}

impl fmt::Debug for XmlReader<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlReader")
            .field("event", &self.event)
            .field("element", &self.element)
            .field("termination", &self.termination)
            .finish()
    }
}

fn is_framed(span: &[u8], prefix: &[u8], suffix: &[u8]) -> bool {
    span.len() >= prefix.len() + suffix.len() && span.starts_with(prefix) && span.ends_with(suffix)
}
