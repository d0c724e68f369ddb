//! Attribute extraction from a raw tag span
//!
//! The table is derived from the text between `<` and `>` on demand and never
//! cached across events. Storage is fixed-capacity (`MAX_ATTRIBUTES`); pairs
//! beyond the capacity are dropped and the table is flagged as truncated.

use heapless::Vec as HeaplessVec;

/// Maximum number of attributes kept per tag
pub const MAX_ATTRIBUTES: usize = 16;

/// A single `name="value"` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name, case preserved
    pub name: String,
    /// Attribute value with quotes stripped, not entity-decoded
    pub value: String,
}

/// Ordered, capacity-bounded attribute list.
#[derive(Clone, Debug, Default)]
pub struct AttributeTable {
    items: HeaplessVec<Attribute, MAX_ATTRIBUTES>,
    truncated: bool,
}

impl AttributeTable {
    /// Tokenize a tag span such as `item id="7" class='x'`.
    ///
    /// Whitespace and `=` separate tokens; tokens alternate between name and
    /// value, and a token becomes a name only when followed by `=`. Quotes are
    /// stripped, and whitespace or `=` inside quotes is kept. A trailing `/`
    /// on a self-closing tag, or `?` on a declaration, is not part of the last
    /// value.
    pub fn parse(span: &str) -> Self {
        let body = if span.starts_with('?') {
            span.strip_suffix('?')
        } else {
            span.strip_suffix('/')
        }
        .unwrap_or(span);

        let mut scan = Scan::default();
        let mut quote: Option<char> = None;
        for ch in body.chars() {
            if let Some(q) = quote {
                if ch == q {
                    quote = None;
                    scan.finish_token();
                } else {
                    scan.token.push(ch);
                }
                continue;
            }
            match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    scan.has_token = true;
                }
                '=' => {
                    scan.finish_token();
                    if scan.name.is_some() {
                        scan.expecting_value = true;
                    }
                }
                c if c.is_ascii_whitespace() => scan.finish_token(),
                c => {
                    scan.token.push(c);
                    scan.has_token = true;
                }
            }
        }
        scan.finish_token();

        if scan.table.truncated {
            log::warn!(
                "[XML] Tag has more than {} attributes; extra pairs dropped",
                MAX_ATTRIBUTES
            );
        }
        scan.table
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no pairs were found.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether pairs were dropped because the table was full.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Pair at `index`.
    pub fn get(&self, index: usize) -> Option<&Attribute> {
        self.items.get(index)
    }

    /// First value whose name matches exactly (case-sensitive).
    pub fn value_by_name(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Iterate over pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter()
    }

    fn push(&mut self, name: String, value: String) {
        if self.items.push(Attribute { name, value }).is_err() {
            self.truncated = true;
        }
    }
}

#[derive(Default)]
struct Scan {
    table: AttributeTable,
    token: String,
    has_token: bool,
    name: Option<String>,
    expecting_value: bool,
}

impl Scan {
    fn finish_token(&mut self) {
        if !self.has_token {
            return;
        }
        let token = core::mem::take(&mut self.token);
        self.has_token = false;
        if self.expecting_value {
            let name = self.name.take().unwrap_or_default();
            self.table.push(name, token);
            self.expecting_value = false;
        } else {
            self.name = Some(token);
        }
    }
}
