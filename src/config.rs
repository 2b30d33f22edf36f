//! Serializer configuration, generalizing the reference crate's
//! `ParserSettings`-driven indentation/formatting toggles to a standalone
//! config owned by the serializer rather than a file-level parser.

/// Controls how the two-pass serializer and its `quick-xml` convenience
/// layer render a tag tree.
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// Number of spaces per indentation level. The two-pass ABI's size/emit
    /// arithmetic (§4.2/§4.3) assumes two spaces, matching the reference
    /// crate; other values are only honored by the `quick-xml` convenience
    /// path.
    pub indent_width: usize,
    /// Escape XML metacharacters (`&`, `<`, `>`, and quotes in attribute
    /// values) when using the `quick-xml` convenience layer. The raw
    /// two-pass `size_of`/`write_into` entry points never escape, regardless
    /// of this setting.
    pub escape_text: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        SerializerConfig {
            indent_width: 2,
            escape_text: false,
        }
    }
}

impl SerializerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_escape_text(mut self, escape_text: bool) -> Self {
        self.escape_text = escape_text;
        self
    }
}
