/// Maximum element nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 256;
/// Maximum length in bytes of a tag name, attribute name, attribute value
/// or text run.
pub const DEFAULT_MAX_STRING: usize = 256;
/// Maximum length of an entity name between `&` and `;`.
pub const DEFAULT_MAX_ESCAPE: usize = 31;
/// Maximum length of the `<?xml ... ?>` declaration body.
pub const DEFAULT_MAX_DECLARATION: usize = 256;

/// Bounds on the parser's auxiliary memory.
///
/// Every buffer is allocated once at its full size when parsing starts.
/// Exceeding a bound fails the parse with
/// [`XmlError::LimitExceeded`](super::XmlError::LimitExceeded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: usize,
    pub max_string: usize,
    pub max_escape: usize,
    pub max_declaration: usize,
}

impl Limits {
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_string: DEFAULT_MAX_STRING,
            max_escape: DEFAULT_MAX_ESCAPE,
            max_declaration: DEFAULT_MAX_DECLARATION,
        }
    }

    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub const fn with_max_string(mut self, max_string: usize) -> Self {
        self.max_string = max_string;
        self
    }

    pub const fn with_max_escape(mut self, max_escape: usize) -> Self {
        self.max_escape = max_escape;
        self
    }

    pub const fn with_max_declaration(mut self, max_declaration: usize) -> Self {
        self.max_declaration = max_declaration;
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new()
    }
}
