use std::collections::TryReserveError;
use std::fmt;
use std::io;

use thiserror::Error;

/// Line and column of the byte that triggered an error, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A raw input byte, shown as `'c'(63)` when printable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found(pub u8);

impl fmt::Display for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_ascii_graphic() || self.0 == b' ' {
            write!(f, "'{}'({:02x})", self.0 as char, self.0)
        } else {
            write!(f, "({:02x})", self.0)
        }
    }
}

/// Which kind of name was being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameContext {
    StartTag,
    EndTag,
    Attribute,
}

impl fmt::Display for NameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NameContext::StartTag => "start tag name",
            NameContext::EndTag => "end tag name",
            NameContext::Attribute => "attribute name",
        })
    }
}

/// Configured bound that an input ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Name,
    Text,
    AttributeValue,
    Depth,
    Declaration,
    Escape,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Limit::Name => "name length",
            Limit::Text => "text length",
            Limit::AttributeValue => "attribute value length",
            Limit::Depth => "nesting depth",
            Limit::Declaration => "XML declaration length",
            Limit::Escape => "escape sequence length",
        })
    }
}

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("{pos}: invalid XML declaration")]
    InvalidDeclaration { pos: Position },

    #[error("unterminated XML declaration")]
    UnterminatedDeclaration,

    #[error("{pos}: expected '<', got {found}")]
    ExpectedTagOpen { pos: Position, found: Found },

    #[error("{pos}: invalid char in {context}: {found}")]
    InvalidNameChar {
        pos: Position,
        context: NameContext,
        found: Found,
    },

    #[error("{pos}: empty-element tag: expected '>' after '/', got {found}")]
    ExpectedEmptyTagClose { pos: Position, found: Found },

    #[error("{pos}: expected spaces or '=' after attribute name, got {found}")]
    ExpectedEquals { pos: Position, found: Found },

    #[error("{pos}: expected spaces or '\"' to open attribute value, got {found}")]
    ExpectedQuote { pos: Position, found: Found },

    #[error("{pos}: invalid char in escape sequence: {found}")]
    InvalidEscapeChar { pos: Position, found: Found },

    #[error("{pos}: escape sequence longer than {max} chars")]
    EscapeTooLong { pos: Position, max: usize },

    #[error("{pos}: unknown escape sequence \"&{name};\"")]
    UnknownEntity { pos: Position, name: String },

    /// The state machine reached a transition its own bookkeeping rules out.
    #[error("{pos}: internal parser error: {detail}")]
    Internal { pos: Position, detail: &'static str },

    #[error("{pos}: opening tag doesn't match closing tag: <{expected}> vs </{found}>")]
    TagMismatch {
        pos: Position,
        expected: String,
        found: String,
    },

    #[error("not all tags have been closed ({open} still open)")]
    UnclosedTags { open: usize },

    #[error("{pos}: unexpected {found} after the root element")]
    TrailingContent { pos: Position, found: Found },

    #[error("unexpected end of input in {context}")]
    UnexpectedEof { context: &'static str },

    #[error("no root element")]
    NoRootElement,

    #[error("{pos}: {limit} exceeds the configured maximum of {max}")]
    LimitExceeded {
        pos: Position,
        limit: Limit,
        max: usize,
    },

    #[error("cannot reserve room for a {limit} of {max}: {source}")]
    Reserve {
        limit: Limit,
        max: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
}

impl XmlError {
    /// True for failures caused by a configured bound rather than by the
    /// input's syntax; the same input may succeed with raised limits.
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, XmlError::LimitExceeded { .. } | XmlError::Reserve { .. })
    }

    /// True for a closing tag that does not match the innermost open tag.
    pub fn is_tag_mismatch(&self) -> bool {
        matches!(self, XmlError::TagMismatch { .. })
    }

    pub fn limit(&self) -> Option<Limit> {
        match self {
            XmlError::LimitExceeded { limit, .. } | XmlError::Reserve { limit, .. } => Some(*limit),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            XmlError::InvalidDeclaration { pos }
            | XmlError::ExpectedTagOpen { pos, .. }
            | XmlError::InvalidNameChar { pos, .. }
            | XmlError::ExpectedEmptyTagClose { pos, .. }
            | XmlError::ExpectedEquals { pos, .. }
            | XmlError::ExpectedQuote { pos, .. }
            | XmlError::InvalidEscapeChar { pos, .. }
            | XmlError::EscapeTooLong { pos, .. }
            | XmlError::UnknownEntity { pos, .. }
            | XmlError::Internal { pos, .. }
            | XmlError::TagMismatch { pos, .. }
            | XmlError::TrailingContent { pos, .. }
            | XmlError::LimitExceeded { pos, .. } => Some(*pos),
            XmlError::UnterminatedDeclaration
            | XmlError::UnclosedTags { .. }
            | XmlError::UnexpectedEof { .. }
            | XmlError::NoRootElement
            | XmlError::Reserve { .. }
            | XmlError::Io(_) => None,
        }
    }
}
