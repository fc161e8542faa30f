//! Bounded, non-validating XML parser producing an owned element tree.
//!
//! ## Architecture
//!
//! - [`parser`]: the byte-level state machine
//! - [`tree`]: the arena-backed [`Document`], element handles, lookups and
//!   the pretty-printer
//! - [`limits`]: bounds on the parser's auxiliary memory
//!
//! ## Example
//!
//! ```
//! use odsread::Diagnostics;
//! use odsread::xml::{self, Limits};
//!
//! let mut diag = Diagnostics::new();
//! let doc = xml::parse_bytes(br#"<a x="1"><b>hi</b></a>"#, &Limits::default(), &mut diag).unwrap();
//!
//! assert_eq!(doc.root().attr("x"), Some("1"));
//! assert_eq!(doc.find("/a/b").and_then(|b| b.first_child()).and_then(|t| t.text()), Some("hi"));
//! ```

mod error;
mod limits;
mod parser;
mod tree;

pub use error::{Found, Limit, NameContext, Position, XmlError};
pub use limits::{
    DEFAULT_MAX_DECLARATION, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ESCAPE, DEFAULT_MAX_STRING, Limits,
};
pub use parser::{parse, parse_bytes};
pub use tree::{Attribute, Children, Document, Element, ElementKind, INLINE_TEXT_MAX, NodeId};
