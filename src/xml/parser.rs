//! Single-pass XML parser driven by a byte-level state machine.
//!
//! Supported: an optional leading `<?xml ... ?>` declaration, elements,
//! double-quoted attributes, text and the five predefined entities in text.
//! Not supported: comments, CDATA, DTDs, processing instructions and
//! namespaces (qualified names are kept verbatim).
//!
//! Auxiliary memory is fixed by [`Limits`]: one string accumulator for
//! names, values and text, one for entity names, and two stacks of the same
//! depth for open tags and the last child seen at each level.

use std::collections::TryReserveError;
use std::io::{BufReader, Read};

use log::{debug, trace};

use super::error::{Found, Limit, NameContext, Position, XmlError};
use super::limits::Limits;
use super::tree::{Document, ElementKind, NodeId, TreeBuilder};
use crate::bounded::{BoundedStack, BoundedString, CapacityExceeded};
use crate::diag::Diagnostics;

/// Parse a whole document from `reader`.
///
/// On failure the error is also appended to `diag` and no part of the tree
/// survives.
pub fn parse<R: Read>(reader: R, limits: &Limits, diag: &mut Diagnostics) -> Result<Document, XmlError> {
    let result = Parser::new(limits).and_then(|parser| parser.run(reader));
    match &result {
        Ok(doc) => debug!("parsed XML document with {} nodes", doc.len()),
        Err(e) => {
            debug!("XML parse failed: {e}");
            diag.add(format_args!("xml: {e}"));
        }
    }
    result
}

/// [`parse`] over an in-memory buffer.
pub fn parse_bytes(input: &[u8], limits: &Limits, diag: &mut Diagnostics) -> Result<Document, XmlError> {
    parse(input, limits, diag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the root: skip spaces, expect `<`.
    Prolog,
    /// Inside `<?...`, up to `>`.
    Declaration,
    /// After the root's `<`: declaration or root name.
    RootTagOpen,
    /// Rest of a start tag name.
    StartTagName,
    /// After `/` in a start tag, expect `>`.
    EmptyTagClose,
    /// Between tags: start tag, end tag or text.
    Content,
    /// Rest of a text run.
    Text,
    /// Inside `&...;`.
    Escape,
    /// After `<` inside an element: start or end tag.
    TagOpen,
    /// Inside a start tag after its name or a value.
    AttrName,
    AttrNameTail,
    AttrEquals,
    AttrValueOpen,
    AttrValue,
    EndTagName,
    EndTagNameTail,
    /// After the root element closed: only spaces allowed.
    Epilogue,
}

impl State {
    fn describe(self) -> &'static str {
        match self {
            State::Prolog => "prolog",
            State::Declaration => "XML declaration",
            State::RootTagOpen | State::TagOpen => "tag",
            State::StartTagName => "start tag name",
            State::EmptyTagClose => "empty-element tag",
            State::Content | State::Text => "content",
            State::Escape => "escape sequence",
            State::AttrName | State::AttrNameTail => "attribute name",
            State::AttrEquals | State::AttrValueOpen => "attribute",
            State::AttrValue => "attribute value",
            State::EndTagName | State::EndTagNameTail => "end tag name",
            State::Epilogue => "epilogue",
        }
    }
}

fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b':'
}

fn is_name_char(c: u8) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == b'.' || c == b'-'
}

fn reserve(limit: Limit, max: usize) -> impl FnOnce(TryReserveError) -> XmlError {
    move |source| XmlError::Reserve { limit, max, source }
}

fn entity_char(name: &[u8]) -> Option<u8> {
    match name {
        b"amp" => Some(b'&'),
        b"lt" => Some(b'<'),
        b"gt" => Some(b'>'),
        b"quot" => Some(b'"'),
        b"apos" => Some(b'\''),
        _ => None,
    }
}

struct Parser {
    state: State,
    tree: TreeBuilder,
    /// Open start tags, innermost last.
    open_tags: BoundedStack<NodeId>,
    /// Last child of each enclosing element, saved when descending.
    prev_siblings: BoundedStack<Option<NodeId>>,
    buf: BoundedString,
    escape: BoundedString,
    /// Element whose children are being read.
    parent: Option<NodeId>,
    /// Last child appended to `parent`.
    prev: Option<NodeId>,
    /// Element whose start tag is being read.
    current: Option<NodeId>,
    seen_declaration: bool,
    max_string: usize,
    max_declaration: usize,
    line: u32,
    column: u32,
}

impl Parser {
    fn new(limits: &Limits) -> Result<Self, XmlError> {
        let (buf_limit, buf_max) = if limits.max_declaration > limits.max_string {
            (Limit::Declaration, limits.max_declaration)
        } else {
            (Limit::Text, limits.max_string)
        };

        Ok(Self {
            state: State::Prolog,
            tree: TreeBuilder::new(),
            open_tags: BoundedStack::new(limits.max_depth).map_err(reserve(Limit::Depth, limits.max_depth))?,
            prev_siblings: BoundedStack::new(limits.max_depth).map_err(reserve(Limit::Depth, limits.max_depth))?,
            buf: BoundedString::new(buf_max).map_err(reserve(buf_limit, buf_max))?,
            escape: BoundedString::new(limits.max_escape).map_err(reserve(Limit::Escape, limits.max_escape))?,
            parent: None,
            prev: None,
            current: None,
            seen_declaration: false,
            max_string: limits.max_string,
            max_declaration: limits.max_declaration,
            line: 1,
            column: 0,
        })
    }

    fn run<R: Read>(mut self, reader: R) -> Result<Document, XmlError> {
        for byte in BufReader::new(reader).bytes() {
            let c = byte?;
            self.column += 1;
            self.step(c)?;
            if c == b'\n' {
                self.line += 1;
                self.column = 0;
            }
        }
        self.finish()
    }

    fn pos(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn step(&mut self, c: u8) -> Result<(), XmlError> {
        match self.state {
            State::Prolog => {
                if is_space(c) {
                    return Ok(());
                }
                if c != b'<' {
                    return Err(XmlError::ExpectedTagOpen {
                        pos: self.pos(),
                        found: Found(c),
                    });
                }
                self.state = State::RootTagOpen;
            }

            State::Declaration => {
                if c == b'>' {
                    let body = self.buf.as_bytes();
                    if body.len() < 4 || !body.starts_with(b"xml") || !body.ends_with(b"?") {
                        return Err(XmlError::InvalidDeclaration { pos: self.pos() });
                    }
                    self.buf.clear();
                    self.seen_declaration = true;
                    self.state = State::Prolog;
                    return Ok(());
                }
                self.push(c, Limit::Declaration)?;
            }

            State::RootTagOpen => {
                if c == b'?' && !self.seen_declaration {
                    self.state = State::Declaration;
                    return Ok(());
                }
                self.start_name(c, NameContext::StartTag)?;
                self.state = State::StartTagName;
            }

            State::StartTagName => {
                if is_space(c) || c == b'/' || c == b'>' {
                    self.open_element();
                    match c {
                        b'/' => self.state = State::EmptyTagClose,
                        b'>' => self.close_start_tag()?,
                        _ => self.state = State::AttrName,
                    }
                    return Ok(());
                }
                self.name_char(c, NameContext::StartTag)?;
            }

            State::EmptyTagClose => {
                if c != b'>' {
                    return Err(XmlError::ExpectedEmptyTagClose {
                        pos: self.pos(),
                        found: Found(c),
                    });
                }
                if let Some(id) = self.current.take() {
                    self.tree.set_kind(id, ElementKind::EmptyTagged);
                }
                self.state = if self.parent.is_some() {
                    State::Content
                } else {
                    State::Epilogue
                };
            }

            State::Content => {
                if is_space(c) {
                    return Ok(());
                }
                match c {
                    b'<' => self.state = State::TagOpen,
                    b'&' => self.begin_escape(),
                    _ => {
                        self.push(c, Limit::Text)?;
                        self.state = State::Text;
                    }
                }
            }

            State::Text => match c {
                b'<' => {
                    let text = self.buf.take();
                    let id = self
                        .tree
                        .append(ElementKind::Text, text, self.parent, self.prev);
                    self.prev = Some(id);
                    self.state = State::TagOpen;
                }
                b'&' => self.begin_escape(),
                _ => self.push(c, Limit::Text)?,
            },

            State::Escape => {
                if c == b';' {
                    let Some(decoded) = entity_char(self.escape.as_bytes()) else {
                        return Err(XmlError::UnknownEntity {
                            pos: self.pos(),
                            name: self.escape.take(),
                        });
                    };
                    self.escape.clear();
                    self.push(decoded, Limit::Text)?;
                    self.state = State::Text;
                    return Ok(());
                }
                if !c.is_ascii_lowercase() {
                    return Err(XmlError::InvalidEscapeChar {
                        pos: self.pos(),
                        found: Found(c),
                    });
                }
                let pos = self.pos();
                self.escape
                    .push(c)
                    .map_err(|e| XmlError::EscapeTooLong { pos, max: e.capacity })?;
            }

            State::TagOpen => {
                if c == b'/' {
                    self.state = State::EndTagName;
                    return Ok(());
                }
                self.start_name(c, NameContext::StartTag)?;
                self.state = State::StartTagName;
            }

            State::AttrName => {
                if is_space(c) {
                    return Ok(());
                }
                match c {
                    b'/' => self.state = State::EmptyTagClose,
                    b'>' => return self.close_start_tag(),
                    _ => {
                        self.start_name(c, NameContext::Attribute)?;
                        self.state = State::AttrNameTail;
                    }
                }
            }

            State::AttrNameTail => {
                if is_space(c) {
                    self.state = State::AttrEquals;
                } else if c == b'=' {
                    self.open_attribute();
                } else {
                    self.name_char(c, NameContext::Attribute)?;
                }
            }

            State::AttrEquals => {
                if is_space(c) {
                    return Ok(());
                }
                if c != b'=' {
                    return Err(XmlError::ExpectedEquals {
                        pos: self.pos(),
                        found: Found(c),
                    });
                }
                self.open_attribute();
            }

            State::AttrValueOpen => {
                if is_space(c) {
                    return Ok(());
                }
                if c != b'"' {
                    return Err(XmlError::ExpectedQuote {
                        pos: self.pos(),
                        found: Found(c),
                    });
                }
                self.state = State::AttrValue;
            }

            State::AttrValue => {
                if c == b'"' {
                    let value = self.buf.take();
                    if let Some(id) = self.current {
                        self.tree.set_last_attribute_value(id, value);
                    }
                    self.state = State::AttrName;
                    return Ok(());
                }
                self.push(c, Limit::AttributeValue)?;
            }

            State::EndTagName => {
                self.start_name(c, NameContext::EndTag)?;
                self.state = State::EndTagNameTail;
            }

            State::EndTagNameTail => {
                if c == b'>' {
                    return self.close_end_tag();
                }
                self.name_char(c, NameContext::EndTag)?;
            }

            State::Epilogue => {
                if !is_space(c) {
                    return Err(XmlError::TrailingContent {
                        pos: self.pos(),
                        found: Found(c),
                    });
                }
            }
        }
        Ok(())
    }

    /// Append to the shared accumulator. The declaration may be configured
    /// longer than other strings, so each kind is checked against its own
    /// bound rather than the accumulator's capacity.
    fn push(&mut self, c: u8, limit: Limit) -> Result<(), XmlError> {
        let max = match limit {
            Limit::Declaration => self.max_declaration,
            _ => self.max_string,
        };
        let pos = self.pos();
        let exceeded = move || XmlError::LimitExceeded { pos, limit, max };
        if self.buf.len() >= max {
            return Err(exceeded());
        }
        self.buf.push(c).map_err(|_| exceeded())
    }

    fn start_name(&mut self, c: u8, context: NameContext) -> Result<(), XmlError> {
        if !is_name_start(c) {
            return Err(XmlError::InvalidNameChar {
                pos: self.pos(),
                context,
                found: Found(c),
            });
        }
        self.push(c, Limit::Name)
    }

    fn name_char(&mut self, c: u8, context: NameContext) -> Result<(), XmlError> {
        if !is_name_char(c) {
            return Err(XmlError::InvalidNameChar {
                pos: self.pos(),
                context,
                found: Found(c),
            });
        }
        self.push(c, Limit::Name)
    }

    fn begin_escape(&mut self) {
        self.escape.clear();
        self.state = State::Escape;
    }

    /// Link a new element into the tree as soon as its name is complete.
    fn open_element(&mut self) {
        let name = self.buf.take();
        trace!("start tag <{name}>");
        let id = self
            .tree
            .append(ElementKind::Tagged, name, self.parent, self.prev);
        if self.parent.is_some() {
            self.prev = Some(id);
        }
        self.current = Some(id);
    }

    /// `>` of a start tag: descend into the element.
    fn close_start_tag(&mut self) -> Result<(), XmlError> {
        let Some(id) = self.current.take() else {
            return Ok(());
        };
        let pos = self.pos();
        let too_deep = move |e: CapacityExceeded| XmlError::LimitExceeded {
            pos,
            limit: Limit::Depth,
            max: e.capacity,
        };

        self.prev_siblings.push(self.prev).map_err(too_deep)?;
        self.open_tags.push(id).map_err(too_deep)?;
        self.parent = Some(id);
        self.prev = None;
        self.state = State::Content;
        Ok(())
    }

    fn open_attribute(&mut self) {
        let name = self.buf.take();
        if let Some(id) = self.current {
            self.tree.push_attribute(id, name);
        }
        self.state = State::AttrValueOpen;
    }

    /// `>` of an end tag: match it against the innermost open tag and ascend.
    fn close_end_tag(&mut self) -> Result<(), XmlError> {
        let found = self.buf.take();
        // End tags are only scanned inside an open element.
        let Some(open) = self.open_tags.pop() else {
            return Err(XmlError::Internal {
                pos: self.pos(),
                detail: "end tag with an empty tag stack",
            });
        };

        let expected = self.tree.name(open);
        if expected != found {
            return Err(XmlError::TagMismatch {
                pos: self.pos(),
                expected: expected.to_owned(),
                found,
            });
        }
        trace!("end tag </{found}>");

        self.parent = self.tree.parent(open);
        self.prev = self.prev_siblings.pop().flatten();
        self.state = if self.open_tags.is_empty() {
            State::Epilogue
        } else {
            State::Content
        };
        Ok(())
    }

    fn finish(self) -> Result<Document, XmlError> {
        match self.state {
            State::Epilogue => Ok(self.tree.finish()),
            State::Prolog => Err(XmlError::NoRootElement),
            State::Declaration => Err(XmlError::UnterminatedDeclaration),
            _ if !self.open_tags.is_empty() => Err(XmlError::UnclosedTags {
                open: self.open_tags.len(),
            }),
            state => Err(XmlError::UnexpectedEof {
                context: state.describe(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::tree::Attribute;
    use pretty_assertions::assert_eq;

    fn parse_str(input: &str) -> Result<Document, XmlError> {
        parse_bytes(input.as_bytes(), &Limits::default(), &mut Diagnostics::new())
    }

    fn attr(name: &str, value: &str) -> Attribute {
        Attribute {
            name: name.to_owned(),
            value: value.to_owned(),
        }
    }

    #[test]
    fn test_nested_tags() {
        let doc = parse_str("<a><b></b></a>").unwrap();
        let root = doc.root();

        assert_eq!(root.name(), Some("a"));
        assert_eq!(root.kind(), ElementKind::Tagged);
        let children: Vec<_> = root.children().collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name(), Some("b"));
        assert_eq!(children[0].kind(), ElementKind::Tagged);
        assert_eq!(children[0].first_child(), None);
    }

    #[test]
    fn test_crossed_tags_are_rejected() {
        let mut diag = Diagnostics::new();
        let err = parse_bytes(b"<a><b></a></b>", &Limits::default(), &mut diag).unwrap_err();

        match &err {
            XmlError::TagMismatch {
                expected, found, ..
            } => {
                assert_eq!(expected, "b");
                assert_eq!(found, "a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_tag_mismatch());
        assert!(diag.contents().starts_with("xml: 1:10: opening tag doesn't match"));
    }

    #[test]
    fn test_stray_end_tag_after_root() {
        let err = parse_str("<a></a></b>").unwrap_err();
        assert!(matches!(err, XmlError::TrailingContent { .. }), "{err:?}");

        let err = parse_str("<a></a").unwrap_err();
        assert!(matches!(err, XmlError::UnclosedTags { open: 1 }), "{err:?}");
    }

    #[test]
    fn test_entities_in_text() {
        let doc = parse_str("<t>&lt;&amp;&gt;&quot;&apos;</t>").unwrap();
        assert_eq!(doc.root().first_child().unwrap().text(), Some("<&>\"'"));

        let doc = parse_str("<t>a &amp; b</t>").unwrap();
        assert_eq!(doc.root().first_child().unwrap().text(), Some("a & b"));
    }

    #[test]
    fn test_unknown_entity_is_rejected() {
        let err = parse_str("<t>x&zzz;y</t>").unwrap_err();
        match err {
            XmlError::UnknownEntity { name, pos } => {
                assert_eq!(name, "zzz");
                assert_eq!(pos, Position { line: 1, column: 9 });
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            parse_str("<t>&;</t>").unwrap_err(),
            XmlError::UnknownEntity { .. }
        ));
        assert!(matches!(
            parse_str("<t>&AMP;</t>").unwrap_err(),
            XmlError::InvalidEscapeChar { .. }
        ));
        assert!(matches!(
            parse_str(&format!("<t>&{};</t>", "a".repeat(40))).unwrap_err(),
            XmlError::EscapeTooLong { max: 31, .. }
        ));
    }

    #[test]
    fn test_attributes_keep_document_order() {
        let doc = parse_str(r#"<a x="1" y="2"/>"#).unwrap();
        let root = doc.root();

        assert_eq!(root.kind(), ElementKind::EmptyTagged);
        assert_eq!(root.attributes(), &[attr("x", "1"), attr("y", "2")]);
        assert_eq!(root.attr("x"), Some("1"));
        assert_eq!(root.attr("z"), None);
    }

    #[test]
    fn test_attribute_spacing_variants() {
        let doc = parse_str("<a  k = \"v\"\tq=\"\"  ><b id=\"1\"/></a>").unwrap();
        let root = doc.root();

        assert_eq!(root.attributes(), &[attr("k", "v"), attr("q", "")]);
        assert_eq!(root.child("b").unwrap().kind(), ElementKind::EmptyTagged);
    }

    #[test]
    fn test_duplicate_attribute_first_wins() {
        let doc = parse_str(r#"<a k="first" k="second"/>"#).unwrap();
        assert_eq!(doc.root().attr("k"), Some("first"));
        assert_eq!(doc.root().attributes().len(), 2);
    }

    #[test]
    fn test_attribute_values_are_not_unescaped() {
        let doc = parse_str(r#"<a href="x&amp;y"/>"#).unwrap();
        assert_eq!(doc.root().attr("href"), Some("x&amp;y"));
    }

    #[test]
    fn test_malformed_attributes() {
        assert!(matches!(
            parse_str("<a x/>").unwrap_err(),
            XmlError::InvalidNameChar {
                context: NameContext::Attribute,
                ..
            }
        ));
        assert!(matches!(
            parse_str("<a x y=\"1\"/>").unwrap_err(),
            XmlError::ExpectedEquals { .. }
        ));
        assert!(matches!(
            parse_str("<a x='1'/>").unwrap_err(),
            XmlError::ExpectedQuote { .. }
        ));
        assert!(matches!(
            parse_str("<a / >").unwrap_err(),
            XmlError::ExpectedEmptyTagClose { .. }
        ));
    }

    #[test]
    fn test_declaration() {
        let doc = parse_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<r/>").unwrap();
        assert_eq!(doc.root().name(), Some("r"));

        assert!(matches!(
            parse_str("<?xmm version=\"1.0\"?><r/>").unwrap_err(),
            XmlError::InvalidDeclaration { .. }
        ));
        assert!(matches!(
            parse_str("<?xml version=\"1.0\"><r/>").unwrap_err(),
            XmlError::InvalidDeclaration { .. }
        ));
        assert!(matches!(
            parse_str("<?xml version").unwrap_err(),
            XmlError::UnterminatedDeclaration
        ));
    }

    #[test]
    fn test_second_declaration_is_rejected() {
        let err = parse_str("<?xml?><?xml?><r/>").unwrap_err();
        assert!(
            matches!(
                err,
                XmlError::InvalidNameChar {
                    context: NameContext::StartTag,
                    found: Found(b'?'),
                    ..
                }
            ),
            "{err:?}"
        );

        assert!(matches!(
            parse_str("<r><?xml?></r>").unwrap_err(),
            XmlError::InvalidNameChar { .. }
        ));
    }

    #[test]
    fn test_comments_are_rejected() {
        let err = parse_str("<r><!-- note --></r>").unwrap_err();
        assert!(matches!(
            err,
            XmlError::InvalidNameChar {
                found: Found(b'!'),
                ..
            }
        ));
    }

    #[test]
    fn test_text_and_elements_interleave() {
        let doc = parse_str("<p>\n  Hello <b>big</b> world\n</p>").unwrap();
        let parts: Vec<_> = doc
            .root()
            .children()
            .map(|c| (c.kind(), c.text().or(c.name()).unwrap_or_default().to_owned()))
            .collect();

        assert_eq!(
            parts,
            vec![
                (ElementKind::Text, "Hello ".to_owned()),
                (ElementKind::Tagged, "b".to_owned()),
                (ElementKind::Text, "world\n".to_owned()),
            ]
        );
    }

    #[test]
    fn test_whitespace_only_content_is_dropped() {
        let doc = parse_str("<a>\n  <b/>\n  \n</a>\n\n").unwrap();
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_names_allow_qualified_and_punctuated_forms() {
        let doc = parse_str(r#"<office:doc-1.x _a:b="c"><t_2/></office:doc-1.x>"#).unwrap();
        assert_eq!(doc.root().name(), Some("office:doc-1.x"));
        assert_eq!(doc.root().attr("_a:b"), Some("c"));
    }

    #[test]
    fn test_invalid_name_start() {
        for input in ["<1a/>", "<a><-b/></a>", "<a></1a>", "< a/>"] {
            let err = parse_str(input).unwrap_err();
            assert!(matches!(err, XmlError::InvalidNameChar { .. }), "{input}: {err:?}");
        }
        assert!(matches!(
            parse_str("<a></a >").unwrap_err(),
            XmlError::InvalidNameChar {
                context: NameContext::EndTag,
                ..
            }
        ));
    }

    #[test]
    fn test_end_of_input_errors() {
        assert!(matches!(parse_str("").unwrap_err(), XmlError::NoRootElement));
        assert!(matches!(parse_str("  \n").unwrap_err(), XmlError::NoRootElement));
        assert!(matches!(
            parse_str("<?xml?>").unwrap_err(),
            XmlError::NoRootElement
        ));
        assert!(matches!(
            parse_str("<a").unwrap_err(),
            XmlError::UnexpectedEof { .. }
        ));
        assert!(matches!(
            parse_str("<a x=\"1\"/").unwrap_err(),
            XmlError::UnexpectedEof { .. }
        ));
        assert!(matches!(
            parse_str("<a><b>text").unwrap_err(),
            XmlError::UnclosedTags { open: 2 }
        ));
    }

    #[test]
    fn test_content_before_root_and_after_root() {
        assert!(matches!(
            parse_str("text<a/>").unwrap_err(),
            XmlError::ExpectedTagOpen { .. }
        ));
        assert!(matches!(
            parse_str("<a/><b/>").unwrap_err(),
            XmlError::TrailingContent { .. }
        ));
        assert!(matches!(
            parse_str("<a></a>tail").unwrap_err(),
            XmlError::TrailingContent { .. }
        ));
    }

    #[test]
    fn test_error_positions_count_lines() {
        let err = parse_str("<a>\n  <b>\n  </c>\n</a>").unwrap_err();
        assert_eq!(err.position(), Some(Position { line: 3, column: 6 }));
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits::default().with_max_depth(3);
        let mut diag = Diagnostics::new();

        let ok = "<a><b><c/></b></a>";
        assert!(parse_bytes(ok.as_bytes(), &limits, &mut diag).is_ok());

        let deep = "<a><b><c><d></d></c></b></a>";
        let err = parse_bytes(deep.as_bytes(), &limits, &mut diag).unwrap_err();
        assert!(err.is_resource_limit());
        assert_eq!(err.limit(), Some(Limit::Depth));
        assert!(diag.contents().contains("nesting depth exceeds the configured maximum of 3"));
    }

    #[test]
    fn test_default_depth_limit() {
        let depth = crate::xml::DEFAULT_MAX_DEPTH;
        let within = format!("{}{}", "<e>".repeat(depth), "</e>".repeat(depth));
        assert!(parse_str(&within).is_ok());

        let beyond = format!("{}{}", "<e>".repeat(depth + 1), "</e>".repeat(depth + 1));
        assert_eq!(parse_str(&beyond).unwrap_err().limit(), Some(Limit::Depth));
    }

    #[test]
    fn test_string_limits() {
        let limits = Limits::default().with_max_string(4);
        let mut diag = Diagnostics::new();
        let mut limit_of = |input: &str| {
            parse_bytes(input.as_bytes(), &limits, &mut diag)
                .unwrap_err()
                .limit()
        };

        assert_eq!(limit_of("<abcde/>"), Some(Limit::Name));
        assert_eq!(limit_of("<a abcde=\"\"/>"), Some(Limit::Name));
        assert_eq!(limit_of("<a></abcde>"), Some(Limit::Name));
        assert_eq!(limit_of("<a>hello</a>"), Some(Limit::Text));
        assert_eq!(limit_of("<a>&amp;&amp;&amp;&amp;&amp;</a>"), Some(Limit::Text));
        assert_eq!(limit_of("<a k=\"12345\"/>"), Some(Limit::AttributeValue));

        let raised = limits.with_max_string(8);
        assert!(parse_bytes(b"<a>hello</a>", &raised, &mut diag).is_ok());
    }

    #[test]
    fn test_declaration_limit() {
        let limits = Limits::default().with_max_declaration(8);
        let err = parse_bytes(
            b"<?xml version=\"1.0\"?><r/>",
            &limits,
            &mut Diagnostics::new(),
        )
        .unwrap_err();
        assert_eq!(err.limit(), Some(Limit::Declaration));
    }

    #[test]
    fn test_unreservable_limits_fail_cleanly() {
        let mut diag = Diagnostics::new();
        let limits = Limits::default().with_max_depth(usize::MAX);
        let err = parse_bytes(b"<a/>", &limits, &mut diag).unwrap_err();

        assert!(matches!(err, XmlError::Reserve { limit: Limit::Depth, .. }), "{err:?}");
        assert!(err.is_resource_limit());
        assert!(diag.contents().starts_with("xml: cannot reserve room for a nesting depth"));

        let limits = Limits::default().with_max_string(usize::MAX);
        let err = parse_bytes(b"<a/>", &limits, &mut diag).unwrap_err();
        assert_eq!(err.limit(), Some(Limit::Text));
    }

    #[test]
    fn test_non_ascii_text_is_preserved() {
        let doc = parse_str("<p>Größe – 10 €</p>").unwrap();
        assert_eq!(doc.root().first_child().unwrap().text(), Some("Größe – 10 €"));
    }

    #[test]
    fn test_many_siblings() {
        let input = format!("<r>{}</r>", "<c/>".repeat(1000));
        let doc = parse_str(&input).unwrap();
        assert_eq!(doc.root().children().count(), 1000);
        assert!(doc.root().children().all(|c| c.is_named("c")));
    }
}
