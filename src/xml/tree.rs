//! Element tree produced by the parser.
//!
//! Nodes live in a single arena owned by [`Document`]; links between nodes
//! are indices into that arena. Dropping the document releases every node
//! and attribute at once, and a tree that is still being built is released
//! the same way when its builder is dropped.

use std::fmt;

/// Single-child text elements shorter than this are printed on one line.
pub const INLINE_TEXT_MAX: usize = 50;

/// Index of a node in its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// `<name ...>children</name>`
    Tagged,
    /// `<name .../>`
    EmptyTagged,
    /// Character content between tags.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug)]
struct NodeData {
    kind: ElementKind,
    /// Tag name, or the content of a text node.
    content: String,
    attributes: Vec<Attribute>,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

/// A parsed XML document. The first node in the arena is the root element.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    pub fn root(&self) -> Element<'_> {
        Element {
            doc: self,
            id: NodeId(0),
        }
    }

    /// Resolve an id previously taken from an element of this document.
    pub fn get(&self, id: NodeId) -> Option<Element<'_>> {
        (id.0 < self.nodes.len()).then_some(Element { doc: self, id })
    }

    /// Look up an element by absolute path such as `/a/b/c`.
    ///
    /// The first component must name the root; each further component picks
    /// the first direct child with that name.
    pub fn find(&self, path: &str) -> Option<Element<'_>> {
        let mut names = path.strip_prefix('/')?.split('/');
        let root = self.root();
        if !root.is_named(names.next()?) {
            return None;
        }
        names.try_fold(root, |elem, name| elem.child(name))
    }

    /// Number of nodes, text nodes included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.root() == other.root()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root(), f)
    }
}

/// Borrowed handle to one node of a [`Document`].
#[derive(Clone, Copy)]
pub struct Element<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> Element<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.data().kind
    }

    pub fn is_text(&self) -> bool {
        self.kind() == ElementKind::Text
    }

    /// Tag name; `None` for text nodes.
    pub fn name(&self) -> Option<&'a str> {
        let data = self.data();
        (data.kind != ElementKind::Text).then_some(data.content.as_str())
    }

    /// Character content; `None` unless this is a text node.
    pub fn text(&self) -> Option<&'a str> {
        let data = self.data();
        (data.kind == ElementKind::Text).then_some(data.content.as_str())
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    pub fn attributes(&self) -> &'a [Attribute] {
        &self.data().attributes
    }

    /// Value of the first attribute called `name`.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.attributes()
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn parent(&self) -> Option<Element<'a>> {
        self.data().parent.map(|id| self.with_id(id))
    }

    pub fn first_child(&self) -> Option<Element<'a>> {
        self.data().first_child.map(|id| self.with_id(id))
    }

    pub fn next_sibling(&self) -> Option<Element<'a>> {
        self.data().next_sibling.map(|id| self.with_id(id))
    }

    /// Direct children in document order.
    pub fn children(&self) -> Children<'a> {
        Children {
            next: self.first_child(),
        }
    }

    /// First direct child called `name`.
    pub fn child(&self, name: &str) -> Option<Element<'a>> {
        self.children().find(|c| c.is_named(name))
    }

    /// First direct child called `name` whose attribute `attr` equals `value`.
    pub fn child_with_attr(&self, name: &str, attr: &str, value: &str) -> Option<Element<'a>> {
        self.children()
            .find(|c| c.is_named(name) && c.attr(attr) == Some(value))
    }

    fn data(&self) -> &'a NodeData {
        self.doc.node(self.id)
    }

    fn with_id(&self, id: NodeId) -> Element<'a> {
        Element { doc: self.doc, id }
    }

    fn write_pretty(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        let indent = level * 2;
        let data = self.data();

        match data.kind {
            ElementKind::Text => {
                write!(f, "{:indent$}", "")?;
                write_escaped(f, &data.content)?;
                writeln!(f)
            }
            ElementKind::EmptyTagged => {
                write!(f, "{:indent$}<{}", "", data.content)?;
                write_attrs(f, &data.attributes)?;
                writeln!(f, "/>")
            }
            ElementKind::Tagged => {
                write!(f, "{:indent$}<{}", "", data.content)?;
                write_attrs(f, &data.attributes)?;

                let mut children = self.children();
                if let (Some(only), None) = (children.next(), children.next()) {
                    if let Some(text) = only.text().filter(|t| t.len() < INLINE_TEXT_MAX) {
                        f.write_str(">")?;
                        write_escaped(f, text)?;
                        return writeln!(f, "</{}>", data.content);
                    }
                }

                writeln!(f, ">")?;
                for child in self.children() {
                    child.write_pretty(f, level + 1)?;
                }
                writeln!(f, "{:indent$}</{}>", "", data.content)
            }
        }
    }
}

fn write_attrs(f: &mut fmt::Formatter<'_>, attrs: &[Attribute]) -> fmt::Result {
    for attr in attrs {
        write!(f, " {}=\"{}\"", attr.name, attr.value)?;
    }
    Ok(())
}

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    let mut rest = text;
    while let Some(i) = rest.find(['&', '<', '>']) {
        f.write_str(&rest[..i])?;
        f.write_str(match rest.as_bytes()[i] {
            b'&' => "&amp;",
            b'<' => "&lt;",
            _ => "&gt;",
        })?;
        rest = &rest[i + 1..];
    }
    f.write_str(rest)
}

/// Structural equality: kind, name or text, attributes in order, and
/// children, recursively. Node ids are not compared.
impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.data(), other.data());
        a.kind == b.kind
            && a.content == b.content
            && a.attributes == b.attributes
            && self.children().eq(other.children())
    }
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("kind", &data.kind)
            .field("content", &data.content)
            .field("attributes", &data.attributes)
            .finish()
    }
}

/// Pretty-prints the subtree: one node per line, two spaces of indent per
/// level, text escaped, short single-text elements inlined.
impl fmt::Display for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_pretty(f, 0)
    }
}

pub struct Children<'a> {
    next: Option<Element<'a>>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.next_sibling();
        Some(current)
    }
}

/// Arena under construction.
///
/// Nodes are linked into the tree as soon as they are created, so an
/// aborted parse releases everything by dropping the builder.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Create a node and link it after `prev` (or as first child of `parent`).
    pub(crate) fn append(
        &mut self,
        kind: ElementKind,
        content: String,
        parent: Option<NodeId>,
        prev: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            content,
            attributes: Vec::new(),
            parent,
            first_child: None,
            next_sibling: None,
        });

        match (prev, parent) {
            (Some(prev), _) => self.nodes[prev.0].next_sibling = Some(id),
            (None, Some(parent)) => {
                debug_assert!(self.nodes[parent.0].first_child.is_none());
                self.nodes[parent.0].first_child = Some(id);
            }
            (None, None) => {}
        }
        id
    }

    pub(crate) fn set_kind(&mut self, id: NodeId, kind: ElementKind) {
        self.nodes[id.0].kind = kind;
    }

    pub(crate) fn push_attribute(&mut self, id: NodeId, name: String) {
        self.nodes[id.0].attributes.push(Attribute {
            name,
            value: String::new(),
        });
    }

    /// Fill in the value of the attribute most recently pushed on `id`.
    pub(crate) fn set_last_attribute_value(&mut self, id: NodeId, value: String) {
        if let Some(attr) = self.nodes[id.0].attributes.last_mut() {
            attr.value = value;
        }
    }

    pub(crate) fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].content
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub(crate) fn finish(self) -> Document {
        Document { nodes: self.nodes }
    }
}
