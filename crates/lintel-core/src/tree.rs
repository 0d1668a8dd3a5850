//! Language-neutral syntax tree consumed by rules.
//!
//! Front ends lower their parser's output into a [`SyntaxTree`] with a
//! [`TreeBuilder`]. Rules navigate it through [`Node`] cursors, which expose
//! the kind, name, location, annotations, parent and children of a node.

use crate::types::{Entity, Location};
use std::path::{Path, PathBuf};

/// Kind of a syntax node, used to dispatch nodes to interested rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// The whole file. Always the root.
    File,
    /// A module or namespace.
    Module,
    /// A type declaration (struct, enum, trait, class, ...).
    Class,
    /// A function or method.
    Function,
    /// A field, constant or static.
    Property,
    /// A function parameter.
    Parameter,
    /// A block of statements.
    Block,
    /// A call expression (function or method).
    Call,
    /// An import (`use`).
    Import,
    /// Any other expression.
    Expression,
    /// Anything the front end does not classify.
    Other,
}

impl NodeKind {
    /// All kinds, in declaration order.
    pub const ALL: [NodeKind; 11] = [
        NodeKind::File,
        NodeKind::Module,
        NodeKind::Class,
        NodeKind::Function,
        NodeKind::Property,
        NodeKind::Parameter,
        NodeKind::Block,
        NodeKind::Call,
        NodeKind::Import,
        NodeKind::Expression,
        NodeKind::Other,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Position of a node in its file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Span {
    /// Creates a span from its start position and byte range.
    #[must_use]
    pub fn new(line: usize, column: usize, start: usize, end: usize) -> Self {
        Self {
            line,
            column,
            start,
            end: end.max(start),
        }
    }
}

/// An annotation (attribute) attached to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Annotation name, possibly path-qualified (`allow`, `lintel::suppress`).
    pub name: String,
    /// Raw argument texts, one per comma-separated argument.
    pub arguments: Vec<String>,
}

impl Annotation {
    /// Creates an annotation.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the last segment of the name (`suppress` for `lintel::suppress`).
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit(|c: char| c == ':' || c == '.')
            .next()
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    name: Option<String>,
    signature: Option<String>,
    span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    annotations: Vec<Annotation>,
}

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    path: PathBuf,
    content: String,
    nodes: Vec<NodeData>,
}

impl SyntaxTree {
    /// Path of the parsed file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full source text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The file node.
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        Node {
            tree: self,
            id: NodeId(0),
        }
    }

    /// Looks up a node by id.
    ///
    /// Ids are only meaningful for the tree that produced them.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        (id.0 < self.nodes.len()).then_some(Node { tree: self, id })
    }

    /// Number of nodes, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of lines in the file.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    /// All nodes in pre-order, starting with the root.
    pub fn preorder(&self) -> impl Iterator<Item = Node<'_>> {
        let mut stack = vec![NodeId(0)];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
            Some(Node { tree: self, id })
        })
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }
}

/// A cursor onto one node of a [`SyntaxTree`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> Node<'t> {
    /// The node's id within its tree.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The tree this node belongs to.
    #[must_use]
    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    /// The node's kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.tree.data(self.id).kind
    }

    /// The declared name, if the node declares something.
    #[must_use]
    pub fn name(&self) -> Option<&'t str> {
        self.tree.data(self.id).name.as_deref()
    }

    /// A description of the node that is stable across edits elsewhere in the file.
    #[must_use]
    pub fn signature(&self) -> String {
        let data = self.tree.data(self.id);
        match (&data.signature, &data.name) {
            (Some(signature), _) => signature.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => format!("{:?}", data.kind),
        }
    }

    /// Position of the node.
    #[must_use]
    pub fn span(&self) -> Span {
        self.tree.data(self.id).span
    }

    /// Source text covered by the node.
    #[must_use]
    pub fn text(&self) -> &'t str {
        let span = self.span();
        self.tree.content.get(span.start..span.end).unwrap_or("")
    }

    /// Number of lines the node spans.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.text().lines().count()
    }

    /// Annotations attached directly to this node.
    #[must_use]
    pub fn annotations(&self) -> &'t [Annotation] {
        &self.tree.data(self.id).annotations
    }

    /// The enclosing node, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Node<'t>> {
        self.tree
            .data(self.id)
            .parent
            .map(|id| Node { tree: self.tree, id })
    }

    /// Returns true for the file node.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.id.0 == 0
    }

    /// Direct children in source order.
    pub fn children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let tree = self.tree;
        tree.data(self.id)
            .children
            .iter()
            .map(move |&id| Node { tree, id })
    }

    /// Enclosing nodes from the parent up to the root.
    #[must_use]
    pub fn ancestors(&self) -> Ancestors<'t> {
        Ancestors { next: self.parent() }
    }

    /// This node followed by its ancestors.
    #[must_use]
    pub fn self_and_ancestors(&self) -> Ancestors<'t> {
        Ancestors { next: Some(*self) }
    }

    /// All nodes below this one, in pre-order.
    pub fn descendants(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let tree = self.tree;
        let mut stack: Vec<NodeId> = tree.data(self.id).children.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(tree.data(id).children.iter().rev().copied());
            Some(Node { tree, id })
        })
    }

    /// Location of the node, for findings.
    #[must_use]
    pub fn location(&self) -> Location {
        let span = self.span();
        Location::new(self.tree.path.clone(), span.line, span.column)
            .with_span(span.start, span.end - span.start)
    }

    /// Entity describing the node, for findings.
    #[must_use]
    pub fn entity(&self) -> Entity {
        Entity {
            name: self.name().unwrap_or_default().to_string(),
            signature: self.signature(),
            location: self.location(),
        }
    }
}

/// Iterator over a node's ancestors, innermost first.
#[derive(Debug, Clone)]
pub struct Ancestors<'t> {
    next: Option<Node<'t>>,
}

impl<'t> Iterator for Ancestors<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// Description of a node handed to [`TreeBuilder`].
#[derive(Debug, Clone)]
pub struct NodeSpec {
    kind: NodeKind,
    name: Option<String>,
    signature: Option<String>,
    span: Span,
    annotations: Vec<Annotation>,
}

impl NodeSpec {
    /// Starts a node description.
    #[must_use]
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            name: None,
            signature: None,
            span,
            annotations: Vec::new(),
        }
    }

    /// Sets the declared name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Attaches annotations.
    #[must_use]
    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        self.annotations = annotations;
        self
    }
}

/// Incrementally builds a [`SyntaxTree`] in source order.
///
/// Nodes are opened and closed like a stack; [`TreeBuilder::leaf`] adds a
/// childless node under the currently open one.
#[derive(Debug)]
pub struct TreeBuilder {
    path: PathBuf,
    content: String,
    nodes: Vec<NodeData>,
    open: Vec<NodeId>,
    line_starts: Vec<usize>,
}

impl TreeBuilder {
    /// Starts a tree whose root spans the whole file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let content = content.into();
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        let root = NodeData {
            kind: NodeKind::File,
            name: None,
            signature: None,
            span: Span::new(1, 1, 0, content.len()),
            parent: None,
            children: Vec::new(),
            annotations: Vec::new(),
        };
        let path = path.into();
        let mut builder = Self {
            path,
            content,
            nodes: vec![root],
            open: vec![NodeId(0)],
            line_starts,
        };
        let file_name = builder
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        builder.nodes[0].name = file_name;
        builder
    }

    /// Source text being built over.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Byte offset of a 1-indexed line and column, clamped to the file.
    #[must_use]
    pub fn offset_for(&self, line: usize, column: usize) -> usize {
        if line == 0 {
            return 0;
        }
        match self.line_starts.get(line - 1) {
            Some(start) => (start + column.saturating_sub(1)).min(self.content.len()),
            None => self.content.len(),
        }
    }

    /// Adds a node under the currently open one and opens it.
    pub fn open(&mut self, spec: NodeSpec) -> NodeId {
        let id = self.push(spec);
        self.open.push(id);
        id
    }

    /// Closes the most recently opened node. The root stays open.
    pub fn close(&mut self) {
        if self.open.len() > 1 {
            self.open.pop();
        }
    }

    /// Adds a childless node under the currently open one.
    pub fn leaf(&mut self, spec: NodeSpec) -> NodeId {
        self.push(spec)
    }

    /// Attaches an annotation to the file node.
    pub fn annotate_root(&mut self, annotation: Annotation) {
        self.nodes[0].annotations.push(annotation);
    }

    /// Finishes the tree.
    #[must_use]
    pub fn build(self) -> SyntaxTree {
        SyntaxTree {
            path: self.path,
            content: self.content,
            nodes: self.nodes,
        }
    }

    fn push(&mut self, spec: NodeSpec) -> NodeId {
        let parent = self.open.last().copied().unwrap_or(NodeId(0));
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind: spec.kind,
            name: spec.name,
            signature: spec.signature,
            span: spec.span,
            parent: Some(parent),
            children: Vec::new(),
            annotations: spec.annotations,
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SyntaxTree {
        let content = "mod a {\n    fn f(x: u8) {}\n}\n";
        let mut builder = TreeBuilder::new("src/lib.rs", content);
        builder.open(NodeSpec::new(NodeKind::Module, Span::new(1, 1, 0, 28)).named("a"));
        builder.open(
            NodeSpec::new(NodeKind::Function, Span::new(2, 5, 12, 26))
                .named("f")
                .with_annotations(vec![Annotation::new("allow", ["dead_code"])]),
        );
        builder.leaf(NodeSpec::new(NodeKind::Parameter, Span::new(2, 10, 17, 22)).named("x"));
        builder.close();
        builder.close();
        builder.build()
    }

    #[test]
    fn preorder_visits_in_source_order() {
        let tree = sample();
        let kinds: Vec<NodeKind> = tree.preorder().map(|n| n.kind()).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::File, NodeKind::Module, NodeKind::Function, NodeKind::Parameter]
        );
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn ancestors_walk_up_to_root() {
        let tree = sample();
        let param = tree.preorder().find(|n| n.kind() == NodeKind::Parameter).unwrap();
        let names: Vec<Option<&str>> = param.ancestors().map(|n| n.name()).collect();
        assert_eq!(names, vec![Some("f"), Some("a"), Some("lib.rs")]);
        assert!(param.ancestors().last().unwrap().is_root());
    }

    #[test]
    fn text_and_location_follow_span() {
        let tree = sample();
        let function = tree.preorder().find(|n| n.kind() == NodeKind::Function).unwrap();
        assert_eq!(function.text(), "fn f(x: u8) {}");
        let location = function.location();
        assert_eq!((location.line, location.column), (2, 5));
        assert_eq!((location.offset, location.length), (12, 14));
        assert_eq!(function.annotations()[0].arguments, vec!["dead_code"]);
    }

    #[test]
    fn offsets_from_line_and_column() {
        let builder = TreeBuilder::new("x.rs", "line1\nline2\nline3");
        assert_eq!(builder.offset_for(1, 1), 0);
        assert_eq!(builder.offset_for(2, 1), 6);
        assert_eq!(builder.offset_for(2, 3), 8);
        assert_eq!(builder.offset_for(9, 1), 17);
    }

    #[test]
    fn simple_name_strips_path() {
        assert_eq!(Annotation::new("lintel::suppress", ["x"]).simple_name(), "suppress");
        assert_eq!(Annotation::new("Suppress", ["x"]).simple_name(), "Suppress");
    }
}
