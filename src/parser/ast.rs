// AST (Abstract Syntax Tree) definitions for the Cinder compiler

use std::fmt;

/// Index of a node inside its [`Ast`] arena
pub type NodeId = usize;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The four scalar kinds of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Num,
    Rnum,
    Bool,
    Str,
}

impl Scalar {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "num" => Some(Scalar::Num),
            "rnum" => Some(Scalar::Rnum),
            "bool" => Some(Scalar::Bool),
            "str" => Some(Scalar::Str),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Scalar::Num => "num",
            Scalar::Rnum => "rnum",
            Scalar::Bool => "bool",
            Scalar::Str => "str",
        }
    }
}

/// Declared type of a variable, parameter or function result.
///
/// `Void` is only produced for function return types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Scalar(Scalar),
    Pointer(Scalar),
    Array(Scalar),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Scalar(s) => write!(f, "{}", s.keyword()),
            Type::Pointer(s) => write!(f, "ptr {}", s.keyword()),
            Type::Array(s) => write!(f, "array<{}>", s.keyword()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Number,
    Float,
    String,
    Char,
    Boolean,
}

/// Closed set of node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    Function(Type),
    Parameter(Type),

    // Expressions
    Identifier,
    Literal(LiteralKind),
    Operator,
    Delimiter,
    Comma,
    FunctionCall,

    // Statements
    Assignment,
    Declaration(Type),
    If,
    ElseIf,
    Else,
    While,
    Loop,
    For,
    Match,
    Case,
    Default,
    Break,
    Continue,
    Return,
    PostfixOrPrefix,

    // Scope markers
    BodyStart,
    BodyEnd,

    // Diagnostic markers
    Unsafe,
    Breakpoint,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub content: String,
    pub location: SourceLocation,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Arena-backed tree. Node 0 is always the `Program` root.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Ast {
            nodes: vec![Node {
                kind: NodeKind::Program,
                content: String::new(),
                location: SourceLocation::new(1, 1),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // the root always exists
        false
    }

    /// Create a node that has no parent yet.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        content: impl Into<String>,
        location: SourceLocation,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            content: content.into(),
            location,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a node as the last child of `parent`.
    pub fn append_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        content: impl Into<String>,
        location: SourceLocation,
    ) -> NodeId {
        let id = self.add_node(kind, content, location);
        self.nodes[id].parent = Some(parent);
        self.nodes[parent].children.push(id);
        id
    }

    /// Move `node` (with its subtree) to the end of `new_parent`'s children.
    ///
    /// Returns `false` and leaves the tree untouched when the move would
    /// create a cycle (`new_parent` is `node` or one of its descendants).
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> bool {
        if node == Self::ROOT || self.is_ancestor(node, new_parent) {
            return false;
        }

        self.detach(node);
        self.nodes[node].parent = Some(new_parent);
        self.nodes[new_parent].children.push(node);
        true
    }

    /// Remove `node` from its parent's child list. The subtree stays in the
    /// arena and can be reattached later.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|&child| child != node);
        }
    }

    /// Whether `ancestor` is `node` or lies on its parent chain.
    pub fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id].kind
    }

    pub fn content(&self, id: NodeId) -> &str {
        &self.nodes[id].content
    }

    pub fn location(&self, id: NodeId) -> SourceLocation {
        self.nodes[id].location
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].children.last().copied()
    }

    /// Pre-order walk of `id`'s subtree, `id` included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            order.push(next);
            pending.extend(self.nodes[next].children.iter().rev());
        }
        order
    }

    /// Indented one-node-per-line rendering of the tree, used by `--dump-ast`.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(Self::ROOT, 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = &self.nodes[id];
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{:?}", node.kind));
        if !node.content.is_empty() {
            out.push_str(&format!(" {:?}", node.content));
        }
        out.push_str(&format!(" @{}\n", node.location));
        for &child in &node.children {
            self.dump_node(child, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 1)
    }

    #[test]
    fn test_append_child_sets_parent() {
        let mut ast = Ast::new();
        let f = ast.append_child(Ast::ROOT, NodeKind::Function(Type::Void), "main", loc());

        assert_eq!(ast.parent(f), Some(Ast::ROOT));
        assert_eq!(ast.children(Ast::ROOT), &[f]);
    }

    #[test]
    fn test_reparent_moves_node_once() {
        let mut ast = Ast::new();
        let p1 = ast.append_child(Ast::ROOT, NodeKind::Return, "", loc());
        let p2 = ast.append_child(Ast::ROOT, NodeKind::Return, "", loc());
        let x = ast.append_child(p1, NodeKind::Identifier, "x", loc());
        let y = ast.append_child(p2, NodeKind::Identifier, "y", loc());

        assert!(ast.reparent(x, p2));

        assert_eq!(ast.children(p2), &[y, x]);
        assert!(ast.children(p1).is_empty());
        assert_eq!(ast.parent(x), Some(p2));
        let owners = (0..ast.len())
            .filter(|&id| ast.children(id).contains(&x))
            .count();
        assert_eq!(owners, 1);
    }

    #[test]
    fn test_reparent_detached_node() {
        let mut ast = Ast::new();
        let owner = ast.append_child(Ast::ROOT, NodeKind::Return, "", loc());
        let lit = ast.add_node(NodeKind::Literal(LiteralKind::Number), "1", loc());

        assert_eq!(ast.parent(lit), None);
        assert!(ast.reparent(lit, owner));
        assert_eq!(ast.children(owner), &[lit]);
    }

    #[test]
    fn test_reparent_refuses_cycles() {
        let mut ast = Ast::new();
        let op = ast.append_child(Ast::ROOT, NodeKind::Operator, "+", loc());
        let lhs = ast.append_child(op, NodeKind::Identifier, "a", loc());

        assert!(!ast.reparent(op, lhs));
        assert!(!ast.reparent(op, op));
        assert!(!ast.reparent(Ast::ROOT, op));
        assert_eq!(ast.parent(op), Some(Ast::ROOT));
        assert_eq!(ast.children(op), &[lhs]);
    }

    #[test]
    fn test_descendants_preorder() {
        let mut ast = Ast::new();
        let op = ast.append_child(Ast::ROOT, NodeKind::Operator, "+", loc());
        let a = ast.append_child(op, NodeKind::Identifier, "a", loc());
        let b = ast.append_child(op, NodeKind::Identifier, "b", loc());

        assert_eq!(ast.descendants(op), vec![op, a, b]);
    }
}
