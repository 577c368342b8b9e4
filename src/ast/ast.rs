use serde_json::{json, Value};

use crate::Position;

use super::{expressions::Expr, statements::Stmt};

pub(crate) const DELIMITER: &str = ":";
pub(crate) const INDENT: &str = "--";

/// Node Kinds
///
/// Stable tag for every node variant, used by the tree printer and the
/// structured dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    Identifier,
    BinaryOperator,
    Assignment,
    Call,
    ArrayIndex,
    ArrayAssignment,
    StructMember,
    StructAssignment,
    Block,
    ExpressionStatement,
    VariableDeclaration,
    ArrayInitialization,
    FunctionDeclaration,
    StructDeclaration,
    Return,
    If,
    For,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::IntegerLiteral => "IntegerLiteral",
            NodeKind::FloatLiteral => "FloatLiteral",
            NodeKind::StringLiteral => "StringLiteral",
            NodeKind::Identifier => "Identifier",
            NodeKind::BinaryOperator => "BinaryOperator",
            NodeKind::Assignment => "Assignment",
            NodeKind::Call => "Call",
            NodeKind::ArrayIndex => "ArrayIndex",
            NodeKind::ArrayAssignment => "ArrayAssignment",
            NodeKind::StructMember => "StructMember",
            NodeKind::StructAssignment => "StructAssignment",
            NodeKind::Block => "Block",
            NodeKind::ExpressionStatement => "ExpressionStatement",
            NodeKind::VariableDeclaration => "VariableDeclaration",
            NodeKind::ArrayInitialization => "ArrayInitialization",
            NodeKind::FunctionDeclaration => "FunctionDeclaration",
            NodeKind::StructDeclaration => "StructDeclaration",
            NodeKind::Return => "Return",
            NodeKind::If => "If",
            NodeKind::For => "For",
        }
    }
}

/// Node Trait
///
/// Diagnostic capabilities shared by every AST node. None of these perform
/// semantic checks; code generation lives in `crate::compiler`.
pub trait Node {
    /// Returns the kind tag of the node.
    fn kind(&self) -> NodeKind;
    /// Returns the source position of the node.
    fn position(&self) -> Position;
    /// Appends an indented tree rendering of the node to `out`.
    ///
    /// Children are rendered with `prefix` extended by `--`.
    fn print(&self, prefix: &str, out: &mut String);
    /// Returns a `{ "name": ..., "children": [...] }` tree for external tooling.
    fn dump(&self) -> Value;

    /// Renders the whole subtree starting with an empty prefix.
    fn to_tree_string(&self) -> String {
        let mut out = String::new();
        self.print("", &mut out);
        out
    }
}

pub(crate) fn print_line(out: &mut String, prefix: &str, kind: NodeKind, detail: &str) {
    out.push_str(prefix);
    out.push_str(kind.as_str());
    out.push_str(DELIMITER);
    out.push_str(detail);
    out.push('\n');
}

pub(crate) fn child_prefix(prefix: &str) -> String {
    format!("{}{}", prefix, INDENT)
}

pub(crate) fn dump_node(kind: NodeKind, detail: &str, children: Vec<Value>) -> Value {
    let name = if detail.is_empty() {
        kind.as_str().to_string()
    } else {
        format!("{}{}{}", kind.as_str(), DELIMITER, detail)
    };

    if children.is_empty() {
        json!({ "name": name })
    } else {
        json!({ "name": name, "children": children })
    }
}

/// A name, used both for values and for type references.
///
/// When `is_type` is set the identifier names a type (`int`, `Point`); when
/// `is_array` is also set it carries one size expression per dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub is_type: bool,
    pub is_array: bool,
    pub array_size: Vec<Expr>,
    pub position: Position,
}

impl Identifier {
    pub fn new(name: &str, position: Position) -> Self {
        Identifier {
            name: name.to_string(),
            is_type: false,
            is_array: false,
            array_size: vec![],
            position,
        }
    }

    pub fn type_name(name: &str, position: Position) -> Self {
        Identifier {
            is_type: true,
            ..Identifier::new(name, position)
        }
    }

    /// Creates an array type reference, `int[3][4]` is `array_type("int", [3, 4])`.
    ///
    /// # Panics
    ///
    /// Panics if `sizes` is empty.
    pub fn array_type(name: &str, sizes: Vec<Expr>, position: Position) -> Self {
        assert!(!sizes.is_empty(), "array type `{}` without sizes", name);
        Identifier {
            is_type: true,
            is_array: true,
            array_size: sizes,
            ..Identifier::new(name, position)
        }
    }
}

impl Node for Identifier {
    fn kind(&self) -> NodeKind {
        NodeKind::Identifier
    }
    fn position(&self) -> Position {
        self.position
    }
    fn print(&self, prefix: &str, out: &mut String) {
        let detail = if self.is_array {
            format!("{}(Array)", self.name)
        } else {
            self.name.clone()
        };
        print_line(out, prefix, self.kind(), &detail);

        let next = child_prefix(prefix);
        for size in self.array_size.iter() {
            size.print(&next, out);
        }
    }
    fn dump(&self) -> Value {
        let detail = if self.is_array {
            format!("{}(Array)", self.name)
        } else {
            self.name.clone()
        };
        dump_node(
            self.kind(),
            &detail,
            self.array_size.iter().map(|size| size.dump()).collect(),
        )
    }
}

/// An ordered statement sequence with its own lexical scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub position: Position,
}

impl Block {
    pub fn new(statements: Vec<Stmt>, position: Position) -> Self {
        Block {
            statements,
            position,
        }
    }
}

impl Node for Block {
    fn kind(&self) -> NodeKind {
        NodeKind::Block
    }
    fn position(&self) -> Position {
        self.position
    }
    fn print(&self, prefix: &str, out: &mut String) {
        print_line(out, prefix, self.kind(), "");
        let next = child_prefix(prefix);
        for statement in self.statements.iter() {
            statement.print(&next, out);
        }
    }
    fn dump(&self) -> Value {
        dump_node(
            self.kind(),
            "",
            self.statements.iter().map(|stmt| stmt.dump()).collect(),
        )
    }
}
