use serde_json::Value;

use crate::Position;

use super::ast::{child_prefix, dump_node, print_line, Block, Identifier, Node, NodeKind};

/// Binary operators understood by the code generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::Less
                | BinaryOperator::LessEqual
                | BinaryOperator::Greater
                | BinaryOperator::GreaterEqual
        )
    }

    /// Operators only defined on integers.
    pub fn is_bitwise(&self) -> bool {
        matches!(
            self,
            BinaryOperator::BitAnd
                | BinaryOperator::BitOr
                | BinaryOperator::BitXor
                | BinaryOperator::ShiftLeft
                | BinaryOperator::ShiftRight
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegerExpr {
    pub value: i64,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoubleExpr {
    pub value: f64,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringExpr {
    pub value: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub operator: BinaryOperator,
    pub right: Box<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpr {
    pub assignee: Identifier,
    pub value: Box<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Identifier,
    pub arguments: Vec<Expr>,
    pub position: Position,
}

/// `name[i][j]...`, one index per declared dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayIndex {
    pub array: Identifier,
    pub indices: Vec<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayAssignmentExpr {
    pub target: ArrayIndex,
    pub value: Box<Expr>,
    pub position: Position,
}

/// `base.member`, or `base.member[i]...` when the member is an array.
#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub base: Identifier,
    pub member: Identifier,
    pub index: Option<ArrayIndex>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructAssignmentExpr {
    pub target: StructMember,
    pub value: Box<Expr>,
    pub position: Position,
}

/// Expressions
///
/// Closed set of expression variants; the code generator matches on it
/// exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(IntegerExpr),
    Double(DoubleExpr),
    String(StringExpr),
    Identifier(Identifier),
    Binary(BinaryExpr),
    Assignment(AssignmentExpr),
    Call(CallExpr),
    ArrayIndex(ArrayIndex),
    ArrayAssignment(ArrayAssignmentExpr),
    StructMember(StructMember),
    StructAssignment(StructAssignmentExpr),
    Block(Block),
}

impl Expr {
    pub fn integer(value: i64, position: Position) -> Self {
        Expr::Integer(IntegerExpr { value, position })
    }

    pub fn double(value: f64, position: Position) -> Self {
        Expr::Double(DoubleExpr { value, position })
    }

    pub fn string(value: &str, position: Position) -> Self {
        Expr::String(StringExpr {
            value: value.to_string(),
            position,
        })
    }

    pub fn identifier(name: &str, position: Position) -> Self {
        Expr::Identifier(Identifier::new(name, position))
    }

    pub fn binary(left: Expr, operator: BinaryOperator, right: Expr, position: Position) -> Self {
        Expr::Binary(BinaryExpr {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            position,
        })
    }

    pub fn assign(name: &str, value: Expr, position: Position) -> Self {
        Expr::Assignment(AssignmentExpr {
            assignee: Identifier::new(name, position),
            value: Box::new(value),
            position,
        })
    }

    pub fn call(name: &str, arguments: Vec<Expr>, position: Position) -> Self {
        Expr::Call(CallExpr {
            callee: Identifier::new(name, position),
            arguments,
            position,
        })
    }

    pub fn index(name: &str, indices: Vec<Expr>, position: Position) -> Self {
        Expr::ArrayIndex(ArrayIndex {
            array: Identifier::new(name, position),
            indices,
            position,
        })
    }

    pub fn assign_index(name: &str, indices: Vec<Expr>, value: Expr, position: Position) -> Self {
        Expr::ArrayAssignment(ArrayAssignmentExpr {
            target: ArrayIndex {
                array: Identifier::new(name, position),
                indices,
                position,
            },
            value: Box::new(value),
            position,
        })
    }

    pub fn member(base: &str, member: &str, position: Position) -> Self {
        Expr::StructMember(StructMember {
            base: Identifier::new(base, position),
            member: Identifier::new(member, position),
            index: None,
            position,
        })
    }

    pub fn assign_member(base: &str, member: &str, value: Expr, position: Position) -> Self {
        Expr::StructAssignment(StructAssignmentExpr {
            target: StructMember {
                base: Identifier::new(base, position),
                member: Identifier::new(member, position),
                index: None,
                position,
            },
            value: Box::new(value),
            position,
        })
    }
}

impl Node for Expr {
    fn kind(&self) -> NodeKind {
        match self {
            Expr::Integer(_) => NodeKind::IntegerLiteral,
            Expr::Double(_) => NodeKind::FloatLiteral,
            Expr::String(_) => NodeKind::StringLiteral,
            Expr::Identifier(_) => NodeKind::Identifier,
            Expr::Binary(_) => NodeKind::BinaryOperator,
            Expr::Assignment(_) => NodeKind::Assignment,
            Expr::Call(_) => NodeKind::Call,
            Expr::ArrayIndex(_) => NodeKind::ArrayIndex,
            Expr::ArrayAssignment(_) => NodeKind::ArrayAssignment,
            Expr::StructMember(_) => NodeKind::StructMember,
            Expr::StructAssignment(_) => NodeKind::StructAssignment,
            Expr::Block(_) => NodeKind::Block,
        }
    }

    fn position(&self) -> Position {
        match self {
            Expr::Integer(expr) => expr.position,
            Expr::Double(expr) => expr.position,
            Expr::String(expr) => expr.position,
            Expr::Identifier(identifier) => identifier.position,
            Expr::Binary(expr) => expr.position,
            Expr::Assignment(expr) => expr.position,
            Expr::Call(expr) => expr.position,
            Expr::ArrayIndex(expr) => expr.position,
            Expr::ArrayAssignment(expr) => expr.position,
            Expr::StructMember(expr) => expr.position,
            Expr::StructAssignment(expr) => expr.position,
            Expr::Block(block) => block.position,
        }
    }

    fn print(&self, prefix: &str, out: &mut String) {
        let next = child_prefix(prefix);
        match self {
            Expr::Integer(expr) => print_line(out, prefix, self.kind(), &expr.value.to_string()),
            Expr::Double(expr) => print_line(out, prefix, self.kind(), &expr.value.to_string()),
            Expr::String(expr) => print_line(out, prefix, self.kind(), &expr.value),
            Expr::Identifier(identifier) => identifier.print(prefix, out),
            Expr::Binary(expr) => {
                print_line(out, prefix, self.kind(), expr.operator.symbol());
                expr.left.print(&next, out);
                expr.right.print(&next, out);
            }
            Expr::Assignment(expr) => {
                print_line(out, prefix, self.kind(), "");
                expr.assignee.print(&next, out);
                expr.value.print(&next, out);
            }
            Expr::Call(expr) => {
                print_line(out, prefix, self.kind(), "");
                expr.callee.print(&next, out);
                for argument in expr.arguments.iter() {
                    argument.print(&next, out);
                }
            }
            Expr::ArrayIndex(index) => index.print(prefix, out),
            Expr::ArrayAssignment(expr) => {
                print_line(out, prefix, self.kind(), "");
                expr.target.print(&next, out);
                expr.value.print(&next, out);
            }
            Expr::StructMember(member) => member.print(prefix, out),
            Expr::StructAssignment(expr) => {
                print_line(out, prefix, self.kind(), "");
                expr.target.print(&next, out);
                expr.value.print(&next, out);
            }
            Expr::Block(block) => block.print(prefix, out),
        }
    }

    fn dump(&self) -> Value {
        match self {
            Expr::Integer(expr) => dump_node(self.kind(), &expr.value.to_string(), vec![]),
            Expr::Double(expr) => dump_node(self.kind(), &expr.value.to_string(), vec![]),
            Expr::String(expr) => dump_node(self.kind(), &expr.value, vec![]),
            Expr::Identifier(identifier) => identifier.dump(),
            Expr::Binary(expr) => dump_node(
                self.kind(),
                expr.operator.symbol(),
                vec![expr.left.dump(), expr.right.dump()],
            ),
            Expr::Assignment(expr) => dump_node(
                self.kind(),
                "",
                vec![expr.assignee.dump(), expr.value.dump()],
            ),
            Expr::Call(expr) => {
                let mut children = vec![expr.callee.dump()];
                children.extend(expr.arguments.iter().map(|argument| argument.dump()));
                dump_node(self.kind(), "", children)
            }
            Expr::ArrayIndex(index) => index.dump(),
            Expr::ArrayAssignment(expr) => {
                dump_node(self.kind(), "", vec![expr.target.dump(), expr.value.dump()])
            }
            Expr::StructMember(member) => member.dump(),
            Expr::StructAssignment(expr) => {
                dump_node(self.kind(), "", vec![expr.target.dump(), expr.value.dump()])
            }
            Expr::Block(block) => block.dump(),
        }
    }
}

impl Node for ArrayIndex {
    fn kind(&self) -> NodeKind {
        NodeKind::ArrayIndex
    }
    fn position(&self) -> Position {
        self.position
    }
    fn print(&self, prefix: &str, out: &mut String) {
        print_line(out, prefix, self.kind(), "");
        let next = child_prefix(prefix);
        self.array.print(&next, out);
        for index in self.indices.iter() {
            index.print(&next, out);
        }
    }
    fn dump(&self) -> Value {
        let mut children = vec![self.array.dump()];
        children.extend(self.indices.iter().map(|index| index.dump()));
        dump_node(self.kind(), "", children)
    }
}

impl Node for StructMember {
    fn kind(&self) -> NodeKind {
        NodeKind::StructMember
    }
    fn position(&self) -> Position {
        self.position
    }
    fn print(&self, prefix: &str, out: &mut String) {
        print_line(out, prefix, self.kind(), "");
        let next = child_prefix(prefix);
        self.base.print(&next, out);
        self.member.print(&next, out);
        if let Some(index) = &self.index {
            index.print(&next, out);
        }
    }
    fn dump(&self) -> Value {
        let mut children = vec![self.base.dump(), self.member.dump()];
        if let Some(index) = &self.index {
            children.push(index.dump());
        }
        dump_node(self.kind(), "", children)
    }
}
