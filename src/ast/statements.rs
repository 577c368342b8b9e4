use serde_json::Value;

use crate::Position;

use super::{
    ast::{child_prefix, dump_node, print_line, Block, Identifier, Node, NodeKind},
    expressions::Expr,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStmt {
    /// `None` for an empty statement (`;`).
    pub expression: Option<Expr>,
    pub position: Position,
}

/// `type name [= value]`
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    pub var_type: Identifier,
    pub identifier: Identifier,
    pub assigned_value: Option<Expr>,
    pub position: Position,
}

impl VariableDeclaration {
    /// # Panics
    ///
    /// Panics if `var_type` is not a type identifier, or is an array type
    /// without sizes.
    pub fn new(var_type: Identifier, identifier: Identifier, assigned_value: Option<Expr>) -> Self {
        assert!(var_type.is_type, "`{}` is not a type", var_type.name);
        assert!(
            !var_type.is_array || !var_type.array_size.is_empty(),
            "array type `{}` without sizes",
            var_type.name
        );

        VariableDeclaration {
            position: identifier.position,
            var_type,
            identifier,
            assigned_value,
        }
    }
}

/// `type name[n] = { values... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInitialization {
    pub declaration: VariableDeclaration,
    pub values: Vec<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub return_type: Identifier,
    pub identifier: Identifier,
    pub parameters: Vec<VariableDeclaration>,
    pub body: Option<Block>,
    pub is_external: bool,
    /// Only meaningful for external declarations.
    pub is_variadic: bool,
    pub position: Position,
}

impl FunctionDeclaration {
    /// # Panics
    ///
    /// Panics if `return_type` is not a type identifier.
    pub fn new(
        return_type: Identifier,
        identifier: Identifier,
        parameters: Vec<VariableDeclaration>,
        body: Block,
    ) -> Self {
        assert!(return_type.is_type, "`{}` is not a type", return_type.name);
        FunctionDeclaration {
            position: identifier.position,
            return_type,
            identifier,
            parameters,
            body: Some(body),
            is_external: false,
            is_variadic: false,
        }
    }

    /// A body-less signature for a function linked in from elsewhere.
    pub fn external(
        return_type: Identifier,
        identifier: Identifier,
        parameters: Vec<VariableDeclaration>,
        is_variadic: bool,
    ) -> Self {
        assert!(return_type.is_type, "`{}` is not a type", return_type.name);
        FunctionDeclaration {
            position: identifier.position,
            return_type,
            identifier,
            parameters,
            body: None,
            is_external: true,
            is_variadic,
        }
    }
}

/// Member order is layout order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDeclaration {
    pub name: Identifier,
    pub members: Vec<VariableDeclaration>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_body: Block,
    pub else_body: Option<Block>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    /// Expression statement or variable declaration, scoped to the loop.
    pub initial: Option<Box<Stmt>>,
    /// A missing condition loops forever.
    pub condition: Option<Expr>,
    pub increment: Option<Expr>,
    pub body: Block,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expression(ExpressionStmt),
    VariableDeclaration(VariableDeclaration),
    ArrayInitialization(ArrayInitialization),
    FunctionDeclaration(FunctionDeclaration),
    StructDeclaration(StructDeclaration),
    Return(ReturnStmt),
    If(IfStmt),
    For(ForStmt),
}

/// A statement together with the flags every statement carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    /// Set for top-level declarations; selects process-lifetime storage.
    pub is_global: bool,
    /// For loops: run the body once before the condition is first tested.
    pub at_least_once: bool,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Stmt {
            kind,
            is_global: false,
            at_least_once: false,
        }
    }

    pub fn expression(expression: Expr) -> Self {
        Stmt::new(StmtKind::Expression(ExpressionStmt {
            position: expression.position(),
            expression: Some(expression),
        }))
    }

    pub fn ret(value: Option<Expr>, position: Position) -> Self {
        Stmt::new(StmtKind::Return(ReturnStmt { value, position }))
    }

    /// The same statement marked as a top-level declaration.
    pub fn into_global(mut self) -> Self {
        self.is_global = true;
        self
    }

    pub fn statement_name(&self) -> &'static str {
        self.kind().as_str()
    }
}

impl From<VariableDeclaration> for Stmt {
    fn from(declaration: VariableDeclaration) -> Self {
        Stmt::new(StmtKind::VariableDeclaration(declaration))
    }
}

impl From<ArrayInitialization> for Stmt {
    fn from(initialization: ArrayInitialization) -> Self {
        Stmt::new(StmtKind::ArrayInitialization(initialization))
    }
}

impl From<FunctionDeclaration> for Stmt {
    fn from(declaration: FunctionDeclaration) -> Self {
        Stmt::new(StmtKind::FunctionDeclaration(declaration))
    }
}

impl From<StructDeclaration> for Stmt {
    fn from(declaration: StructDeclaration) -> Self {
        Stmt::new(StmtKind::StructDeclaration(declaration))
    }
}

impl From<IfStmt> for Stmt {
    fn from(if_stmt: IfStmt) -> Self {
        Stmt::new(StmtKind::If(if_stmt))
    }
}

impl From<ForStmt> for Stmt {
    fn from(for_stmt: ForStmt) -> Self {
        Stmt::new(StmtKind::For(for_stmt))
    }
}

fn global_marker(is_global: bool) -> &'static str {
    if is_global {
        "[global]"
    } else {
        ""
    }
}

impl Node for VariableDeclaration {
    fn kind(&self) -> NodeKind {
        NodeKind::VariableDeclaration
    }
    fn position(&self) -> Position {
        self.position
    }
    fn print(&self, prefix: &str, out: &mut String) {
        print_line(out, prefix, self.kind(), "");
        print_declaration_children(self, &child_prefix(prefix), out);
    }
    fn dump(&self) -> Value {
        dump_node(self.kind(), "", declaration_children(self))
    }
}

fn print_declaration_children(declaration: &VariableDeclaration, prefix: &str, out: &mut String) {
    declaration.var_type.print(prefix, out);
    declaration.identifier.print(prefix, out);
    if let Some(value) = &declaration.assigned_value {
        value.print(prefix, out);
    }
}

fn declaration_children(declaration: &VariableDeclaration) -> Vec<Value> {
    let mut children = vec![declaration.var_type.dump(), declaration.identifier.dump()];
    if let Some(value) = &declaration.assigned_value {
        children.push(value.dump());
    }
    children
}

impl Node for FunctionDeclaration {
    fn kind(&self) -> NodeKind {
        NodeKind::FunctionDeclaration
    }
    fn position(&self) -> Position {
        self.position
    }
    fn print(&self, prefix: &str, out: &mut String) {
        let detail = if self.is_external { "[extern]" } else { "" };
        print_line(out, prefix, self.kind(), detail);

        let next = child_prefix(prefix);
        self.return_type.print(&next, out);
        self.identifier.print(&next, out);
        for parameter in self.parameters.iter() {
            parameter.print(&next, out);
        }
        if let Some(body) = &self.body {
            body.print(&next, out);
        }
    }
    fn dump(&self) -> Value {
        let mut children = vec![self.return_type.dump(), self.identifier.dump()];
        children.extend(self.parameters.iter().map(|parameter| parameter.dump()));
        if let Some(body) = &self.body {
            children.push(body.dump());
        }
        let detail = if self.is_external { "extern" } else { "" };
        dump_node(self.kind(), detail, children)
    }
}

impl Node for StructDeclaration {
    fn kind(&self) -> NodeKind {
        NodeKind::StructDeclaration
    }
    fn position(&self) -> Position {
        self.position
    }
    fn print(&self, prefix: &str, out: &mut String) {
        print_line(out, prefix, self.kind(), &self.name.name);
        let next = child_prefix(prefix);
        for member in self.members.iter() {
            member.print(&next, out);
        }
    }
    fn dump(&self) -> Value {
        dump_node(
            self.kind(),
            &self.name.name,
            self.members.iter().map(|member| member.dump()).collect(),
        )
    }
}

impl Node for Stmt {
    fn kind(&self) -> NodeKind {
        match &self.kind {
            StmtKind::Expression(_) => NodeKind::ExpressionStatement,
            StmtKind::VariableDeclaration(_) => NodeKind::VariableDeclaration,
            StmtKind::ArrayInitialization(_) => NodeKind::ArrayInitialization,
            StmtKind::FunctionDeclaration(_) => NodeKind::FunctionDeclaration,
            StmtKind::StructDeclaration(_) => NodeKind::StructDeclaration,
            StmtKind::Return(_) => NodeKind::Return,
            StmtKind::If(_) => NodeKind::If,
            StmtKind::For(_) => NodeKind::For,
        }
    }

    fn position(&self) -> Position {
        match &self.kind {
            StmtKind::Expression(stmt) => stmt.position,
            StmtKind::VariableDeclaration(stmt) => stmt.position,
            StmtKind::ArrayInitialization(stmt) => stmt.position,
            StmtKind::FunctionDeclaration(stmt) => stmt.position,
            StmtKind::StructDeclaration(stmt) => stmt.position,
            StmtKind::Return(stmt) => stmt.position,
            StmtKind::If(stmt) => stmt.position,
            StmtKind::For(stmt) => stmt.position,
        }
    }

    fn print(&self, prefix: &str, out: &mut String) {
        let next = child_prefix(prefix);
        match &self.kind {
            StmtKind::Expression(stmt) => {
                print_line(out, prefix, self.kind(), "");
                if let Some(expression) = &stmt.expression {
                    expression.print(&next, out);
                }
            }
            StmtKind::VariableDeclaration(declaration) => {
                print_line(out, prefix, self.kind(), global_marker(self.is_global));
                print_declaration_children(declaration, &next, out);
            }
            StmtKind::ArrayInitialization(initialization) => {
                print_line(out, prefix, self.kind(), global_marker(self.is_global));
                initialization.declaration.print(&next, out);
                for value in initialization.values.iter() {
                    value.print(&next, out);
                }
            }
            StmtKind::FunctionDeclaration(declaration) => declaration.print(prefix, out),
            StmtKind::StructDeclaration(declaration) => declaration.print(prefix, out),
            StmtKind::Return(stmt) => {
                print_line(out, prefix, self.kind(), "");
                if let Some(value) = &stmt.value {
                    value.print(&next, out);
                }
            }
            StmtKind::If(stmt) => {
                print_line(out, prefix, self.kind(), "");
                stmt.condition.print(&next, out);
                stmt.then_body.print(&next, out);
                if let Some(else_body) = &stmt.else_body {
                    else_body.print(&next, out);
                }
            }
            StmtKind::For(stmt) => {
                print_line(out, prefix, self.kind(), "");
                if let Some(initial) = &stmt.initial {
                    initial.print(&next, out);
                }
                if let Some(condition) = &stmt.condition {
                    condition.print(&next, out);
                }
                if let Some(increment) = &stmt.increment {
                    increment.print(&next, out);
                }
                stmt.body.print(&next, out);
            }
        }
    }

    fn dump(&self) -> Value {
        match &self.kind {
            StmtKind::Expression(stmt) => dump_node(
                self.kind(),
                "",
                stmt.expression.iter().map(|expression| expression.dump()).collect(),
            ),
            StmtKind::VariableDeclaration(declaration) => {
                let detail = if self.is_global { "global" } else { "" };
                dump_node(self.kind(), detail, declaration_children(declaration))
            }
            StmtKind::ArrayInitialization(initialization) => {
                let mut children = vec![initialization.declaration.dump()];
                children.extend(initialization.values.iter().map(|value| value.dump()));
                let detail = if self.is_global { "global" } else { "" };
                dump_node(self.kind(), detail, children)
            }
            StmtKind::FunctionDeclaration(declaration) => declaration.dump(),
            StmtKind::StructDeclaration(declaration) => declaration.dump(),
            StmtKind::Return(stmt) => dump_node(
                self.kind(),
                "",
                stmt.value.iter().map(|value| value.dump()).collect(),
            ),
            StmtKind::If(stmt) => {
                let mut children = vec![stmt.condition.dump(), stmt.then_body.dump()];
                if let Some(else_body) = &stmt.else_body {
                    children.push(else_body.dump());
                }
                dump_node(self.kind(), "", children)
            }
            StmtKind::For(stmt) => {
                let mut children = vec![];
                if let Some(initial) = &stmt.initial {
                    children.push(initial.dump());
                }
                if let Some(condition) = &stmt.condition {
                    children.push(condition.dump());
                }
                if let Some(increment) = &stmt.increment {
                    children.push(increment.dump());
                }
                children.push(stmt.body.dump());
                dump_node(self.kind(), "", children)
            }
        }
    }
}
