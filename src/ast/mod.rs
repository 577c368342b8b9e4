/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: The `Node` capability trait, node kind tags, identifiers and blocks
/// - expressions: The closed set of expression variants
/// - statements: The closed set of statement variants and declarations
pub mod ast;
pub mod expressions;
pub mod statements;
