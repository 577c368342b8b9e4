//! Code generation module for the compiler.
//!
//! This module contains the LLVM-based code generator that walks the AST
//! and produces LLVM IR. It handles:
//!
//! - Compilation of expressions and statements
//! - Lowering of language types to LLVM types
//! - Storage for locals, globals, arrays and structs
//! - Function bodies and control flow

pub mod compiler;
pub mod expr;
pub mod stmt;

#[cfg(test)]
mod tests;
