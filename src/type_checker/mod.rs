//! Type system and symbol resolution.
//!
//! This module holds everything the code generator consults to give meaning
//! to names and values:
//!
//! - The type lattice and the implicit conversion policy
//! - The struct registry with member layouts
//! - The stack of lexical scopes used to resolve identifiers
//! - Compile-time evaluation of constant expressions

pub mod const_eval;
pub mod environment;
pub mod type_checker;
pub mod types;

#[cfg(test)]
mod tests;
