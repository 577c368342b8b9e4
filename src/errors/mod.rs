//! Error types and error handling for the compiler.
//!
//! This module defines the error types used throughout code generation.
//! It includes:
//!
//! - Error structures with source position information
//! - Specific error variants for resolution, typing and emission failures
//! - Error formatting and display functionality
//! - Helpful error messages and suggestions

pub mod errors;

#[cfg(test)]
mod tests;
