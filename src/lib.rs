#![allow(clippy::module_inception)]

use std::fmt::Display;

use crate::errors::errors::{Error, ErrorTip};

pub mod ast;
pub mod compiler;
pub mod driver;
pub mod errors;
pub mod type_checker;

/// A source location as reported by the parser: 1-based row and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

impl Position {
    pub fn new(row: u32, col: u32) -> Self {
        Position { row, col }
    }

    /// Position used for nodes synthesized by the compiler and for backend failures.
    pub fn null() -> Self {
        Position { row: 0, col: 0 }
    }

    pub fn is_null(&self) -> bool {
        self.row == 0 && self.col == 0
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

pub fn display_error(error: &Error, file_name: &str) -> String {
    /*
        Error: UnknownIdentifier (Identifier `x` not declared)
        -> main.sl:20:9
    */

    let mut rendered = String::new();

    if let ErrorTip::None = error.get_tip() {
        rendered.push_str(&format!("Error: {}\n", error.get_error_name()));
    } else {
        rendered.push_str(&format!(
            "Error: {} ({})\n",
            error.get_error_name(),
            error.get_tip()
        ));
    }

    let position = error.get_position();
    if position.is_null() {
        rendered.push_str(&format!("-> {}\n", file_name));
    } else {
        rendered.push_str(&format!("-> {}:{}\n", file_name, position));
    }

    rendered
}
