use std::fmt::Display;

use inkwell::builder::BuilderError;
use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_internal_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    /// Number of diagnostics this error stands for.
    ///
    /// Parse failures carry the count accumulated by the parser; every
    /// generation or emission error aborts the run and counts once.
    pub fn error_count(&self) -> usize {
        match &self.internal_error {
            ErrorImpl::ParseFailed { count } => *count,
            _ => 1,
        }
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnknownIdentifier { .. } => "UnknownIdentifier",
            ErrorImpl::DuplicateDeclaration { .. } => "DuplicateDeclaration",
            ErrorImpl::TypeMismatch { .. } => "TypeMismatch",
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::UnknownMember { .. } => "UnknownMember",
            ErrorImpl::ArityMismatch { .. } => "ArityMismatch",
            ErrorImpl::MissingReturn { .. } => "MissingReturn",
            ErrorImpl::NonConstantExpression { .. } => "NonConstantExpression",
            ErrorImpl::InvalidArraySize { .. } => "InvalidArraySize",
            ErrorImpl::MisplacedStatement { .. } => "MisplacedStatement",
            ErrorImpl::ParseFailed { .. } => "ParseFailed",
            ErrorImpl::Backend { .. } => "Backend",
            ErrorImpl::Emit { .. } => "Emit",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnknownIdentifier { name } => {
                ErrorTip::Suggestion(format!("Identifier `{}` not declared", name))
            }
            ErrorImpl::DuplicateDeclaration { name } => {
                ErrorTip::Suggestion(format!("`{}` already declared in this scope", name))
            }
            ErrorImpl::TypeMismatch { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::UnknownType { type_ } => {
                ErrorTip::Suggestion(format!("Unknown type `{}` found", type_))
            }
            ErrorImpl::UnknownMember { structure, member } => ErrorTip::Suggestion(format!(
                "Struct `{}` has no member `{}`",
                structure, member
            )),
            ErrorImpl::ArityMismatch {
                function,
                expected,
                received,
            } => ErrorTip::Suggestion(format!(
                "`{}` expects {} arguments, received {}",
                function, expected, received
            )),
            ErrorImpl::MissingReturn { function } => ErrorTip::Suggestion(format!(
                "Function `{}` can reach the end of its body without returning a value",
                function
            )),
            ErrorImpl::NonConstantExpression { context } => ErrorTip::Suggestion(format!(
                "{} must be a compile-time constant",
                context
            )),
            ErrorImpl::InvalidArraySize { message } => ErrorTip::Suggestion(message.clone()),
            ErrorImpl::MisplacedStatement { statement, scope } => ErrorTip::Suggestion(
                format!("`{}` is not allowed in {} scope", statement, scope),
            ),
            ErrorImpl::ParseFailed { .. } => ErrorTip::None,
            ErrorImpl::Backend { message } => ErrorTip::Suggestion(message.clone()),
            ErrorImpl::Emit { message } => ErrorTip::Suggestion(message.clone()),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.internal_error)
    }
}

impl std::error::Error for Error {}

impl From<BuilderError> for Error {
    fn from(error: BuilderError) -> Self {
        Error::new(
            ErrorImpl::Backend {
                message: error.to_string(),
            },
            Position::null(),
        )
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("unknown identifier {name:?}")]
    UnknownIdentifier { name: String },
    #[error("{name:?} already declared in this scope")]
    DuplicateDeclaration { name: String },
    #[error("type mismatch: expected {expected}, received {received}")]
    TypeMismatch { expected: String, received: String },
    #[error("unknown type {type_}")]
    UnknownType { type_: String },
    #[error("struct {structure:?} has no member {member:?}")]
    UnknownMember { structure: String, member: String },
    #[error("{function:?} expects {expected} arguments, received {received}")]
    ArityMismatch {
        function: String,
        expected: usize,
        received: usize,
    },
    #[error("function {function:?} does not return a value on every path")]
    MissingReturn { function: String },
    #[error("{context} is not a compile-time constant")]
    NonConstantExpression { context: String },
    #[error("invalid array size: {message}")]
    InvalidArraySize { message: String },
    #[error("{statement} is not allowed in {scope} scope")]
    MisplacedStatement { statement: String, scope: String },
    #[error("{count} parse errors")]
    ParseFailed { count: usize },
    #[error("backend error: {message}")]
    Backend { message: String },
    #[error("emission failed: {message}")]
    Emit { message: String },
}
