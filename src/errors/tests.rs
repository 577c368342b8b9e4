//! Unit tests for error handling.

use crate::errors::errors::{Error, ErrorImpl, ErrorTip};
use crate::Position;

#[test]
fn test_error_position() {
    let error = Error::new(
        ErrorImpl::UnknownIdentifier {
            name: "foo".to_string(),
        },
        Position::new(3, 7),
    );

    assert_eq!(error.get_position().row, 3);
    assert_eq!(error.get_position().col, 7);
    assert_eq!(error.get_error_name(), "UnknownIdentifier");
}

#[test]
fn test_duplicate_declaration_error() {
    let error = Error::new(
        ErrorImpl::DuplicateDeclaration {
            name: "x".to_string(),
        },
        Position::new(1, 1),
    );

    assert_eq!(error.get_error_name(), "DuplicateDeclaration");
    assert_eq!(
        error.get_tip().to_string(),
        "`x` already declared in this scope"
    );
}

#[test]
fn test_type_mismatch_error() {
    let error = Error::new(
        ErrorImpl::TypeMismatch {
            expected: "int".to_string(),
            received: "double".to_string(),
        },
        Position::new(1, 1),
    );

    assert_eq!(error.get_error_name(), "TypeMismatch");
    assert_eq!(
        error.to_string(),
        "type mismatch: expected int, received double"
    );
}

#[test]
fn test_arity_mismatch_error() {
    let error = Error::new(
        ErrorImpl::ArityMismatch {
            function: "add".to_string(),
            expected: 2,
            received: 3,
        },
        Position::new(1, 1),
    );

    assert_eq!(error.get_error_name(), "ArityMismatch");
    assert_eq!(
        error.get_tip().to_string(),
        "`add` expects 2 arguments, received 3"
    );
}

#[test]
fn test_missing_return_error() {
    let error = Error::new(
        ErrorImpl::MissingReturn {
            function: "f".to_string(),
        },
        Position::new(2, 1),
    );

    assert_eq!(error.get_error_name(), "MissingReturn");
}

#[test]
fn test_error_count() {
    let parse = Error::new(ErrorImpl::ParseFailed { count: 4 }, Position::null());
    assert_eq!(parse.error_count(), 4);
    assert!(matches!(parse.get_tip(), ErrorTip::None));

    let semantic = Error::new(
        ErrorImpl::UnknownType {
            type_: "Pointt".to_string(),
        },
        Position::new(1, 1),
    );
    assert_eq!(semantic.error_count(), 1);
}

#[test]
fn test_error_tip_display() {
    let tip = ErrorTip::Suggestion("Try this instead".to_string());
    assert_eq!(tip.to_string(), "Try this instead");

    let tip = ErrorTip::None;
    assert_eq!(tip.to_string(), "");
}
