//! Unit tests for scopes, coercions, struct layout and constant folding.

use crate::{
    ast::{
        ast::Identifier,
        expressions::{BinaryOperator, Expr},
    },
    Position,
};

use super::{
    const_eval::{eval_const_expr, eval_const_extent, ConstValue},
    environment::{EnvironmentKind, ScopeTable},
    type_checker::{element_count, TypeChecker},
    types::{Coercion, Type},
};

fn pos() -> Position {
    Position::new(1, 1)
}

#[test]
fn test_declare_and_resolve() {
    let mut scopes: ScopeTable<u32> = ScopeTable::new();
    scopes.declare("x", 1, Type::Integer, pos()).unwrap();

    let binding = scopes.resolve("x", pos()).unwrap();
    assert_eq!(binding.storage, 1);
    assert_eq!(binding.binding_type, Type::Integer);
}

#[test]
fn test_duplicate_in_same_scope() {
    let mut scopes: ScopeTable<u32> = ScopeTable::new();
    scopes.declare("x", 1, Type::Integer, pos()).unwrap();

    let error = scopes
        .declare("x", 2, Type::Float, Position::new(2, 5))
        .unwrap_err();
    assert_eq!(error.get_error_name(), "DuplicateDeclaration");
    assert_eq!(error.get_position().row, 2);
}

#[test]
fn test_shadowing_and_restore() {
    let mut scopes: ScopeTable<u32> = ScopeTable::new();
    scopes.declare("x", 1, Type::Integer, pos()).unwrap();

    scopes.push(EnvironmentKind::Function);
    scopes.push(EnvironmentKind::Block);
    // Visible from a nested scope
    assert_eq!(scopes.resolve("x", pos()).unwrap().storage, 1);

    scopes.declare("x", 2, Type::Float, pos()).unwrap();
    assert_eq!(scopes.resolve("x", pos()).unwrap().storage, 2);
    assert_eq!(scopes.resolve("x", pos()).unwrap().binding_type, Type::Float);

    scopes.pop();
    assert_eq!(scopes.resolve("x", pos()).unwrap().storage, 1);
    scopes.pop();
    assert!(scopes.is_global());
}

#[test]
fn test_unknown_identifier() {
    let mut scopes: ScopeTable<u32> = ScopeTable::new();
    scopes.push(EnvironmentKind::Block);
    scopes.declare("inner", 1, Type::Integer, pos()).unwrap();
    scopes.pop();

    let error = scopes.resolve("inner", Position::new(9, 3)).unwrap_err();
    assert_eq!(error.get_error_name(), "UnknownIdentifier");
    assert_eq!(*error.get_position(), Position::new(9, 3));
}

#[test]
fn test_global_scope_is_never_popped() {
    let mut scopes: ScopeTable<u32> = ScopeTable::new();
    assert!(scopes.pop().is_none());
    assert_eq!(scopes.depth(), 1);
}

#[test]
fn test_coercion_rules() {
    assert_eq!(Type::Integer.coerce_to(&Type::Float), Some(Coercion::IntToFloat));
    assert_eq!(Type::Integer.coerce_to(&Type::Integer), Some(Coercion::None));
    assert_eq!(Type::Boolean.coerce_to(&Type::Integer), Some(Coercion::BoolToInt));
    assert_eq!(Type::Float.coerce_to(&Type::Integer), None);
    assert_eq!(Type::Void.coerce_to(&Type::Void), None);
    assert_eq!(
        Type::Struct("Point".to_string()).coerce_to(&Type::Struct("Vec".to_string())),
        None
    );
}

#[test]
fn test_array_compatibility() {
    let two_dims = Type::array(Type::Integer, 2);
    assert_eq!(two_dims.coerce_to(&Type::array(Type::Integer, 2)), Some(Coercion::None));
    assert_eq!(two_dims.coerce_to(&Type::array(Type::Integer, 1)), None);
    assert_eq!(two_dims.coerce_to(&Type::array(Type::Float, 2)), None);
}

#[test]
fn test_unify_arithmetic() {
    assert_eq!(
        Type::unify_arithmetic(&Type::Integer, &Type::Float),
        Some(Type::Float)
    );
    assert_eq!(
        Type::unify_arithmetic(&Type::Integer, &Type::Boolean),
        Some(Type::Integer)
    );
    assert_eq!(Type::unify_arithmetic(&Type::String, &Type::Integer), None);
}

#[test]
fn test_bitwise_on_float_is_mismatch() {
    let checker = TypeChecker::new();
    let error = checker
        .check_binary(BinaryOperator::BitAnd, &Type::Float, &Type::Integer, pos())
        .unwrap_err();
    assert_eq!(error.get_error_name(), "TypeMismatch");
}

#[test]
fn test_resolve_types() {
    let mut checker = TypeChecker::new();
    assert_eq!(
        checker.resolve_type(&Identifier::type_name("int", pos())).unwrap(),
        Type::Integer
    );
    assert_eq!(
        checker.resolve_type(&Identifier::type_name("float", pos())).unwrap(),
        Type::Float
    );

    let error = checker
        .resolve_type(&Identifier::type_name("Point", pos()))
        .unwrap_err();
    assert_eq!(error.get_error_name(), "UnknownType");

    checker
        .declare_struct(&Identifier::type_name("Point", pos()), vec![])
        .unwrap();
    assert_eq!(
        checker.resolve_type(&Identifier::type_name("Point", pos())).unwrap(),
        Type::Struct("Point".to_string())
    );

    let matrix = Identifier::array_type(
        "double",
        vec![Expr::integer(2, pos()), Expr::integer(3, pos())],
        pos(),
    );
    assert_eq!(checker.resolve_type(&matrix).unwrap(), Type::array(Type::Float, 2));
}

#[test]
fn test_struct_layout_offsets() {
    let mut checker = TypeChecker::new();
    let layout = checker
        .declare_struct(
            &Identifier::type_name("Shape", pos()),
            vec![
                (Identifier::new("id", pos()), Type::Integer, vec![]),
                (Identifier::new("points", pos()), Type::array(Type::Float, 1), vec![4]),
                (Identifier::new("scale", pos()), Type::Float, vec![]),
            ],
        )
        .unwrap()
        .clone();

    let offsets: Vec<u64> = layout.members.iter().map(|member| member.byte_offset).collect();
    assert_eq!(offsets, vec![0, 8, 40]);
    assert_eq!(layout.size, 48);
    assert_eq!(layout.member("scale").map(|member| member.index), Some(2));

    let error = checker
        .member("Shape", &Identifier::new("z", pos()))
        .unwrap_err();
    assert_eq!(error.get_error_name(), "UnknownMember");
}

#[test]
fn test_struct_duplicate_member() {
    let mut checker = TypeChecker::new();
    let error = checker
        .declare_struct(
            &Identifier::type_name("Point", pos()),
            vec![
                (Identifier::new("x", pos()), Type::Integer, vec![]),
                (Identifier::new("x", Position::new(3, 9)), Type::Integer, vec![]),
            ],
        )
        .unwrap_err();
    assert_eq!(error.get_error_name(), "DuplicateDeclaration");
    assert_eq!(error.get_position().row, 3);
}

#[test]
fn test_element_count_limits() {
    assert_eq!(element_count("grid", &[3, 4], pos()).unwrap(), 12);
    assert_eq!(element_count("big", &[u32::MAX as u64], pos()).unwrap(), u32::MAX);

    let error = element_count("wide", &[4294967297], Position::new(2, 4)).unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidArraySize");
    assert_eq!(*error.get_position(), Position::new(2, 4));

    let error = element_count("huge", &[i64::MAX as u64, 4], pos()).unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidArraySize");
}

#[test]
fn test_struct_size_overflow() {
    let mut checker = TypeChecker::new();
    let error = checker
        .declare_struct(
            &Identifier::type_name("Huge", pos()),
            vec![(
                Identifier::new("cells", Position::new(2, 9)),
                Type::array(Type::Integer, 1),
                vec![u64::MAX / 4],
            )],
        )
        .unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidArraySize");
    assert_eq!(error.get_position().row, 2);
}

#[test]
fn test_const_eval() {
    let expr = Expr::binary(
        Expr::integer(3, pos()),
        BinaryOperator::Multiply,
        Expr::binary(
            Expr::integer(2, pos()),
            BinaryOperator::Plus,
            Expr::integer(1, pos()),
            pos(),
        ),
        pos(),
    );
    assert_eq!(eval_const_expr(&expr), Some(ConstValue::Integer(9)));
    assert_eq!(eval_const_extent(&expr), Some(9));

    let mixed = Expr::binary(
        Expr::integer(1, pos()),
        BinaryOperator::Plus,
        Expr::double(0.5, pos()),
        pos(),
    );
    assert_eq!(eval_const_expr(&mixed), Some(ConstValue::Float(1.5)));
    assert_eq!(eval_const_extent(&mixed), None);

    let division_by_zero = Expr::binary(
        Expr::integer(1, pos()),
        BinaryOperator::Divide,
        Expr::integer(0, pos()),
        pos(),
    );
    assert_eq!(eval_const_expr(&division_by_zero), None);
    assert_eq!(eval_const_expr(&Expr::identifier("n", pos())), None);
}
