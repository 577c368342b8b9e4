//! IR-level tests of the code generator.

use inkwell::context::Context;

use crate::{
    ast::{
        ast::{Block, Identifier},
        expressions::{BinaryOperator, Expr},
        statements::{
            ArrayInitialization, FunctionDeclaration, IfStmt, Stmt, StructDeclaration,
            VariableDeclaration,
        },
    },
    errors::errors::Error,
    Position,
};

use super::compiler::{compile, Compiler};

fn pos() -> Position {
    Position::new(1, 1)
}

fn ty(name: &str) -> Identifier {
    Identifier::type_name(name, pos())
}

fn var(type_name: &str, name: &str, value: Option<Expr>) -> VariableDeclaration {
    VariableDeclaration::new(ty(type_name), Identifier::new(name, pos()), value)
}

fn function(return_type: &str, name: &str, parameters: Vec<VariableDeclaration>, body: Vec<Stmt>) -> Stmt {
    FunctionDeclaration::new(
        ty(return_type),
        Identifier::new(name, pos()),
        parameters,
        Block::new(body, pos()),
    )
    .into()
}

fn program(statements: Vec<Stmt>) -> Block {
    Block::new(statements, pos())
}

fn generate<'a>(context: &'a Context, statements: Vec<Stmt>) -> Result<Compiler<'a>, Error> {
    compile(&program(statements), "test", context)
}

fn generate_error(statements: Vec<Stmt>) -> Error {
    let context = Context::create();
    let error = match generate(&context, statements) {
        Ok(_) => panic!("generation should fail"),
        Err(error) => error,
    };
    error
}

#[test]
fn test_global_initializer_is_constant() {
    let context = Context::create();
    let compiler = generate(
        &context,
        vec![
            Stmt::from(var(
                "int",
                "answer",
                Some(Expr::binary(
                    Expr::integer(6, pos()),
                    BinaryOperator::Multiply,
                    Expr::integer(7, pos()),
                    pos(),
                )),
            ))
            .into_global(),
            Stmt::from(var("double", "ratio", Some(Expr::integer(2, pos())))).into_global(),
        ],
    )
    .unwrap();

    compiler.verify().unwrap();
    let ir = compiler.print_ir();
    assert!(ir.contains("@answer = global i64 42"), "{}", ir);
    assert!(ir.contains("@ratio = global double 2.000000e+00"), "{}", ir);
}

#[test]
fn test_global_initializer_must_be_constant() {
    let error = generate_error(vec![
        Stmt::from(var("int", "a", Some(Expr::integer(1, pos())))).into_global(),
        Stmt::from(var("int", "b", Some(Expr::identifier("a", pos())))).into_global(),
    ]);
    assert_eq!(error.get_error_name(), "NonConstantExpression");
}

#[test]
fn test_external_declaration_has_no_body() {
    let context = Context::create();
    let compiler = generate(
        &context,
        vec![FunctionDeclaration::external(
            ty("double"),
            Identifier::new("sqrt", pos()),
            vec![var("double", "x", None)],
            false,
        )
        .into()],
    )
    .unwrap();

    let sqrt = compiler.module.get_function("sqrt").unwrap();
    assert_eq!(sqrt.count_basic_blocks(), 0);
    assert!(compiler.print_ir().contains("declare double @sqrt(double)"));
}

#[test]
fn test_forward_declaration_is_defined_later() {
    let context = Context::create();
    let compiler = generate(
        &context,
        vec![
            FunctionDeclaration::external(ty("int"), Identifier::new("one", pos()), vec![], false)
                .into(),
            function(
                "int",
                "two",
                vec![],
                vec![Stmt::ret(
                    Some(Expr::binary(
                        Expr::call("one", vec![], pos()),
                        BinaryOperator::Plus,
                        Expr::integer(1, pos()),
                        pos(),
                    )),
                    pos(),
                )],
            ),
            function("int", "one", vec![], vec![Stmt::ret(Some(Expr::integer(1, pos())), pos())]),
        ],
    )
    .unwrap();

    compiler.verify().unwrap();
    assert_eq!(
        compiler.module.get_function("one").unwrap().count_basic_blocks(),
        1
    );
}

#[test]
fn test_duplicate_function() {
    let error = generate_error(vec![
        function("void", "f", vec![], vec![]),
        function("void", "f", vec![], vec![]),
    ]);
    assert_eq!(error.get_error_name(), "DuplicateDeclaration");
}

#[test]
fn test_void_function_falls_through() {
    let context = Context::create();
    let compiler = generate(&context, vec![function("void", "noop", vec![], vec![])]).unwrap();

    compiler.verify().unwrap();
    assert!(compiler.print_ir().contains("ret void"));
}

#[test]
fn test_missing_return() {
    let error = generate_error(vec![function(
        "int",
        "f",
        vec![],
        vec![Stmt::expression(Expr::integer(1, pos()))],
    )]);
    assert_eq!(error.get_error_name(), "MissingReturn");
}

#[test]
fn test_code_after_return_is_still_checked() {
    let error = generate_error(vec![function(
        "int",
        "f",
        vec![],
        vec![
            Stmt::ret(Some(Expr::integer(1, pos())), pos()),
            Stmt::expression(Expr::identifier("missing", Position::new(4, 2))),
        ],
    )]);
    assert_eq!(error.get_error_name(), "UnknownIdentifier");
    assert_eq!(*error.get_position(), Position::new(4, 2));
}

#[test]
fn test_statement_after_return_in_branch() {
    // int pick(int c) { if (c) { return 1; c = 2; } else { return 2; } }
    let context = Context::create();
    let compiler = generate(
        &context,
        vec![function(
            "int",
            "pick",
            vec![var("int", "c", None)],
            vec![IfStmt {
                condition: Expr::identifier("c", pos()),
                then_body: Block::new(
                    vec![
                        Stmt::ret(Some(Expr::integer(1, pos())), pos()),
                        Stmt::expression(Expr::assign("c", Expr::integer(2, pos()), pos())),
                    ],
                    pos(),
                ),
                else_body: Some(Block::new(
                    vec![Stmt::ret(Some(Expr::integer(2, pos())), pos())],
                    pos(),
                )),
                position: pos(),
            }
            .into()],
        )],
    )
    .unwrap();

    compiler.verify().unwrap();
}

#[test]
fn test_branching_code_after_return() {
    let context = Context::create();
    let compiler = generate(
        &context,
        vec![function(
            "int",
            "f",
            vec![],
            vec![
                Stmt::ret(Some(Expr::integer(5, pos())), pos()),
                IfStmt {
                    condition: Expr::integer(1, pos()),
                    then_body: Block::new(vec![Stmt::expression(Expr::integer(0, pos()))], pos()),
                    else_body: None,
                    position: pos(),
                }
                .into(),
            ],
        )],
    )
    .unwrap();

    compiler.verify().unwrap();
    assert!(compiler.print_ir().contains("unreachable"));
}

#[test]
fn test_statement_placement() {
    let error = generate_error(vec![Stmt::expression(Expr::integer(1, pos()))]);
    assert_eq!(error.get_error_name(), "MisplacedStatement");

    let error = generate_error(vec![function(
        "void",
        "outer",
        vec![],
        vec![function("void", "inner", vec![], vec![])],
    )]);
    assert_eq!(error.get_error_name(), "MisplacedStatement");
}

#[test]
fn test_float_to_int_assignment() {
    let error = generate_error(vec![function(
        "void",
        "f",
        vec![],
        vec![var("int", "x", Some(Expr::double(1.5, Position::new(2, 13)))).into()],
    )]);
    assert_eq!(error.get_error_name(), "TypeMismatch");
    assert_eq!(error.get_position().col, 13);
}

#[test]
fn test_bare_return_in_non_void_function() {
    let error = generate_error(vec![function("int", "f", vec![], vec![Stmt::ret(None, pos())])]);
    assert_eq!(error.get_error_name(), "TypeMismatch");
}

#[test]
fn test_arity_mismatch() {
    let error = generate_error(vec![
        function(
            "int",
            "add",
            vec![var("int", "a", None), var("int", "b", None)],
            vec![Stmt::ret(Some(Expr::identifier("a", pos())), pos())],
        ),
        function(
            "int",
            "main",
            vec![],
            vec![Stmt::ret(
                Some(Expr::call("add", vec![Expr::integer(1, pos())], pos())),
                pos(),
            )],
        ),
    ]);
    assert_eq!(error.get_error_name(), "ArityMismatch");
}

#[test]
fn test_index_count_must_match_dimensions() {
    let error = generate_error(vec![function(
        "int",
        "f",
        vec![],
        vec![
            VariableDeclaration::new(
                Identifier::array_type(
                    "int",
                    vec![Expr::integer(2, pos()), Expr::integer(2, pos())],
                    pos(),
                ),
                Identifier::new("grid", pos()),
                None,
            )
            .into(),
            Stmt::ret(
                Some(Expr::index("grid", vec![Expr::integer(0, pos())], pos())),
                pos(),
            ),
        ],
    )]);
    assert_eq!(error.get_error_name(), "InvalidArraySize");
}

#[test]
fn test_array_initializer_too_long() {
    let error = generate_error(vec![function(
        "void",
        "f",
        vec![],
        vec![ArrayInitialization {
            declaration: VariableDeclaration::new(
                Identifier::array_type("int", vec![Expr::integer(2, pos())], pos()),
                Identifier::new("a", pos()),
                None,
            ),
            values: vec![
                Expr::integer(1, pos()),
                Expr::integer(2, pos()),
                Expr::integer(3, pos()),
            ],
            position: pos(),
        }
        .into()],
    )]);
    assert_eq!(error.get_error_name(), "TypeMismatch");
}

#[test]
fn test_global_array_initializer() {
    let context = Context::create();
    let compiler = generate(
        &context,
        vec![Stmt::from(ArrayInitialization {
            declaration: VariableDeclaration::new(
                Identifier::array_type("int", vec![Expr::integer(4, pos())], pos()),
                Identifier::new("primes", pos()),
                None,
            ),
            values: vec![Expr::integer(2, pos()), Expr::integer(3, pos())],
            position: pos(),
        })
        .into_global()],
    )
    .unwrap();

    compiler.verify().unwrap();
    let ir = compiler.print_ir();
    assert!(
        ir.contains("@primes = global [4 x i64] [i64 2, i64 3, i64 0, i64 0]"),
        "{}",
        ir
    );
}

#[test]
fn test_struct_lowering() {
    let context = Context::create();
    let compiler = generate(
        &context,
        vec![
            StructDeclaration {
                name: ty("Point"),
                members: vec![var("int", "x", None), var("double", "y", None)],
                position: pos(),
            }
            .into(),
            Stmt::from(var("Point", "origin", None)).into_global(),
        ],
    )
    .unwrap();

    compiler.verify().unwrap();
    let ir = compiler.print_ir();
    assert!(ir.contains("%Point = type { i64, double }"), "{}", ir);
    assert!(ir.contains("@origin = global %Point zeroinitializer"), "{}", ir);
}

#[test]
fn test_unknown_member() {
    let error = generate_error(vec![
        StructDeclaration {
            name: ty("Point"),
            members: vec![var("int", "x", None)],
            position: pos(),
        }
        .into(),
        function(
            "int",
            "f",
            vec![],
            vec![
                var("Point", "p", None).into(),
                Stmt::ret(Some(Expr::member("p", "z", pos())), pos()),
            ],
        ),
    ]);
    assert_eq!(error.get_error_name(), "UnknownMember");
}

#[test]
fn test_unknown_type() {
    let error = generate_error(vec![Stmt::from(var("Vector", "v", None)).into_global()]);
    assert_eq!(error.get_error_name(), "UnknownType");
}

fn global_array(name: &str, sizes: Vec<i64>) -> Stmt {
    Stmt::from(VariableDeclaration::new(
        Identifier::array_type(
            "int",
            sizes.into_iter().map(|size| Expr::integer(size, pos())).collect(),
            pos(),
        ),
        Identifier::new(name, pos()),
        None,
    ))
    .into_global()
}

#[test]
fn test_array_element_count_overflow() {
    let error = generate_error(vec![global_array("g", vec![i64::MAX, 4])]);
    assert_eq!(error.get_error_name(), "InvalidArraySize");
}

#[test]
fn test_array_element_count_exceeds_llvm_limit() {
    let error = generate_error(vec![global_array("g", vec![4294967297])]);
    assert_eq!(error.get_error_name(), "InvalidArraySize");

    let error = generate_error(vec![function(
        "void",
        "f",
        vec![],
        vec![VariableDeclaration::new(
            Identifier::array_type("int", vec![Expr::integer(4294967297, pos())], pos()),
            Identifier::new("local", pos()),
            None,
        )
        .into()],
    )]);
    assert_eq!(error.get_error_name(), "InvalidArraySize");
}

#[test]
fn test_struct_member_array_too_large() {
    let error = generate_error(vec![StructDeclaration {
        name: ty("Table"),
        members: vec![VariableDeclaration::new(
            Identifier::array_type("int", vec![Expr::integer(4294967297, pos())], pos()),
            Identifier::new("cells", pos()),
            None,
        )],
        position: pos(),
    }
    .into()]);
    assert_eq!(error.get_error_name(), "InvalidArraySize");
}
