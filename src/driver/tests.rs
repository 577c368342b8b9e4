use std::{cell::Cell, fs, path::PathBuf};

use inkwell::{context::Context, module::Module};
use tempfile::tempdir;

use crate::{
    ast::{
        ast::{Block, Identifier},
        expressions::Expr,
        statements::{FunctionDeclaration, Stmt},
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    driver::{compile_program, render_diagnostic, run, DriverOptions, ParsedProgram},
    emitter::{temporary_object_path, Emitter, ObjectEmitter},
};

fn pos() -> Position {
    Position::new(1, 1)
}

/// `int main() { return <value>; }`
fn main_returning(value: Expr) -> Block {
    Block::new(
        vec![FunctionDeclaration::new(
            Identifier::type_name("int", pos()),
            Identifier::new("main", pos()),
            vec![],
            Block::new(vec![Stmt::ret(Some(value), pos())], pos()),
        )
        .into()],
        pos(),
    )
}

struct CountingEmitter {
    calls: Cell<usize>,
}

impl Emitter for CountingEmitter {
    fn emit(&self, _module: &Module, options: &DriverOptions) -> Result<PathBuf, Error> {
        self.calls.set(self.calls.get() + 1);
        Ok(options.output_path())
    }
}

#[test]
fn test_parse_errors_prevent_generation() {
    let context = Context::create();
    let program = ParsedProgram::with_errors(main_returning(Expr::integer(0, pos())), 3);

    let error = match compile_program(&context, &program, &DriverOptions::default()) {
        Ok(_) => panic!("parse errors should stop the driver"),
        Err(error) => error,
    };
    assert_eq!(error.get_error_name(), "ParseFailed");
    assert_eq!(error.error_count(), 3);
    assert_eq!(render_diagnostic(&error, "main.sl"), "3 errors generated.\n");
}

#[test]
fn test_render_diagnostic() {
    let error = Error::new(
        ErrorImpl::UnknownIdentifier {
            name: String::from("x"),
        },
        Position::new(4, 2),
    );
    assert_eq!(
        render_diagnostic(&error, "main.sl"),
        "main.sl:4:2: error: unknown identifier \"x\"\n1 error generated.\n"
    );
}

#[test]
fn test_output_path_defaults() {
    let mut options = DriverOptions::default();
    assert_eq!(options.output_path(), PathBuf::from("a.out"));

    options.dont_link = true;
    assert_eq!(options.output_path(), PathBuf::from("a.o"));

    options.emit_llvm = true;
    assert_eq!(options.output_path(), PathBuf::from("a.ll"));

    options.output_file = Some(PathBuf::from("build/prog.ll"));
    assert_eq!(options.output_path(), PathBuf::from("build/prog.ll"));
}

#[test]
fn test_run_exit_codes() {
    let emitter = CountingEmitter {
        calls: Cell::new(0),
    };
    let options = DriverOptions::default();

    let ok = ParsedProgram::new(main_returning(Expr::integer(0, pos())));
    assert_eq!(run(&ok, &options, &emitter), 0);
    assert_eq!(emitter.calls.get(), 1);

    let broken = ParsedProgram::new(main_returning(Expr::identifier("missing", pos())));
    assert_eq!(run(&broken, &options, &emitter), 1);
    // Nothing is emitted for a unit with errors
    assert_eq!(emitter.calls.get(), 1);
}

#[test]
fn test_emit_object_without_linking() {
    let dir = tempdir().unwrap();
    let options = DriverOptions {
        file_name: String::from("main.sl"),
        output_file: Some(dir.path().join("main.o")),
        dont_link: true,
        ..DriverOptions::default()
    };

    let context = Context::create();
    let program = ParsedProgram::new(main_returning(Expr::integer(0, pos())));
    let compiler = compile_program(&context, &program, &options).unwrap();

    let output = ObjectEmitter::default()
        .emit(&compiler.module, &options)
        .unwrap();
    assert_eq!(output, dir.path().join("main.o"));
    assert!(fs::metadata(&output).unwrap().len() > 0);
}

#[test]
fn test_emit_textual_ir() {
    let dir = tempdir().unwrap();
    let options = DriverOptions {
        file_name: String::from("main.sl"),
        output_file: Some(dir.path().join("main.ll")),
        emit_llvm: true,
        ..DriverOptions::default()
    };

    let context = Context::create();
    let program = ParsedProgram::new(main_returning(Expr::integer(7, pos())));
    let compiler = compile_program(&context, &program, &options).unwrap();

    let output = ObjectEmitter::default()
        .emit(&compiler.module, &options)
        .unwrap();
    let ir = fs::read_to_string(output).unwrap();
    assert!(ir.contains("define i64 @main()"), "{}", ir);
    assert!(ir.contains("ret i64 7"), "{}", ir);
}

#[test]
fn test_temporary_object_differs_from_output() {
    assert_eq!(
        temporary_object_path(&PathBuf::from("build/prog.o")),
        PathBuf::from("build/prog.tmp.o")
    );
    assert_eq!(temporary_object_path(&PathBuf::from("a.out")), PathBuf::from("a.tmp.o"));
    assert_eq!(temporary_object_path(&PathBuf::from("prog")), PathBuf::from("prog.tmp.o"));
}

#[test]
fn test_link_into_object_named_output() {
    let dir = tempdir().unwrap();
    let options = DriverOptions {
        file_name: String::from("main.sl"),
        output_file: Some(dir.path().join("prog.o")),
        ..DriverOptions::default()
    };

    let context = Context::create();
    let program = ParsedProgram::new(main_returning(Expr::integer(0, pos())));
    let compiler = compile_program(&context, &program, &options).unwrap();

    let output = ObjectEmitter::default()
        .emit(&compiler.module, &options)
        .unwrap();
    assert_eq!(output, dir.path().join("prog.o"));
    assert!(fs::metadata(&output).unwrap().len() > 0);
    assert!(!dir.path().join("prog.tmp.o").exists());
}
