use std::{fmt::Write, path::PathBuf, time::Instant};

use inkwell::{
    context::Context,
    targets::{CodeModel, InitializationConfig, RelocMode, Target, TargetMachine},
    OptimizationLevel,
};
use log::{debug, info};

use crate::{
    ast::ast::Block,
    compiler::compiler::Compiler,
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::emitter::Emitter;

/// Output of the external parser: the program root and the number of
/// syntax errors it reported.
#[derive(Debug, Clone)]
pub struct ParsedProgram {
    pub root: Block,
    pub error_count: usize,
}

impl ParsedProgram {
    pub fn new(root: Block) -> Self {
        ParsedProgram {
            root,
            error_count: 0,
        }
    }

    pub fn with_errors(root: Block, error_count: usize) -> Self {
        ParsedProgram { root, error_count }
    }
}

#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Module name and file label of diagnostics.
    pub file_name: String,
    pub output_file: Option<PathBuf>,
    /// Write the object file and stop before linking.
    pub dont_link: bool,
    /// Write textual IR instead of an object file.
    pub emit_llvm: bool,
    pub opt_level: OptimizationLevel,
}

impl Default for DriverOptions {
    fn default() -> Self {
        DriverOptions {
            file_name: String::from("<stdin>"),
            output_file: None,
            dont_link: false,
            emit_llvm: false,
            opt_level: OptimizationLevel::None,
        }
    }
}

impl DriverOptions {
    /// Where the final artifact goes, `a.ll`, `a.o` or `a.out` by default.
    pub fn output_path(&self) -> PathBuf {
        if let Some(output_file) = &self.output_file {
            return output_file.clone();
        }

        if self.emit_llvm {
            PathBuf::from("a.ll")
        } else if self.dont_link {
            PathBuf::from("a.o")
        } else {
            PathBuf::from("a.out")
        }
    }
}

/// Target machine for the host, used for the module layout and for
/// object emission.
pub fn host_target_machine(opt_level: OptimizationLevel) -> Result<TargetMachine, Error> {
    Target::initialize_native(&InitializationConfig::default()).map_err(backend_error)?;

    let target_triple = TargetMachine::get_default_triple();
    let target =
        Target::from_triple(&target_triple).map_err(|message| backend_error(message.to_string()))?;

    target
        .create_target_machine(
            &target_triple,
            "generic",
            "",
            opt_level,
            RelocMode::PIC,
            CodeModel::Default,
        )
        .ok_or_else(|| {
            backend_error(format!(
                "no target machine for {}",
                target_triple.as_str().to_string_lossy()
            ))
        })
}

fn backend_error(message: String) -> Error {
    Error::new(ErrorImpl::Backend { message }, Position::null())
}

/// Generates and verifies the module for `program`.
///
/// Programs with parse errors are rejected before generation starts; the
/// first generation error aborts the unit.
pub fn compile_program<'a>(
    context: &'a Context,
    program: &ParsedProgram,
    options: &DriverOptions,
) -> Result<Compiler<'a>, Error> {
    if program.error_count > 0 {
        return Err(Error::new(
            ErrorImpl::ParseFailed {
                count: program.error_count,
            },
            Position::null(),
        ));
    }

    let start = Instant::now();
    let target_machine = host_target_machine(options.opt_level)?;

    let mut compiler = Compiler::new(context, &options.file_name);
    compiler.configure_target(&target_machine);
    debug!(
        "target {}",
        target_machine.get_triple().as_str().to_string_lossy()
    );

    compiler.gen(&program.root)?;
    info!("Generated IR in {:?}", start.elapsed());

    let verify_start = Instant::now();
    compiler.verify()?;
    info!("Verified module in {:?}", verify_start.elapsed());

    Ok(compiler)
}

/// Compiler-style rendering of a failed run: one `file:row:col: error:` line
/// and the error count.
pub fn render_diagnostic(error: &Error, file_name: &str) -> String {
    let mut rendered = String::new();
    let position = error.get_position();

    // Parse errors were already reported by the parser
    if !matches!(error.get_internal_error(), ErrorImpl::ParseFailed { .. }) {
        if position.is_null() {
            let _ = writeln!(rendered, "{}: error: {}", file_name, error);
        } else {
            let _ = writeln!(rendered, "{}:{}: error: {}", file_name, position, error);
        }
    }

    let count = error.error_count();
    let _ = writeln!(
        rendered,
        "{} error{} generated.",
        count,
        if count == 1 { "" } else { "s" }
    );
    rendered
}

/// Runs the whole pipeline and returns the process exit code.
pub fn run(program: &ParsedProgram, options: &DriverOptions, emitter: &dyn Emitter) -> i32 {
    let start = Instant::now();
    let context = Context::create();

    let result = compile_program(&context, program, options).and_then(|compiler| {
        let emit_start = Instant::now();
        let output = emitter.emit(&compiler.module, options)?;
        info!("Emitted {} in {:?}", output.display(), emit_start.elapsed());
        Ok(output)
    });

    match result {
        Ok(_) => {
            info!("Total time: {:?}", start.elapsed());
            0
        }
        Err(error) => {
            eprint!("{}", render_diagnostic(&error, &options.file_name));
            1
        }
    }
}
