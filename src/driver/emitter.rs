use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use inkwell::{module::Module, targets::FileType};
use log::debug;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::driver::{host_target_machine, DriverOptions};

/// Hands a finished module to the outside world.
pub trait Emitter {
    /// Writes the artifact selected by `options` and returns its path.
    fn emit(&self, module: &Module, options: &DriverOptions) -> Result<PathBuf, Error>;
}

/// Writes an object file for the host, or textual IR, and optionally links
/// the object into an executable.
pub struct ObjectEmitter {
    /// Compiler driver used as the linker.
    pub linker: String,
}

impl Default for ObjectEmitter {
    fn default() -> Self {
        ObjectEmitter {
            linker: String::from("cc"),
        }
    }
}

impl Emitter for ObjectEmitter {
    fn emit(&self, module: &Module, options: &DriverOptions) -> Result<PathBuf, Error> {
        let output = options.output_path();

        if options.emit_llvm {
            module
                .print_to_file(&output)
                .map_err(|message| emit_error(&output, message.to_string()))?;
            return Ok(output);
        }

        let object = if options.dont_link {
            output.clone()
        } else {
            temporary_object_path(&output)
        };

        let target_machine = host_target_machine(options.opt_level)?;
        target_machine
            .write_to_file(module, FileType::Object, &object)
            .map_err(|message| emit_error(&object, message.to_string()))?;
        debug!("wrote object file {}", object.display());

        if options.dont_link {
            return Ok(object);
        }

        link(&self.linker, &object, &output)?;
        fs::remove_file(&object).map_err(|error| emit_error(&object, error.to_string()))?;
        Ok(output)
    }
}

/// Object file handed to the linker; never equal to `output`.
pub(crate) fn temporary_object_path(output: &Path) -> PathBuf {
    output.with_extension("tmp.o")
}

fn link(linker: &str, object: &Path, output: &Path) -> Result<(), Error> {
    let status = Command::new(linker)
        .arg(object)
        .arg("-o")
        .arg(output)
        .status()
        .map_err(|error| emit_error(output, format!("failed to run `{}`: {}", linker, error)))?;

    if !status.success() {
        return Err(emit_error(
            output,
            format!("`{}` exited with {}", linker, status),
        ));
    }

    debug!("linked {}", output.display());
    Ok(())
}

fn emit_error(path: &Path, message: String) -> Error {
    Error::new(
        ErrorImpl::Emit {
            message: format!("{}: {}", path.display(), message),
        },
        Position::null(),
    )
}
