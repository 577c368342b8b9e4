//! Main compiler module.
//!
//! This module contains the core Compiler structure: the generation context
//! that owns the LLVM module being built, the scope table, the type registry
//! and the state of the function currently being generated.

use std::collections::HashMap;

use inkwell::{
    basic_block::BasicBlock,
    builder::Builder,
    context::Context,
    module::{Linkage, Module},
    targets::TargetMachine,
    types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType as LLVMFunctionType, StructType},
    values::{BasicValueEnum, FunctionValue, IntValue, PointerValue},
    AddressSpace, FloatPredicate, IntPredicate,
};

use crate::{
    ast::ast::Block,
    errors::errors::{Error, ErrorImpl},
    type_checker::{
        environment::ScopeTable,
        type_checker::TypeChecker,
        types::{Coercion, FunctionType, Type},
    },
    Position,
};

use super::stmt::gen_statement;

/// Where a name lives in the generated program.
#[derive(Debug, Clone)]
pub enum Storage<'a> {
    /// Pointer to a scalar or struct slot (stack or global).
    Variable(PointerValue<'a>),
    /// Pointer to the first element and the extent of every dimension.
    Array {
        base: PointerValue<'a>,
        extents: Vec<IntValue<'a>>,
    },
    Function(FunctionValue<'a>),
}

/// A generated value together with its language-level type.
#[derive(Debug, Clone)]
pub struct Value<'a> {
    pub value: BasicValueEnum<'a>,
    pub value_type: Type,
}

/// The function whose body is being generated.
#[derive(Debug, Clone)]
pub struct FunctionState<'a> {
    pub name: String,
    pub value: FunctionValue<'a>,
    pub return_type: Type,
}

/// The generation context of one compilation unit.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the LLVM context
pub struct Compiler<'a> {
    /// Struct registry and coercion policy
    pub type_checker: TypeChecker,
    /// Lexical scopes mapping names to storage
    pub scopes: ScopeTable<Storage<'a>>,
    /// Map of struct names to their LLVM struct types
    pub named_structs: HashMap<String, StructType<'a>>,
    /// Set while a function body is generated
    pub current_function: Option<FunctionState<'a>>,

    /// Reference to the LLVM context
    pub context: &'a Context,
    /// The LLVM module being built
    pub module: Module<'a>,
    /// The LLVM IR builder
    pub builder: Builder<'a>,
}

impl<'a> Compiler<'a> {
    /// Creates a new Compiler with an empty module named after `file_name`.
    pub fn new(context: &'a Context, file_name: &str) -> Self {
        Compiler {
            type_checker: TypeChecker::new(),
            scopes: ScopeTable::new(),
            named_structs: HashMap::new(),
            current_function: None,
            module: context.create_module(file_name),
            builder: context.create_builder(),
            context,
        }
    }

    /// Sets the module triple and data layout for `target_machine`.
    pub fn configure_target(&self, target_machine: &TargetMachine) {
        self.module.set_triple(&target_machine.get_triple());
        self.module
            .set_data_layout(&target_machine.get_target_data().get_data_layout());
    }

    /// Generates every top-level statement of `program` in order.
    ///
    /// Stops at the first error.
    pub fn gen(&mut self, program: &Block) -> Result<(), Error> {
        for statement in program.statements.iter() {
            gen_statement(self, statement)?;
        }
        Ok(())
    }

    /// Runs the LLVM verifier on the module.
    pub fn verify(&self) -> Result<(), Error> {
        self.module.verify().map_err(|message| {
            Error::new(
                ErrorImpl::Backend {
                    message: message.to_string(),
                },
                Position::null(),
            )
        })
    }

    /// Textual LLVM IR of the module.
    pub fn print_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Converts a value type to an LLVM basic type.
    ///
    /// Arrays convert to a pointer to their element type, which is how they
    /// are passed around; their storage is allocated by the declaration.
    pub fn convert_type(&self, type_: &Type) -> Result<BasicTypeEnum<'a>, Error> {
        match type_ {
            Type::Integer => Ok(self.context.i64_type().into()),
            Type::Float => Ok(self.context.f64_type().into()),
            Type::Boolean => Ok(self.context.bool_type().into()),
            Type::String => Ok(self
                .context
                .i8_type()
                .ptr_type(AddressSpace::default())
                .into()),
            Type::Struct(name) => self
                .named_structs
                .get(name)
                .map(|struct_type| struct_type.as_basic_type_enum())
                .ok_or_else(|| {
                    Error::new(
                        ErrorImpl::UnknownType {
                            type_: name.clone(),
                        },
                        Position::null(),
                    )
                }),
            Type::Array { element, .. } => Ok(self
                .convert_type(element)?
                .ptr_type(AddressSpace::default())
                .into()),
            Type::Void | Type::Function(_) => Err(Error::new(
                ErrorImpl::TypeMismatch {
                    expected: String::from("a value type"),
                    received: type_.to_string(),
                },
                Position::null(),
            )),
        }
    }

    /// Lowers a function signature.
    pub fn convert_function_type(&self, function: &FunctionType) -> Result<LLVMFunctionType<'a>, Error> {
        let parameters = function
            .parameters
            .iter()
            .map(|parameter| self.convert_type(parameter).map(|ty| ty.into()))
            .collect::<Result<Vec<BasicMetadataTypeEnum<'a>>, Error>>()?;

        if *function.return_type == Type::Void {
            Ok(self
                .context
                .void_type()
                .fn_type(parameters.as_slice(), function.is_variadic))
        } else {
            Ok(self
                .convert_type(&function.return_type)?
                .fn_type(parameters.as_slice(), function.is_variadic))
        }
    }

    /// Declares a function prototype with external linkage.
    pub fn create_function_proto(&self, name: &str, function_type: LLVMFunctionType<'a>) -> FunctionValue<'a> {
        self.module
            .add_function(name, function_type, Some(Linkage::External))
    }

    /// Creates a new basic block in the given function.
    pub fn create_basic_block(&self, name: &str, function: FunctionValue<'a>) -> BasicBlock<'a> {
        self.context.append_basic_block(function, name)
    }

    /// The function the builder is currently positioned in.
    pub fn current_function_value(&self) -> Result<FunctionValue<'a>, Error> {
        self.current_function
            .as_ref()
            .map(|function| function.value)
            .ok_or_else(|| {
                Error::new(
                    ErrorImpl::Backend {
                        message: String::from("no function is being generated"),
                    },
                    Position::null(),
                )
            })
    }

    /// Whether the block the builder points at already ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.builder
            .get_insert_block()
            .and_then(|block| block.get_terminator())
            .is_some()
    }

    /// Makes sure instructions can be appended: code following a `return`
    /// goes into a fresh block without predecessors.
    pub fn ensure_open_block(&self) -> Result<(), Error> {
        if self.current_function.is_some() && self.is_terminated() {
            let function = self.current_function_value()?;
            let dead = self.create_basic_block("dead", function);
            self.builder.position_at_end(dead);
        }
        Ok(())
    }

    /// Allocates a stack slot in the entry block of the current function so
    /// slots inside loops are not re-allocated on every iteration.
    pub fn create_entry_block_alloca(
        &self,
        type_: BasicTypeEnum<'a>,
        count: Option<IntValue<'a>>,
        name: &str,
    ) -> Result<PointerValue<'a>, Error> {
        let function = self.current_function_value()?;
        let builder = self.context.create_builder();
        let entry = function.get_first_basic_block().ok_or_else(|| {
            Error::new(
                ErrorImpl::Backend {
                    message: format!("function `{}` has no entry block", name),
                },
                Position::null(),
            )
        })?;

        match entry.get_first_instruction() {
            Some(instruction) => builder.position_before(&instruction),
            None => builder.position_at_end(entry),
        }

        let slot = match count {
            Some(count) => builder.build_array_alloca(type_, count, name)?,
            None => builder.build_alloca(type_, name)?,
        };
        Ok(slot)
    }

    /// The all-zero constant of an LLVM type, used for global storage.
    pub fn zero_value(&self, type_: BasicTypeEnum<'a>) -> BasicValueEnum<'a> {
        match type_ {
            BasicTypeEnum::IntType(ty) => ty.const_zero().into(),
            BasicTypeEnum::FloatType(ty) => ty.const_zero().into(),
            BasicTypeEnum::PointerType(ty) => ty.const_null().into(),
            BasicTypeEnum::StructType(ty) => ty.const_zero().into(),
            BasicTypeEnum::ArrayType(ty) => ty.const_zero().into(),
            BasicTypeEnum::VectorType(ty) => ty.const_zero().into(),
        }
    }

    pub fn const_integer(&self, value: u64) -> IntValue<'a> {
        self.context.i64_type().const_int(value, false)
    }

    /// Applies the implicit conversion from `value`'s type to `target`, or
    /// fails with a `TypeMismatch` at `position`.
    pub fn coerce(&self, value: Value<'a>, target: &Type, position: Position) -> Result<BasicValueEnum<'a>, Error> {
        let coercion = self
            .type_checker
            .check_coercion(&value.value_type, target, position)?;

        let converted = match coercion {
            Coercion::None => value.value,
            Coercion::IntToFloat => self
                .builder
                .build_signed_int_to_float(value.value.into_int_value(), self.context.f64_type(), "")?
                .into(),
            Coercion::BoolToInt => self
                .builder
                .build_int_z_extend(value.value.into_int_value(), self.context.i64_type(), "")?
                .into(),
            Coercion::BoolToFloat => self
                .builder
                .build_unsigned_int_to_float(value.value.into_int_value(), self.context.f64_type(), "")?
                .into(),
        };
        Ok(converted)
    }

    /// Turns a value into an `i1` usable by a conditional branch: comparisons
    /// are used as is, numbers are compared against zero.
    pub fn build_condition(&self, value: Value<'a>, position: Position) -> Result<IntValue<'a>, Error> {
        match value.value_type {
            Type::Boolean => Ok(value.value.into_int_value()),
            Type::Integer => Ok(self.builder.build_int_compare(
                IntPredicate::NE,
                value.value.into_int_value(),
                self.context.i64_type().const_zero(),
                "",
            )?),
            Type::Float => Ok(self.builder.build_float_compare(
                FloatPredicate::ONE,
                value.value.into_float_value(),
                self.context.f64_type().const_zero(),
                "",
            )?),
            other => Err(Error::new(
                ErrorImpl::TypeMismatch {
                    expected: String::from("a condition"),
                    received: other.to_string(),
                },
                position,
            )),
        }
    }

    /// Whether `block` can be reached from the entry block of the current
    /// function by following branch terminators.
    pub fn is_reachable(&self, block: BasicBlock<'a>) -> bool {
        let entry = match self
            .current_function
            .as_ref()
            .and_then(|state| state.value.get_first_basic_block())
        {
            Some(entry) => entry,
            None => return false,
        };

        let mut visited = vec![entry];
        let mut pending = vec![entry];
        while let Some(current) = pending.pop() {
            if current == block {
                return true;
            }
            let terminator = match current.get_terminator() {
                Some(terminator) => terminator,
                None => continue,
            };
            for index in 0..terminator.get_num_operands() {
                let successor = terminator
                    .get_operand(index)
                    .and_then(|operand| operand.right());
                if let Some(successor) = successor {
                    if !visited.contains(&successor) {
                        visited.push(successor);
                        pending.push(successor);
                    }
                }
            }
        }
        false
    }

    /// Ends the current block with a branch to `target`, or with
    /// `unreachable` when the block itself cannot be reached.
    pub fn branch_to(&self, target: BasicBlock<'a>) -> Result<(), Error> {
        let reachable = self
            .builder
            .get_insert_block()
            .map(|block| self.is_reachable(block))
            .unwrap_or(false);

        if reachable {
            self.builder.build_unconditional_branch(target)?;
        } else {
            self.builder.build_unreachable()?;
        }
        Ok(())
    }

    /// Closes the current function body: falls back to `ret void` for void
    /// functions and `unreachable` when the end of the body cannot be reached.
    pub fn finish_function(&self, position: Position) -> Result<(), Error> {
        if self.is_terminated() {
            return Ok(());
        }

        let state = self.current_function.as_ref().ok_or_else(|| {
            Error::new(
                ErrorImpl::Backend {
                    message: String::from("no function is being generated"),
                },
                position,
            )
        })?;

        let reachable = self
            .builder
            .get_insert_block()
            .map(|block| self.is_reachable(block))
            .unwrap_or(false);

        if !reachable {
            self.builder.build_unreachable()?;
        } else if state.return_type == Type::Void {
            self.builder.build_return(None)?;
        } else {
            return Err(Error::new(
                ErrorImpl::MissingReturn {
                    function: state.name.clone(),
                },
                position,
            ));
        }

        Ok(())
    }
}

/// Generates a module for `program` in a fresh generation context.
///
/// This is the primary entry point for code generation; target setup,
/// verification and emission are left to the driver.
pub fn compile<'a>(program: &Block, file_name: &str, context: &'a Context) -> Result<Compiler<'a>, Error> {
    let mut compiler = Compiler::new(context, file_name);
    compiler.gen(program)?;
    Ok(compiler)
}
