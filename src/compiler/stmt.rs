use inkwell::{
    module::Linkage,
    types::{BasicType, BasicTypeEnum},
    values::{BasicValueEnum, FunctionValue, IntValue, PointerValue},
};
use log::debug;

use crate::{
    ast::{
        ast::{Block, Node},
        expressions::Expr,
        statements::{
            ArrayInitialization, ForStmt, FunctionDeclaration, IfStmt, ReturnStmt, Stmt, StmtKind,
            StructDeclaration, VariableDeclaration,
        },
    },
    errors::errors::{Error, ErrorImpl},
    type_checker::{
        const_eval::{eval_const_expr, eval_const_extent, ConstValue},
        environment::{Binding, EnvironmentKind},
        type_checker::element_count,
        types::{FunctionType, Type},
    },
    Position,
};

use super::{
    compiler::{Compiler, FunctionState, Storage, Value},
    expr::gen_expression,
};

/// Generates LLVM IR for the given statement.
///
/// Declarations at global scope, or flagged global, become module globals.
/// Code following a terminator is placed in a fresh block.
///
/// # Arguments
///
/// * `compiler` - The generation context
/// * `statement` - The statement to generate
///
/// # Returns
///
/// The value of an expression statement, so a block used as an expression
/// can yield its last value; `None` for every other statement.
pub fn gen_statement<'a>(compiler: &mut Compiler<'a>, statement: &Stmt) -> Result<Option<Value<'a>>, Error> {
    let at_global_scope = compiler.current_function.is_none();

    match &statement.kind {
        StmtKind::FunctionDeclaration(_) | StmtKind::StructDeclaration(_) if !at_global_scope => {
            return Err(misplaced(statement, "function"))
        }
        StmtKind::Expression(_) | StmtKind::Return(_) | StmtKind::If(_) | StmtKind::For(_)
            if at_global_scope =>
        {
            return Err(misplaced(statement, "global"))
        }
        _ => {}
    }

    compiler.ensure_open_block()?;

    let is_global = statement.is_global || at_global_scope;
    match &statement.kind {
        StmtKind::Expression(stmt) => match &stmt.expression {
            Some(expression) => gen_expression(compiler, expression).map(Some),
            None => Ok(None),
        },
        StmtKind::VariableDeclaration(declaration) => {
            gen_variable_declaration(compiler, declaration, is_global)?;
            Ok(None)
        }
        StmtKind::ArrayInitialization(initialization) => {
            gen_array_initialization(compiler, initialization, is_global)?;
            Ok(None)
        }
        StmtKind::FunctionDeclaration(declaration) => {
            gen_function_declaration(compiler, declaration)?;
            Ok(None)
        }
        StmtKind::StructDeclaration(declaration) => {
            gen_struct_declaration(compiler, declaration)?;
            Ok(None)
        }
        StmtKind::Return(stmt) => {
            gen_return(compiler, stmt)?;
            Ok(None)
        }
        StmtKind::If(stmt) => {
            gen_if(compiler, stmt)?;
            Ok(None)
        }
        StmtKind::For(stmt) => {
            compiler.scopes.push(EnvironmentKind::Block);
            let result = gen_for(compiler, stmt, statement.at_least_once);
            compiler.scopes.pop();
            result?;
            Ok(None)
        }
    }
}

/// Generates a block in its own nested scope.
pub fn gen_block<'a>(compiler: &mut Compiler<'a>, block: &Block) -> Result<Option<Value<'a>>, Error> {
    compiler.scopes.push(EnvironmentKind::Block);
    let result = gen_statements(compiler, &block.statements);
    compiler.scopes.pop();
    result
}

fn gen_statements<'a>(compiler: &mut Compiler<'a>, statements: &[Stmt]) -> Result<Option<Value<'a>>, Error> {
    let mut last_value = None;
    for statement in statements.iter() {
        if let Some(value) = gen_statement(compiler, statement)? {
            last_value = Some(value);
        }
    }
    Ok(last_value)
}

fn misplaced(statement: &Stmt, scope: &str) -> Error {
    Error::new(
        ErrorImpl::MisplacedStatement {
            statement: statement.statement_name().to_string(),
            scope: scope.to_string(),
        },
        statement.position(),
    )
}

fn gen_variable_declaration<'a>(
    compiler: &mut Compiler<'a>,
    declaration: &VariableDeclaration,
    is_global: bool,
) -> Result<(), Error> {
    let var_type = compiler.type_checker.resolve_type(&declaration.var_type)?;
    if !var_type.is_storable() {
        return Err(Error::new(
            ErrorImpl::TypeMismatch {
                expected: String::from("a variable type"),
                received: var_type.to_string(),
            },
            declaration.var_type.position,
        ));
    }

    if let Type::Array { .. } = var_type {
        if let Some(value) = &declaration.assigned_value {
            return Err(Error::new(
                ErrorImpl::TypeMismatch {
                    expected: String::from("an initializer list"),
                    received: var_type.to_string(),
                },
                value.position(),
            ));
        }
        return gen_array_declaration(compiler, declaration, var_type, is_global, &[]);
    }

    let name = &declaration.identifier.name;
    let llvm_type = compiler.convert_type(&var_type)?;

    if is_global {
        let initializer = match &declaration.assigned_value {
            Some(value) => const_initializer(compiler, value, &var_type, name)?,
            None => compiler.zero_value(llvm_type),
        };
        let global = compiler.module.add_global(llvm_type, None, name);
        global.set_initializer(&initializer);

        compiler.scopes.declare(
            name,
            Storage::Variable(global.as_pointer_value()),
            var_type,
            declaration.identifier.position,
        )?;
        debug!("declared global `{}`", name);
        return Ok(());
    }

    let slot = compiler.create_entry_block_alloca(llvm_type, None, name)?;
    compiler.scopes.declare(
        name,
        Storage::Variable(slot),
        var_type.clone(),
        declaration.identifier.position,
    )?;

    if let Some(value) = &declaration.assigned_value {
        let generated = gen_expression(compiler, value)?;
        let converted = compiler.coerce(generated, &var_type, value.position())?;
        compiler.builder.build_store(slot, converted)?;
    }

    Ok(())
}

fn gen_array_initialization<'a>(
    compiler: &mut Compiler<'a>,
    initialization: &ArrayInitialization,
    is_global: bool,
) -> Result<(), Error> {
    let declaration = &initialization.declaration;
    let var_type = compiler.type_checker.resolve_type(&declaration.var_type)?;
    if let Type::Array { .. } = var_type {
        gen_array_declaration(compiler, declaration, var_type, is_global, &initialization.values)
    } else {
        Err(Error::new(
            ErrorImpl::TypeMismatch {
                expected: String::from("an array"),
                received: var_type.to_string(),
            },
            declaration.var_type.position,
        ))
    }
}

/// Allocates an array and stores `values` at offsets 0, 1, ... in order.
fn gen_array_declaration<'a>(
    compiler: &mut Compiler<'a>,
    declaration: &VariableDeclaration,
    array_type: Type,
    is_global: bool,
    values: &[Expr],
) -> Result<(), Error> {
    let element = match &array_type {
        Type::Array { element, .. } => (**element).clone(),
        other => other.clone(),
    };
    let element_type = compiler.convert_type(&element)?;
    let name = &declaration.identifier.name;

    let constant_extents = declaration
        .var_type
        .array_size
        .iter()
        .map(eval_const_extent)
        .collect::<Option<Vec<i64>>>();

    let mut constant_count = None;
    if let Some(extents) = &constant_extents {
        if let Some(extent) = extents.iter().find(|extent| **extent <= 0) {
            return Err(Error::new(
                ErrorImpl::InvalidArraySize {
                    message: format!("size of `{}` must be positive, found {}", name, extent),
                },
                declaration.var_type.position,
            ));
        }

        let extents = extents.iter().map(|extent| *extent as u64).collect::<Vec<u64>>();
        let count = element_count(name, &extents, declaration.var_type.position)?;
        constant_count = Some(count);
        if values.len() > count as usize {
            return Err(Error::new(
                ErrorImpl::TypeMismatch {
                    expected: format!("at most {} elements", count),
                    received: format!("{} elements", values.len()),
                },
                declaration.position,
            ));
        }
    }

    if is_global {
        let (extents, count) = constant_extents.zip(constant_count).ok_or_else(|| {
            Error::new(
                ErrorImpl::NonConstantExpression {
                    context: format!("size of global array `{}`", name),
                },
                declaration.var_type.position,
            )
        })?;

        let initializer = const_array(compiler, &element, element_type, values, count, name)?;
        let global = compiler
            .module
            .add_global(element_type.array_type(count), None, name);
        global.set_initializer(&initializer);

        let zero = compiler.const_integer(0);
        let base = unsafe { global.as_pointer_value().const_gep(&[zero, zero]) };
        let extents = extents
            .iter()
            .map(|extent| compiler.const_integer(*extent as u64))
            .collect();

        compiler.scopes.declare(
            name,
            Storage::Array { base, extents },
            array_type,
            declaration.identifier.position,
        )?;
        debug!("declared global array `{}` of {} elements", name, count);
        return Ok(());
    }

    let (extents, is_constant) = match constant_extents {
        Some(extents) => (
            extents
                .iter()
                .map(|extent| compiler.const_integer(*extent as u64))
                .collect::<Vec<IntValue<'a>>>(),
            true,
        ),
        None => {
            let mut extents = Vec::with_capacity(declaration.var_type.array_size.len());
            for size in declaration.var_type.array_size.iter() {
                let generated = gen_expression(compiler, size)?;
                extents.push(
                    compiler
                        .coerce(generated, &Type::Integer, size.position())?
                        .into_int_value(),
                );
            }
            (extents, false)
        }
    };

    let count = match constant_count {
        Some(count) => compiler.const_integer(count as u64),
        None => {
            let mut count = compiler.const_integer(1);
            for extent in extents.iter() {
                count = compiler.builder.build_int_mul(count, *extent, "")?;
            }
            count
        }
    };

    let base = if is_constant {
        compiler.create_entry_block_alloca(element_type, Some(count), name)?
    } else {
        compiler
            .builder
            .build_array_alloca(element_type, count, name)?
    };

    compiler.scopes.declare(
        name,
        Storage::Array {
            base,
            extents: extents.clone(),
        },
        array_type,
        declaration.identifier.position,
    )?;

    for (offset, value) in values.iter().enumerate() {
        let generated = gen_expression(compiler, value)?;
        let converted = compiler.coerce(generated, &element, value.position())?;
        let index = compiler.const_integer(offset as u64);
        let pointer: PointerValue<'a> =
            unsafe { compiler.builder.build_in_bounds_gep(base, &[index], "")? };
        compiler.builder.build_store(pointer, converted)?;
    }

    Ok(())
}

/// Constant initializer of a global array, zero-filled past `values`.
fn const_array<'a>(
    compiler: &Compiler<'a>,
    element: &Type,
    element_type: BasicTypeEnum<'a>,
    values: &[Expr],
    count: u32,
    name: &str,
) -> Result<BasicValueEnum<'a>, Error> {
    if values.is_empty() {
        return Ok(element_type.array_type(count).const_zero().into());
    }

    let mut constants = Vec::with_capacity(count as usize);
    for value in values.iter() {
        constants.push(const_initializer(compiler, value, element, name)?);
    }
    while constants.len() < count as usize {
        constants.push(compiler.zero_value(element_type));
    }

    match element_type {
        BasicTypeEnum::IntType(ty) => Ok(ty
            .const_array(
                &constants
                    .iter()
                    .map(|constant| constant.into_int_value())
                    .collect::<Vec<_>>(),
            )
            .into()),
        BasicTypeEnum::FloatType(ty) => Ok(ty
            .const_array(
                &constants
                    .iter()
                    .map(|constant| constant.into_float_value())
                    .collect::<Vec<_>>(),
            )
            .into()),
        BasicTypeEnum::PointerType(ty) => Ok(ty
            .const_array(
                &constants
                    .iter()
                    .map(|constant| constant.into_pointer_value())
                    .collect::<Vec<_>>(),
            )
            .into()),
        _ => Err(Error::new(
            ErrorImpl::NonConstantExpression {
                context: format!("initializer of global array `{}`", name),
            },
            values[0].position(),
        )),
    }
}

/// Folds a global initializer to a constant of type `target`.
fn const_initializer<'a>(
    compiler: &Compiler<'a>,
    value: &Expr,
    target: &Type,
    name: &str,
) -> Result<BasicValueEnum<'a>, Error> {
    if let (Expr::String(literal), Type::String) = (value, target) {
        return Ok(const_string(compiler, &literal.value).into());
    }

    let constant = eval_const_expr(value).ok_or_else(|| {
        Error::new(
            ErrorImpl::NonConstantExpression {
                context: format!("initializer of `{}`", name),
            },
            value.position(),
        )
    })?;
    compiler
        .type_checker
        .check_coercion(&constant.get_type(), target, value.position())?;

    match (constant, target) {
        (ConstValue::Integer(integer), Type::Integer) => Ok(compiler
            .context
            .i64_type()
            .const_int(integer as u64, true)
            .into()),
        (constant, Type::Float) => Ok(compiler
            .context
            .f64_type()
            .const_float(constant.as_f64())
            .into()),
        (constant, other) => Err(Error::new(
            ErrorImpl::TypeMismatch {
                expected: other.to_string(),
                received: constant.get_type().to_string(),
            },
            value.position(),
        )),
    }
}

/// Private constant holding a NUL-terminated string; yields `i8*`.
fn const_string<'a>(compiler: &Compiler<'a>, value: &str) -> PointerValue<'a> {
    let bytes = compiler.context.const_string(value.as_bytes(), true);
    let global = compiler.module.add_global(bytes.get_type(), None, "str");
    global.set_initializer(&bytes);
    global.set_constant(true);
    global.set_linkage(Linkage::Private);

    let zero = compiler.const_integer(0);
    unsafe { global.as_pointer_value().const_gep(&[zero, zero]) }
}

fn gen_function_declaration<'a>(
    compiler: &mut Compiler<'a>,
    declaration: &FunctionDeclaration,
) -> Result<(), Error> {
    let name = &declaration.identifier.name;
    let return_type = compiler.type_checker.resolve_type(&declaration.return_type)?;
    if let Type::Array { .. } = return_type {
        return Err(Error::new(
            ErrorImpl::TypeMismatch {
                expected: String::from("a scalar or struct return type"),
                received: return_type.to_string(),
            },
            declaration.return_type.position,
        ));
    }

    let mut parameters = Vec::with_capacity(declaration.parameters.len());
    for (index, parameter) in declaration.parameters.iter().enumerate() {
        let parameter_type = compiler.type_checker.resolve_type(&parameter.var_type)?;
        if !parameter_type.is_storable() {
            return Err(Error::new(
                ErrorImpl::TypeMismatch {
                    expected: String::from("a parameter type"),
                    received: parameter_type.to_string(),
                },
                parameter.var_type.position,
            ));
        }
        if declaration.parameters[..index]
            .iter()
            .any(|previous| previous.identifier.name == parameter.identifier.name)
        {
            return Err(Error::new(
                ErrorImpl::DuplicateDeclaration {
                    name: parameter.identifier.name.clone(),
                },
                parameter.identifier.position,
            ));
        }
        parameters.push(parameter_type);
    }

    let function_type = FunctionType {
        name: name.clone(),
        return_type: Box::new(return_type.clone()),
        parameters,
        is_variadic: declaration.is_variadic,
        is_external: declaration.is_external,
    };

    let function = match compiler.scopes.lookup_global(name).cloned() {
        None => {
            let llvm_type = compiler.convert_function_type(&function_type)?;
            let function = compiler.create_function_proto(name, llvm_type);
            compiler.scopes.declare(
                name,
                Storage::Function(function),
                Type::Function(function_type.clone()),
                declaration.identifier.position,
            )?;
            function
        }
        // A body for a previously declared prototype
        Some(Binding {
            storage: Storage::Function(function),
            binding_type: Type::Function(previous),
            ..
        }) if previous.is_external
            && !declaration.is_external
            && previous.same_signature(&function_type)
            && function.count_basic_blocks() == 0 =>
        {
            compiler.scopes.redeclare_global(
                name,
                Storage::Function(function),
                Type::Function(function_type.clone()),
                declaration.identifier.position,
            );
            function
        }
        Some(_) => {
            return Err(Error::new(
                ErrorImpl::DuplicateDeclaration { name: name.clone() },
                declaration.identifier.position,
            ))
        }
    };

    let body = match (&declaration.body, declaration.is_external) {
        (Some(body), false) => body,
        _ => {
            debug!("declared external function `{}`", name);
            return Ok(());
        }
    };

    let entry = compiler.create_basic_block("entry", function);
    compiler.builder.position_at_end(entry);
    compiler.current_function = Some(FunctionState {
        name: name.clone(),
        value: function,
        return_type,
    });
    compiler.scopes.push(EnvironmentKind::Function);

    let result = gen_function_body(compiler, declaration, function, &function_type.parameters, body);

    compiler.scopes.pop();
    compiler.current_function = None;
    result?;

    debug!("generated function `{}`", name);
    Ok(())
}

fn gen_function_body<'a>(
    compiler: &mut Compiler<'a>,
    declaration: &FunctionDeclaration,
    function: FunctionValue<'a>,
    parameter_types: &[Type],
    body: &Block,
) -> Result<(), Error> {
    for (index, (parameter, parameter_type)) in declaration
        .parameters
        .iter()
        .zip(parameter_types.iter())
        .enumerate()
    {
        let name = &parameter.identifier.name;
        let value = function.get_nth_param(index as u32).ok_or_else(|| {
            Error::new(
                ErrorImpl::Backend {
                    message: format!("missing parameter `{}`", name),
                },
                parameter.position,
            )
        })?;

        let storage = if let Type::Array { .. } = parameter_type {
            // Extents are evaluated in the callee, after earlier parameters are bound
            let mut extents = Vec::with_capacity(parameter.var_type.array_size.len());
            for size in parameter.var_type.array_size.iter() {
                let generated = gen_expression(compiler, size)?;
                extents.push(
                    compiler
                        .coerce(generated, &Type::Integer, size.position())?
                        .into_int_value(),
                );
            }
            Storage::Array {
                base: value.into_pointer_value(),
                extents,
            }
        } else {
            let slot = compiler.create_entry_block_alloca(value.get_type(), None, name)?;
            compiler.builder.build_store(slot, value)?;
            Storage::Variable(slot)
        };

        compiler.scopes.declare(
            name,
            storage,
            parameter_type.clone(),
            parameter.identifier.position,
        )?;
    }

    gen_block(compiler, body)?;
    compiler.finish_function(declaration.position)
}

fn gen_struct_declaration<'a>(
    compiler: &mut Compiler<'a>,
    declaration: &StructDeclaration,
) -> Result<(), Error> {
    let mut members = Vec::with_capacity(declaration.members.len());
    for member in declaration.members.iter() {
        if member.assigned_value.is_some() {
            return Err(Error::new(
                ErrorImpl::MisplacedStatement {
                    statement: String::from("member initializer"),
                    scope: String::from("struct"),
                },
                member.position,
            ));
        }

        let member_type = compiler.type_checker.resolve_type(&member.var_type)?;
        let mut extents = Vec::with_capacity(member.var_type.array_size.len());
        for size in member.var_type.array_size.iter() {
            let extent = eval_const_extent(size).ok_or_else(|| {
                Error::new(
                    ErrorImpl::NonConstantExpression {
                        context: format!("size of member `{}`", member.identifier.name),
                    },
                    size.position(),
                )
            })?;
            if extent <= 0 {
                return Err(Error::new(
                    ErrorImpl::InvalidArraySize {
                        message: format!(
                            "size of member `{}` must be positive, found {}",
                            member.identifier.name, extent
                        ),
                    },
                    size.position(),
                ));
            }
            extents.push(extent as u64);
        }
        element_count(&member.identifier.name, &extents, member.identifier.position)?;

        members.push((member.identifier.clone(), member_type, extents));
    }

    let layout = compiler
        .type_checker
        .declare_struct(&declaration.name, members)?
        .clone();

    let mut fields: Vec<BasicTypeEnum<'a>> = Vec::with_capacity(layout.members.len());
    for member in layout.members.iter() {
        let field = match &member.member_type {
            Type::Array { element, .. } => {
                let count = element_count(&member.name, &member.extents, declaration.position)?;
                compiler.convert_type(element)?.array_type(count).into()
            }
            other => compiler.convert_type(other)?,
        };
        fields.push(field);
    }

    let struct_type = compiler.context.opaque_struct_type(&layout.name);
    struct_type.set_body(&fields, false);
    compiler
        .named_structs
        .insert(layout.name.clone(), struct_type);

    debug!(
        "declared struct `{}` ({} members, {} bytes)",
        layout.name,
        layout.members.len(),
        layout.size
    );
    Ok(())
}

fn gen_return<'a>(compiler: &mut Compiler<'a>, stmt: &ReturnStmt) -> Result<(), Error> {
    let return_type = compiler
        .current_function
        .as_ref()
        .map(|function| function.return_type.clone())
        .ok_or_else(|| {
            Error::new(
                ErrorImpl::MisplacedStatement {
                    statement: String::from("Return"),
                    scope: String::from("global"),
                },
                stmt.position,
            )
        })?;

    let value = match &stmt.value {
        Some(value) => value,
        None if return_type == Type::Void => {
            compiler.builder.build_return(None)?;
            return Ok(());
        }
        None => return Err(return_mismatch(&return_type, &Type::Void, stmt.position)),
    };

    let generated = gen_expression(compiler, value)?;
    match (&return_type, &generated.value_type) {
        (Type::Void, Type::Void) => {
            compiler.builder.build_return(None)?;
        }
        (Type::Void, received) => {
            return Err(return_mismatch(&return_type, received, value.position()));
        }
        _ => {
            let converted = compiler.coerce(generated, &return_type, value.position())?;
            compiler.builder.build_return(Some(&converted))?;
        }
    }
    Ok(())
}

fn return_mismatch(expected: &Type, received: &Type, position: Position) -> Error {
    Error::new(
        ErrorImpl::TypeMismatch {
            expected: expected.to_string(),
            received: received.to_string(),
        },
        position,
    )
}

fn gen_if<'a>(compiler: &mut Compiler<'a>, stmt: &IfStmt) -> Result<(), Error> {
    let condition = gen_expression(compiler, &stmt.condition)?;
    let condition = compiler.build_condition(condition, stmt.condition.position())?;

    let function = compiler.current_function_value()?;
    let then_block = compiler.create_basic_block("then", function);
    let else_block = stmt
        .else_body
        .as_ref()
        .map(|_| compiler.create_basic_block("else", function));
    let merge_block = compiler.create_basic_block("merge", function);

    compiler.builder.build_conditional_branch(
        condition,
        then_block,
        else_block.unwrap_or(merge_block),
    )?;

    compiler.builder.position_at_end(then_block);
    gen_block(compiler, &stmt.then_body)?;
    if !compiler.is_terminated() {
        compiler.branch_to(merge_block)?;
    }

    if let (Some(else_block), Some(else_body)) = (else_block, &stmt.else_body) {
        compiler.builder.position_at_end(else_block);
        gen_block(compiler, else_body)?;
        if !compiler.is_terminated() {
            compiler.branch_to(merge_block)?;
        }
    }

    compiler.builder.position_at_end(merge_block);
    Ok(())
}

/// Generates a loop: `initial; cond: if !condition goto end; body; increment;
/// goto cond; end:`. With `at_least_once` the body runs before the first test.
fn gen_for<'a>(compiler: &mut Compiler<'a>, stmt: &ForStmt, at_least_once: bool) -> Result<(), Error> {
    if let Some(initial) = &stmt.initial {
        gen_statement(compiler, initial)?;
    }

    let function = compiler.current_function_value()?;
    let condition_block = compiler.create_basic_block("for.cond", function);
    let body_block = compiler.create_basic_block("for.body", function);
    let exit_block = compiler.create_basic_block("for.end", function);

    compiler.builder.build_unconditional_branch(if at_least_once {
        body_block
    } else {
        condition_block
    })?;

    compiler.builder.position_at_end(condition_block);
    match &stmt.condition {
        Some(condition) => {
            let value = gen_expression(compiler, condition)?;
            let value = compiler.build_condition(value, condition.position())?;
            compiler
                .builder
                .build_conditional_branch(value, body_block, exit_block)?;
        }
        None => {
            compiler.builder.build_unconditional_branch(body_block)?;
        }
    }

    compiler.builder.position_at_end(body_block);
    gen_block(compiler, &stmt.body)?;

    compiler.ensure_open_block()?;
    if let Some(increment) = &stmt.increment {
        gen_expression(compiler, increment)?;
    }
    compiler.branch_to(condition_block)?;

    compiler.builder.position_at_end(exit_block);
    Ok(())
}
