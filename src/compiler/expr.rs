use inkwell::{
    values::{BasicMetadataValueEnum, BasicValueEnum, IntValue, PointerValue},
    FloatPredicate, IntPredicate,
};

use crate::{
    ast::{
        ast::{Block, Identifier, Node},
        expressions::{
            ArrayIndex, AssignmentExpr, BinaryExpr, BinaryOperator, CallExpr, Expr, StructMember,
        },
    },
    errors::errors::{Error, ErrorImpl},
    type_checker::types::Type,
    Position,
};

use super::{
    compiler::{Compiler, Storage, Value},
    stmt::gen_block,
};

/// Generates LLVM IR for the given expression.
///
/// # Arguments
///
/// * `compiler` - The generation context; the builder must sit inside a function
/// * `expression` - The expression to generate
///
/// # Returns
///
/// The generated value with its language-level type. Statements without a
/// value, such as void calls, yield a placeholder of type `void`.
pub fn gen_expression<'a>(compiler: &mut Compiler<'a>, expression: &Expr) -> Result<Value<'a>, Error> {
    match expression {
        Expr::Integer(expr) => Ok(Value {
            value: compiler
                .context
                .i64_type()
                .const_int(expr.value as u64, true)
                .into(),
            value_type: Type::Integer,
        }),
        Expr::Double(expr) => Ok(Value {
            value: compiler.context.f64_type().const_float(expr.value).into(),
            value_type: Type::Float,
        }),
        Expr::String(expr) => Ok(Value {
            value: compiler
                .builder
                .build_global_string_ptr(&expr.value, "str")?
                .as_pointer_value()
                .into(),
            value_type: Type::String,
        }),
        Expr::Identifier(identifier) => gen_identifier(compiler, identifier),
        Expr::Binary(expr) => gen_binary(compiler, expr),
        Expr::Assignment(expr) => gen_assignment(compiler, expr),
        Expr::Call(expr) => gen_call(compiler, expr),
        Expr::ArrayIndex(index) => {
            let (pointer, element_type) = array_element_pointer(compiler, index)?;
            let value = compiler.builder.build_load(pointer, "")?;
            Ok(Value {
                value,
                value_type: element_type,
            })
        }
        Expr::ArrayAssignment(expr) => {
            let (pointer, element_type) = array_element_pointer(compiler, &expr.target)?;
            store_value(compiler, pointer, element_type, &expr.value)
        }
        Expr::StructMember(member) => {
            let (pointer, member_type) = struct_member_pointer(compiler, member)?;
            if let Type::Array { .. } = member_type {
                // An array member without an index decays to its first element
                return Ok(Value {
                    value: pointer.into(),
                    value_type: member_type,
                });
            }
            let value = compiler.builder.build_load(pointer, &member.member.name)?;
            Ok(Value {
                value,
                value_type: member_type,
            })
        }
        Expr::StructAssignment(expr) => {
            let (pointer, member_type) = struct_member_pointer(compiler, &expr.target)?;
            if let Type::Array { .. } = member_type {
                return Err(not_assignable(&member_type, expr.position));
            }
            store_value(compiler, pointer, member_type, &expr.value)
        }
        Expr::Block(block) => gen_block_expression(compiler, block),
    }
}

/// Placeholder returned by expressions without a usable value.
pub fn void_value<'a>(compiler: &Compiler<'a>) -> Value<'a> {
    Value {
        value: compiler.context.i64_type().const_zero().into(),
        value_type: Type::Void,
    }
}

fn gen_block_expression<'a>(compiler: &mut Compiler<'a>, block: &Block) -> Result<Value<'a>, Error> {
    Ok(gen_block(compiler, block)?.unwrap_or_else(|| void_value(compiler)))
}

fn not_assignable(target: &Type, position: Position) -> Error {
    Error::new(
        ErrorImpl::TypeMismatch {
            expected: String::from("an assignable location"),
            received: target.to_string(),
        },
        position,
    )
}

fn gen_identifier<'a>(compiler: &mut Compiler<'a>, identifier: &Identifier) -> Result<Value<'a>, Error> {
    let binding = compiler
        .scopes
        .resolve(&identifier.name, identifier.position)?
        .clone();

    match binding.storage {
        Storage::Variable(pointer) => Ok(Value {
            value: compiler.builder.build_load(pointer, &identifier.name)?,
            value_type: binding.binding_type,
        }),
        Storage::Array { base, .. } => Ok(Value {
            value: base.into(),
            value_type: binding.binding_type,
        }),
        Storage::Function(_) => Err(Error::new(
            ErrorImpl::TypeMismatch {
                expected: String::from("a value"),
                received: binding.binding_type.to_string(),
            },
            identifier.position,
        )),
    }
}

fn gen_binary<'a>(compiler: &mut Compiler<'a>, expr: &BinaryExpr) -> Result<Value<'a>, Error> {
    let left = gen_expression(compiler, &expr.left)?;
    let right = gen_expression(compiler, &expr.right)?;

    let operand_type = compiler.type_checker.check_binary(
        expr.operator,
        &left.value_type,
        &right.value_type,
        expr.position,
    )?;

    let left = compiler.coerce(left, &operand_type, expr.left.position())?;
    let right = compiler.coerce(right, &operand_type, expr.right.position())?;

    if operand_type == Type::Float {
        gen_float_binary(compiler, expr.operator, left, right)
    } else {
        gen_integer_binary(compiler, expr.operator, left, right)
    }
}

fn gen_integer_binary<'a>(
    compiler: &Compiler<'a>,
    operator: BinaryOperator,
    left: BasicValueEnum<'a>,
    right: BasicValueEnum<'a>,
) -> Result<Value<'a>, Error> {
    let left = left.into_int_value();
    let right = right.into_int_value();
    let builder = &compiler.builder;

    let predicate = match operator {
        BinaryOperator::Equal => Some(IntPredicate::EQ),
        BinaryOperator::NotEqual => Some(IntPredicate::NE),
        BinaryOperator::Less => Some(IntPredicate::SLT),
        BinaryOperator::LessEqual => Some(IntPredicate::SLE),
        BinaryOperator::Greater => Some(IntPredicate::SGT),
        BinaryOperator::GreaterEqual => Some(IntPredicate::SGE),
        _ => None,
    };
    if let Some(predicate) = predicate {
        return Ok(Value {
            value: builder.build_int_compare(predicate, left, right, "")?.into(),
            value_type: Type::Boolean,
        });
    }

    let value = match operator {
        BinaryOperator::Plus => builder.build_int_add(left, right, "")?,
        BinaryOperator::Minus => builder.build_int_sub(left, right, "")?,
        BinaryOperator::Multiply => builder.build_int_mul(left, right, "")?,
        BinaryOperator::Divide => builder.build_int_signed_div(left, right, "")?,
        BinaryOperator::Modulo => builder.build_int_signed_rem(left, right, "")?,
        BinaryOperator::BitAnd => builder.build_and(left, right, "")?,
        BinaryOperator::BitOr => builder.build_or(left, right, "")?,
        BinaryOperator::BitXor => builder.build_xor(left, right, "")?,
        BinaryOperator::ShiftLeft => builder.build_left_shift(left, right, "")?,
        BinaryOperator::ShiftRight => builder.build_right_shift(left, right, true, "")?,
        _ => unreachable!("comparisons are handled above"),
    };

    Ok(Value {
        value: value.into(),
        value_type: Type::Integer,
    })
}

fn gen_float_binary<'a>(
    compiler: &Compiler<'a>,
    operator: BinaryOperator,
    left: BasicValueEnum<'a>,
    right: BasicValueEnum<'a>,
) -> Result<Value<'a>, Error> {
    let left = left.into_float_value();
    let right = right.into_float_value();
    let builder = &compiler.builder;

    let predicate = match operator {
        BinaryOperator::Equal => FloatPredicate::OEQ,
        BinaryOperator::NotEqual => FloatPredicate::ONE,
        BinaryOperator::Less => FloatPredicate::OLT,
        BinaryOperator::LessEqual => FloatPredicate::OLE,
        BinaryOperator::Greater => FloatPredicate::OGT,
        BinaryOperator::GreaterEqual => FloatPredicate::OGE,
        _ => {
            let value = match operator {
                BinaryOperator::Plus => builder.build_float_add(left, right, "")?,
                BinaryOperator::Minus => builder.build_float_sub(left, right, "")?,
                BinaryOperator::Multiply => builder.build_float_mul(left, right, "")?,
                BinaryOperator::Divide => builder.build_float_div(left, right, "")?,
                BinaryOperator::Modulo => builder.build_float_rem(left, right, "")?,
                // Bitwise operators on floats are rejected by the type checker
                _ => unreachable!("bitwise operator on double"),
            };
            return Ok(Value {
                value: value.into(),
                value_type: Type::Float,
            });
        }
    };

    Ok(Value {
        value: builder.build_float_compare(predicate, left, right, "")?.into(),
        value_type: Type::Boolean,
    })
}

fn gen_assignment<'a>(compiler: &mut Compiler<'a>, expr: &AssignmentExpr) -> Result<Value<'a>, Error> {
    let binding = compiler
        .scopes
        .resolve(&expr.assignee.name, expr.assignee.position)?
        .clone();

    match binding.storage {
        Storage::Variable(pointer) => store_value(compiler, pointer, binding.binding_type, &expr.value),
        _ => Err(not_assignable(&binding.binding_type, expr.position)),
    }
}

/// Generates `value`, converts it to `target_type` and stores it at `pointer`.
/// The stored value is the value of the assignment.
fn store_value<'a>(
    compiler: &mut Compiler<'a>,
    pointer: PointerValue<'a>,
    target_type: Type,
    value: &Expr,
) -> Result<Value<'a>, Error> {
    let generated = gen_expression(compiler, value)?;
    let converted = compiler.coerce(generated, &target_type, value.position())?;
    compiler.builder.build_store(pointer, converted)?;

    Ok(Value {
        value: converted,
        value_type: target_type,
    })
}

fn gen_call<'a>(compiler: &mut Compiler<'a>, expr: &CallExpr) -> Result<Value<'a>, Error> {
    let binding = compiler
        .scopes
        .resolve(&expr.callee.name, expr.callee.position)?
        .clone();

    let (function, function_type) = match (binding.storage, binding.binding_type) {
        (Storage::Function(function), Type::Function(function_type)) => (function, function_type),
        (_, other) => {
            return Err(Error::new(
                ErrorImpl::TypeMismatch {
                    expected: String::from("a function"),
                    received: other.to_string(),
                },
                expr.callee.position,
            ))
        }
    };

    let expected = function_type.parameters.len();
    let received = expr.arguments.len();
    let arity_ok = if function_type.is_variadic {
        received >= expected
    } else {
        received == expected
    };
    if !arity_ok {
        return Err(Error::new(
            ErrorImpl::ArityMismatch {
                function: function_type.name.clone(),
                expected,
                received,
            },
            expr.position,
        ));
    }

    let mut arguments: Vec<BasicMetadataValueEnum<'a>> = Vec::with_capacity(received);
    for (index, argument) in expr.arguments.iter().enumerate() {
        let value = gen_expression(compiler, argument)?;
        let converted = match function_type.parameters.get(index) {
            Some(parameter) => compiler.coerce(value, parameter, argument.position())?,
            None => variadic_argument(compiler, value, argument.position())?,
        };
        arguments.push(converted.into());
    }

    let call = compiler.builder.build_call(function, &arguments, "")?;
    match call.try_as_basic_value().left() {
        Some(value) => Ok(Value {
            value,
            value_type: *function_type.return_type,
        }),
        None => Ok(void_value(compiler)),
    }
}

/// Extra arguments of a variadic call are passed as is, except comparison
/// results which are widened to an Integer.
fn variadic_argument<'a>(
    compiler: &Compiler<'a>,
    value: Value<'a>,
    position: Position,
) -> Result<BasicValueEnum<'a>, Error> {
    match value.value_type {
        Type::Boolean => compiler.coerce(value, &Type::Integer, position),
        Type::Void | Type::Function(_) => Err(Error::new(
            ErrorImpl::TypeMismatch {
                expected: String::from("a value"),
                received: value.value_type.to_string(),
            },
            position,
        )),
        _ => Ok(value.value),
    }
}

/// Row-major offset of `indices` into an array with the given extents.
fn flatten_indices<'a>(
    compiler: &mut Compiler<'a>,
    indices: &[Expr],
    extents: &[IntValue<'a>],
    position: Position,
) -> Result<IntValue<'a>, Error> {
    if indices.len() != extents.len() {
        return Err(Error::new(
            ErrorImpl::InvalidArraySize {
                message: format!(
                    "expected {} indices, received {}",
                    extents.len(),
                    indices.len()
                ),
            },
            position,
        ));
    }

    let mut offset: Option<IntValue<'a>> = None;
    for (index, extent) in indices.iter().zip(extents.iter()) {
        let value = gen_expression(compiler, index)?;
        let value = compiler
            .coerce(value, &Type::Integer, index.position())?
            .into_int_value();

        offset = Some(match offset {
            None => value,
            Some(outer) => {
                let scaled = compiler.builder.build_int_mul(outer, *extent, "")?;
                compiler.builder.build_int_add(scaled, value, "")?
            }
        });
    }

    Ok(offset.unwrap_or_else(|| compiler.const_integer(0)))
}

/// Computes the address of one array element.
///
/// # Arguments
///
/// * `compiler` - The generation context
/// * `index` - The array name and one index per dimension
///
/// # Returns
///
/// The element pointer and the element type, or `InvalidArraySize` when the
/// index count differs from the array's dimension count.
pub fn array_element_pointer<'a>(
    compiler: &mut Compiler<'a>,
    index: &ArrayIndex,
) -> Result<(PointerValue<'a>, Type), Error> {
    let binding = compiler
        .scopes
        .resolve(&index.array.name, index.array.position)?
        .clone();

    let (base, extents, element) = match (binding.storage, binding.binding_type) {
        (Storage::Array { base, extents }, Type::Array { element, .. }) => (base, extents, element),
        (_, other) => {
            return Err(Error::new(
                ErrorImpl::TypeMismatch {
                    expected: String::from("an array"),
                    received: other.to_string(),
                },
                index.array.position,
            ))
        }
    };

    let offset = flatten_indices(compiler, &index.indices, &extents, index.position)?;
    let pointer = unsafe {
        compiler
            .builder
            .build_in_bounds_gep(base, &[offset], &index.array.name)?
    };

    Ok((pointer, *element))
}

/// Computes the address of a struct member.
///
/// Array members without an index yield a pointer to their first element.
///
/// # Arguments
///
/// * `compiler` - The generation context
/// * `member` - The struct variable, the member name and an optional index
///
/// # Returns
///
/// The member pointer and the member type, or `UnknownMember` when the struct
/// has no such member.
pub fn struct_member_pointer<'a>(
    compiler: &mut Compiler<'a>,
    member: &StructMember,
) -> Result<(PointerValue<'a>, Type), Error> {
    let binding = compiler
        .scopes
        .resolve(&member.base.name, member.base.position)?
        .clone();

    let (pointer, structure) = match (binding.storage, binding.binding_type) {
        (Storage::Variable(pointer), Type::Struct(structure)) => (pointer, structure),
        (_, other) => {
            return Err(Error::new(
                ErrorImpl::TypeMismatch {
                    expected: String::from("a struct"),
                    received: other.to_string(),
                },
                member.base.position,
            ))
        }
    };

    let layout = compiler
        .type_checker
        .member(&structure, &member.member)?
        .clone();
    let field = compiler
        .builder
        .build_struct_gep(pointer, layout.index, &layout.name)?;

    match (&member.index, layout.member_type) {
        (Some(index), Type::Array { element, .. }) => {
            let extents = layout
                .extents
                .iter()
                .map(|extent| compiler.const_integer(*extent))
                .collect::<Vec<IntValue<'a>>>();
            let offset = flatten_indices(compiler, &index.indices, &extents, index.position)?;
            let zero = compiler.const_integer(0);
            let pointer = unsafe {
                compiler
                    .builder
                    .build_in_bounds_gep(field, &[zero, offset], &layout.name)?
            };
            Ok((pointer, *element))
        }
        (Some(index), other) => Err(Error::new(
            ErrorImpl::TypeMismatch {
                expected: String::from("an array"),
                received: other.to_string(),
            },
            index.position,
        )),
        (None, array @ Type::Array { .. }) => {
            let zero = compiler.const_integer(0);
            let pointer = unsafe {
                compiler
                    .builder
                    .build_in_bounds_gep(field, &[zero, zero], &layout.name)?
            };
            Ok((pointer, array))
        }
        (None, member_type) => Ok((field, member_type)),
    }
}
