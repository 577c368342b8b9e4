use std::collections::HashMap;

use crate::{
    ast::{ast::Identifier, expressions::BinaryOperator},
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::types::{Coercion, Type};

/// Size in bytes of every scalar value (`i64`, `double`, `i8*`).
pub const SCALAR_SIZE: u64 = 8;

/// Number of elements of an array with the given extents, or
/// `InvalidArraySize` when the count does not fit an LLVM array type.
pub fn element_count(name: &str, extents: &[u64], position: Position) -> Result<u32, Error> {
    extents
        .iter()
        .try_fold(1u64, |count, extent| count.checked_mul(*extent))
        .and_then(|count| u32::try_from(count).ok())
        .ok_or_else(|| {
            Error::new(
                ErrorImpl::InvalidArraySize {
                    message: format!("`{}` has too many elements", name),
                },
                position,
            )
        })
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMemberLayout {
    pub name: String,
    pub member_type: Type,
    /// Field index in the lowered struct, equal to the declaration index.
    pub index: u32,
    /// Constant extents when the member is an array, empty otherwise.
    pub extents: Vec<u64>,
    pub byte_offset: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    pub name: String,
    pub members: Vec<StructMemberLayout>,
    pub size: u64,
}

impl StructLayout {
    pub fn member(&self, name: &str) -> Option<&StructMemberLayout> {
        self.members.iter().find(|member| member.name == name)
    }
}

/// Type registry of one generation context.
///
/// Knows the built-in scalar names and every struct declared so far, and
/// owns the coercion policy used by the code generator.
#[derive(Debug, Default)]
pub struct TypeChecker {
    structs: HashMap<String, StructLayout>,
}

impl TypeChecker {
    pub fn new() -> Self {
        TypeChecker {
            structs: HashMap::new(),
        }
    }

    fn builtin_type(name: &str) -> Option<Type> {
        match name {
            "int" => Some(Type::Integer),
            "double" | "float" => Some(Type::Float),
            "string" => Some(Type::String),
            "void" => Some(Type::Void),
            _ => None,
        }
    }

    /// Resolves a type identifier to a scalar, a declared struct, or an array
    /// of either.
    pub fn resolve_type(&self, identifier: &Identifier) -> Result<Type, Error> {
        let base = if let Some(builtin) = TypeChecker::builtin_type(&identifier.name) {
            builtin
        } else if self.structs.contains_key(&identifier.name) {
            Type::Struct(identifier.name.clone())
        } else {
            return Err(Error::new(
                ErrorImpl::UnknownType {
                    type_: identifier.name.clone(),
                },
                identifier.position,
            ));
        };

        if identifier.is_array {
            if base == Type::Void {
                return Err(Error::new(
                    ErrorImpl::UnknownType {
                        type_: String::from("void[]"),
                    },
                    identifier.position,
                ));
            }
            Ok(Type::array(base, identifier.array_size.len()))
        } else {
            Ok(base)
        }
    }

    /// Registers a struct and assigns member offsets in declaration order.
    ///
    /// `members` holds each member's name, resolved type and constant extents.
    pub fn declare_struct(
        &mut self,
        name: &Identifier,
        members: Vec<(Identifier, Type, Vec<u64>)>,
    ) -> Result<&StructLayout, Error> {
        if self.structs.contains_key(&name.name) || TypeChecker::builtin_type(&name.name).is_some()
        {
            return Err(Error::new(
                ErrorImpl::DuplicateDeclaration {
                    name: name.name.clone(),
                },
                name.position,
            ));
        }

        let mut layout = StructLayout {
            name: name.name.clone(),
            members: vec![],
            size: 0,
        };

        for (index, (member, member_type, extents)) in members.into_iter().enumerate() {
            if layout.member(&member.name).is_some() {
                return Err(Error::new(
                    ErrorImpl::DuplicateDeclaration { name: member.name },
                    member.position,
                ));
            }
            if !member_type.is_storable() {
                return Err(Error::new(
                    ErrorImpl::TypeMismatch {
                        expected: String::from("a storable member type"),
                        received: member_type.to_string(),
                    },
                    member.position,
                ));
            }

            let total = self
                .size_of(&member_type, &extents)
                .and_then(|size| layout.size.checked_add(size));
            let total = match total {
                Some(total) => total,
                None => {
                    return Err(Error::new(
                        ErrorImpl::InvalidArraySize {
                            message: format!("struct `{}` is too large", name.name),
                        },
                        member.position,
                    ))
                }
            };
            layout.members.push(StructMemberLayout {
                name: member.name,
                member_type,
                index: index as u32,
                extents,
                byte_offset: layout.size,
            });
            layout.size = total;
        }

        self.structs.insert(name.name.clone(), layout);
        Ok(&self.structs[&name.name])
    }

    /// Looks up `member` in the struct named `structure`.
    pub fn member(&self, structure: &str, member: &Identifier) -> Result<&StructMemberLayout, Error> {
        self.structs
            .get(structure)
            .and_then(|layout| layout.member(&member.name))
            .ok_or_else(|| {
                Error::new(
                    ErrorImpl::UnknownMember {
                        structure: structure.to_string(),
                        member: member.name.clone(),
                    },
                    member.position,
                )
            })
    }

    /// Storage size of a value of `ty`; `extents` are the array extents when
    /// `ty` is an array. `None` when the size overflows.
    pub fn size_of(&self, ty: &Type, extents: &[u64]) -> Option<u64> {
        match ty {
            Type::Struct(name) => Some(self.structs.get(name).map(|layout| layout.size).unwrap_or(0)),
            Type::Array { element, .. } => extents
                .iter()
                .try_fold(self.size_of(element, &[])?, |size, extent| size.checked_mul(*extent)),
            Type::Void | Type::Function(_) => Some(0),
            Type::Integer | Type::Float | Type::Boolean | Type::String => Some(SCALAR_SIZE),
        }
    }

    /// Coercion needed to store a `from` value into a `to` location, or a
    /// `TypeMismatch` at `position`.
    pub fn check_coercion(&self, from: &Type, to: &Type, position: Position) -> Result<Coercion, Error> {
        from.coerce_to(to).ok_or_else(|| {
            Error::new(
                ErrorImpl::TypeMismatch {
                    expected: to.to_string(),
                    received: from.to_string(),
                },
                position,
            )
        })
    }

    /// Operand type of a binary operator, `TypeMismatch` for non-numeric
    /// operands or bitwise operators on floats.
    pub fn check_binary(
        &self,
        operator: BinaryOperator,
        left: &Type,
        right: &Type,
        position: Position,
    ) -> Result<Type, Error> {
        let unified = Type::unify_arithmetic(left, right).ok_or_else(|| {
            let received = if left.is_numeric() { right } else { left };
            Error::new(
                ErrorImpl::TypeMismatch {
                    expected: String::from("int or double"),
                    received: received.to_string(),
                },
                position,
            )
        })?;

        if operator.is_bitwise() && unified == Type::Float {
            return Err(Error::new(
                ErrorImpl::TypeMismatch {
                    expected: Type::Integer.to_string(),
                    received: Type::Float.to_string(),
                },
                position,
            ));
        }

        Ok(unified)
    }
}
