//! The type lattice of the language.

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Integer,
    Float,
    /// Result of a comparison; an Integer 0/1 when used as a value.
    Boolean,
    String,
    /// Return type of functions without a value.
    Void,
    /// Nominal: two struct types are equal when their names are.
    Struct(String),
    /// Element type and number of dimensions; extents are not part of the type.
    Array { element: Box<Type>, dims: usize },
    Function(FunctionType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub name: String,
    pub return_type: Box<Type>,
    pub parameters: Vec<Type>,
    pub is_variadic: bool,
    pub is_external: bool,
}

impl FunctionType {
    /// Two declarations describe the same callable.
    pub fn same_signature(&self, other: &FunctionType) -> bool {
        self.return_type == other.return_type
            && self.parameters == other.parameters
            && self.is_variadic == other.is_variadic
    }
}

/// Implicit conversion the code generator has to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    None,
    IntToFloat,
    BoolToInt,
    BoolToFloat,
}

impl Type {
    pub fn array(element: Type, dims: usize) -> Self {
        Type::Array {
            element: Box::new(element),
            dims,
        }
    }

    /// Integer, Float or a comparison result.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Float | Type::Boolean)
    }

    /// Types that can live in a variable.
    pub fn is_storable(&self) -> bool {
        !matches!(self, Type::Void | Type::Function(_) | Type::Boolean)
    }

    /// Decides whether a value of type `self` can be used where `target` is
    /// expected, and which conversion that takes.
    ///
    /// Integer widens to Float; everything else must match exactly, with
    /// structs compared by name and arrays by element type and dimensionality.
    pub fn coerce_to(&self, target: &Type) -> Option<Coercion> {
        match (self, target) {
            (Type::Integer, Type::Float) => Some(Coercion::IntToFloat),
            (Type::Boolean, Type::Integer) => Some(Coercion::BoolToInt),
            (Type::Boolean, Type::Float) => Some(Coercion::BoolToFloat),
            (Type::Void, _) | (_, Type::Void) => None,
            (Type::Function(_), _) | (_, Type::Function(_)) => None,
            (from, to) if from == to => Some(Coercion::None),
            _ => None,
        }
    }

    /// The type both operands of an arithmetic or comparison operator are
    /// converted to: Float if either side is Float, Integer otherwise.
    pub fn unify_arithmetic(left: &Type, right: &Type) -> Option<Type> {
        if !left.is_numeric() || !right.is_numeric() {
            return None;
        }

        if *left == Type::Float || *right == Type::Float {
            Some(Type::Float)
        } else {
            Some(Type::Integer)
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Integer => write!(f, "int"),
            Type::Float => write!(f, "double"),
            Type::Boolean => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Struct(name) => write!(f, "{}", name),
            Type::Array { element, dims } => write!(f, "{}{}", element, "[]".repeat(*dims)),
            Type::Function(function) => {
                let parameters = function
                    .parameters
                    .iter()
                    .map(|parameter| parameter.to_string())
                    .collect::<Vec<String>>();
                let variadic = if function.is_variadic { ", ..." } else { "" };
                write!(
                    f,
                    "fn({}{}) -> {}",
                    parameters.join(", "),
                    variadic,
                    function.return_type
                )
            }
        }
    }
}
