//! Compile-time evaluation of constant expressions.
//!
//! Used where the generated code cannot compute a value at runtime: global
//! initializers and the extents of struct member arrays and global arrays.

use crate::ast::expressions::{BinaryOperator, Expr};

use super::types::Type;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Integer(i64),
    Float(f64),
}

impl ConstValue {
    pub fn get_type(&self) -> Type {
        match self {
            ConstValue::Integer(_) => Type::Integer,
            ConstValue::Float(_) => Type::Float,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            ConstValue::Integer(value) => *value as f64,
            ConstValue::Float(value) => *value,
        }
    }
}

/// Folds literals and operators over literals; `None` for anything that
/// needs runtime state or would trap (division by zero).
pub fn eval_const_expr(expression: &Expr) -> Option<ConstValue> {
    match expression {
        Expr::Integer(expr) => Some(ConstValue::Integer(expr.value)),
        Expr::Double(expr) => Some(ConstValue::Float(expr.value)),
        Expr::Binary(expr) => {
            let left = eval_const_expr(&expr.left)?;
            let right = eval_const_expr(&expr.right)?;
            match (left, right) {
                (ConstValue::Integer(left), ConstValue::Integer(right)) => {
                    eval_integer(expr.operator, left, right).map(ConstValue::Integer)
                }
                (left, right) => eval_float(expr.operator, left.as_f64(), right.as_f64()),
            }
        }
        _ => None,
    }
}

/// Evaluates an array extent: a constant integer.
pub fn eval_const_extent(expression: &Expr) -> Option<i64> {
    match eval_const_expr(expression)? {
        ConstValue::Integer(value) => Some(value),
        ConstValue::Float(_) => None,
    }
}

fn eval_integer(operator: BinaryOperator, left: i64, right: i64) -> Option<i64> {
    match operator {
        BinaryOperator::Plus => Some(left.wrapping_add(right)),
        BinaryOperator::Minus => Some(left.wrapping_sub(right)),
        BinaryOperator::Multiply => Some(left.wrapping_mul(right)),
        BinaryOperator::Divide => {
            if right != 0 {
                Some(left.wrapping_div(right))
            } else {
                None
            }
        }
        BinaryOperator::Modulo => {
            if right != 0 {
                Some(left.wrapping_rem(right))
            } else {
                None
            }
        }
        BinaryOperator::Equal => Some((left == right) as i64),
        BinaryOperator::NotEqual => Some((left != right) as i64),
        BinaryOperator::Less => Some((left < right) as i64),
        BinaryOperator::LessEqual => Some((left <= right) as i64),
        BinaryOperator::Greater => Some((left > right) as i64),
        BinaryOperator::GreaterEqual => Some((left >= right) as i64),
        BinaryOperator::BitAnd => Some(left & right),
        BinaryOperator::BitOr => Some(left | right),
        BinaryOperator::BitXor => Some(left ^ right),
        BinaryOperator::ShiftLeft => Some(left.wrapping_shl(right as u32)),
        BinaryOperator::ShiftRight => Some(left.wrapping_shr(right as u32)),
    }
}

fn eval_float(operator: BinaryOperator, left: f64, right: f64) -> Option<ConstValue> {
    let value = match operator {
        BinaryOperator::Plus => ConstValue::Float(left + right),
        BinaryOperator::Minus => ConstValue::Float(left - right),
        BinaryOperator::Multiply => ConstValue::Float(left * right),
        BinaryOperator::Divide => ConstValue::Float(left / right),
        BinaryOperator::Modulo => ConstValue::Float(left % right),
        BinaryOperator::Equal => ConstValue::Integer((left == right) as i64),
        BinaryOperator::NotEqual => ConstValue::Integer((left != right) as i64),
        BinaryOperator::Less => ConstValue::Integer((left < right) as i64),
        BinaryOperator::LessEqual => ConstValue::Integer((left <= right) as i64),
        BinaryOperator::Greater => ConstValue::Integer((left > right) as i64),
        BinaryOperator::GreaterEqual => ConstValue::Integer((left >= right) as i64),
        _ => return None,
    };
    Some(value)
}
