use crate::op::{BinOp, UnaryOp};
use crate::val::Val;
use crate::vm::error::ErrorKind;
use crate::vm::vm::frame::Frame;

#[inline]
fn int_fast(op: BinOp, a: i64, b: i64) -> Option<Result<Val, ErrorKind>> {
    let overflow = || ErrorKind::ArithmeticOverflow { op: op.symbol() };
    Some(match op {
        BinOp::Add => a.checked_add(b).map(Val::Int).ok_or_else(overflow),
        BinOp::Sub => a.checked_sub(b).map(Val::Int).ok_or_else(overflow),
        BinOp::Mul => a.checked_mul(b).map(Val::Int).ok_or_else(overflow),
        BinOp::Lt => Ok(Val::Bool(a < b)),
        BinOp::Le => Ok(Val::Bool(a <= b)),
        BinOp::Gt => Ok(Val::Bool(a > b)),
        BinOp::Ge => Ok(Val::Bool(a >= b)),
        BinOp::Eq => Ok(Val::Bool(a == b)),
        BinOp::Ne => Ok(Val::Bool(a != b)),
        // zero-divisor checks live in the generic path
        BinOp::Div | BinOp::Mod => return None,
    })
}

#[inline]
fn float_fast(op: BinOp, a: f64, b: f64) -> Option<Val> {
    Some(match op {
        BinOp::Add => Val::Float(a + b),
        BinOp::Sub => Val::Float(a - b),
        BinOp::Mul => Val::Float(a * b),
        _ => return None,
    })
}

/// Pop two operands, apply `op`, push the result.
#[inline]
pub(super) fn exec_binary(frame: &mut Frame, op: BinOp) -> Result<(), ErrorKind> {
    let rhs = frame.pop()?;
    let lhs = frame.pop()?;
    let fast = match (&lhs, &rhs) {
        (Val::Int(a), Val::Int(b)) => int_fast(op, *a, *b).transpose()?,
        (Val::Float(a), Val::Float(b)) => float_fast(op, *a, *b),
        _ => None,
    };
    let value = match fast {
        Some(value) => value,
        None => {
            tracing::trace!(
                target: "bvm::vm::slowpath",
                op = %op,
                lhs = lhs.type_name(),
                rhs = rhs.type_name(),
                "binary op fallback"
            );
            op.eval_vals(&lhs, &rhs)?
        }
    };
    frame.push(value)
}

#[inline]
pub(super) fn exec_unary(frame: &mut Frame, op: UnaryOp) -> Result<(), ErrorKind> {
    let val = frame.pop()?;
    let value = op.eval_val(&val)?;
    frame.push(value)
}

/// Conditions must be `Bool`; nothing is coerced.
#[inline]
pub(super) fn expect_bool(val: &Val, op: &'static str) -> Result<bool, ErrorKind> {
    match val {
        Val::Bool(b) => Ok(*b),
        other => Err(ErrorKind::TypeMismatch {
            op,
            lhs: other.type_name(),
            rhs: None,
        }),
    }
}
