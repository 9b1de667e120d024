use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

use crate::op::{BinOp, UnaryOp, err_op, err_unary};
use crate::vm::ErrorKind;

use super::Val;

type OpResult = Result<Val, ErrorKind>;

#[inline]
fn overflow(op: BinOp) -> ErrorKind {
    ErrorKind::ArithmeticOverflow { op: op.symbol() }
}

impl Add for &Val {
    type Output = OpResult;

    /// Only Str + Str concatenates; text never mixes with numbers.
    #[inline]
    fn add(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a.checked_add(*b).map(Val::Int).ok_or_else(|| overflow(BinOp::Add)),
            (Val::Float(a), Val::Float(b)) => Ok(Val::Float(a + b)),
            (Val::Float(a), Val::Int(b)) => Ok(Val::Float(a + *b as f64)),
            (Val::Int(a), Val::Float(b)) => Ok(Val::Float(*a as f64 + b)),
            (Val::Str(a), Val::Str(b)) => {
                if a.is_empty() {
                    return Ok(Val::Str(b.clone()));
                }
                if b.is_empty() {
                    return Ok(Val::Str(a.clone()));
                }
                let mut out = String::with_capacity(a.len() + b.len());
                out.push_str(a);
                out.push_str(b);
                Ok(out.into())
            }
            _ => err_op(self, BinOp::Add, other),
        }
    }
}

impl Sub for &Val {
    type Output = OpResult;

    #[inline]
    fn sub(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a.checked_sub(*b).map(Val::Int).ok_or_else(|| overflow(BinOp::Sub)),
            (Val::Float(a), Val::Float(b)) => Ok((a - b).into()),
            (Val::Float(a), Val::Int(b)) => Ok((a - *b as f64).into()),
            (Val::Int(a), Val::Float(b)) => Ok((*a as f64 - b).into()),
            _ => err_op(self, BinOp::Sub, other),
        }
    }
}

impl Mul for &Val {
    type Output = OpResult;

    #[inline]
    fn mul(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a.checked_mul(*b).map(Val::Int).ok_or_else(|| overflow(BinOp::Mul)),
            (Val::Float(a), Val::Float(b)) => Ok((a * b).into()),
            (Val::Float(a), Val::Int(b)) => Ok((a * *b as f64).into()),
            (Val::Int(a), Val::Float(b)) => Ok((*a as f64 * b).into()),
            _ => err_op(self, BinOp::Mul, other),
        }
    }
}

impl Div for &Val {
    type Output = OpResult;

    /// A zero divisor is fatal for every numeric type and is detected before
    /// the dividend's type is looked at. Int / Int truncates toward zero.
    #[inline]
    fn div(self, other: Self) -> Self::Output {
        if other.is_numeric_zero() {
            return Err(ErrorKind::DivisionByZero);
        }
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a.checked_div(*b).map(Val::Int).ok_or_else(|| overflow(BinOp::Div)),
            (Val::Float(a), Val::Float(b)) => Ok((a / b).into()),
            (Val::Float(a), Val::Int(b)) => Ok((a / *b as f64).into()),
            (Val::Int(a), Val::Float(b)) => Ok((*a as f64 / b).into()),
            _ => err_op(self, BinOp::Div, other),
        }
    }
}

impl Rem for &Val {
    type Output = OpResult;

    /// Remainder takes the sign of the dividend.
    #[inline]
    fn rem(self, other: Self) -> Self::Output {
        if other.is_numeric_zero() {
            return Err(ErrorKind::DivisionByZero);
        }
        match (self, other) {
            // only MIN % -1 wraps, and its true remainder is 0
            (Val::Int(a), Val::Int(b)) => Ok(Val::Int(a.wrapping_rem(*b))),
            (Val::Float(a), Val::Float(b)) => Ok((a % b).into()),
            (Val::Float(a), Val::Int(b)) => Ok((a % *b as f64).into()),
            (Val::Int(a), Val::Float(b)) => Ok((*a as f64 % b).into()),
            _ => err_op(self, BinOp::Mod, other),
        }
    }
}

impl Neg for &Val {
    type Output = OpResult;

    #[inline]
    fn neg(self) -> Self::Output {
        match self {
            Val::Int(a) => a
                .checked_neg()
                .map(Val::Int)
                .ok_or(ErrorKind::ArithmeticOverflow { op: UnaryOp::Neg.symbol() }),
            Val::Float(a) => Ok(Val::Float(-a)),
            _ => err_unary(UnaryOp::Neg, self),
        }
    }
}
