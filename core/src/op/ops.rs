use core::cmp::Ordering;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::{val::Val, vm::ErrorKind};

pub(crate) fn err_op<R>(l: &Val, op: BinOp, r: &Val) -> Result<R, ErrorKind> {
    Err(ErrorKind::TypeMismatch {
        op: op.symbol(),
        lhs: l.type_name(),
        rhs: Some(r.type_name()),
    })
}

pub(crate) fn err_unary<R>(op: UnaryOp, v: &Val) -> Result<R, ErrorKind> {
    Err(ErrorKind::TypeMismatch {
        op: op.symbol(),
        lhs: v.type_name(),
        rhs: None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }

    pub fn eval_val(self, val: &Val) -> Result<Val, ErrorKind> {
        match self {
            UnaryOp::Neg => -val,
            UnaryOp::Not => match val {
                Val::Bool(b) => Ok(Val::Bool(!b)),
                _ => err_unary(self, val),
            },
        }
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Binary operators with a fixed arity of two.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Gt => ">",
            BinOp::Lt => "<",
            BinOp::Ge => ">=",
            BinOp::Le => "<=",
        }
    }

    pub fn is_arith(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod)
    }

    pub fn is_cmp(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le
        )
    }

    fn arith(self, l: &Val, r: &Val) -> Result<Val, ErrorKind> {
        match self {
            BinOp::Add => l + r,
            BinOp::Sub => l - r,
            BinOp::Mul => l * r,
            BinOp::Div => l / r,
            BinOp::Mod => l % r,
            _ => err_op(l, self, r),
        }
    }

    /// Equality is total; ordering only exists between two numbers or two
    /// strings.
    pub fn cmp(self, l: &Val, r: &Val) -> Result<bool, ErrorKind> {
        match self {
            BinOp::Eq => Ok(l == r),
            BinOp::Ne => Ok(l != r),
            _ => {
                let ord = match l.partial_cmp(r) {
                    Some(ord) => ord,
                    None if l.is_numeric() && r.is_numeric() => {
                        return Err(ErrorKind::Unordered { op: self.symbol() });
                    }
                    None => return err_op(l, self, r),
                };

                match self {
                    BinOp::Gt => Ok(ord == Ordering::Greater),
                    BinOp::Lt => Ok(ord == Ordering::Less),
                    BinOp::Ge => Ok(ord != Ordering::Less),
                    BinOp::Le => Ok(ord != Ordering::Greater),
                    _ => err_op(l, self, r),
                }
            }
        }
    }

    pub fn eval_vals(self, l_val: &Val, r_val: &Val) -> Result<Val, ErrorKind> {
        if self.is_arith() {
            self.arith(l_val, r_val)
        } else {
            Ok(Val::Bool(self.cmp(l_val, r_val)?))
        }
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}
