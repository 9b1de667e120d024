use std::cmp::Ordering;
use std::sync::Arc;

use crate::module::BuiltinHandle;

mod closure;
mod convert;
mod ops;
mod types;

pub use closure::Closure;
pub use types::Type;


/// Runtime datum flowing through operand stacks, slots and constant pools.
///
/// Values are immutable. Payloads that would be expensive to copy are behind
/// an [`Arc`], so cloning a value never deep-copies.
#[derive(Debug, Clone, Default)]
pub enum Val {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Text, wrapped in Arc<str> for cheap cloning
    Str(Arc<str>),
    /// Compiled unit plus its copy-captured values
    Callable(Closure),
    /// Handle into the builtin resolver's registry
    Builtin(BuiltinHandle),
}

impl Val {
    #[inline]
    pub fn type_of(&self) -> Type {
        Type::of(self)
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_of().name()
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Val::Nil)
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Val::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Val::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value; Int promotes to Float.
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Val::Float(f) => Some(*f),
            Val::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Val::Int(_) | Val::Float(_))
    }

    /// True for Int 0 and Float ±0.0.
    #[inline]
    pub(crate) fn is_numeric_zero(&self) -> bool {
        match self {
            Val::Int(i) => *i == 0,
            Val::Float(f) => *f == 0.0,
            _ => false,
        }
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Nil, Val::Nil) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Float(a), Val::Float(b)) => a == b,
            (Val::Int(a), Val::Float(b)) | (Val::Float(b), Val::Int(a)) => {
                int_float_cmp(*a, *b) == Some(Ordering::Equal)
            }
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Callable(a), Val::Callable(b)) => a == b,
            (Val::Builtin(a), Val::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

/// 2^63, the first float past `i64::MAX`.
const I64_END: f64 = 9_223_372_036_854_775_808.0;

/// Exact ordering of an Int against a Float, without rounding the Int.
fn int_float_cmp(i: i64, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f >= I64_END {
        return Some(Ordering::Less);
    }
    if f < -I64_END {
        return Some(Ordering::Greater);
    }
    // in range, so the integral part converts exactly
    let whole = f.trunc();
    Some(i.cmp(&(whole as i64)).then_with(|| whole.partial_cmp(&f).unwrap_or(Ordering::Equal)))
}

impl PartialOrd for Val {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a.partial_cmp(b),
            (Val::Float(a), Val::Float(b)) => a.partial_cmp(b),
            (Val::Int(a), Val::Float(b)) => int_float_cmp(*a, *b),
            (Val::Float(a), Val::Int(b)) => int_float_cmp(*b, *a).map(Ordering::reverse),
            (Val::Str(a), Val::Str(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl core::fmt::Display for Val {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Val::Nil => write!(f, "nil"),
            Val::Bool(b) => write!(f, "{b}"),
            Val::Int(i) => write!(f, "{i}"),
            Val::Float(fl) => {
                if fl.is_finite() {
                    let mut buf = ryu::Buffer::new();
                    f.write_str(buf.format_finite(*fl))
                } else {
                    write!(f, "{fl}")
                }
            }
            Val::Str(s) => write!(f, "{}", s.as_ref()),
            Val::Callable(closure) => write!(f, "<fn {}/{}>", closure.name(), closure.unit().arity()),
            Val::Builtin(handle) => write!(f, "<builtin #{}>", handle.index()),
        }
    }
}
