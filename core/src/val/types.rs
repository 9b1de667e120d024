use std::fmt;

use super::Val;

/// Runtime type tag of a [`Val`]; keys receiver-method lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Nil,
    Bool,
    Int,
    Float,
    String,
    Function,
    Builtin,
}

impl Type {
    #[inline]
    pub fn of(val: &Val) -> Self {
        match val {
            Val::Nil => Type::Nil,
            Val::Bool(_) => Type::Bool,
            Val::Int(_) => Type::Int,
            Val::Float(_) => Type::Float,
            Val::Str(_) => Type::String,
            Val::Callable(_) => Type::Function,
            Val::Builtin(_) => Type::Builtin,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::Nil => "Nil",
            Type::Bool => "Bool",
            Type::Int => "Int",
            Type::Float => "Float",
            Type::String => "String",
            Type::Function => "Function",
            Type::Builtin => "Builtin",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
