//! Read-only tables a compiled unit shares with every frame activated from it.

use std::sync::Arc;

use crate::val::Val;

use super::error::ErrorKind;

/// Immutable, indexed sequence of literal values.
#[derive(Debug, Clone, Default)]
pub struct ConstPool {
    values: Arc<[Val]>,
}

impl ConstPool {
    pub fn new(values: Vec<Val>) -> Self {
        Self {
            values: Arc::from(values),
        }
    }

    #[inline]
    pub fn get(&self, index: u32) -> Result<&Val, ErrorKind> {
        self.values
            .get(index as usize)
            .ok_or(ErrorKind::ConstIndexOutOfRange {
                index,
                len: self.values.len(),
            })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Val> {
        self.values.iter()
    }

    /// True when both pools are the same allocation.
    pub fn shares_storage(&self, other: &ConstPool) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

/// Immutable, indexed sequence of identifiers used for builtin and method lookups.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: Arc<[Arc<str>]>,
}

impl NameTable {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn get(&self, index: u16) -> Result<&Arc<str>, ErrorKind> {
        self.names
            .get(index as usize)
            .ok_or(ErrorKind::NameIndexOutOfRange {
                index,
                len: self.names.len(),
            })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|name| name.as_ref())
    }
}
