use crate::val::Val;
use crate::vm::error::ErrorKind;

/// Per-frame LIFO of operand values with a hard depth limit.
///
/// Popping an empty stack is an error, never a default value.
#[derive(Debug, Clone)]
pub struct OperandStack {
    values: Vec<Val>,
    limit: usize,
}

impl OperandStack {
    pub fn new(limit: usize) -> Self {
        Self::with_capacity(0, limit)
    }

    /// Pre-allocate `capacity` slots (clamped to `limit`).
    pub fn with_capacity(capacity: usize, limit: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity.min(limit)),
            limit,
        }
    }

    #[inline]
    pub fn push(&mut self, val: Val) -> Result<(), ErrorKind> {
        if self.values.len() >= self.limit {
            return Err(ErrorKind::StackOverflow { limit: self.limit });
        }
        self.values.push(val);
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Result<Val, ErrorKind> {
        self.values.pop().ok_or(ErrorKind::StackUnderflow)
    }

    #[inline]
    pub fn peek(&self) -> Result<&Val, ErrorKind> {
        self.values.last().ok_or(ErrorKind::StackUnderflow)
    }

    /// Pop the top `n` values, returned in the order they were pushed.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Val>, ErrorKind> {
        let len = self.values.len();
        if n > len {
            return Err(ErrorKind::StackUnderflow);
        }
        Ok(self.values.split_off(len - n))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bottom to top.
    #[inline]
    pub fn as_slice(&self) -> &[Val] {
        &self.values
    }
}
