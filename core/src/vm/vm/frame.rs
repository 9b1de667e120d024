use std::sync::Arc;

use crate::module::Arity;
use crate::val::{Closure, Val};
use crate::vm::bytecode::{Op, Unit};
use crate::vm::error::ErrorKind;

use super::stack::OperandStack;

/// Fixed-size, index-addressed local variable storage of one activation.
///
/// Sized to the unit's declared local count; every slot starts as `Nil`.
#[derive(Debug, Clone)]
pub struct SlotTable {
    values: Vec<Val>,
}

impl SlotTable {
    pub fn new(n_locals: usize) -> Self {
        Self {
            values: vec![Val::Nil; n_locals],
        }
    }

    #[inline]
    pub fn load(&self, index: u16) -> Result<&Val, ErrorKind> {
        self.values.get(index as usize).ok_or(ErrorKind::SlotIndexOutOfRange {
            index,
            len: self.values.len(),
        })
    }

    #[inline]
    pub fn store(&mut self, index: u16, val: Val) -> Result<(), ErrorKind> {
        let len = self.values.len();
        match self.values.get_mut(index as usize) {
            Some(slot) => {
                *slot = val;
                Ok(())
            }
            None => Err(ErrorKind::SlotIndexOutOfRange { index, len }),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[Val] {
        &self.values
    }
}

/// Execution context of one activation of a compiled unit.
///
/// Owns its operand stack and slot table; the instruction stream, constant
/// pool and name table are shared with every other activation of the unit.
#[derive(Debug)]
pub struct Frame {
    closure: Closure,
    slots: SlotTable,
    stack: OperandStack,
    pc: usize,
    current: usize,
    depth: usize,
}

impl Frame {
    /// Activate `closure` with `args` bound to slots `0..arity`.
    pub fn new(closure: Closure, args: Vec<Val>, depth: usize, stack_limit: usize) -> Result<Self, ErrorKind> {
        let unit = closure.unit();
        let arity = unit.arity() as usize;
        if args.len() != arity {
            return Err(ErrorKind::ArityMismatch {
                callee: Arc::clone(unit.name_arc()),
                expected: Arity::Exact(unit.arity()),
                got: args.len(),
            });
        }
        let mut slots = SlotTable::new(unit.n_locals() as usize);
        for (slot, arg) in slots.values.iter_mut().zip(args) {
            *slot = arg;
        }
        let stack = OperandStack::with_capacity(unit.max_stack(), stack_limit);
        Ok(Self {
            closure,
            slots,
            stack,
            pc: 0,
            current: 0,
            depth,
        })
    }

    /// Next instruction; advances the instruction pointer.
    #[inline]
    pub fn fetch(&mut self) -> Result<Op, ErrorKind> {
        self.current = self.pc;
        let op = *self.closure.unit().code().get(self.pc).ok_or(ErrorKind::CodeOverrun)?;
        self.pc += 1;
        Ok(op)
    }

    #[inline]
    pub fn jump(&mut self, target: u32) {
        self.pc = target as usize;
    }

    #[inline]
    pub fn push(&mut self, val: Val) -> Result<(), ErrorKind> {
        self.stack.push(val)
    }

    #[inline]
    pub fn pop(&mut self) -> Result<Val, ErrorKind> {
        self.stack.pop()
    }

    #[inline]
    pub fn peek(&self) -> Result<&Val, ErrorKind> {
        self.stack.peek()
    }

    #[inline]
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Val>, ErrorKind> {
        self.stack.pop_n(n)
    }

    #[inline]
    pub fn load_slot(&self, index: u16) -> Result<Val, ErrorKind> {
        self.slots.load(index).cloned()
    }

    #[inline]
    pub fn store_slot(&mut self, index: u16, val: Val) -> Result<(), ErrorKind> {
        self.slots.store(index, val)
    }

    #[inline]
    pub fn constant(&self, index: u32) -> Result<Val, ErrorKind> {
        self.closure.unit().consts().get(index).cloned()
    }

    #[inline]
    pub fn name(&self, index: u16) -> Result<Arc<str>, ErrorKind> {
        self.closure.unit().names().get(index).cloned()
    }

    #[inline]
    pub fn capture(&self, index: u16) -> Result<Val, ErrorKind> {
        let captures = self.closure.captures();
        captures
            .get(index as usize)
            .cloned()
            .ok_or(ErrorKind::CaptureIndexOutOfRange {
                index,
                len: captures.len(),
            })
    }

    /// Offset of the next instruction to fetch.
    #[inline]
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Offset of the instruction most recently fetched.
    #[inline]
    pub fn current_pc(&self) -> usize {
        self.current
    }

    pub fn current_op(&self) -> Option<Op> {
        self.closure.unit().code().get(self.current).copied()
    }

    /// Position of this frame on the call stack (0 is the entry frame).
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    #[inline]
    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    #[inline]
    pub fn unit(&self) -> &Arc<Unit> {
        self.closure.unit()
    }

    #[inline]
    pub fn closure(&self) -> &Closure {
        &self.closure
    }

    /// The callable value this frame was activated from.
    pub fn callee(&self) -> Val {
        Val::Callable(self.closure.clone())
    }
}
