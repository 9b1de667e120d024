//! Fatal error model of the dispatch engine.
//!
//! Nothing inside the core recovers from these: the failing frame and every
//! caller are unwound and a single [`VmError`] reaches the embedder.

use std::fmt;
use std::sync::Arc;

use crate::module::Arity;

use super::bytecode::Op;

/// Coarse classification used by embedders to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The bytecode unit itself is broken (a compiler defect).
    MalformedUnit,
    OperandStack,
    Type,
    Resolution,
    Arithmetic,
    /// A builtin reported failure.
    Native,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    ConstIndexOutOfRange { index: u32, len: usize },
    NameIndexOutOfRange { index: u16, len: usize },
    SlotIndexOutOfRange { index: u16, len: usize },
    CaptureIndexOutOfRange { index: u16, len: usize },
    ProtoIndexOutOfRange { index: u32, len: usize },
    JumpOutOfRange { target: u32, len: usize },
    CaptureCountMismatch { expected: usize, got: usize },
    StackDepthMismatch { expected: usize, found: usize },
    InvalidArity { arity: u16, locals: u16 },
    /// A unit table grew past what its operand width can address.
    TableOverflow { table: &'static str, index: usize },
    /// Jump patch aimed at an instruction that is not a jump.
    NotAJump { at: usize },
    /// Control ran past the last instruction without a Return.
    CodeOverrun,

    StackUnderflow,
    StackOverflow { limit: usize },
    CallDepthExceeded { limit: usize },

    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: Option<&'static str>,
    },
    /// Ordering comparison involving NaN.
    Unordered { op: &'static str },
    NotCallable { type_name: &'static str },
    ArityMismatch {
        callee: Arc<str>,
        expected: Arity,
        got: usize,
    },

    UnresolvedName { name: Arc<str> },
    UnresolvedMethod { receiver: &'static str, name: Arc<str> },

    DivisionByZero,
    ArithmeticOverflow { op: &'static str },

    Native { name: Arc<str>, message: String },
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            ConstIndexOutOfRange { .. }
            | NameIndexOutOfRange { .. }
            | SlotIndexOutOfRange { .. }
            | CaptureIndexOutOfRange { .. }
            | ProtoIndexOutOfRange { .. }
            | JumpOutOfRange { .. }
            | CaptureCountMismatch { .. }
            | StackDepthMismatch { .. }
            | InvalidArity { .. }
            | TableOverflow { .. }
            | NotAJump { .. }
            | CodeOverrun => ErrorCategory::MalformedUnit,
            StackUnderflow | StackOverflow { .. } | CallDepthExceeded { .. } => ErrorCategory::OperandStack,
            TypeMismatch { .. } | Unordered { .. } | NotCallable { .. } | ArityMismatch { .. } => ErrorCategory::Type,
            UnresolvedName { .. } | UnresolvedMethod { .. } => ErrorCategory::Resolution,
            DivisionByZero | ArithmeticOverflow { .. } => ErrorCategory::Arithmetic,
            Native { .. } => ErrorCategory::Native,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ErrorKind::*;
        match self {
            ConstIndexOutOfRange { index, len } => write!(f, "constant index {index} out of range (pool has {len})"),
            NameIndexOutOfRange { index, len } => write!(f, "name index {index} out of range (table has {len})"),
            SlotIndexOutOfRange { index, len } => write!(f, "slot index {index} out of range (frame has {len})"),
            CaptureIndexOutOfRange { index, len } => {
                write!(f, "capture index {index} out of range (closure has {len})")
            }
            ProtoIndexOutOfRange { index, len } => write!(f, "prototype index {index} out of range (unit has {len})"),
            JumpOutOfRange { target, len } => write!(f, "jump target {target} out of range (code has {len})"),
            CaptureCountMismatch { expected, got } => write!(f, "closure expects {expected} captures, got {got}"),
            StackDepthMismatch { expected, found } => {
                write!(f, "operand stack depth mismatch: {expected} on one path, {found} on another")
            }
            InvalidArity { arity, locals } => write!(f, "arity {arity} exceeds declared local count {locals}"),
            TableOverflow { table, index } => write!(f, "{table} index {index} does not fit its operand"),
            NotAJump { at } => write!(f, "instruction {at} is not a jump"),
            CodeOverrun => write!(f, "instruction pointer ran past the end of the code"),
            StackUnderflow => write!(f, "operand stack underflow"),
            StackOverflow { limit } => write!(f, "operand stack overflow (limit {limit})"),
            CallDepthExceeded { limit } => write!(f, "call depth exceeded (limit {limit})"),
            TypeMismatch { op, lhs, rhs: Some(rhs) } => write!(f, "invalid operands: {lhs} {op} {rhs}"),
            TypeMismatch { op, lhs, rhs: None } => write!(f, "invalid operand for '{op}': {lhs}"),
            Unordered { op } => write!(f, "unordered comparison with NaN: {op}"),
            NotCallable { type_name } => write!(f, "value of type {type_name} is not callable"),
            ArityMismatch { callee, expected, got } => {
                write!(f, "{callee} expects {expected} arguments, got {got}")
            }
            UnresolvedName { name } => write!(f, "unresolved name '{name}'"),
            UnresolvedMethod { receiver, name } => write!(f, "no method '{name}' on {receiver}"),
            DivisionByZero => write!(f, "division by zero"),
            ArithmeticOverflow { op } => write!(f, "integer overflow in '{op}'"),
            Native { name, message } => write!(f, "{name}: {message}"),
        }
    }
}

impl std::error::Error for ErrorKind {}

/// One pending activation at the moment of failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub unit: Arc<str>,
    /// Offset of the instruction the frame was executing (the Call, for callers).
    pub pc: usize,
    pub depth: usize,
}

/// Structured fatal error surfaced to the embedder.
#[derive(Debug, Clone)]
pub struct VmError {
    pub kind: ErrorKind,
    pub op: Option<Op>,
    pub pc: usize,
    pub depth: usize,
    /// Innermost activation first.
    pub trace: Vec<TraceEntry>,
}

impl VmError {
    pub(crate) fn malformed(unit: &Arc<str>, pc: usize, op: Option<Op>, kind: ErrorKind) -> Self {
        Self {
            kind,
            op,
            pc,
            depth: 0,
            trace: vec![TraceEntry {
                unit: Arc::clone(unit),
                pc,
                depth: 0,
            }],
        }
    }

    /// Error raised outside any frame (e.g. a direct builtin call from the embedder).
    pub(crate) fn detached(kind: ErrorKind) -> Self {
        Self {
            kind,
            op: None,
            pc: 0,
            depth: 0,
            trace: Vec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    #[inline]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Unit names of the unwound activations, innermost first.
    pub fn trace_names(&self) -> Vec<&str> {
        self.trace.iter().map(|entry| entry.unit.as_ref()).collect()
    }

    /// Formatted call stack, in the same layout the VM prints on failure.
    pub fn call_stack_report(&self) -> Option<String> {
        if self.trace.is_empty() {
            return None;
        }
        let mut msg = String::from("Call stack:\n");
        for entry in &self.trace {
            msg.push_str("  [");
            msg.push_str(&entry.depth.to_string());
            msg.push_str("] ");
            msg.push_str(entry.unit.as_ref());
            msg.push_str(" at pc ");
            msg.push_str(&entry.pc.to_string());
            msg.push('\n');
        }
        Some(msg)
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(op) = &self.op {
            write!(f, " (at pc {}: {})", self.pc, op)?;
        }
        if let Some(report) = self.call_stack_report() {
            write!(f, "\n\n{report}")?;
        }
        Ok(())
    }
}

impl std::error::Error for VmError {}
