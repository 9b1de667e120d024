use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::sync::Arc;

use crate::op::BinOp;
use crate::val::Val;

use super::analysis;
use super::error::VmError;
use super::pool::{ConstPool, NameTable};

/// One stack-machine instruction.
///
/// Operands are indices into the owning unit's tables; jump targets are
/// absolute instruction offsets. All of them are validated once, when the
/// [`Unit`] is built.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Nop,
    LoadConst(u32 /*kidx*/),
    LoadNil,
    LoadBool(bool),
    LoadSlot(u16 /*slot*/),
    StoreSlot(u16 /*slot*/),
    LoadCapture(u16 /*idx*/),
    // Push the callable running in the current frame
    LoadCallee,
    Pop,
    Dup,
    Swap,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    // Comparisons -> Bool
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Not,
    // Control transfer
    Jump(u32 /*target*/),
    JumpIfFalse(u32),
    JumpIfTrue(u32),
    // Short-circuit helpers: when the branch is taken the tested value stays
    // on the stack as the result, otherwise it is popped.
    JumpIfFalseOrPop(u32),
    JumpIfTrueOrPop(u32),
    // Builtins and calls
    LoadName(u16 /*name*/),
    CallBuiltin(u16 /*name*/, u8 /*argc*/),
    CallMethod(u16 /*name*/, u8 /*argc*/),
    MakeClosure(u32 /*proto*/, u16 /*ncap*/),
    Call(u8 /*argc*/),
    Return,
}

impl Op {
    /// The binary operator this instruction applies, if any.
    #[inline]
    pub fn binary(self) -> Option<BinOp> {
        Some(match self {
            Op::Add => BinOp::Add,
            Op::Sub => BinOp::Sub,
            Op::Mul => BinOp::Mul,
            Op::Div => BinOp::Div,
            Op::Mod => BinOp::Mod,
            Op::Eq => BinOp::Eq,
            Op::Ne => BinOp::Ne,
            Op::Lt => BinOp::Lt,
            Op::Le => BinOp::Le,
            Op::Gt => BinOp::Gt,
            Op::Ge => BinOp::Ge,
            _ => return None,
        })
    }

    #[inline]
    pub fn jump_target(self) -> Option<u32> {
        match self {
            Op::Jump(t)
            | Op::JumpIfFalse(t)
            | Op::JumpIfTrue(t)
            | Op::JumpIfFalseOrPop(t)
            | Op::JumpIfTrueOrPop(t) => Some(t),
            _ => None,
        }
    }

    /// `(pops, pushes)` on the fall-through path.
    pub fn stack_effect(self) -> (usize, usize) {
        match self {
            Op::Nop | Op::Jump(_) => (0, 0),
            Op::LoadConst(_)
            | Op::LoadNil
            | Op::LoadBool(_)
            | Op::LoadSlot(_)
            | Op::LoadCapture(_)
            | Op::LoadCallee
            | Op::LoadName(_) => (0, 1),
            Op::StoreSlot(_) | Op::Pop => (1, 0),
            Op::Dup => (1, 2),
            Op::Swap => (2, 2),
            Op::Add
            | Op::Sub
            | Op::Mul
            | Op::Div
            | Op::Mod
            | Op::Eq
            | Op::Ne
            | Op::Lt
            | Op::Le
            | Op::Gt
            | Op::Ge => (2, 1),
            Op::Neg | Op::Not => (1, 1),
            Op::JumpIfFalse(_) | Op::JumpIfTrue(_) => (1, 0),
            Op::JumpIfFalseOrPop(_) | Op::JumpIfTrueOrPop(_) => (1, 0),
            Op::CallBuiltin(_, argc) => (argc as usize, 1),
            Op::CallMethod(_, argc) | Op::Call(argc) => (argc as usize + 1, 1),
            Op::MakeClosure(_, ncap) => (ncap as usize, 1),
            Op::Return => (1, 0),
        }
    }

    /// `(pops, pushes)` when a conditional branch is taken.
    pub fn branch_effect(self) -> Option<(usize, usize)> {
        match self {
            Op::Jump(_) => Some((0, 0)),
            Op::JumpIfFalse(_) | Op::JumpIfTrue(_) => Some((1, 0)),
            Op::JumpIfFalseOrPop(_) | Op::JumpIfTrueOrPop(_) => Some((1, 1)),
            _ => None,
        }
    }

    /// Whether execution can continue with the next instruction.
    #[inline]
    pub fn falls_through(self) -> bool {
        !matches!(self, Op::Jump(_) | Op::Return)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Nop => "NOP",
            Op::LoadConst(_) => "LOAD_CONST",
            Op::LoadNil => "LOAD_NIL",
            Op::LoadBool(_) => "LOAD_BOOL",
            Op::LoadSlot(_) => "LOAD_SLOT",
            Op::StoreSlot(_) => "STORE_SLOT",
            Op::LoadCapture(_) => "LOAD_CAPTURE",
            Op::LoadCallee => "LOAD_CALLEE",
            Op::Pop => "POP",
            Op::Dup => "DUP",
            Op::Swap => "SWAP",
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::Mod => "MOD",
            Op::Neg => "NEG",
            Op::Eq => "EQ",
            Op::Ne => "NE",
            Op::Lt => "LT",
            Op::Le => "LE",
            Op::Gt => "GT",
            Op::Ge => "GE",
            Op::Not => "NOT",
            Op::Jump(_) => "JUMP",
            Op::JumpIfFalse(_) => "JUMP_IF_FALSE",
            Op::JumpIfTrue(_) => "JUMP_IF_TRUE",
            Op::JumpIfFalseOrPop(_) => "JUMP_IF_FALSE_OR_POP",
            Op::JumpIfTrueOrPop(_) => "JUMP_IF_TRUE_OR_POP",
            Op::LoadName(_) => "LOAD_NAME",
            Op::CallBuiltin(..) => "CALL_BUILTIN",
            Op::CallMethod(..) => "CALL_METHOD",
            Op::MakeClosure(..) => "MAKE_CLOSURE",
            Op::Call(_) => "CALL",
            Op::Return => "RETURN",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())?;
        match *self {
            Op::LoadConst(k) => write!(f, " {k}"),
            Op::LoadBool(b) => write!(f, " {b}"),
            Op::LoadSlot(s) | Op::StoreSlot(s) | Op::LoadCapture(s) | Op::LoadName(s) => write!(f, " {s}"),
            Op::Jump(t)
            | Op::JumpIfFalse(t)
            | Op::JumpIfTrue(t)
            | Op::JumpIfFalseOrPop(t)
            | Op::JumpIfTrueOrPop(t) => write!(f, " {t}"),
            Op::CallBuiltin(n, argc) | Op::CallMethod(n, argc) => write!(f, " {n} {argc}"),
            Op::MakeClosure(p, ncap) => write!(f, " {p} {ncap}"),
            Op::Call(argc) => write!(f, " {argc}"),
            _ => Ok(()),
        }
    }
}

/// Raw pieces of a compiled unit, as handed over by the compiler.
#[derive(Debug, Clone, Default)]
pub struct UnitParts {
    pub name: String,
    pub arity: u16,
    pub n_locals: u16,
    pub n_captures: u16,
    pub code: Vec<Op>,
    pub consts: Vec<Val>,
    pub names: Vec<String>,
    pub protos: Vec<Arc<Unit>>,
}

/// A verified compiled unit: one function or script body.
///
/// Every frame activated from the unit shares its instruction stream,
/// constant pool and name table. A `Unit` only exists after verification, so
/// its indices and jump targets are known to be in bounds.
#[derive(Debug)]
pub struct Unit {
    name: Arc<str>,
    arity: u16,
    n_locals: u16,
    n_captures: u16,
    code: Vec<Op>,
    consts: ConstPool,
    names: NameTable,
    protos: Vec<Arc<Unit>>,
    max_stack: usize,
}

impl Unit {
    /// Verify `parts` and seal them into a shareable unit.
    pub fn new(parts: UnitParts) -> Result<Arc<Unit>, VmError> {
        let UnitParts {
            name,
            arity,
            n_locals,
            n_captures,
            code,
            consts,
            names,
            protos,
        } = parts;
        let mut unit = Unit {
            name: Arc::from(name),
            arity,
            n_locals,
            n_captures,
            code,
            consts: ConstPool::new(consts),
            names: NameTable::new(names),
            protos,
            max_stack: 0,
        };
        unit.max_stack = analysis::verify(&unit)?;
        Ok(Arc::new(unit))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    #[inline]
    pub fn arity(&self) -> u16 {
        self.arity
    }

    #[inline]
    pub fn n_locals(&self) -> u16 {
        self.n_locals
    }

    #[inline]
    pub fn n_captures(&self) -> u16 {
        self.n_captures
    }

    #[inline]
    pub fn code(&self) -> &[Op] {
        &self.code
    }

    #[inline]
    pub fn consts(&self) -> &ConstPool {
        &self.consts
    }

    #[inline]
    pub fn names(&self) -> &NameTable {
        &self.names
    }

    #[inline]
    pub fn protos(&self) -> &[Arc<Unit>] {
        &self.protos
    }

    /// Deepest operand stack any path through the unit reaches.
    #[inline]
    pub fn max_stack(&self) -> usize {
        self.max_stack
    }

    /// Human-readable listing with constant and name operands resolved.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "unit {} (arity {}, locals {}, captures {}, max stack {})",
            self.name, self.arity, self.n_locals, self.n_captures, self.max_stack
        );
        for (pc, op) in self.code.iter().enumerate() {
            let _ = write!(out, "{pc:>4}  {op}");
            match *op {
                Op::LoadConst(k) => {
                    if let Ok(v) = self.consts.get(k) {
                        let _ = write!(out, "    ; {v}");
                    }
                }
                Op::LoadName(n) | Op::CallBuiltin(n, _) | Op::CallMethod(n, _) => {
                    if let Ok(name) = self.names.get(n) {
                        let _ = write!(out, "    ; {name}");
                    }
                }
                Op::MakeClosure(p, _) => {
                    if let Some(proto) = self.protos.get(p as usize) {
                        let _ = write!(out, "    ; {}", proto.name());
                    }
                }
                _ => {}
            }
            out.push('\n');
        }
        for proto in &self.protos {
            out.push('\n');
            out.push_str(&proto.disassemble());
        }
        out
    }
}
