use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::val::Val;

use super::bytecode::{Op, Unit, UnitParts};
use super::error::{ErrorKind, VmError};

/// Incremental assembler for [`Unit`]s.
///
/// Interns constants and names as they are requested, hands out instruction
/// offsets for jump patching and runs verification on [`build`](Self::build).
/// A table outgrowing its operand width or a bad jump patch is remembered and
/// reported by `build`.
#[derive(Debug, Default)]
pub struct UnitBuilder {
    parts: UnitParts,
    name_index: FxHashMap<String, usize>,
    // first failure, as (pc, op, kind)
    error: Option<(usize, Option<Op>, ErrorKind)>,
}

/// Constants are shared only when they are the same variant with the same
/// payload; `1` and `1.0` stay distinct entries.
fn same_const(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Nil, Val::Nil) => true,
        (Val::Bool(x), Val::Bool(y)) => x == y,
        (Val::Int(x), Val::Int(y)) => x == y,
        (Val::Float(x), Val::Float(y)) => x.to_bits() == y.to_bits(),
        (Val::Str(x), Val::Str(y)) => x == y,
        _ => false,
    }
}

impl UnitBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            parts: UnitParts {
                name: name.into(),
                ..UnitParts::default()
            },
            name_index: FxHashMap::default(),
            error: None,
        }
    }

    /// Number of parameters; also raises the local count to cover them.
    pub fn arity(mut self, arity: u16) -> Self {
        self.parts.arity = arity;
        self.parts.n_locals = self.parts.n_locals.max(arity);
        self
    }

    pub fn locals(mut self, n_locals: u16) -> Self {
        self.parts.n_locals = n_locals;
        self
    }

    pub fn captures(mut self, n_captures: u16) -> Self {
        self.parts.n_captures = n_captures;
        self
    }

    fn fail(&mut self, pc: usize, op: Option<Op>, kind: ErrorKind) {
        if self.error.is_none() {
            self.error = Some((pc, op, kind));
        }
    }

    /// Narrow a table index to its operand width, recording an overflow.
    fn operand<T: TryFrom<usize> + Default>(&mut self, index: usize, table: &'static str) -> T {
        T::try_from(index).unwrap_or_else(|_| {
            let pc = self.parts.code.len();
            self.fail(pc, None, ErrorKind::TableOverflow { table, index });
            T::default()
        })
    }

    pub fn constant(&mut self, value: impl Into<Val>) -> u32 {
        let value = value.into();
        if let Some(idx) = self.parts.consts.iter().position(|k| same_const(k, &value)) {
            return self.operand(idx, "constant");
        }
        self.parts.consts.push(value);
        self.operand(self.parts.consts.len() - 1, "constant")
    }

    pub fn name(&mut self, name: &str) -> u16 {
        let idx = match self.name_index.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.parts.names.len();
                self.parts.names.push(name.to_string());
                self.name_index.insert(name.to_string(), idx);
                idx
            }
        };
        self.operand(idx, "name")
    }

    pub fn proto(&mut self, unit: Arc<Unit>) -> u32 {
        self.parts.protos.push(unit);
        self.operand(self.parts.protos.len() - 1, "prototype")
    }

    /// Append `op`, returning its offset.
    pub fn emit(&mut self, op: Op) -> usize {
        self.parts.code.push(op);
        self.parts.code.len() - 1
    }

    /// Offset the next emitted instruction will get.
    pub fn here(&mut self) -> u32 {
        self.operand(self.parts.code.len(), "code")
    }

    /// Point the jump at `at` to `target`. Patching anything other than a
    /// jump fails the build.
    pub fn patch_jump(&mut self, at: usize, target: u32) {
        let patched = match self.parts.code.get(at) {
            Some(Op::Jump(_)) => Op::Jump(target),
            Some(Op::JumpIfFalse(_)) => Op::JumpIfFalse(target),
            Some(Op::JumpIfTrue(_)) => Op::JumpIfTrue(target),
            Some(Op::JumpIfFalseOrPop(_)) => Op::JumpIfFalseOrPop(target),
            Some(Op::JumpIfTrueOrPop(_)) => Op::JumpIfTrueOrPop(target),
            other => {
                let op = other.copied();
                self.fail(at, op, ErrorKind::NotAJump { at });
                return;
            }
        };
        self.parts.code[at] = patched;
    }

    pub fn build(self) -> Result<Arc<Unit>, VmError> {
        if let Some((pc, op, kind)) = self.error {
            return Err(VmError::malformed(&Arc::from(self.parts.name.as_str()), pc, op, kind));
        }
        Unit::new(self.parts)
    }
}
