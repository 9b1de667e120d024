//! Load-time verification of compiled units.
//!
//! Every index operand is bounds-checked and the operand stack depth is
//! computed for each reachable instruction by abstract interpretation, so the
//! dispatch loop never has to revalidate the instruction stream.

use tracing::debug;

use super::bytecode::{Op, Unit};
use super::error::{ErrorKind, VmError};

/// Verify `unit` and return the deepest operand stack it can reach.
pub(crate) fn verify(unit: &Unit) -> Result<usize, VmError> {
    let verifier = Verifier { unit };
    let result = verifier.check_header().and_then(|_| verifier.check_operands()).and_then(|_| verifier.stack_depths());
    if let Err(err) = &result {
        debug!(
            target: "bvm::verify",
            unit = unit.name(),
            pc = err.pc,
            kind = %err.kind,
            "rejected unit"
        );
    }
    result
}

struct Verifier<'a> {
    unit: &'a Unit,
}

impl Verifier<'_> {
    fn fail(&self, pc: usize, kind: ErrorKind) -> VmError {
        VmError::malformed(self.unit.name_arc(), pc, self.unit.code().get(pc).copied(), kind)
    }

    fn check_header(&self) -> Result<(), VmError> {
        let unit = self.unit;
        if unit.arity() > unit.n_locals() {
            return Err(VmError::malformed(
                unit.name_arc(),
                0,
                None,
                ErrorKind::InvalidArity {
                    arity: unit.arity(),
                    locals: unit.n_locals(),
                },
            ));
        }
        Ok(())
    }

    fn check_operands(&self) -> Result<(), VmError> {
        let unit = self.unit;
        let len = unit.code().len();
        for (pc, op) in unit.code().iter().enumerate() {
            let checked = match *op {
                Op::LoadConst(k) => unit.consts().get(k).map(|_| ()),
                Op::LoadSlot(s) | Op::StoreSlot(s) => {
                    if s < unit.n_locals() {
                        Ok(())
                    } else {
                        Err(ErrorKind::SlotIndexOutOfRange {
                            index: s,
                            len: unit.n_locals() as usize,
                        })
                    }
                }
                Op::LoadCapture(c) => {
                    if c < unit.n_captures() {
                        Ok(())
                    } else {
                        Err(ErrorKind::CaptureIndexOutOfRange {
                            index: c,
                            len: unit.n_captures() as usize,
                        })
                    }
                }
                Op::LoadName(n) | Op::CallBuiltin(n, _) | Op::CallMethod(n, _) => unit.names().get(n).map(|_| ()),
                Op::MakeClosure(p, ncap) => match unit.protos().get(p as usize) {
                    None => Err(ErrorKind::ProtoIndexOutOfRange {
                        index: p,
                        len: unit.protos().len(),
                    }),
                    Some(proto) if proto.n_captures() != ncap => Err(ErrorKind::CaptureCountMismatch {
                        expected: proto.n_captures() as usize,
                        got: ncap as usize,
                    }),
                    Some(_) => Ok(()),
                },
                _ => match op.jump_target() {
                    Some(target) if target as usize >= len => Err(ErrorKind::JumpOutOfRange { target, len }),
                    _ => Ok(()),
                },
            };
            checked.map_err(|kind| self.fail(pc, kind))?;
        }
        Ok(())
    }

    /// Walk the control-flow graph from pc 0 assigning one stack depth per
    /// instruction. Running off the end is left to the runtime.
    fn stack_depths(&self) -> Result<usize, VmError> {
        let code = self.unit.code();
        if code.is_empty() {
            return Ok(0);
        }
        let mut depths: Vec<Option<usize>> = vec![None; code.len()];
        let mut work = vec![0usize];
        depths[0] = Some(0);
        let mut max_depth = 0usize;

        while let Some(pc) = work.pop() {
            let op = code[pc];
            let depth = depths[pc].unwrap_or_default();
            let (pops, pushes) = op.stack_effect();
            if depth < pops {
                return Err(self.fail(pc, ErrorKind::StackUnderflow));
            }
            let after = depth - pops + pushes;
            max_depth = max_depth.max(after);

            if op.falls_through() && pc + 1 < code.len() {
                self.merge(&mut depths, &mut work, pc + 1, after)?;
            }
            if let (Some(target), Some((bpops, bpushes))) = (op.jump_target(), op.branch_effect()) {
                let taken = depth - bpops + bpushes;
                max_depth = max_depth.max(taken);
                self.merge(&mut depths, &mut work, target as usize, taken)?;
            }
        }
        Ok(max_depth)
    }

    fn merge(&self, depths: &mut [Option<usize>], work: &mut Vec<usize>, pc: usize, depth: usize) -> Result<(), VmError> {
        match depths[pc] {
            None => {
                depths[pc] = Some(depth);
                work.push(pc);
                Ok(())
            }
            Some(expected) if expected == depth => Ok(()),
            Some(expected) => Err(self.fail(pc, ErrorKind::StackDepthMismatch { expected, found: depth })),
        }
    }
}
