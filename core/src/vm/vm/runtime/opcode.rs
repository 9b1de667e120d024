use tracing::trace;

use crate::op::UnaryOp;
use crate::val::{Closure, Val};
use crate::vm::bytecode::Op;
use crate::vm::error::ErrorKind;
use crate::vm::vm::Vm;

use super::invoke::call_builtin;
use super::math::{exec_binary, exec_unary, expect_bool};

impl Vm {
    /// Fetch and execute one instruction of the active frame.
    pub(super) fn exec_one(&mut self) -> Result<Option<Val>, ErrorKind> {
        let Some(frame) = self.frames.last_mut() else {
            return Ok(None);
        };
        let op = frame.fetch()?;
        trace!(
            target: "bvm::vm::dispatch",
            depth = frame.depth(),
            pc = frame.current_pc(),
            op = %op,
            stack = frame.stack().len(),
            "exec"
        );

        if let Some(bin) = op.binary() {
            exec_binary(frame, bin)?;
            return Ok(None);
        }

        match op {
            Op::Nop => {}
            Op::LoadConst(k) => {
                let val = frame.constant(k)?;
                frame.push(val)?;
            }
            Op::LoadNil => frame.push(Val::Nil)?,
            Op::LoadBool(b) => frame.push(Val::Bool(b))?,
            Op::LoadSlot(s) => {
                let val = frame.load_slot(s)?;
                frame.push(val)?;
            }
            Op::StoreSlot(s) => {
                let val = frame.pop()?;
                frame.store_slot(s, val)?;
            }
            Op::LoadCapture(c) => {
                let val = frame.capture(c)?;
                frame.push(val)?;
            }
            Op::LoadCallee => {
                let callee = frame.callee();
                frame.push(callee)?;
            }
            Op::Pop => {
                frame.pop()?;
            }
            Op::Dup => {
                let top = frame.peek()?.clone();
                frame.push(top)?;
            }
            Op::Swap => {
                let b = frame.pop()?;
                let a = frame.pop()?;
                frame.push(b)?;
                frame.push(a)?;
            }
            Op::Neg => exec_unary(frame, UnaryOp::Neg)?,
            Op::Not => exec_unary(frame, UnaryOp::Not)?,
            Op::Jump(target) => frame.jump(target),
            Op::JumpIfFalse(target) => {
                if !expect_bool(&frame.pop()?, op.mnemonic())? {
                    frame.jump(target);
                }
            }
            Op::JumpIfTrue(target) => {
                if expect_bool(&frame.pop()?, op.mnemonic())? {
                    frame.jump(target);
                }
            }
            Op::JumpIfFalseOrPop(target) => {
                if expect_bool(frame.peek()?, op.mnemonic())? {
                    frame.pop()?;
                } else {
                    frame.jump(target);
                }
            }
            Op::JumpIfTrueOrPop(target) => {
                if expect_bool(frame.peek()?, op.mnemonic())? {
                    frame.jump(target);
                } else {
                    frame.pop()?;
                }
            }
            Op::LoadName(n) => {
                let name = frame.name(n)?;
                let handle = self.resolver.resolve(&name).ok_or(ErrorKind::UnresolvedName { name })?;
                frame.push(Val::Builtin(handle))?;
            }
            Op::CallBuiltin(n, argc) => {
                let name = frame.name(n)?;
                let handle = self.resolver.resolve(&name).ok_or(ErrorKind::UnresolvedName { name })?;
                let args = frame.pop_n(argc as usize)?;
                let result = call_builtin(self.resolver.as_ref(), handle, None, &args)?;
                frame.push(result)?;
            }
            Op::CallMethod(n, argc) => {
                let name = frame.name(n)?;
                let args = frame.pop_n(argc as usize)?;
                let receiver = frame.pop()?;
                let Some(handle) = self.resolver.resolve_method(&receiver, &name) else {
                    return Err(ErrorKind::UnresolvedMethod {
                        receiver: receiver.type_name(),
                        name,
                    });
                };
                let result = call_builtin(self.resolver.as_ref(), handle, Some(&receiver), &args)?;
                frame.push(result)?;
            }
            Op::MakeClosure(p, ncap) => {
                let proto = frame
                    .unit()
                    .protos()
                    .get(p as usize)
                    .cloned()
                    .ok_or(ErrorKind::ProtoIndexOutOfRange {
                        index: p,
                        len: frame.unit().protos().len(),
                    })?;
                let captures = frame.pop_n(ncap as usize)?;
                let closure = Closure::new(proto, captures)?;
                frame.push(Val::Callable(closure))?;
            }
            Op::Call(argc) => {
                let args = frame.pop_n(argc as usize)?;
                match frame.pop()? {
                    Val::Callable(closure) => self.push_frame(closure, args)?,
                    Val::Builtin(handle) => {
                        let result = call_builtin(self.resolver.as_ref(), handle, None, &args)?;
                        frame.push(result)?;
                    }
                    other => {
                        return Err(ErrorKind::NotCallable {
                            type_name: other.type_name(),
                        });
                    }
                }
            }
            Op::Return => {
                let result = frame.pop()?;
                return self.pop_frame(result);
            }
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
            | Op::Ge => {} // dispatched above
        }
        Ok(None)
    }
}
