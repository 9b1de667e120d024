use std::sync::Arc;

use tracing::{debug, trace};

use crate::val::{Closure, Val};
use crate::vm::bytecode::Unit;
use crate::vm::error::{ErrorKind, TraceEntry, VmError};
use crate::vm::vm::Vm;
use crate::vm::vm::frame::Frame;

use super::invoke::call_builtin;

impl Vm {
    /// Run `unit` as the entry frame until it returns.
    pub fn run(&mut self, unit: &Arc<Unit>, args: &[Val]) -> Result<Val, VmError> {
        self.start(unit, args)?;
        self.finish()
    }

    /// Call a value from the host: a callable runs to completion on a fresh
    /// call stack, a builtin is invoked directly.
    pub fn call(&mut self, callee: &Val, args: &[Val]) -> Result<Val, VmError> {
        match callee {
            Val::Callable(closure) => {
                self.enter(closure.clone(), args.to_vec())?;
                self.finish()
            }
            Val::Builtin(handle) => call_builtin(self.resolver.as_ref(), *handle, None, args).map_err(VmError::detached),
            other => Err(VmError::detached(ErrorKind::NotCallable {
                type_name: other.type_name(),
            })),
        }
    }

    /// Activate `unit` without executing anything. Any execution already in
    /// progress is discarded.
    pub fn start(&mut self, unit: &Arc<Unit>, args: &[Val]) -> Result<(), VmError> {
        let closure = Closure::from_unit(Arc::clone(unit))
            .map_err(|kind| VmError::malformed(unit.name_arc(), 0, None, kind))?;
        self.enter(closure, args.to_vec())
    }

    /// Execute one instruction of the active frame.
    ///
    /// Returns `Some(result)` once the entry frame returns; `None` while work
    /// remains (or when nothing is running). On error the whole call stack is
    /// unwound.
    pub fn step(&mut self) -> Result<Option<Val>, VmError> {
        self.exec_one().map_err(|kind| self.unwind(kind))
    }

    fn finish(&mut self) -> Result<Val, VmError> {
        loop {
            if let Some(result) = self.step()? {
                return Ok(result);
            }
        }
    }

    fn enter(&mut self, closure: Closure, args: Vec<Val>) -> Result<(), VmError> {
        self.frames.clear();
        self.push_frame(closure, args).map_err(VmError::detached)
    }

    pub(super) fn push_frame(&mut self, closure: Closure, args: Vec<Val>) -> Result<(), ErrorKind> {
        let depth = self.frames.len();
        if depth >= self.config.max_call_depth {
            return Err(ErrorKind::CallDepthExceeded {
                limit: self.config.max_call_depth,
            });
        }
        let frame = Frame::new(closure, args, depth, self.config.max_stack_depth)?;
        trace!(target: "bvm::vm::call", unit = frame.unit().name(), depth, "enter frame");
        self.frames.push(frame);
        Ok(())
    }

    /// Drop the active frame and hand `result` to its caller. Yields the
    /// result when the entry frame itself returned.
    pub(super) fn pop_frame(&mut self, result: Val) -> Result<Option<Val>, ErrorKind> {
        if let Some(done) = self.frames.pop() {
            trace!(target: "bvm::vm::call", unit = done.unit().name(), depth = done.depth(), "leave frame");
        }
        match self.frames.last_mut() {
            Some(caller) => {
                caller.push(result)?;
                Ok(None)
            }
            None => Ok(Some(result)),
        }
    }

    fn unwind(&mut self, kind: ErrorKind) -> VmError {
        let (op, pc, depth) = self
            .frames
            .last()
            .map_or((None, 0, 0), |frame| (frame.current_op(), frame.current_pc(), frame.depth()));
        let trace: Vec<TraceEntry> = self
            .frames
            .iter()
            .rev()
            .map(|frame| TraceEntry {
                unit: Arc::clone(frame.unit().name_arc()),
                pc: frame.current_pc(),
                depth: frame.depth(),
            })
            .collect();
        debug!(
            target: "bvm::vm::error",
            kind = %kind,
            pc,
            depth,
            frames = trace.len(),
            "unwinding call stack"
        );
        self.frames.clear();
        VmError {
            kind,
            op,
            pc,
            depth,
            trace,
        }
    }
}
