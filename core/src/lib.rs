pub mod module;
pub mod op;
pub mod val;

// Stack bytecode VM: units, frames and the dispatch loop
pub mod vm;

pub use module::{Arity, BuiltinFn, BuiltinHandle, BuiltinRegistry, BuiltinResolver, Export, Module};
pub use val::{Closure, Type, Val};
pub use vm::{ErrorCategory, ErrorKind, Frame, Op, TraceEntry, Unit, UnitBuilder, UnitParts, Vm, VmConfig, VmError};
