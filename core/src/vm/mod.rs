//! Stack bytecode VM subsystem
//!
//! Compiled units, their load-time verifier, the frame model and the
//! dispatch loop that executes them.

mod analysis;
mod builder;
mod bytecode;
mod config;
mod error;
mod image;
mod pool;
#[allow(clippy::module_inception)]
mod vm;

pub use builder::UnitBuilder;
pub use bytecode::{Op, Unit, UnitParts};
pub use config::VmConfig;
pub use error::{ErrorCategory, ErrorKind, TraceEntry, VmError};
pub use image::IMAGE_VERSION;
pub use pool::{ConstPool, NameTable};
pub use vm::{Frame, OperandStack, SlotTable, Vm};

#[cfg(test)]
mod vm_test;
