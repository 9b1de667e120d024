pub(super) use std::sync::Arc;

pub(super) use crate::{
    module::{Arity, BuiltinRegistry, BuiltinResolver},
    val::{Closure, Type, Val},
    vm::{ErrorCategory, ErrorKind, Op, Unit, UnitBuilder, UnitParts, Vm, VmConfig, VmError},
};

/// Route `tracing` output through the test harness. Set `RUST_LOG=bvm=trace`
/// to see the dispatch log of a failing test.
pub(super) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(super) fn empty_vm() -> Vm {
    Vm::new(Arc::new(BuiltinRegistry::new()))
}

/// Verified unit with no parameters, captures or prototypes.
pub(super) fn assemble(name: &str, n_locals: u16, consts: Vec<Val>, code: Vec<Op>) -> Arc<Unit> {
    Unit::new(UnitParts {
        name: name.into(),
        n_locals,
        consts,
        code,
        ..UnitParts::default()
    })
    .expect("unit should verify")
}

pub(super) fn run_unit(unit: &Arc<Unit>) -> Result<Val, VmError> {
    empty_vm().run(unit, &[])
}

mod errors;
mod functions;
mod semantics;
