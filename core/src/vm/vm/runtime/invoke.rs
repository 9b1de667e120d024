use std::sync::Arc;

use tracing::{debug, trace};

use crate::module::{BuiltinHandle, BuiltinResolver};
use crate::val::Val;
use crate::vm::error::ErrorKind;

fn builtin_name(resolver: &dyn BuiltinResolver, handle: BuiltinHandle) -> Arc<str> {
    match resolver.name_of(handle) {
        Some(name) => Arc::from(name),
        None => Arc::from(format!("<builtin #{}>", handle.index())),
    }
}

/// Check arity and run a builtin synchronously. Host failures become fatal
/// `Native` errors.
#[inline]
pub(super) fn call_builtin(
    resolver: &dyn BuiltinResolver,
    handle: BuiltinHandle,
    receiver: Option<&Val>,
    args: &[Val],
) -> Result<Val, ErrorKind> {
    let arity = resolver.arity(handle);
    if !arity.accepts(args.len()) {
        return Err(ErrorKind::ArityMismatch {
            callee: builtin_name(resolver, handle),
            expected: arity,
            got: args.len(),
        });
    }
    trace!(target: "bvm::vm::call", builtin = handle.index(), argc = args.len(), "invoke builtin");
    resolver.invoke(handle, receiver, args).map_err(|err| {
        let name = builtin_name(resolver, handle);
        debug!(target: "bvm::vm::call", builtin = %name, error = %err, "builtin failed");
        ErrorKind::Native {
            name,
            message: format!("{err:#}"),
        }
    })
}
