pub mod math;
pub mod string;
pub mod time;


use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use bvm_core::{Arity, BuiltinRegistry, Val};
use once_cell::sync::Lazy;
use tracing::warn;

/// Largest integer magnitude an f64 represents exactly.
const F64_EXACT_INT: i64 = 1 << 53;

/// Register all stdlib modules with the given registry
pub fn register_stdlib_modules(registry: &mut BuiltinRegistry) -> Result<()> {
    registry.register_module(&math::MathModule::new())?;
    registry.register_module(&string::StringModule::new())?;
    registry.register_module(&time::TimeModule::new())?;
    Ok(())
}

/// Register global builtin functions available without a module prefix
/// - print(fmt, ...args): print formatted text without newline; returns nil
/// - println(fmt, ...args): print formatted text with newline; returns nil
/// - len(s), type_of(v), to_str(v), to_int(v), to_float(v)
/// - assert(cond[, msg]): fail with `msg` unless `cond` is true
pub fn register_stdlib_globals(registry: &mut BuiltinRegistry) -> Result<()> {
    registry.register_fn("print", Arity::Any, print_fn)?;
    registry.register_fn("println", Arity::Any, println_fn)?;
    registry.register_fn("len", Arity::Exact(1), len_fn)?;
    registry.register_fn("type_of", Arity::Exact(1), type_of_fn)?;
    registry.register_fn("to_str", Arity::Exact(1), to_str_fn)?;
    registry.register_fn("to_int", Arity::Exact(1), to_int_fn)?;
    registry.register_fn("to_float", Arity::Exact(1), to_float_fn)?;
    registry.register_fn("assert", Arity::AtLeast(1), assert_fn)?;
    Ok(())
}

/// Globals plus every stdlib module.
pub fn register_stdlib(registry: &mut BuiltinRegistry) -> Result<()> {
    register_stdlib_globals(registry)?;
    register_stdlib_modules(registry)
}

static DEFAULT_REGISTRY: Lazy<Arc<BuiltinRegistry>> = Lazy::new(|| {
    let mut registry = BuiltinRegistry::new();
    if let Err(err) = register_stdlib(&mut registry) {
        warn!(target: "bvm::stdlib", error = %err, "stdlib registration incomplete");
    }
    Arc::new(registry)
});

/// Shared registry with the whole stdlib, built once per process.
pub fn default_registry() -> Arc<BuiltinRegistry> {
    Arc::clone(&DEFAULT_REGISTRY)
}

/// `{}` placeholders consume arguments in order; leftovers are appended with spaces.
pub(crate) fn format_variadic(args: &[Val]) -> String {
    let Some((first, rest)) = args.split_first() else {
        return String::new();
    };
    let Val::Str(fmt) = first else {
        return args.iter().map(Val::to_string).collect::<Vec<_>>().join(" ");
    };

    let mut out = String::with_capacity(fmt.len() + rest.len() * 8);
    let mut pending = rest.iter();
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'}') {
            chars.next();
            match pending.next() {
                Some(arg) => out.push_str(&arg.to_string()),
                None => out.push_str("{}"),
            }
        } else {
            out.push(c);
        }
    }
    for arg in pending {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&arg.to_string());
    }
    out
}

fn print_fn(args: &[Val]) -> Result<Val> {
    print!("{}", format_variadic(args));
    Ok(Val::Nil)
}

fn println_fn(args: &[Val]) -> Result<Val> {
    println!("{}", format_variadic(args));
    Ok(Val::Nil)
}

fn len_fn(args: &[Val]) -> Result<Val> {
    match &args[0] {
        Val::Str(s) => Ok(Val::Int(s.chars().count() as i64)),
        other => Err(anyhow!("len() expects a String, got {}", other.type_name())),
    }
}

fn type_of_fn(args: &[Val]) -> Result<Val> {
    Ok(Val::from(args[0].type_name()))
}

fn to_str_fn(args: &[Val]) -> Result<Val> {
    match &args[0] {
        s @ Val::Str(_) => Ok(s.clone()),
        other => Ok(Val::from(other.to_string())),
    }
}

pub(crate) fn float_to_int(f: f64, api: &str) -> Result<i64> {
    if !f.is_finite() {
        bail!("{api}: cannot convert {f} to Int");
    }
    let truncated = f.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        bail!("{api}: {f} is out of Int range");
    }
    if truncated != f {
        warn!(target: "bvm::stdlib", api, value = f, "fractional part discarded");
    }
    Ok(truncated as i64)
}

pub(crate) fn int_to_float(i: i64, api: &str) -> f64 {
    if !(-F64_EXACT_INT..=F64_EXACT_INT).contains(&i) {
        warn!(target: "bvm::stdlib", api, value = i, "integer not exactly representable as Float");
    }
    i as f64
}

fn to_int_fn(args: &[Val]) -> Result<Val> {
    match &args[0] {
        Val::Int(i) => Ok(Val::Int(*i)),
        Val::Float(f) => Ok(Val::Int(float_to_int(*f, "to_int")?)),
        Val::Bool(b) => Ok(Val::Int(*b as i64)),
        Val::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Val::Int)
            .map_err(|err| anyhow!("to_int(): cannot parse '{}': {}", s, err)),
        other => Err(anyhow!("to_int() cannot convert {}", other.type_name())),
    }
}

fn to_float_fn(args: &[Val]) -> Result<Val> {
    match &args[0] {
        Val::Float(f) => Ok(Val::Float(*f)),
        Val::Int(i) => Ok(Val::Float(int_to_float(*i, "to_float"))),
        Val::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Val::Float)
            .map_err(|err| anyhow!("to_float(): cannot parse '{}': {}", s, err)),
        other => Err(anyhow!("to_float() cannot convert {}", other.type_name())),
    }
}

fn assert_fn(args: &[Val]) -> Result<Val> {
    match &args[0] {
        Val::Bool(true) => Ok(Val::Nil),
        Val::Bool(false) if args.len() > 1 => bail!("assertion failed: {}", format_variadic(&args[1..])),
        Val::Bool(false) => bail!("assertion failed"),
        other => Err(anyhow!("assert() condition must be Bool, got {}", other.type_name())),
    }
}
