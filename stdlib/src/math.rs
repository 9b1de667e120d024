use anyhow::{Result, anyhow, bail};
use bvm_core::{Arity, Export, Module, Type, Val};

use crate::{float_to_int, int_to_float};

#[derive(Debug, Default)]
pub struct MathModule;

impl MathModule {
    pub fn new() -> Self {
        Self
    }
}

impl Module for MathModule {
    fn name(&self) -> &str {
        "math"
    }

    fn description(&self) -> &str {
        "Numeric functions and constants"
    }

    fn exports(&self) -> Vec<Export> {
        vec![
            Export::new("abs", Arity::Exact(1), abs),
            Export::new("sqrt", Arity::Exact(1), sqrt),
            Export::new("pow", Arity::Exact(2), pow),
            Export::new("floor", Arity::Exact(1), floor),
            Export::new("ceil", Arity::Exact(1), ceil),
            Export::new("round", Arity::Exact(1), round),
            Export::new("sin", Arity::Exact(1), sin),
            Export::new("cos", Arity::Exact(1), cos),
            Export::new("exp", Arity::Exact(1), exp),
            Export::new("log", Arity::Exact(1), log),
            Export::new("min", Arity::AtLeast(1), min),
            Export::new("max", Arity::AtLeast(1), max),
            Export::new("clamp", Arity::Exact(3), clamp),
            Export::new("pi", Arity::Exact(0), pi),
            Export::new("e", Arity::Exact(0), e),
        ]
    }

    fn methods(&self) -> Vec<(Type, Export)> {
        let mut methods = Vec::new();
        for ty in [Type::Int, Type::Float] {
            methods.push((ty, Export::new("abs", Arity::Exact(0), abs)));
            methods.push((ty, Export::new("pow", Arity::Exact(1), pow)));
            methods.push((ty, Export::new("to_int", Arity::Exact(0), to_int)));
            methods.push((ty, Export::new("to_float", Arity::Exact(0), to_float)));
        }
        methods.push((Type::Float, Export::new("floor", Arity::Exact(0), floor)));
        methods.push((Type::Float, Export::new("ceil", Arity::Exact(0), ceil)));
        methods.push((Type::Float, Export::new("round", Arity::Exact(0), round)));
        methods.push((Type::Float, Export::new("is_nan", Arity::Exact(0), is_nan)));
        methods
    }
}

fn number(val: &Val, api: &str) -> Result<f64> {
    val.as_float()
        .ok_or_else(|| anyhow!("{api}() argument must be a number, got {}", val.type_name()))
}

/// Absolute value
fn abs(args: &[Val]) -> Result<Val> {
    match &args[0] {
        Val::Int(x) => x
            .checked_abs()
            .map(Val::Int)
            .ok_or_else(|| anyhow!("abs() overflows for {x}")),
        Val::Float(x) => Ok(Val::Float(x.abs())),
        other => Err(anyhow!("abs() argument must be a number, got {}", other.type_name())),
    }
}

fn sqrt(args: &[Val]) -> Result<Val> {
    let x = number(&args[0], "sqrt")?;
    if x < 0.0 {
        bail!("sqrt() argument must be non-negative");
    }
    Ok(Val::Float(x.sqrt()))
}

/// Int ** non-negative Int stays Int (checked); anything else is Float.
fn pow(args: &[Val]) -> Result<Val> {
    match (&args[0], &args[1]) {
        (Val::Int(base), Val::Int(exp)) if *exp >= 0 => {
            let exp = u32::try_from(*exp).map_err(|_| anyhow!("pow() exponent {exp} is too large"))?;
            base.checked_pow(exp)
                .map(Val::Int)
                .ok_or_else(|| anyhow!("pow() overflows for {base}^{exp}"))
        }
        (base, exp) => Ok(Val::Float(number(base, "pow")?.powf(number(exp, "pow")?))),
    }
}

fn floor(args: &[Val]) -> Result<Val> {
    match &args[0] {
        Val::Int(x) => Ok(Val::Int(*x)),
        other => Ok(Val::Int(float_to_int(number(other, "floor")?.floor(), "floor")?)),
    }
}

fn ceil(args: &[Val]) -> Result<Val> {
    match &args[0] {
        Val::Int(x) => Ok(Val::Int(*x)),
        other => Ok(Val::Int(float_to_int(number(other, "ceil")?.ceil(), "ceil")?)),
    }
}

fn round(args: &[Val]) -> Result<Val> {
    match &args[0] {
        Val::Int(x) => Ok(Val::Int(*x)),
        other => Ok(Val::Int(float_to_int(number(other, "round")?.round(), "round")?)),
    }
}

fn sin(args: &[Val]) -> Result<Val> {
    Ok(Val::Float(number(&args[0], "sin")?.sin()))
}

fn cos(args: &[Val]) -> Result<Val> {
    Ok(Val::Float(number(&args[0], "cos")?.cos()))
}

fn exp(args: &[Val]) -> Result<Val> {
    Ok(Val::Float(number(&args[0], "exp")?.exp()))
}

/// Natural logarithm
fn log(args: &[Val]) -> Result<Val> {
    let x = number(&args[0], "log")?;
    if x <= 0.0 {
        bail!("log() argument must be positive");
    }
    Ok(Val::Float(x.ln()))
}

fn pick(args: &[Val], api: &str, prefer: std::cmp::Ordering) -> Result<Val> {
    let mut best = &args[0];
    number(best, api)?;
    for candidate in &args[1..] {
        number(candidate, api)?;
        match candidate.partial_cmp(best) {
            Some(ord) if ord == prefer => best = candidate,
            Some(_) => {}
            None => bail!("{api}() cannot order NaN"),
        }
    }
    Ok(best.clone())
}

fn min(args: &[Val]) -> Result<Val> {
    pick(args, "min", std::cmp::Ordering::Less)
}

fn max(args: &[Val]) -> Result<Val> {
    pick(args, "max", std::cmp::Ordering::Greater)
}

fn clamp(args: &[Val]) -> Result<Val> {
    match (&args[0], &args[1], &args[2]) {
        (Val::Int(v), Val::Int(lo), Val::Int(hi)) => {
            if lo > hi {
                bail!("clamp() requires min <= max");
            }
            Ok(Val::Int(*v.clamp(lo, hi)))
        }
        (v, lo, hi) => {
            let (v, lo, hi) = (number(v, "clamp")?, number(lo, "clamp")?, number(hi, "clamp")?);
            if lo.is_nan() || hi.is_nan() || lo > hi {
                bail!("clamp() requires min <= max");
            }
            Ok(Val::Float(v.clamp(lo, hi)))
        }
    }
}

fn pi(_args: &[Val]) -> Result<Val> {
    Ok(Val::Float(std::f64::consts::PI))
}

fn e(_args: &[Val]) -> Result<Val> {
    Ok(Val::Float(std::f64::consts::E))
}

fn to_int(args: &[Val]) -> Result<Val> {
    match &args[0] {
        Val::Int(x) => Ok(Val::Int(*x)),
        other => Ok(Val::Int(float_to_int(number(other, "to_int")?, "to_int")?)),
    }
}

fn to_float(args: &[Val]) -> Result<Val> {
    match &args[0] {
        Val::Int(x) => Ok(Val::Float(int_to_float(*x, "to_float"))),
        other => Ok(Val::Float(number(other, "to_float")?)),
    }
}

fn is_nan(args: &[Val]) -> Result<Val> {
    Ok(Val::Bool(number(&args[0], "is_nan")?.is_nan()))
}
