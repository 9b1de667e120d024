use anyhow::{Result, anyhow, bail};
use bvm_core::{Arity, Export, Module, Type, Val};

/// String functions; every export is also a method on `String` receivers.
#[derive(Debug, Default)]
pub struct StringModule;

impl StringModule {
    pub fn new() -> Self {
        Self
    }

    // (name, arity counting the string itself, function)
    const FUNCTIONS: &'static [(&'static str, u16, bvm_core::BuiltinFn)] = &[
        ("len", 1, len),
        ("lower", 1, lower),
        ("upper", 1, upper),
        ("trim", 1, trim),
        ("starts_with", 2, starts_with),
        ("ends_with", 2, ends_with),
        ("contains", 2, contains),
        ("index_of", 2, index_of),
        ("replace", 3, replace),
        ("substring", 3, substring),
        ("repeat", 2, repeat),
    ];
}

impl Module for StringModule {
    fn name(&self) -> &str {
        "string"
    }

    fn description(&self) -> &str {
        "Text inspection and transformation"
    }

    fn exports(&self) -> Vec<Export> {
        Self::FUNCTIONS
            .iter()
            .map(|&(name, arity, func)| Export::new(name, Arity::Exact(arity), func))
            .collect()
    }

    fn methods(&self) -> Vec<(Type, Export)> {
        Self::FUNCTIONS
            .iter()
            .map(|&(name, arity, func)| (Type::String, Export::new(name, Arity::Exact(arity - 1), func)))
            .collect()
    }
}

fn text<'a>(val: &'a Val, api: &str) -> Result<&'a str> {
    val.as_str()
        .ok_or_else(|| anyhow!("{api}() expects a String, got {}", val.type_name()))
}

fn index(val: &Val, api: &str) -> Result<usize> {
    match val {
        Val::Int(i) if *i >= 0 => Ok(*i as usize),
        Val::Int(i) => bail!("{api}() index must be non-negative, got {i}"),
        other => Err(anyhow!("{api}() index must be an Int, got {}", other.type_name())),
    }
}

/// Length in characters
fn len(args: &[Val]) -> Result<Val> {
    Ok(Val::Int(text(&args[0], "len")?.chars().count() as i64))
}

fn lower(args: &[Val]) -> Result<Val> {
    Ok(Val::from(text(&args[0], "lower")?.to_lowercase()))
}

fn upper(args: &[Val]) -> Result<Val> {
    Ok(Val::from(text(&args[0], "upper")?.to_uppercase()))
}

fn trim(args: &[Val]) -> Result<Val> {
    Ok(Val::from(text(&args[0], "trim")?.trim()))
}

fn starts_with(args: &[Val]) -> Result<Val> {
    let s = text(&args[0], "starts_with")?;
    Ok(Val::Bool(s.starts_with(text(&args[1], "starts_with")?)))
}

fn ends_with(args: &[Val]) -> Result<Val> {
    let s = text(&args[0], "ends_with")?;
    Ok(Val::Bool(s.ends_with(text(&args[1], "ends_with")?)))
}

fn contains(args: &[Val]) -> Result<Val> {
    let s = text(&args[0], "contains")?;
    Ok(Val::Bool(s.contains(text(&args[1], "contains")?)))
}

/// Character offset of the first match, or -1.
fn index_of(args: &[Val]) -> Result<Val> {
    let s = text(&args[0], "index_of")?;
    let needle = text(&args[1], "index_of")?;
    Ok(Val::Int(match s.find(needle) {
        Some(byte) => s[..byte].chars().count() as i64,
        None => -1,
    }))
}

fn replace(args: &[Val]) -> Result<Val> {
    let s = text(&args[0], "replace")?;
    let from = text(&args[1], "replace")?;
    let to = text(&args[2], "replace")?;
    if from.is_empty() {
        bail!("replace() pattern must not be empty");
    }
    Ok(Val::from(s.replace(from, to)))
}

/// Characters in `[start, end)`; `end` is clamped to the length.
fn substring(args: &[Val]) -> Result<Val> {
    let s = text(&args[0], "substring")?;
    let start = index(&args[1], "substring")?;
    let end = index(&args[2], "substring")?;
    if start > end {
        bail!("substring() start {start} is past end {end}");
    }
    Ok(Val::from(s.chars().skip(start).take(end - start).collect::<String>()))
}

fn repeat(args: &[Val]) -> Result<Val> {
    let s = text(&args[0], "repeat")?;
    let n = index(&args[1], "repeat")?;
    Ok(Val::from(s.repeat(n)))
}
