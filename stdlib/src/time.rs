//! Wall-clock helpers.
//!
//! Timestamps are Unix milliseconds (`Int`) so they round-trip through
//! ordinary arithmetic.

use std::fmt::Write;

use anyhow::{Result, anyhow};
use bvm_core::{Arity, Export, Module, Val};
use chrono::{DateTime, SecondsFormat, Utc};

#[derive(Debug, Default)]
pub struct TimeModule;

impl TimeModule {
    pub fn new() -> Self {
        Self
    }
}

impl Module for TimeModule {
    fn name(&self) -> &str {
        "time"
    }

    fn description(&self) -> &str {
        "Current time and timestamp formatting"
    }

    fn exports(&self) -> Vec<Export> {
        vec![
            Export::new("now_ms", Arity::Exact(0), now_ms),
            Export::new("now_iso", Arity::Exact(0), now_iso),
            Export::new("since", Arity::Exact(1), since),
            Export::new("format", Arity::Exact(2), format),
            Export::new("to_iso", Arity::Exact(1), to_iso),
        ]
    }
}

fn timestamp(val: &Val, api: &str) -> Result<DateTime<Utc>> {
    let ms = val
        .as_int()
        .ok_or_else(|| anyhow!("time.{api}() expects Int milliseconds, got {}", val.type_name()))?;
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("time.{api}(): timestamp {ms} is out of range"))
}

fn now_ms(_args: &[Val]) -> Result<Val> {
    Ok(Val::Int(Utc::now().timestamp_millis()))
}

fn now_iso(_args: &[Val]) -> Result<Val> {
    Ok(Val::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)))
}

/// Milliseconds elapsed since `start`.
fn since(args: &[Val]) -> Result<Val> {
    let start = timestamp(&args[0], "since")?;
    Ok(Val::Int((Utc::now() - start).num_milliseconds()))
}

/// strftime-style formatting of a millisecond timestamp (UTC).
fn format(args: &[Val]) -> Result<Val> {
    let at = timestamp(&args[0], "format")?;
    let pattern = args[1]
        .as_str()
        .ok_or_else(|| anyhow!("time.format() pattern must be a String, got {}", args[1].type_name()))?;
    let mut out = String::new();
    write!(out, "{}", at.format(pattern)).map_err(|_| anyhow!("time.format(): invalid pattern '{pattern}'"))?;
    Ok(Val::from(out))
}

fn to_iso(args: &[Val]) -> Result<Val> {
    let at = timestamp(&args[0], "to_iso")?;
    Ok(Val::from(at.to_rfc3339_opts(SecondsFormat::Millis, true)))
}
