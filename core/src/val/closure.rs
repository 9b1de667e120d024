use std::sync::Arc;

use crate::vm::{ErrorKind, Unit};

use super::Val;

/// A callable value: a compiled unit and the values it captured.
///
/// Captures are copied when the closure is created, so a closure never holds
/// a reference into the frame that created it.
#[derive(Clone)]
pub struct Closure {
    unit: Arc<Unit>,
    captures: Arc<[Val]>,
}

impl Closure {
    pub fn new(unit: Arc<Unit>, captures: Vec<Val>) -> Result<Self, ErrorKind> {
        let expected = unit.n_captures() as usize;
        if captures.len() != expected {
            return Err(ErrorKind::CaptureCountMismatch {
                expected,
                got: captures.len(),
            });
        }
        Ok(Self {
            unit,
            captures: Arc::from(captures),
        })
    }

    /// Closure over a unit that captures nothing.
    pub fn from_unit(unit: Arc<Unit>) -> Result<Self, ErrorKind> {
        Self::new(unit, Vec::new())
    }

    #[inline]
    pub fn unit(&self) -> &Arc<Unit> {
        &self.unit
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.unit.name()
    }

    #[inline]
    pub fn captures(&self) -> &Arc<[Val]> {
        &self.captures
    }
}

impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.unit, &other.unit) && self.captures == other.captures
    }
}

// Units can be large; print only what identifies the closure.
impl core::fmt::Debug for Closure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Closure")
            .field("unit", &self.unit.name())
            .field("arity", &self.unit.arity())
            .field("captures", &self.captures.len())
            .finish()
    }
}
