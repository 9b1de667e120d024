mod frame;
mod runtime;
mod stack;

use std::sync::Arc;

use crate::module::BuiltinResolver;

use super::config::VmConfig;

pub use frame::{Frame, SlotTable};
pub use stack::OperandStack;

/// Stack-based dispatch engine.
///
/// Holds the call stack as an arena of [`Frame`]s; the active frame is the
/// last one. Builtins are reached only through the resolver handed in at
/// construction.
pub struct Vm {
    resolver: Arc<dyn BuiltinResolver>,
    config: VmConfig,
    frames: Vec<Frame>,
}

impl Vm {
    pub fn new(resolver: Arc<dyn BuiltinResolver>) -> Self {
        Self::with_config(resolver, VmConfig::default())
    }

    pub fn with_config(resolver: Arc<dyn BuiltinResolver>, config: VmConfig) -> Self {
        Self {
            resolver,
            config,
            frames: Vec::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    #[inline]
    pub fn resolver(&self) -> &Arc<dyn BuiltinResolver> {
        &self.resolver
    }

    /// Live activations, entry frame first.
    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        !self.frames.is_empty()
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("config", &self.config)
            .field("frames", &self.frames.len())
            .finish()
    }
}
