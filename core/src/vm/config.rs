use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Resource limits of one [`Vm`](super::Vm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Deepest operand stack a single frame may grow to.
    pub max_stack_depth: usize,
    /// Most frames that may be live on the call stack at once.
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_stack_depth: 1024,
            max_call_depth: 256,
        }
    }
}

impl VmConfig {
    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Parse from JSON; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: VmConfig = serde_json::from_str(text).context("invalid vm config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_stack_depth > 0, "max_stack_depth must be positive");
        ensure!(self.max_call_depth > 0, "max_call_depth must be positive");
        Ok(())
    }
}
