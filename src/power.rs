//! # Power-off Action
//!
//! Shuts the host down after the shutdown gesture is confirmed. The command
//! comes from `[power]` in the configuration and defaults to
//! `sudo poweroff`.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::config::PowerConfig;
use crate::error::{PadcarError, Result};

/// Action that powers the host off.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PowerOff: Send + Sync {
    /// Requests power-off. Returns once the request has been handed over.
    async fn power_off(&self) -> Result<()>;
}

/// Power-off through an external command.
#[derive(Debug, Clone)]
pub struct CommandPowerOff {
    program: String,
    args: Vec<String>,
}

impl CommandPowerOff {
    /// Builds the action from the configured command line.
    ///
    /// # Errors
    ///
    /// Returns `PowerOff` if the command line is empty.
    pub fn new(config: &PowerConfig) -> Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| PadcarError::PowerOff("empty power-off command".to_string()))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl PowerOff for CommandPowerOff {
    async fn power_off(&self) -> Result<()> {
        info!("Running power-off command: {} {}", self.program, self.args.join(" "));

        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .await
            .map_err(|e| PadcarError::PowerOff(format!("failed to run {}: {}", self.program, e)))?;

        if !status.success() {
            return Err(PadcarError::PowerOff(format!("{} exited with {}", self.program, status)));
        }
        Ok(())
    }
}
