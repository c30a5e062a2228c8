//! Policy configuration.
//!
//! The attempt limit, fee-waiver threshold and write retry bound are global
//! policy values with documented defaults. Pass marks are per module and
//! live on [`Module`](crate::model::Module).
//!
//! Overrides are read from a JSON file; any omitted key keeps its default:
//!
//! ```json
//! { "max_attempts": 3, "fee_threshold_percent": 70.0, "max_write_retries": 5 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, Result};

/// Default number of quiz attempts before a module locks.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default average score (percent) below which re-sits carry a fee.
pub const DEFAULT_FEE_THRESHOLD_PERCENT: f64 = 70.0;

/// Default number of compare-and-swap retries before a submission gives up.
pub const DEFAULT_MAX_WRITE_RETRIES: u32 = 5;

/// Global policy values consulted by the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub max_attempts: u32,
    pub fee_threshold_percent: f64,
    pub max_write_retries: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            fee_threshold_percent: DEFAULT_FEE_THRESHOLD_PERCENT,
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
        }
    }
}

impl PolicyConfig {
    /// Load and validate a policy file.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Io` if the file cannot be read,
    /// `ProgressError::InvalidFileFormat` if it is not valid JSON, or
    /// `ProgressError::Validation` if a value is out of range.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let config: PolicyConfig = serde_json::from_slice(&bytes).map_err(|e| {
            ProgressError::InvalidFileFormat(format!(
                "failed to parse policy file {}: {e}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the engines misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ProgressError::Validation(
                "max_attempts must be at least 1".into(),
            ));
        }
        if !self.fee_threshold_percent.is_finite()
            || !(0.0..=100.0).contains(&self.fee_threshold_percent)
        {
            return Err(ProgressError::Validation(format!(
                "fee_threshold_percent must be 0-100, got {}",
                self.fee_threshold_percent
            )));
        }
        if self.max_write_retries == 0 {
            return Err(ProgressError::Validation(
                "max_write_retries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
