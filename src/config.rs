//! Store configuration
//!
//! Defaults reproduce the store's historical shape: 100 slots, 200-byte
//! entries, and overwrite accounting that charges a fresh entry even when
//! it displaces an occupied slot.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of slots in the store.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default per-entry payload limit in bytes.
///
/// Bounds the width the snapshot codec has to recombine: a pair blob is at
/// most twice this size.
pub const DEFAULT_MAX_ENTRY_LEN: usize = 200;

/// What writing into an occupied slot does to the active-entry counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Charge a fresh active entry even though an occupied entry was
    /// displaced. The displaced charge is never credited back, so it
    /// permanently consumes capacity.
    #[default]
    ChargeNew,
    /// Credit the displaced entry back before charging the new one, so the
    /// counter always equals the number of occupied slots.
    ReclaimOld,
}

/// Slot store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of slots.
    pub capacity: usize,
    /// Per-entry payload limit in bytes.
    pub max_entry_len: usize,
    /// Overwrite accounting policy.
    pub overwrite_policy: OverwritePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_entry_len: DEFAULT_MAX_ENTRY_LEN,
            overwrite_policy: OverwritePolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("failed to read config file: {}", e)))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the store cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::Config("capacity must be at least 1".to_string()));
        }
        if self.max_entry_len == 0 {
            return Err(Error::Config(
                "max_entry_len must be at least 1".to_string(),
            ));
        }
        // Slot lengths travel as u32 in the snapshot wire layout.
        if self.max_entry_len > u32::MAX as usize {
            return Err(Error::Config(format!(
                "max_entry_len {} does not fit the snapshot length encoding",
                self.max_entry_len
            )));
        }
        Ok(())
    }
}
