use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CapError, Result};

pub const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StashConfig {
    /// Finished recordings older than this many days are swept.
    pub retention_days: u32,
    /// Timestamp pattern for export file names (`YYYY MM DD hh mm a S`).
    pub file_pattern: String,
    pub file_suffix: String,
    pub container_ext: String,
    /// Offset applied when rendering timestamps into file names.
    pub utc_offset_minutes: i32,
    /// Store a fragment zstd-compressed only if that saves at least this fraction.
    pub min_gain: f32,
    /// fsync the journal and frame file after every commit.
    pub sync_on_commit: bool,
    pub sweep_on_open: bool,
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            file_pattern: "YYYYMMDDhhmm".into(),
            file_suffix: "_sample".into(),
            container_ext: "webm".into(),
            utc_offset_minutes: 0,
            min_gain: 0.05,
            sync_on_commit: false,
            sweep_on_open: true,
        }
    }
}

impl StashConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        let cfg: StashConfig = serde_json::from_slice(&raw)
            .map_err(|e| CapError::Config(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.min_gain) {
            return Err(CapError::Config(format!(
                "min_gain must be in [0, 1), got {}",
                self.min_gain
            )));
        }
        if self.container_ext.is_empty() || self.container_ext.contains(['/', '.']) {
            return Err(CapError::Config(format!(
                "invalid container_ext {:?}",
                self.container_ext
            )));
        }
        // UtcOffset accepts at most +/-25:59:59
        if self.utc_offset_minutes.abs() >= 26 * 60 {
            return Err(CapError::Config(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }
}
