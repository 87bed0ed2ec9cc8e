//! YAML configuration of a cut run.
//!
//! ```yaml
//! selection:
//!   - width: ['>', 0]
//!   - leakage_intensity_width_2: ['<', 0.2]
//! chunksize: 100000
//! key: events
//! cascade:
//!   parameters_group: dl1/event/telescope/parameters
//!   key_columns: [obs_id, event_id]
//! compression: {codec: zstd, level: 5}
//! ```
//!
//! Keys other than these are ignored, so the selection can live in a larger
//! analysis configuration.

use std::path::Path;

use serde::Deserialize;

use crate::cuts::{CascadeOptions, CopyOptions};
use crate::error::{CutError, Result};
use crate::selection::SelectionConfig;
use crate::store::Compression;

pub const DEFAULT_TABLE_KEY: &str = "events";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CutsConfig {
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default, alias = "chunk_size")]
    pub chunksize: Option<usize>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub cascade: CascadeSection,
    #[serde(default)]
    pub compression: Compression,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CascadeSection {
    pub parameters_group: Option<String>,
    pub key_columns: Option<Vec<String>>,
}

impl CutsConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CutError::io(path, e))?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: CutsConfig =
            serde_yaml::from_str(text).map_err(|e| CutError::Config(e.to_string()))?;
        if config.chunksize == Some(0) {
            return Err(CutError::InvalidChunkSize(0));
        }
        Ok(config)
    }

    pub fn table_key(&self) -> &str {
        self.key.as_deref().unwrap_or(DEFAULT_TABLE_KEY)
    }

    /// Copy options, `chunk_size` taking precedence over the file.
    pub fn copy_options(&self, chunk_size: Option<usize>, report_progress: bool) -> CopyOptions {
        let defaults = CopyOptions::default();
        CopyOptions {
            chunk_size: chunk_size.or(self.chunksize).unwrap_or(defaults.chunk_size),
            compression: self.compression,
            report_progress,
        }
    }

    pub fn cascade_options(&self, chunk_size: Option<usize>, report_progress: bool) -> CascadeOptions {
        let defaults = CascadeOptions::default();
        CascadeOptions {
            parameters_group: self
                .cascade
                .parameters_group
                .clone()
                .unwrap_or(defaults.parameters_group),
            key_columns: self
                .cascade
                .key_columns
                .clone()
                .unwrap_or(defaults.key_columns),
            copy: self.copy_options(chunk_size, report_progress),
        }
    }
}
