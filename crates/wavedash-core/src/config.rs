//! Session settings

use crate::types::{
    DEFAULT_EXTENSION, DEFAULT_PALETTE, DEFAULT_X_LABEL, MAX_TITLE_SIGNALS, MIXED_UNITS_LABEL,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings shared by the upload pipeline and the rendering selector.
///
/// Every field has a default, so a JSON document only needs to name the
/// values it overrides:
///
/// ```rust
/// use wavedash_core::WaveDashConfig;
///
/// let config = WaveDashConfig::from_json(r#"{ "defaultXLabel": "t" }"#).unwrap();
/// assert_eq!(config.default_x_label, "t");
/// assert_eq!(config.accepted_extension, ".raw");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaveDashConfig {
    /// Upload filename suffix, compared case-insensitively
    pub accepted_extension: String,
    /// Series colors, assigned by position within a tile
    pub palette: Vec<String>,
    pub default_x_label: String,
    pub mixed_units_label: String,
    /// Titles list up to this many names before switching to "+N more"
    pub max_title_signals: usize,
}

impl Default for WaveDashConfig {
    fn default() -> Self {
        Self {
            accepted_extension: DEFAULT_EXTENSION.to_string(),
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            default_x_label: DEFAULT_X_LABEL.to_string(),
            mixed_units_label: MIXED_UNITS_LABEL.to_string(),
            max_title_signals: MAX_TITLE_SIGNALS,
        }
    }
}

impl WaveDashConfig {
    /// Load settings from JSON. Missing fields keep their defaults and an
    /// empty palette falls back to the default palette.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        if config.palette.is_empty() {
            debug!("empty palette in settings, using default palette");
            config.palette = Self::default().palette;
        }
        Ok(config)
    }

    /// Whether an upload filename carries the accepted extension
    pub fn accepts_filename(&self, filename: &str) -> bool {
        filename
            .to_lowercase()
            .ends_with(&self.accepted_extension.to_lowercase())
    }

    /// Color for the series at `index`, wrapping around the palette
    pub fn color(&self, index: usize) -> &str {
        if self.palette.is_empty() {
            return DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()];
        }
        &self.palette[index % self.palette.len()]
    }
}
