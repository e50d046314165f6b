//! Simulcast track configuration

use std::time::Duration;

/// Separator placed between the group label and the member's encoding id
pub const DEFAULT_SEPARATOR: &str = "#";

/// Layer id reported for encodings without explicit spatial/temporal layers
pub const MAX_LAYER_ID: u8 = 0xFF;

/// Configuration options for a [`SimulcastTrack`](crate::SimulcastTrack)
#[derive(Debug, Clone)]
pub struct SimulcastConfig {
    /// Separator used when remapping member encoding ids
    pub separator: String,

    /// Sentinel spatial/temporal id for single-layer encodings
    pub max_layer_id: u8,

    /// Return an error on unbalanced `detached()` instead of clamping
    pub strict: bool,

    /// Default polling interval for the layer monitor
    pub monitor_interval: Duration,
}

impl Default for SimulcastConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            max_layer_id: MAX_LAYER_ID,
            strict: false,
            monitor_interval: Duration::from_secs(1),
        }
    }
}

impl SimulcastConfig {
    /// Set the encoding id separator
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set the single-layer sentinel id
    pub fn max_layer_id(mut self, id: u8) -> Self {
        self.max_layer_id = id;
        self
    }

    /// Fail on unbalanced detach instead of clamping the counter
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the layer monitor polling interval
    pub fn monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Compute the aggregate-level id for a member encoding
    ///
    /// The label alone is used when the member's encoding id is empty, and
    /// the member's id is kept untouched when no label is given.
    pub fn remap_id(&self, label: &str, encoding_id: &str) -> String {
        if encoding_id.is_empty() {
            label.to_string()
        } else if label.is_empty() {
            encoding_id.to_string()
        } else {
            format!("{}{}{}", label, self.separator, encoding_id)
        }
    }
}
