//! Runtime configuration for the scaler

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the inter-update delay is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum DelayMode {
    /// Sleep after every write, including the last one
    #[default]
    AfterEach,
    /// Sleep only between two consecutive writes
    Between,
}

/// Scaler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalerConfig {
    /// Deadline for every individual cluster call, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Placement of the inter-update delay
    #[serde(default)]
    pub delay_mode: DelayMode,

    /// Reject negative or inverted bounds before touching the cluster
    #[serde(default)]
    pub strict_bounds: bool,

    /// Namespace holding every workload. When unset each workload is looked
    /// up in the namespace carrying its own name.
    #[serde(default)]
    pub namespace: Option<String>,
}

fn default_request_timeout_ms() -> u64 {
    500
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            delay_mode: DelayMode::default(),
            strict_bounds: false,
            namespace: None,
        }
    }
}

impl ScalerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
