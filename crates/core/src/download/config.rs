//! Download service configuration.

use serde::{Deserialize, Serialize};

use crate::completion::DEFAULT_COMPLETION_BUFFER;

use super::types::{DownloadRequest, NetworkTypes};

/// Configuration for the bundled HTTP download service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadServiceConfig {
    /// Per-transfer timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Completion events buffered per subscriber.
    #[serde(default = "default_completion_buffer")]
    pub completion_buffer: usize,

    /// Conditions of the link the service currently runs on.
    #[serde(default)]
    pub network: NetworkConditions,
}

fn default_timeout() -> u64 {
    60
}

fn default_completion_buffer() -> usize {
    DEFAULT_COMPLETION_BUFFER
}

impl Default for DownloadServiceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            completion_buffer: default_completion_buffer(),
            network: NetworkConditions::default(),
        }
    }
}

/// Current link conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConditions {
    #[serde(default)]
    pub metered: bool,
    #[serde(default)]
    pub roaming: bool,
}

impl NetworkConditions {
    /// Whether a request may transfer over this link.
    pub fn permits(&self, request: &DownloadRequest) -> bool {
        self.permits_networks(&request.allowed_networks) && (!self.roaming || request.allow_roaming)
    }

    fn permits_networks(&self, allowed: &NetworkTypes) -> bool {
        if self.metered {
            allowed.metered
        } else {
            allowed.unmetered
        }
    }
}
