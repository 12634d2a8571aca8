use serde::{Deserialize, Serialize};

use crate::ClusterError;

/// Default minimum cosine similarity for a face to join an existing cluster.
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// Controls assignment behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Minimum cosine similarity to match a cluster centroid.
    /// Lower = more lenient (more merges), higher = stricter (more clusters).
    /// Must be in (0, 1]. Default: 0.8.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Config {
    /// Creates a config with the given threshold.
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Replaces unset fields with their defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.threshold == 0.0 {
            self.threshold = DEFAULT_THRESHOLD;
        }
        self
    }

    /// Checks that the threshold lies in (0, 1].
    pub fn validate(&self) -> Result<(), ClusterError> {
        let t = self.threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(ClusterError::InvalidThreshold(t));
        }
        Ok(())
    }
}
