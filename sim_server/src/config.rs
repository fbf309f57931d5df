//! Server configuration.
//!
//! The scheduler section is shared with `sim_shared`; the world section only
//! matters to the demo host.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sim_shared::config::SchedulerConfig;

use crate::world::WorldConfig;

/// Root configuration for the `server` binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub world: WorldConfig,
}

impl ServerConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse config {}", path.display()))
    }
}
