use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cairn_store::RetryConfig;
use cairn_world::{WorldCacheConfig, WorldGenConfig};
use serde::Deserialize;

/// Engine settings, usually read from `cairn.toml`. Every field has a default.
#[derive(Clone, Debug, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_render_radius")]
    pub render_radius: i32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_load_workers")]
    pub load_workers: usize,
    #[serde(default = "default_load_deadline_ms")]
    pub load_deadline_ms: u64,
    #[serde(default)]
    pub seed: i32,
    /// Journal file; in-memory store when unset.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Block definitions; built-in set when unset.
    #[serde(default)]
    pub blocks_path: Option<PathBuf>,
    /// Attach an in-process authoritative peer.
    #[serde(default)]
    pub loopback_remote: bool,
    #[serde(default)]
    pub worldgen: WorldGenConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_render_radius() -> i32 {
    6
}
fn default_batch_size() -> usize {
    4
}
fn default_load_workers() -> usize {
    4
}
fn default_load_deadline_ms() -> u64 {
    500
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render_radius: default_render_radius(),
            batch_size: default_batch_size(),
            load_workers: default_load_workers(),
            load_deadline_ms: default_load_deadline_ms(),
            seed: 0,
            store_path: None,
            blocks_path: None,
            loopback_remote: false,
            worldgen: WorldGenConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        Ok(toml::from_str(s)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn world_cache(&self) -> WorldCacheConfig {
        WorldCacheConfig {
            load_workers: self.load_workers.max(1),
            load_deadline: Duration::from_millis(self.load_deadline_ms),
            ..WorldCacheConfig::for_radius(self.render_radius)
        }
    }
}
