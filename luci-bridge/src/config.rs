//! Bridge configuration
//!
//! One configured instance per router. The host platform usually hands the
//! values over directly; the TOML loader exists for development setups and
//! tests, with the path taken from `LUCI_BRIDGE_CONFIG` when set.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 10;

#[derive(Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Base URL of the router UI, e.g. `http://192.168.1.1`.
    pub host: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_update_interval")]
    pub update_interval_seconds: u64,
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

impl BridgeConfig {
    /// Load from the `LUCI_BRIDGE_CONFIG` path, falling back to
    /// `luci-bridge.toml` in the working directory.
    pub async fn load() -> Result<Self> {
        let path =
            std::env::var("LUCI_BRIDGE_CONFIG").unwrap_or_else(|_| "luci-bridge.toml".into());
        Self::load_from(Path::new(&path)).await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading bridge config {}", path.display()))?;
        let mut config: BridgeConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        // A trailing slash would double up when paths are appended.
        while config.host.ends_with('/') {
            config.host.pop();
        }
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_seconds)
    }
}

// Credentials must never end up in logs.
impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("update_interval_seconds", &self.update_interval_seconds)
            .finish()
    }
}
