use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server configuration. Every key is optional in the TOML file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root directory of the object store.
    pub storage_root: PathBuf,
    /// Upper bound on upload size in bytes. `None` means unbounded.
    pub max_object_size: Option<u64>,
    /// Timeout for each callback notification request.
    pub callback_timeout_secs: u64,
    /// Staging files older than this are swept at startup. `0` disables the
    /// sweep.
    pub staging_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8081)),
            storage_root: PathBuf::from("./store/"),
            max_object_size: None,
            callback_timeout_secs: 10,
            staging_grace_secs: 3600,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }

    pub fn staging_grace(&self) -> Option<Duration> {
        (self.staging_grace_secs > 0).then(|| Duration::from_secs(self.staging_grace_secs))
    }
}
