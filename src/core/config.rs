// ─── Installer Configuration ───
// Optional JSON file plus CLI overrides. Everything has a default, so a
// missing file is the common case.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::http::APP_USER_AGENT;
use crate::core::service::{default_mirrors, ServiceEndpoint};
use crate::core::version::manifest::VERSION_MANIFEST_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Mirror ring, primary first.
    pub mirrors: Vec<ServiceEndpoint>,
    /// Disables the mirror ring when set.
    pub fixed: Option<ServiceEndpoint>,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub user_agent: String,
    /// Whether the platform proxy configuration is tried as a candidate.
    pub system_proxy: bool,
    pub manifest_url: String,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            mirrors: default_mirrors(),
            fixed: None,
            connect_timeout_secs: 8,
            read_timeout_secs: 8,
            user_agent: APP_USER_AGENT.to_string(),
            system_proxy: true,
            manifest_url: VERSION_MANIFEST_URL.to_string(),
        }
    }
}

impl InstallerConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> InstallerResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(InstallerError::io(path, e)),
        };

        let config: InstallerConfig = serde_json::from_str(&raw)?;
        if config.mirrors.is_empty() {
            return Err(InstallerError::Other(format!(
                "{}: `mirrors` must not be empty",
                path.display()
            )));
        }

        info!("Loaded config from {:?} ({} mirrors)", path, config.mirrors.len());
        Ok(config)
    }

    /// Apply `--meta-url` / `--maven-url`. Either may be absent.
    pub fn with_fixed_urls(mut self, meta: Option<&str>, maven: Option<&str>) -> InstallerResult<Self> {
        if meta.is_some() || maven.is_some() {
            self.fixed = Some(ServiceEndpoint::fixed(meta, maven)?);
        }
        Ok(self)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
