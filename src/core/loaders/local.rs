use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::info;

use super::descriptor::InstallerMeta;
use crate::core::error::{InstallerError, InstallerResult};

const MOD_JSON: &str = "fabric.mod.json";
const INSTALLER_JSON: &str = "fabric-installer.json";

/// A loader jar supplied from disk instead of the artifact service.
#[derive(Debug, Clone)]
pub struct LocalLoader {
    pub path: PathBuf,
    /// `version` from the jar's `fabric.mod.json`.
    pub version: String,
    pub meta: InstallerMeta,
}

impl LocalLoader {
    pub async fn read(path: &Path) -> InstallerResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| InstallerError::io(path, e))?;

        let owned = path.to_path_buf();
        let (version, meta) = tokio::task::spawn_blocking(move || read_entries(bytes))
            .await
            .map_err(|e| InstallerError::Other(format!("Reading {:?} panicked: {}", owned, e)))??;

        info!("Local loader jar {:?} is version {}", path, version);
        Ok(Self {
            path: path.to_path_buf(),
            version,
            meta,
        })
    }
}

fn read_entries(bytes: Vec<u8>) -> InstallerResult<(String, InstallerMeta)> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;

    let mod_json: serde_json::Value = serde_json::from_slice(&read_entry(&mut archive, MOD_JSON)?)?;
    let version = mod_json
        .get("version")
        .and_then(|v| v.as_str())
        .ok_or_else(|| InstallerError::descriptor(format!("{}: version", MOD_JSON), "missing or not a string"))?
        .to_string();

    let meta = InstallerMeta::from_slice(&read_entry(&mut archive, INSTALLER_JSON)?)?;
    Ok((version, meta))
}

fn read_entry<R: Read + std::io::Seek>(archive: &mut zip::ZipArchive<R>, name: &str) -> InstallerResult<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .map_err(|_| InstallerError::descriptor(name, "not found in loader jar"))?;
    let mut out = Vec::new();
    entry.read_to_end(&mut out)?;
    Ok(out)
}
