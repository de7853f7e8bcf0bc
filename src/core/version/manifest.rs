// ─── Version Manifest ───
// The Mojang version manifest v2 and the per-version JSON it points to.
// Only the pieces the installer needs are decoded.

use std::collections::HashMap;

use serde::Deserialize;

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Top-level Mojang version manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(rename = "releaseTime")]
    pub release_time: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionEntry {
    pub fn is_stable(&self) -> bool {
        self.version_type == "release"
    }
}

impl VersionManifest {
    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// Newest release; the manifest is ordered newest first.
    pub fn latest_stable(&self) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.is_stable())
    }
}

/// Per-version JSON. Only `downloads` is read (server jar lookup).
#[derive(Debug, Clone, Deserialize)]
pub struct VersionMeta {
    pub id: String,
    #[serde(default)]
    pub downloads: HashMap<String, DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

impl VersionMeta {
    pub fn server_download(&self) -> Option<&DownloadArtifact> {
        self.downloads.get("server")
    }
}
