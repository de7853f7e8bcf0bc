// ─── Metadata Client ───
// Version lists and launch descriptors. Fabric metadata goes through the
// endpoint resolver; the Mojang manifest is fetched directly and cached.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::info;

use super::manifest::{DownloadArtifact, VersionManifest, VersionMeta};
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::loaders::descriptor::{InstallerMeta, LaunchDescriptor, Side};
use crate::core::maven::{ArtifactCoordinate, LOADER_ARTIFACT, LOADER_GROUP};
use crate::core::service::EndpointResolver;

/// One entry of `v2/versions/loader`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderVersionEntry {
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub build: Option<u32>,
    #[serde(default)]
    pub maven: Option<String>,
    pub version: String,
    #[serde(default)]
    pub stable: bool,
}

pub struct MetaClient {
    resolver: Arc<EndpointResolver>,
    manifest_url: String,
    game_manifest: OnceCell<VersionManifest>,
}

impl MetaClient {
    pub fn new(resolver: Arc<EndpointResolver>, manifest_url: &str) -> Self {
        Self {
            resolver,
            manifest_url: manifest_url.to_string(),
            game_manifest: OnceCell::new(),
        }
    }

    pub fn resolver(&self) -> &Arc<EndpointResolver> {
        &self.resolver
    }

    /// Mojang version manifest, fetched on first use and kept for the
    /// lifetime of this client.
    pub async fn game_version_manifest(&self) -> InstallerResult<&VersionManifest> {
        self.game_manifest
            .get_or_try_init(|| async {
                info!("Fetching Minecraft version manifest...");
                let manifest: VersionManifest =
                    self.resolver.fetcher().fetch_json(&self.manifest_url).await?;
                info!("Loaded {} versions from manifest", manifest.versions.len());
                Ok::<_, InstallerError>(manifest)
            })
            .await
    }

    pub async fn loader_versions(&self) -> InstallerResult<Vec<LoaderVersionEntry>> {
        self.resolver.query_meta_json("v2/versions/loader").await
    }

    /// `requested` if the manifest knows it, else the newest release.
    pub async fn resolve_game_version(&self, requested: Option<&str>) -> InstallerResult<String> {
        let manifest = self.game_version_manifest().await?;
        let entry = match requested {
            Some(id) => manifest.find_version(id).ok_or_else(|| InstallerError::VersionNotFound {
                kind: "game",
                version: id.to_string(),
            })?,
            None => manifest.latest_stable().ok_or_else(|| InstallerError::VersionNotFound {
                kind: "game",
                version: "latest release".to_string(),
            })?,
        };
        Ok(entry.id.clone())
    }

    /// `requested` if listed, else the first stable loader (or the first one).
    pub async fn resolve_loader_version(&self, requested: Option<&str>) -> InstallerResult<String> {
        let versions = self.loader_versions().await?;

        let found = match requested {
            Some(v) => versions.iter().find(|e| e.version == v),
            None => versions.iter().find(|e| e.stable).or_else(|| versions.first()),
        };

        found.map(|e| e.version.clone()).ok_or_else(|| InstallerError::VersionNotFound {
            kind: "loader",
            version: requested.unwrap_or("latest").to_string(),
        })
    }

    /// The loader's installer metadata from the artifact service.
    pub async fn installer_meta(&self, loader_version: &str) -> InstallerResult<InstallerMeta> {
        let url = self.installer_meta_url(loader_version)?;
        let value: serde_json::Value = self.resolver.query_artifact_json(&url).await?;
        InstallerMeta::from_json(value)
    }

    pub async fn launch_descriptor(
        &self,
        loader_version: &str,
        game_version: &str,
        side: Side,
    ) -> InstallerResult<LaunchDescriptor> {
        let meta = self.installer_meta(loader_version).await?;
        LaunchDescriptor::build(
            &meta,
            loader_version,
            game_version,
            side,
            self.resolver.canonical_maven(),
        )
    }

    /// Vanilla server jar download for `game_version`.
    pub async fn server_download(&self, game_version: &str) -> InstallerResult<DownloadArtifact> {
        let manifest = self.game_version_manifest().await?;
        let entry = manifest
            .find_version(game_version)
            .ok_or_else(|| InstallerError::VersionNotFound {
                kind: "game",
                version: game_version.to_string(),
            })?;

        let meta: VersionMeta = self.resolver.fetcher().fetch_json(&entry.url).await?;
        meta.server_download().cloned().ok_or_else(|| {
            InstallerError::Other(format!("Minecraft {} has no server download", meta.id))
        })
    }

    fn installer_meta_url(&self, loader_version: &str) -> InstallerResult<String> {
        let coord = ArtifactCoordinate::parse(&format!(
            "{}:{}:{}@json",
            LOADER_GROUP, LOADER_ARTIFACT, loader_version
        ))?;
        Ok(coord.url(self.resolver.canonical_maven()))
    }
}
