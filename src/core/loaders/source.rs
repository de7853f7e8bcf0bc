use tracing::warn;

use super::descriptor::{LaunchDescriptor, Side};
use super::local::LocalLoader;
use crate::core::error::InstallerResult;
use crate::core::version::MetaClient;

/// Where the loader's installer metadata comes from.
pub enum LoaderSource {
    /// The artifact service, for a version picked from the loader list.
    Remote,
    /// A loader jar on disk; its embedded metadata and version win.
    Local(LocalLoader),
}

impl LoaderSource {
    /// Loader version to install: the jar's own for local sources, otherwise
    /// `requested` or the default from the loader list.
    pub async fn loader_version(&self, meta: &MetaClient, requested: Option<&str>) -> InstallerResult<String> {
        match self {
            LoaderSource::Remote => meta.resolve_loader_version(requested).await,
            LoaderSource::Local(local) => {
                if let Some(requested) = requested.filter(|v| *v != local.version) {
                    warn!(
                        "Ignoring requested loader {}, {:?} contains {}",
                        requested, local.path, local.version
                    );
                }
                Ok(local.version.clone())
            }
        }
    }

    pub async fn descriptor(
        &self,
        meta: &MetaClient,
        loader_version: &str,
        game_version: &str,
        side: Side,
    ) -> InstallerResult<LaunchDescriptor> {
        match self {
            LoaderSource::Remote => meta.launch_descriptor(loader_version, game_version, side).await,
            LoaderSource::Local(local) => LaunchDescriptor::build(
                &local.meta,
                loader_version,
                game_version,
                side,
                meta.resolver().canonical_maven(),
            ),
        }
    }

    pub fn local(&self) -> Option<&LocalLoader> {
        match self {
            LoaderSource::Remote => None,
            LoaderSource::Local(local) => Some(local),
        }
    }
}
