// ─── Endpoint Resolver ───
// Mirror failover for the metadata and artifact services. Resolution starts
// at the mirror that last worked and walks the ring once.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::endpoint::ServiceEndpoint;
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::net::Fetcher;

pub struct EndpointResolver {
    fetcher: Arc<Fetcher>,
    mirrors: Vec<ServiceEndpoint>,
    active: AtomicUsize,
    /// When set, mirrors are ignored for the lifetime of this resolver.
    fixed: Option<ServiceEndpoint>,
}

impl EndpointResolver {
    pub fn new(fetcher: Arc<Fetcher>, mirrors: Vec<ServiceEndpoint>) -> InstallerResult<Self> {
        if mirrors.is_empty() {
            return Err(InstallerError::Other("at least one service mirror is required".into()));
        }

        Ok(Self {
            fetcher,
            mirrors,
            active: AtomicUsize::new(0),
            fixed: None,
        })
    }

    pub fn with_fixed(mut self, fixed: Option<ServiceEndpoint>) -> Self {
        if let Some(service) = &fixed {
            info!("Using fixed {}, mirror fallback disabled", service);
        }
        self.fixed = fixed;
        self
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    pub fn active_index(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Artifact base URL that gets substituted with the active mirror.
    pub fn canonical_maven(&self) -> &str {
        &self.mirrors[0].maven
    }

    /// Fetch `<meta base><path>` and decode it.
    pub async fn query_meta_json<T: DeserializeOwned>(&self, path: &str) -> InstallerResult<T> {
        let fetcher = &self.fetcher;
        let bytes = self
            .invoke_with_fallbacks(path, |service| {
                let url = format!("{}{}", service.meta, path);
                async move { fetcher.fetch_bytes(&url).await }
            })
            .await?;

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetch JSON from `url`, rotating mirrors only for canonical artifact URLs.
    pub async fn query_artifact_json<T: DeserializeOwned>(&self, url: &str) -> InstallerResult<T> {
        let bytes = match self.artifact_path(url) {
            None => self.fetcher.fetch_bytes(url).await?,
            Some(path) => {
                let fetcher = &self.fetcher;
                self.invoke_with_fallbacks(path, |service| {
                    let url = format!("{}{}", service.maven, path);
                    async move { fetcher.fetch_bytes(&url).await }
                })
                .await?
            }
        };

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Download `url` to `dest`, rotating mirrors only for canonical artifact URLs.
    pub async fn download_artifact(&self, url: &str, dest: &Path) -> InstallerResult<()> {
        match self.artifact_path(url) {
            None => self.fetcher.download(url, dest).await,
            Some(path) => {
                let fetcher = &self.fetcher;
                self.invoke_with_fallbacks(path, |service| {
                    let url = format!("{}{}", service.maven, path);
                    async move { fetcher.download(&url, dest).await }
                })
                .await
            }
        }
    }

    fn artifact_path<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.canonical_maven())
    }

    async fn invoke_with_fallbacks<T, F, Fut>(&self, target: &str, mut op: F) -> InstallerResult<T>
    where
        F: FnMut(ServiceEndpoint) -> Fut,
        Fut: Future<Output = InstallerResult<T>>,
    {
        if let Some(fixed) = &self.fixed {
            return op(fixed.clone()).await;
        }

        let len = self.mirrors.len();
        let start = self.active.load(Ordering::Relaxed) % len;
        let mut index = start;
        let mut attempts = Vec::new();

        loop {
            let service = self.mirrors[index].clone();
            debug!("Resolving {} via mirror #{} {}", target, index, service);

            match op(service.clone()).await {
                Ok(value) => {
                    if index != start {
                        info!("Switched to mirror #{} {}", index, service);
                    }
                    self.active.store(index, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(e) => {
                    warn!("{} failed for {}: {}", service, target, e);
                    attempts.push(e);
                }
            }

            index = (index + 1) % len;
            if index == start {
                break;
            }
        }

        Err(InstallerError::NetworkExhausted {
            target: target.to_string(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::net::testing::{Outcome, ScriptedTransport};
    use crate::core::net::ProxySupplier;
    use crate::core::service::endpoint::default_mirrors;

    fn mirrors(n: usize) -> Vec<ServiceEndpoint> {
        (0..n)
            .map(|i| ServiceEndpoint::new(&format!("https://meta{i}.test/"), &format!("https://maven{i}.test/")))
            .collect()
    }

    fn resolver(transport: Arc<ScriptedTransport>, mirrors: Vec<ServiceEndpoint>) -> EndpointResolver {
        let proxies = ProxySupplier::new(false).with_env_lookup(|_| None);
        let fetcher = Arc::new(Fetcher::new(transport, proxies));
        EndpointResolver::new(fetcher, mirrors).unwrap()
    }

    #[tokio::test]
    async fn rolls_forward_to_first_working_mirror_and_remembers_it() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .host("meta0.test", Outcome::Refused)
                .host("meta1.test", Outcome::Status(502))
                .host("meta2.test", Outcome::Body(b"[1]".to_vec())),
        );
        let resolver = resolver(transport.clone(), mirrors(3));

        let value: Vec<u32> = resolver.query_meta_json("v2/versions/game").await.unwrap();
        assert_eq!(value, vec![1]);
        assert_eq!(resolver.active_index(), 2);

        transport.clear_attempts();
        let _: Vec<u32> = resolver.query_meta_json("v2/versions/game").await.unwrap();
        assert_eq!(transport.attempted_urls(), vec!["https://meta2.test/v2/versions/game"]);
    }

    #[tokio::test]
    async fn wraps_around_from_the_active_index() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .host("meta0.test", Outcome::Body(b"{}".to_vec()))
                .route_default(Outcome::Refused),
        );
        let resolver = resolver(transport.clone(), mirrors(3));
        resolver.active.store(1, Ordering::Relaxed);

        let _: serde_json::Value = resolver.query_meta_json("x").await.unwrap();

        assert_eq!(
            transport.attempted_urls(),
            vec!["https://meta1.test/x", "https://meta2.test/x", "https://meta0.test/x"]
        );
        assert_eq!(resolver.active_index(), 0);
    }

    #[tokio::test]
    async fn exhausted_ring_reports_each_mirror_once_in_attempt_order() {
        let transport = Arc::new(ScriptedTransport::new().route_default(Outcome::Status(500)));
        let resolver = resolver(transport.clone(), mirrors(3));
        resolver.active.store(2, Ordering::Relaxed);

        let err = resolver.query_meta_json::<serde_json::Value>("x").await.unwrap_err();

        let causes = err.causes();
        assert_eq!(causes.len(), 3);
        let targets: Vec<_> = causes
            .iter()
            .map(|c| match c {
                InstallerError::NetworkExhausted { target, .. } => target.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            targets,
            vec!["https://meta2.test/x", "https://meta0.test/x", "https://meta1.test/x"]
        );
        assert_eq!(resolver.active_index(), 2);
    }

    #[tokio::test]
    async fn artifact_urls_are_substituted_only_under_the_canonical_base() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .host("maven0.test", Outcome::Refused)
                .host("maven1.test", Outcome::Body(b"{\"a\":1}".to_vec()))
                .host("libraries.minecraft.net", Outcome::Body(b"{\"b\":2}".to_vec())),
        );
        let resolver = resolver(transport.clone(), mirrors(2));

        let v: serde_json::Value = resolver
            .query_artifact_json("https://maven0.test/net/fabricmc/x.json")
            .await
            .unwrap();
        assert_eq!(v["a"], 1);
        assert_eq!(resolver.active_index(), 1);

        transport.clear_attempts();
        let v: serde_json::Value = resolver
            .query_artifact_json("https://libraries.minecraft.net/y.json")
            .await
            .unwrap();
        assert_eq!(v["b"], 2);
        assert_eq!(transport.attempted_urls(), vec!["https://libraries.minecraft.net/y.json"]);
        assert_eq!(resolver.active_index(), 1);
    }

    #[tokio::test]
    async fn fixed_service_disables_rotation() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .host("fixed.test", Outcome::Status(503))
                .route_default(Outcome::Body(b"{}".to_vec())),
        );
        let fixed = ServiceEndpoint::fixed(Some("https://fixed.test"), None).unwrap();
        let resolver = resolver(transport.clone(), default_mirrors()).with_fixed(Some(fixed));

        let err = resolver.query_meta_json::<serde_json::Value>("v2/versions/loader").await;

        assert!(err.is_err());
        assert!(transport
            .attempted_urls()
            .iter()
            .all(|u| u == "https://fixed.test/v2/versions/loader"));
    }

    #[tokio::test]
    async fn download_artifact_fails_over_and_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("lib.jar");
        let transport = Arc::new(
            ScriptedTransport::new()
                .host("maven0.test", Outcome::BrokenBody(b"half".to_vec()))
                .host("maven1.test", Outcome::Body(b"whole".to_vec())),
        );
        let resolver = resolver(transport, mirrors(2));

        resolver
            .download_artifact("https://maven0.test/a/b/1/b-1.jar", &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"whole");
    }
}
