// ─── Resilient Fetcher ───
// Every network read goes through here: tries each proxy candidate in
// order, remembers the one that worked, aggregates failures otherwise.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::proxy::{ProxyCandidate, ProxyKind, ProxySupplier};
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::fs::{remove_if_exists, rename_into_place, temp_path_for};
use crate::core::http::{BodyStream, HttpTransport, Transport};

pub struct Fetcher {
    transport: Arc<dyn Transport>,
    proxies: ProxySupplier,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(Arc::new(HttpTransport::default()), ProxySupplier::default())
    }
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, proxies: ProxySupplier) -> Self {
        Self { transport, proxies }
    }

    pub fn proxies(&self) -> &ProxySupplier {
        &self.proxies
    }

    pub async fn fetch_bytes(&self, url: &str) -> InstallerResult<Vec<u8>> {
        self.try_with_proxies(url, |body| read_all(body)).await
    }

    pub async fn fetch_text(&self, url: &str) -> InstallerResult<String> {
        let bytes = self.fetch_bytes(url).await?;
        String::from_utf8(bytes).map_err(|e| InstallerError::Other(format!("{} is not UTF-8: {}", url, e)))
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> InstallerResult<T> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Stream `url` into `dest`.
    ///
    /// Bytes land in a sibling temp file that is renamed over `dest` only after
    /// the whole body arrived; on any failure the temp file is removed, so a
    /// partial file is never visible at `dest`.
    pub async fn download(&self, url: &str, dest: &Path) -> InstallerResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InstallerError::io(parent, e))?;
        }

        let tmp = temp_path_for(dest);

        let result = self
            .try_with_proxies(url, |body| write_body(body, tmp.clone()))
            .await;

        if let Err(e) = result {
            remove_if_exists(&tmp).await;
            return Err(e);
        }

        rename_into_place(&tmp, dest).await?;

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(())
    }

    /// Run `read` on the body of the first candidate that answers.
    ///
    /// A failure while reading counts against that candidate too.
    async fn try_with_proxies<T, F, Fut>(&self, url: &str, mut read: F) -> InstallerResult<T>
    where
        F: FnMut(BodyStream) -> Fut,
        Fut: Future<Output = InstallerResult<T>>,
    {
        let parsed = Url::parse(url).map_err(|e| InstallerError::Other(format!("Invalid URL {}: {}", url, e)))?;
        let mut attempts = Vec::new();

        for ProxyCandidate { kind, route } in self.proxies.candidates(&parsed) {
            let outcome = match self.transport.open(&parsed, &route).await {
                Ok(body) => read(body).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => {
                    self.proxies.record_success(&route);
                    return Ok(value);
                }
                Err(e) => {
                    if kind == ProxyKind::Sticky {
                        self.proxies.clear_sticky();
                    }
                    debug!("Request to {} using {} failed: {}", url, route, e);
                    attempts.push(InstallerError::Request {
                        url: url.to_string(),
                        via: route.to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }

        warn!("All {} routes to {} failed", attempts.len(), url);
        Err(InstallerError::NetworkExhausted {
            target: url.to_string(),
            attempts,
        })
    }
}

async fn read_all(mut body: BodyStream) -> InstallerResult<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

async fn write_body(mut body: BodyStream, tmp: PathBuf) -> InstallerResult<()> {
    // Each attempt starts from an empty file.
    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| InstallerError::io(&tmp, e))?;

    while let Some(chunk) = body.next().await {
        file.write_all(&chunk?)
            .await
            .map_err(|e| InstallerError::io(&tmp, e))?;
    }

    file.flush().await.map_err(|e| InstallerError::io(&tmp, e))?;
    file.sync_all().await.map_err(|e| InstallerError::io(&tmp, e))?;
    Ok(())
}
