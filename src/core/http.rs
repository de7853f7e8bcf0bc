use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::{Client, Proxy, Url};
use tracing::debug;

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::net::ProxyRoute;

pub const APP_USER_AGENT: &str = concat!("loader-installer/", env!("CARGO_PKG_VERSION"));

/// Connect and read bound used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Response body as a stream of chunks.
pub type BodyStream = BoxStream<'static, InstallerResult<Vec<u8>>>;

/// One GET through one route. Non-2xx statuses are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, url: &Url, route: &ProxyRoute) -> InstallerResult<BodyStream>;
}

/// `reqwest` transport; keeps one client per route.
pub struct HttpTransport {
    user_agent: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    clients: Mutex<HashMap<ProxyRoute, Client>>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(APP_USER_AGENT, DEFAULT_TIMEOUT, DEFAULT_TIMEOUT)
    }
}

impl HttpTransport {
    pub fn new(user_agent: &str, connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            connect_timeout,
            read_timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, route: &ProxyRoute) -> InstallerResult<Client> {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(client) = clients.get(route) {
            return Ok(client.clone());
        }

        let client = build_http_client(&self.user_agent, route, self.connect_timeout, self.read_timeout)?;
        clients.insert(route.clone(), client.clone());
        Ok(client)
    }
}

pub fn build_http_client(
    user_agent: &str,
    route: &ProxyRoute,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    let builder = Client::builder()
        .user_agent(user_agent)
        .default_headers(default_headers)
        .connect_timeout(connect_timeout)
        .read_timeout(read_timeout);

    // reqwest picks up platform proxy settings unless told otherwise.
    let builder = match route {
        ProxyRoute::System => builder,
        ProxyRoute::Direct => builder.no_proxy(),
        ProxyRoute::Http(addr) => builder.no_proxy().proxy(Proxy::all(addr.to_url())?),
    };

    builder.build()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, url: &Url, route: &ProxyRoute) -> InstallerResult<BodyStream> {
        let client = self.client_for(route)?;
        let response = client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallerError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!("GET {} via {} -> {}", url, route, status);

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(InstallerError::from))
            .boxed())
    }
}
