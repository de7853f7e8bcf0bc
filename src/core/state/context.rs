use std::sync::Arc;

use tracing::debug;

use crate::core::config::InstallerConfig;
use crate::core::error::InstallerResult;
use crate::core::http::{HttpTransport, Transport};
use crate::core::net::{Fetcher, ProxySupplier};
use crate::core::service::EndpointResolver;
use crate::core::version::MetaClient;

/// Everything one installer process shares between installs: the sticky
/// proxy slot, the active mirror index and the cached game manifest.
///
/// Tests build a fresh context per case instead of resetting globals.
pub struct InstallerContext {
    pub config: InstallerConfig,
    pub fetcher: Arc<Fetcher>,
    pub resolver: Arc<EndpointResolver>,
    pub meta: MetaClient,
}

impl InstallerContext {
    pub fn new(config: InstallerConfig) -> InstallerResult<Self> {
        let transport = Arc::new(HttpTransport::new(
            &config.user_agent,
            config.connect_timeout(),
            config.read_timeout(),
        ));
        let proxies = ProxySupplier::new(config.system_proxy);
        Self::with_transport(config, transport, proxies)
    }

    pub fn with_transport(
        config: InstallerConfig,
        transport: Arc<dyn Transport>,
        proxies: ProxySupplier,
    ) -> InstallerResult<Self> {
        let fetcher = Arc::new(Fetcher::new(transport, proxies));
        let resolver = Arc::new(
            EndpointResolver::new(fetcher.clone(), config.mirrors.clone())?
                .with_fixed(config.fixed.clone()),
        );
        let meta = MetaClient::new(resolver.clone(), &config.manifest_url);

        debug!(
            "Installer context ready: {} mirrors, fixed={}",
            config.mirrors.len(),
            config.fixed.is_some()
        );

        Ok(Self {
            config,
            fetcher,
            resolver,
            meta,
        })
    }
}
