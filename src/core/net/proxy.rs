// ─── Proxy Candidates ───
// Ordered list of ways to reach a URL: sticky route, direct, system
// configuration, then the curl-style environment variables.

use std::fmt;
use std::sync::{Arc, RwLock};

use reqwest::Url;
use tracing::{debug, warn};

use crate::core::error::{InstallerError, InstallerResult};

/// Port used when a proxy URL does not name one.
const DEFAULT_PROXY_PORT: u16 = 80;

/// Where a candidate came from. Order of this enum is the order of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    Sticky,
    Direct,
    System,
    Env,
}

/// An HTTP proxy endpoint parsed from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyAddress {
    pub host: String,
    pub port: u16,
}

impl ProxyAddress {
    pub fn to_url(&self) -> String {
        format!("http://{}", self)
    }
}

/// `host:port`, with IPv6 hosts in brackets.
impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// How a single connection attempt is routed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProxyRoute {
    /// No proxy at all.
    Direct,
    /// Whatever the platform proxy configuration says.
    System,
    /// An explicit HTTP proxy.
    Http(ProxyAddress),
}

impl fmt::Display for ProxyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyRoute::Direct => write!(f, "direct connection"),
            ProxyRoute::System => write!(f, "system proxy"),
            ProxyRoute::Http(addr) => write!(f, "proxy {}", addr),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCandidate {
    pub kind: ProxyKind,
    pub route: ProxyRoute,
}

impl ProxyCandidate {
    pub fn new(kind: ProxyKind, route: ProxyRoute) -> Self {
        Self { kind, route }
    }

    /// Address of the proxy, if this candidate goes through one.
    pub fn proxy_address(&self) -> Option<&ProxyAddress> {
        match &self.route {
            ProxyRoute::Http(addr) => Some(addr),
            _ => None,
        }
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds candidate lists and holds the last route that worked.
///
/// The sticky slot is a best-effort hint: concurrent writers may overwrite each
/// other and that is fine.
pub struct ProxySupplier {
    last_success: RwLock<Option<ProxyRoute>>,
    use_system: bool,
    env: EnvLookup,
}

impl Default for ProxySupplier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ProxySupplier {
    pub fn new(use_system: bool) -> Self {
        Self {
            last_success: RwLock::new(None),
            use_system,
            env: Arc::new(|key| std::env::var(key).ok()),
        }
    }

    /// Replace the environment source (tests, embedding callers).
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    /// Candidates for `url`, most specific first. Never touches the network.
    pub fn candidates(&self, url: &Url) -> Vec<ProxyCandidate> {
        let sticky = self.sticky();
        let mut out: Vec<ProxyCandidate> = sticky
            .iter()
            .map(|route| ProxyCandidate::new(ProxyKind::Sticky, route.clone()))
            .collect();

        let mut rest = vec![ProxyCandidate::new(ProxyKind::Direct, ProxyRoute::Direct)];
        if self.use_system {
            rest.push(ProxyCandidate::new(ProxyKind::System, ProxyRoute::System));
        }
        for addr in self.environment_proxies() {
            rest.push(ProxyCandidate::new(ProxyKind::Env, ProxyRoute::Http(addr)));
        }

        // The sticky route is tried once, in front.
        out.extend(rest.into_iter().filter(|c| sticky.as_ref() != Some(&c.route)));

        debug!("{} proxy candidates for {}", out.len(), url);
        out
    }

    pub fn sticky(&self) -> Option<ProxyRoute> {
        self.last_success
            .read()
            .map(|slot| slot.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn record_success(&self, route: &ProxyRoute) {
        match self.last_success.write() {
            Ok(mut slot) => *slot = Some(route.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(route.clone()),
        }
    }

    /// Drop the sticky route after it failed, so it loses its priority.
    pub fn clear_sticky(&self) {
        match self.last_success.write() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    fn environment_proxies(&self) -> Vec<ProxyAddress> {
        let mut out = Vec::new();

        for (upper, lower) in [("HTTP_PROXY", "http_proxy"), ("HTTPS_PROXY", "https_proxy")] {
            let Some(raw) = (self.env)(upper).or_else(|| (self.env)(lower)) else {
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }

            match parse_proxy(&raw) {
                Ok(addr) => out.push(addr),
                Err(e) => warn!("Ignoring {} environment variable: {}", upper, e),
            }
        }

        out
    }
}

/// Parse `scheme://host[:port]` into a proxy address. Port defaults to 80.
pub fn parse_proxy(raw: &str) -> InstallerResult<ProxyAddress> {
    let invalid = |reason: &str| InstallerError::InvalidProxy {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("missing host"))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();

    // `Url::port` hides a port equal to the scheme default, so check the raw text.
    let port = match url.port() {
        Some(port) => port,
        None if authority_has_port(trimmed) => url.port_or_known_default().unwrap_or(DEFAULT_PROXY_PORT),
        None => DEFAULT_PROXY_PORT,
    };

    Ok(ProxyAddress { host, port })
}

fn authority_has_port(raw: &str) -> bool {
    let rest = raw.split_once("://").map(|(_, r)| r).unwrap_or(raw);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host_port = authority.rsplit_once('@').map(|(_, hp)| hp).unwrap_or(authority);
    let after_host = host_port.rsplit_once(']').map(|(_, p)| p).unwrap_or(host_port);
    after_host.contains(':')
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn supplier_with_env(vars: &[(&str, &str)]) -> ProxySupplier {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProxySupplier::new(true).with_env_lookup(move |key| vars.get(key).cloned())
    }

    fn url() -> Url {
        Url::parse("https://meta.fabricmc.net/v2/versions/loader").unwrap()
    }

    #[test]
    fn parse_proxy_defaults_port_to_80() {
        let addr = parse_proxy("http://proxy.local").unwrap();
        assert_eq!(addr.host, "proxy.local");
        assert_eq!(addr.port, 80);

        let addr = parse_proxy("https://proxy.local").unwrap();
        assert_eq!(addr.port, 80);
    }

    #[test]
    fn parse_proxy_keeps_explicit_port() {
        assert_eq!(parse_proxy("http://10.0.0.1:3128").unwrap().port, 3128);
        assert_eq!(parse_proxy("https://proxy.local:443").unwrap().port, 443);
        assert_eq!(parse_proxy("http://user:pw@proxy.local:8080/").unwrap().port, 8080);
    }

    #[test]
    fn ipv6_proxy_keeps_brackets_in_url() {
        let addr = parse_proxy("http://[::1]:3128").unwrap();
        assert_eq!(addr.host, "::1");
        assert_eq!(addr.to_url(), "http://[::1]:3128");
        assert_eq!(ProxyRoute::Http(addr).to_string(), "proxy [::1]:3128");
    }

    #[test]
    fn parse_proxy_rejects_values_without_host() {
        assert!(parse_proxy("not a url").is_err());
        assert!(parse_proxy("proxy.local:3128").is_err());
    }

    #[test]
    fn default_order_is_direct_system_env() {
        let supplier = supplier_with_env(&[
            ("HTTP_PROXY", "http://one:8080"),
            ("https_proxy", "http://two"),
        ]);

        let kinds: Vec<_> = supplier.candidates(&url()).iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ProxyKind::Direct, ProxyKind::System, ProxyKind::Env, ProxyKind::Env]
        );

        let candidates = supplier.candidates(&url());
        assert_eq!(candidates[2].proxy_address().unwrap().host, "one");
        assert_eq!(candidates[3].proxy_address().unwrap().port, 80);
    }

    #[test]
    fn uppercase_env_var_wins_over_lowercase() {
        let supplier = supplier_with_env(&[
            ("HTTP_PROXY", "http://upper:1"),
            ("http_proxy", "http://lower:2"),
        ]);

        let envs: Vec<_> = supplier
            .candidates(&url())
            .into_iter()
            .filter(|c| c.kind == ProxyKind::Env)
            .collect();
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].proxy_address().unwrap().host, "upper");
    }

    #[test]
    fn malformed_env_proxy_is_skipped_not_fatal() {
        let supplier = supplier_with_env(&[("HTTP_PROXY", "::::"), ("HTTPS_PROXY", "http://ok:9")]);

        let candidates = supplier.candidates(&url());
        assert_eq!(candidates[0].route, ProxyRoute::Direct);
        let envs: Vec<_> = candidates.iter().filter(|c| c.kind == ProxyKind::Env).collect();
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].proxy_address().unwrap().host, "ok");
    }

    #[test]
    fn sticky_route_goes_first_until_cleared() {
        let supplier = supplier_with_env(&[]);
        let route = ProxyRoute::Http(ProxyAddress {
            host: "sticky".into(),
            port: 3128,
        });

        supplier.record_success(&route);
        let candidates = supplier.candidates(&url());
        assert_eq!(candidates[0], ProxyCandidate::new(ProxyKind::Sticky, route));
        assert_eq!(candidates[1].kind, ProxyKind::Direct);

        supplier.clear_sticky();
        assert_eq!(supplier.candidates(&url())[0].kind, ProxyKind::Direct);
    }

    #[test]
    fn sticky_route_is_not_repeated() {
        let supplier = ProxySupplier::new(true).with_env_lookup(|_| None);
        supplier.record_success(&ProxyRoute::System);

        let routes: Vec<_> = supplier.candidates(&url()).into_iter().map(|c| c.route).collect();
        assert_eq!(routes, vec![ProxyRoute::System, ProxyRoute::Direct]);
    }

    #[test]
    fn system_candidate_can_be_disabled() {
        let supplier = ProxySupplier::new(false).with_env_lookup(|_| None);
        let candidates = supplier.candidates(&url());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].route, ProxyRoute::Direct);
    }
}
