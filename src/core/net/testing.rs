//! In-memory transport for tests: canned answers per route, URL or host,
//! and a log of every attempt.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::Url;

use super::proxy::ProxyRoute;
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::http::{BodyStream, Transport};

#[derive(Debug, Clone)]
pub enum Outcome {
    Body(Vec<u8>),
    Status(u16),
    Refused,
    /// Sends these bytes, then the connection drops.
    BrokenBody(Vec<u8>),
}

pub struct ScriptedTransport {
    by_route: Vec<(ProxyRoute, Outcome)>,
    by_url: HashMap<String, Outcome>,
    by_host: HashMap<String, Outcome>,
    fallback: Outcome,
    attempts: Mutex<Vec<(String, ProxyRoute)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            by_route: Vec::new(),
            by_url: HashMap::new(),
            by_host: HashMap::new(),
            fallback: Outcome::Status(404),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Route rules win over URL and host rules.
    pub fn route(mut self, route: ProxyRoute, outcome: Outcome) -> Self {
        self.by_route.push((route, outcome));
        self
    }

    pub fn route_default(mut self, outcome: Outcome) -> Self {
        self.fallback = outcome;
        self
    }

    pub fn url(mut self, url: &str, outcome: Outcome) -> Self {
        self.by_url.insert(url.to_string(), outcome);
        self
    }

    pub fn json(self, url: &str, body: &serde_json::Value) -> Self {
        self.url(url, Outcome::Body(body.to_string().into_bytes()))
    }

    pub fn host(mut self, host: &str, outcome: Outcome) -> Self {
        self.by_host.insert(host.to_string(), outcome);
        self
    }

    pub fn attempted_routes(&self) -> Vec<ProxyRoute> {
        self.lock().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn attempted_urls(&self) -> Vec<String> {
        self.lock().iter().map(|(u, _)| u.clone()).collect()
    }

    pub fn clear_attempts(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, ProxyRoute)>> {
        self.attempts.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn outcome_for(&self, url: &Url, route: &ProxyRoute) -> Outcome {
        if let Some((_, outcome)) = self.by_route.iter().find(|(r, _)| r == route) {
            return outcome.clone();
        }
        if let Some(outcome) = self.by_url.get(url.as_str()) {
            return outcome.clone();
        }
        if let Some(outcome) = url.host_str().and_then(|h| self.by_host.get(h)) {
            return outcome.clone();
        }
        self.fallback.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, url: &Url, route: &ProxyRoute) -> InstallerResult<BodyStream> {
        self.lock().push((url.to_string(), route.clone()));

        match self.outcome_for(url, route) {
            Outcome::Body(bytes) => Ok(stream::iter(vec![Ok(bytes)]).boxed()),
            Outcome::Status(status) => Err(InstallerError::HttpStatus {
                url: url.to_string(),
                status,
            }),
            Outcome::Refused => Err(InstallerError::io(
                "",
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )),
            Outcome::BrokenBody(bytes) => Ok(stream::iter(vec![
                Ok(bytes),
                Err(InstallerError::io(
                    "",
                    std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
                )),
            ])
            .boxed()),
        }
    }
}
