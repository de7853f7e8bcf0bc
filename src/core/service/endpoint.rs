use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{InstallerError, InstallerResult};

pub const DEFAULT_META_SERVER: &str = "https://meta.fabricmc.net/";
pub const DEFAULT_MAVEN_SERVER: &str = "https://maven.fabricmc.net/";

/// One mirrored `(metadata, artifact)` base URL pair. Bases end with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub meta: String,
    pub maven: String,
}

impl ServiceEndpoint {
    pub fn new(meta: &str, maven: &str) -> Self {
        Self {
            meta: with_trailing_slash(meta),
            maven: with_trailing_slash(maven),
        }
    }

    /// Fixed override from user input; a missing half falls back to the default.
    pub fn fixed(meta: Option<&str>, maven: Option<&str>) -> InstallerResult<Self> {
        if meta.is_none() && maven.is_none() {
            return Err(InstallerError::Other(
                "fixed service needs a meta or a maven url".into(),
            ));
        }

        Ok(Self::new(
            meta.unwrap_or(DEFAULT_META_SERVER),
            maven.unwrap_or(DEFAULT_MAVEN_SERVER),
        ))
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service(meta={}, maven={})", self.meta, self.maven)
    }
}

/// The public Fabric mirror set, primary first.
pub fn default_mirrors() -> Vec<ServiceEndpoint> {
    vec![
        ServiceEndpoint::new(DEFAULT_META_SERVER, DEFAULT_MAVEN_SERVER),
        ServiceEndpoint::new("https://meta2.fabricmc.net/", "https://maven2.fabricmc.net/"),
    ]
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
