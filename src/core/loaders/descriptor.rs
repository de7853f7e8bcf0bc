// ─── Launch Descriptor ───
// Explicit schema for the loader's installer metadata
// (`fabric-loader-<v>.json`, also embedded in the loader jar as
// `fabric-installer.json`) and the flattened descriptor built from it.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::warn;

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::maven::{ArtifactCoordinate, LOADER_ARTIFACT, LOADER_GROUP, MAPPINGS_ARTIFACT, MOJANG_LIBRARIES};

/// Prefix of every generated profile id.
pub const LOADER_NAME: &str = "fabric-loader";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Server => "server",
        }
    }
}

// ── Wire schema ─────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MainClass {
    Flat(String),
    Split {
        client: String,
        #[serde(default)]
        server: Option<String>,
    },
}

/// `{common, client, server}` groups; any may be absent.
#[derive(Debug, Clone, Deserialize)]
pub struct Sided<T> {
    #[serde(default = "Vec::new")]
    pub common: Vec<T>,
    #[serde(default = "Vec::new")]
    pub client: Vec<T>,
    #[serde(default = "Vec::new")]
    pub server: Vec<T>,
}

impl<T> Default for Sided<T> {
    fn default() -> Self {
        Self {
            common: Vec::new(),
            client: Vec::new(),
            server: Vec::new(),
        }
    }
}

impl<T: Clone> Sided<T> {
    /// `common` first, then the side's own group, in declaration order.
    pub fn for_side(&self, side: Side) -> Vec<T> {
        let own = match side {
            Side::Client => &self.client,
            Side::Server => &self.server,
        };
        self.common.iter().chain(own.iter()).cloned().collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibrarySpec {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LaunchWrapper {
    #[serde(default)]
    pub tweakers: Sided<String>,
}

/// The loader's installer metadata document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallerMeta {
    #[serde(default)]
    pub version: Option<u32>,
    pub main_class: MainClass,
    #[serde(default)]
    pub libraries: Sided<LibrarySpec>,
    #[serde(default)]
    pub arguments: Sided<String>,
    #[serde(default)]
    pub launchwrapper: Option<LaunchWrapper>,
}

impl InstallerMeta {
    /// Decode and validate. Errors name the offending field.
    pub fn from_json(value: serde_json::Value) -> InstallerResult<Self> {
        let meta: InstallerMeta = serde_json::from_value(value)
            .map_err(|e| InstallerError::descriptor("installer metadata", e.to_string()))?;
        meta.validate()?;
        Ok(meta)
    }

    pub fn from_slice(bytes: &[u8]) -> InstallerResult<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        Self::from_json(value)
    }

    fn validate(&self) -> InstallerResult<()> {
        match &self.main_class {
            MainClass::Flat(c) if c.is_empty() => {
                return Err(InstallerError::descriptor("mainClass", "empty main class"));
            }
            MainClass::Split { client, .. } if client.is_empty() => {
                return Err(InstallerError::descriptor("mainClass.client", "empty main class"));
            }
            _ => {}
        }

        let groups = [
            ("common", &self.libraries.common),
            ("client", &self.libraries.client),
            ("server", &self.libraries.server),
        ];
        for (group, libs) in groups {
            for (i, lib) in libs.iter().enumerate() {
                ArtifactCoordinate::parse(&lib.name).map_err(|e| {
                    InstallerError::descriptor(format!("libraries.{}[{}].name", group, i), e.to_string())
                })?;
            }
        }

        Ok(())
    }

    pub fn main_class(&self, side: Side) -> Option<&str> {
        match (&self.main_class, side) {
            (MainClass::Flat(c), _) => Some(c),
            (MainClass::Split { client, .. }, Side::Client) => Some(client),
            (MainClass::Split { server, .. }, Side::Server) => server.as_deref(),
        }
    }
}

// ── Descriptor ──────────────────────────────────────────

/// One library entry as written into the launch JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    /// Repository base, ends with `/`.
    pub url: String,
    pub coordinate: ArtifactCoordinate,
}

impl Library {
    pub fn new(name: &str, url: Option<&str>) -> InstallerResult<Self> {
        let base = url.unwrap_or(MOJANG_LIBRARIES);
        let url = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };

        Ok(Self {
            name: name.to_string(),
            url,
            coordinate: ArtifactCoordinate::parse(name)?,
        })
    }

    pub fn download_url(&self) -> String {
        self.coordinate.url(&self.url)
    }
}

#[derive(Debug, Clone)]
pub struct LaunchDescriptor {
    pub profile_id: String,
    pub loader_version: String,
    pub inherits_from: String,
    pub main_class_client: String,
    pub main_class_server: Option<String>,
    /// Libraries for the side this descriptor was built for.
    pub libraries: Vec<Library>,
    pub game_arguments: Vec<String>,
}

pub fn profile_id(loader_version: &str, game_version: &str) -> String {
    format!("{}-{}-{}", LOADER_NAME, loader_version, game_version)
}

impl LaunchDescriptor {
    /// Flatten `meta` for `side` and append the mappings and loader artifacts
    /// (from `maven`) unless the metadata already lists them.
    pub fn build(
        meta: &InstallerMeta,
        loader_version: &str,
        game_version: &str,
        side: Side,
        maven: &str,
    ) -> InstallerResult<Self> {
        let main_class_client = meta
            .main_class(Side::Client)
            .ok_or_else(|| InstallerError::descriptor("mainClass.client", "missing"))?
            .to_string();
        let main_class_server = meta.main_class(Side::Server).map(str::to_string);

        if side == Side::Server && main_class_server.is_none() {
            return Err(InstallerError::descriptor("mainClass.server", "missing"));
        }

        let mut libraries = meta
            .libraries
            .for_side(side)
            .iter()
            .map(|spec| Library::new(&spec.name, spec.url.as_deref()))
            .collect::<InstallerResult<Vec<_>>>()?;

        ensure_library(
            &mut libraries,
            &format!("{}:{}:{}", LOADER_GROUP, MAPPINGS_ARTIFACT, game_version),
            maven,
        )?;
        ensure_library(
            &mut libraries,
            &format!("{}:{}:{}", LOADER_GROUP, LOADER_ARTIFACT, loader_version),
            maven,
        )?;

        for name in duplicate_libraries(&libraries) {
            warn!("Library {} is declared more than once; keeping every entry", name);
        }

        let mut game_arguments = meta.arguments.for_side(side);
        if side == Side::Client {
            if let Some(wrapper) = &meta.launchwrapper {
                let tweakers = wrapper.tweakers.for_side(Side::Client);
                if tweakers.len() > 1 {
                    warn!("{} tweakers declared, only {} is used", tweakers.len(), tweakers[0]);
                }
                if let Some(tweaker) = tweakers.first() {
                    game_arguments.push("--tweakClass".to_string());
                    game_arguments.push(tweaker.clone());
                }
            }
        }

        Ok(Self {
            profile_id: profile_id(loader_version, game_version),
            loader_version: loader_version.to_string(),
            inherits_from: game_version.to_string(),
            main_class_client,
            main_class_server,
            libraries,
            game_arguments,
        })
    }

    pub fn main_class(&self, side: Side) -> Option<&str> {
        match side {
            Side::Client => Some(&self.main_class_client),
            Side::Server => self.main_class_server.as_deref(),
        }
    }

    /// Coordinate of the loader jar itself.
    pub fn loader_coordinate(&self) -> String {
        format!("{}:{}:{}", LOADER_GROUP, LOADER_ARTIFACT, self.loader_version)
    }
}

fn ensure_library(libraries: &mut Vec<Library>, name: &str, url: &str) -> InstallerResult<()> {
    if libraries.iter().any(|lib| lib.name == name) {
        return Ok(());
    }
    libraries.push(Library::new(name, Some(url))?);
    Ok(())
}

/// Names that appear more than once, in first-seen order.
pub fn duplicate_libraries(libraries: &[Library]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut out = Vec::new();

    for lib in libraries {
        if !seen.insert(lib.name.as_str()) && reported.insert(lib.name.as_str()) {
            out.push(lib.name.clone());
        }
    }
    out
}
