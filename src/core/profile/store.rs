// ─── Launcher Profile Store ───
// Inserts or updates one entry in the launcher's profile JSON. Every other
// key, including its position, is written back untouched.

use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::value::{to_raw_value, RawValue};
use tracing::{debug, info};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::fs::write_atomic;
use crate::core::loaders::descriptor::LOADER_NAME;

/// Built-in launcher icon used for new entries.
const PROFILE_ICON: &str = "Furnace";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherType {
    Win32,
    MicrosoftStore,
}

impl LauncherType {
    pub const ALL: [LauncherType; 2] = [LauncherType::Win32, LauncherType::MicrosoftStore];

    pub fn profile_file(&self) -> &'static str {
        match self {
            LauncherType::Win32 => "launcher_profiles.json",
            LauncherType::MicrosoftStore => "launcher_profiles_microsoft_store.json",
        }
    }

    /// Launcher types whose profile store exists under `dir`.
    pub fn installed(dir: &Path) -> Vec<LauncherType> {
        Self::ALL
            .into_iter()
            .filter(|t| dir.join(t.profile_file()).is_file())
            .collect()
    }
}

impl fmt::Display for LauncherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LauncherType::Win32 => write!(f, "win32"),
            LauncherType::MicrosoftStore => write!(f, "microsoft_store"),
        }
    }
}

impl FromStr for LauncherType {
    type Err = InstallerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "win32" => Ok(LauncherType::Win32),
            "microsoft_store" => Ok(LauncherType::MicrosoftStore),
            other => Err(InstallerError::Other(format!(
                "Unknown launcher type {:?} (expected win32 or microsoft_store)",
                other
            ))),
        }
    }
}

/// One launcher row per game version, whatever loader version it points at.
pub fn profile_key(game_version: &str) -> String {
    format!("{}-{}", LOADER_NAME, game_version)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { store: PathBuf, key: String, created: bool },
    /// No profile store for the chosen launcher.
    Skipped,
}

/// Pick the store file under `dir`.
///
/// An explicit choice wins. Otherwise the single existing store is used; two
/// stores without a choice is an error, none means there is nothing to merge.
pub fn select_store(dir: &Path, launcher: Option<LauncherType>) -> InstallerResult<Option<PathBuf>> {
    if let Some(launcher) = launcher {
        let path = dir.join(launcher.profile_file());
        return Ok(path.is_file().then_some(path));
    }

    match LauncherType::installed(dir).as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(dir.join(only.profile_file()))),
        _ => Err(InstallerError::AmbiguousLauncher(dir.to_path_buf())),
    }
}

/// Point the `fabric-loader-<game>` entry at `profile_id`.
///
/// Entries other than that one are written back with their original bytes.
pub async fn merge_profile(
    dir: &Path,
    launcher: Option<LauncherType>,
    game_version: &str,
    profile_id: &str,
    now: DateTime<Utc>,
) -> InstallerResult<MergeOutcome> {
    let Some(store) = select_store(dir, launcher)? else {
        info!("No launcher profile store in {:?}, skipping profile creation", dir);
        return Ok(MergeOutcome::Skipped);
    };

    let raw = tokio::fs::read_to_string(&store)
        .await
        .map_err(|e| InstallerError::io(&store, e))?;

    let key = profile_key(game_version);
    let (out, created) = merge_text(&raw, &key, profile_id, now)
        .map_err(|message| InstallerError::descriptor(store.display().to_string(), message))?;
    write_atomic(&store, out.as_bytes()).await?;

    info!(
        "{} profile {} -> {} in {:?}",
        if created { "Created" } else { "Updated" },
        key,
        profile_id,
        store
    );
    Ok(MergeOutcome::Merged { store, key, created })
}

/// Rewritten store text, and whether the entry is new.
fn merge_text(raw: &str, key: &str, profile_id: &str, now: DateTime<Utc>) -> Result<(String, bool), String> {
    let mut root = parse_object(raw, "profile store")?;

    let mut profiles = match root.get("profiles") {
        Some(Slot::Raw(value)) => parse_object(value.get(), "`profiles`")?,
        _ => Entries::default(),
    };

    let created = match profiles.get(key) {
        Some(Slot::Raw(value)) => {
            let mut entry = parse_object(value.get(), &format!("profile `{}`", key))?;
            entry.upsert("lastVersionId", Slot::json(&profile_id)?);
            profiles.upsert(key, Slot::Edited(entry));
            debug!("Kept created timestamp of existing profile {}", key);
            false
        }
        _ => {
            let stamp = now.format(TIMESTAMP_FORMAT).to_string();
            let mut entry = Entries::default();
            entry.upsert("name", Slot::json(&key)?);
            entry.upsert("type", Slot::json(&"custom")?);
            entry.upsert("created", Slot::json(&stamp)?);
            entry.upsert("lastUsed", Slot::json(&stamp)?);
            entry.upsert("icon", Slot::json(&PROFILE_ICON)?);
            entry.upsert("lastVersionId", Slot::json(&profile_id)?);
            profiles.upsert(key, Slot::Edited(entry));
            true
        }
    };
    root.upsert("profiles", Slot::Edited(profiles));

    let mut out = serde_json::to_string_pretty(&root).map_err(|e| e.to_string())?;
    out.push('\n');
    Ok((out, created))
}

fn parse_object(text: &str, what: &str) -> Result<Entries<Slot>, String> {
    let entries: Entries<Box<RawValue>> =
        serde_json::from_str(text).map_err(|e| format!("{} is not a JSON object: {}", what, e))?;
    Ok(Entries(
        entries.0.into_iter().map(|(k, v)| (k, Slot::Raw(v))).collect(),
    ))
}

// ── Byte-preserving JSON object ─────────────────────────

/// A value as read from disk, or an object this merge rewrote.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Slot {
    Raw(Box<RawValue>),
    Edited(Entries<Slot>),
}

impl Slot {
    fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, String> {
        to_raw_value(value).map(Slot::Raw).map_err(|e| e.to_string())
    }
}

/// JSON object as ordered `(key, value)` pairs.
#[derive(Debug)]
struct Entries<V>(Vec<(String, V)>);

impl<V> Default for Entries<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> Entries<V> {
    fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Replace in place, or append at the end.
    fn upsert(&mut self, key: &str, value: V) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key.to_string(), value)),
        }
    }
}

impl<V: Serialize> Serialize for Entries<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = Entries<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, V>()? {
                    out.push(entry);
                }
                Ok(Entries(out))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
