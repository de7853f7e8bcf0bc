use std::fmt;

/// A mappings version string split into the game version it targets and its
/// build number.
///
/// Two shapes exist: `<game>+build.<n>` and the legacy `<game>.<n>` /
/// `<game>-<n>` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingsVersion {
    raw: String,
    minecraft: String,
    sub: String,
}

impl MappingsVersion {
    /// Returns `None` when no separator is present.
    pub fn parse(raw: &str) -> Option<Self> {
        let (minecraft, sub) = if raw.contains("+build.") {
            let plus = raw.rfind('+')?;
            let dot = raw.rfind('.')?;
            (&raw[..plus], &raw[dot + 1..])
        } else {
            let sep = if raw.contains('-') { '-' } else { '.' };
            raw.rsplit_once(sep)?
        };

        Some(Self {
            raw: raw.to_string(),
            minecraft: minecraft.to_string(),
            sub: sub.to_string(),
        })
    }

    pub fn minecraft_version(&self) -> &str {
        &self.minecraft
    }

    pub fn sub_version(&self) -> &str {
        &self.sub
    }
}

impl fmt::Display for MappingsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Cheap snapshot guess from the name alone.
pub fn is_snapshot(version: &str) -> bool {
    version.contains("-pre")
        || version.contains("Pre-Release")
        || version.contains("19w")
        || version.contains("18w")
        || version.starts_with("3D")
}
