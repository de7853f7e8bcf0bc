// ─── Client Materialization ───
// Writes `versions/<id>/<id>.json` and the empty `<id>.jar` the launcher
// expects next to it.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::core::error::InstallerResult;
use crate::core::fs::{create_dir_safe, remove_dir_if_exists, write_atomic};
use crate::core::loaders::descriptor::{LaunchDescriptor, Side};

/// Launch JSON in the launcher's schema.
///
/// `time`/`releaseTime` are left out so that reinstalling produces the same
/// bytes; the launcher takes them from the parent version.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LaunchJson<'a> {
    id: &'a str,
    inherits_from: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    main_class: &'a str,
    arguments: LaunchArguments<'a>,
    libraries: Vec<LaunchLibrary<'a>>,
}

#[derive(Debug, Serialize)]
struct LaunchArguments<'a> {
    game: &'a [String],
}

#[derive(Debug, Serialize)]
struct LaunchLibrary<'a> {
    name: &'a str,
    url: &'a str,
}

pub fn version_dir(target: &Path, profile_id: &str) -> PathBuf {
    target.join("versions").join(profile_id)
}

pub fn render_launch_json(descriptor: &LaunchDescriptor) -> InstallerResult<String> {
    let json = LaunchJson {
        id: &descriptor.profile_id,
        inherits_from: &descriptor.inherits_from,
        kind: "release",
        main_class: descriptor.main_class(Side::Client).unwrap_or_default(),
        arguments: LaunchArguments {
            game: &descriptor.game_arguments,
        },
        libraries: descriptor
            .libraries
            .iter()
            .map(|lib| LaunchLibrary {
                name: &lib.name,
                url: &lib.url,
            })
            .collect(),
    };

    let mut out = serde_json::to_string_pretty(&json)?;
    out.push('\n');
    Ok(out)
}

/// Replace `versions/<id>/` with a fresh copy. Returns the directory.
pub async fn materialize(target: &Path, descriptor: &LaunchDescriptor) -> InstallerResult<PathBuf> {
    let id = &descriptor.profile_id;
    let dir = version_dir(target, id);

    // Never mix files from an older install of the same id.
    remove_dir_if_exists(&dir).await?;
    create_dir_safe(&dir).await?;

    write_atomic(&dir.join(format!("{}.jar", id)), &[]).await?;
    debug!("Wrote placeholder jar for {}", id);

    let json = render_launch_json(descriptor)?;
    write_atomic(&dir.join(format!("{}.json", id)), json.as_bytes()).await?;

    info!(
        "Materialized {} ({} libraries) in {:?}",
        id,
        descriptor.libraries.len(),
        dir
    );
    Ok(dir)
}
