// ─── Server Materialization ───
// Libraries under `libraries/`, a manifest-only launch jar that puts them on
// the class path, and optionally the vanilla `server.jar`.

use std::io::Write;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::progress::{InstallProgress, ProgressSink};
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::fs::{create_dir_safe, remove_if_exists, rename_into_place, temp_path_for};
use crate::core::loaders::descriptor::{LaunchDescriptor, Side};
use crate::core::loaders::local::LocalLoader;
use crate::core::service::EndpointResolver;
use crate::core::version::{DownloadArtifact, MetaClient};

pub const LAUNCH_JAR_NAME: &str = "fabric-server-launch.jar";
pub const SERVER_JAR_NAME: &str = "server.jar";
pub const LIBRARIES_DIR: &str = "libraries";

/// Manifest lines are at most 72 bytes, continuation lines start with a space.
const MANIFEST_LINE_LIMIT: usize = 72;

/// Download (or copy) every library, in declaration order.
///
/// Returns class path entries relative to `target`. A library whose file is
/// already present is not fetched again.
pub async fn install_libraries(
    resolver: &EndpointResolver,
    target: &Path,
    descriptor: &LaunchDescriptor,
    local: Option<&LocalLoader>,
    progress: &ProgressSink,
    cancel: &CancellationToken,
) -> InstallerResult<Vec<String>> {
    let libs_dir = target.join(LIBRARIES_DIR);
    create_dir_safe(&libs_dir).await?;

    let total = descriptor.libraries.len();
    let loader_coord = descriptor.loader_coordinate();
    let mut class_path = Vec::with_capacity(total);

    for (index, lib) in descriptor.libraries.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(InstallerError::Cancelled);
        }

        let relative = lib.coordinate.local_path();
        let dest = libs_dir.join(&relative);
        let present = dest.is_file();

        match local {
            Some(local) if lib.name == loader_coord => {
                copy_into_place(&local.path, &dest).await?;
                debug!("Copied local loader jar to {:?}", dest);
            }
            _ if present => debug!("Library {} already present", lib.name),
            _ => resolver.download_artifact(&lib.download_url(), &dest).await?,
        }

        progress.emit(InstallProgress::Library {
            index: index + 1,
            total,
            name: lib.name.clone(),
            skipped: present && !(local.is_some() && lib.name == loader_coord),
        });

        class_path.push(class_path_entry(&relative));
    }

    info!("{} server libraries ready in {:?}", total, libs_dir);
    Ok(class_path)
}

fn class_path_entry(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    format!("{}/{}", LIBRARIES_DIR, parts.join("/"))
}

async fn copy_into_place(src: &Path, dest: &Path) -> InstallerResult<()> {
    if let Some(parent) = dest.parent() {
        create_dir_safe(parent).await?;
    }
    let tmp = temp_path_for(dest);
    if let Err(e) = tokio::fs::copy(src, &tmp).await {
        remove_if_exists(&tmp).await;
        return Err(InstallerError::io(src, e));
    }
    rename_into_place(&tmp, dest).await
}

// ── Launch jar ──────────────────────────────────────────

/// `META-INF/MANIFEST.MF` text with CRLF line ends and 72-byte wrapping.
pub fn manifest_text(main_class: &str, class_path: &[String]) -> String {
    let mut out = String::new();
    push_attribute(&mut out, "Manifest-Version", "1.0");
    push_attribute(&mut out, "Main-Class", main_class);
    if !class_path.is_empty() {
        push_attribute(&mut out, "Class-Path", &class_path.join(" "));
    }
    out.push_str("\r\n");
    out
}

fn push_attribute(out: &mut String, key: &str, value: &str) {
    let line = format!("{}: {}", key, value);
    let mut rest = line.as_str();
    let mut limit = MANIFEST_LINE_LIMIT;

    while !rest.is_empty() {
        let mut cut = rest.len().min(limit);
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if limit < MANIFEST_LINE_LIMIT {
            out.push(' ');
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n");
        rest = &rest[cut..];
        limit = MANIFEST_LINE_LIMIT - 1;
    }
}

/// Write `<target>/fabric-server-launch.jar` containing only a manifest.
pub async fn write_launch_jar(target: &Path, main_class: &str, class_path: &[String]) -> InstallerResult<PathBuf> {
    let jar = target.join(LAUNCH_JAR_NAME);
    let tmp = temp_path_for(&jar);
    let manifest = manifest_text(main_class, class_path);

    let tmp_for_task = tmp.clone();
    let written = tokio::task::spawn_blocking(move || -> InstallerResult<()> {
        let file = std::fs::File::create(&tmp_for_task).map_err(|e| InstallerError::io(&tmp_for_task, e))?;
        let mut zip = zip::ZipWriter::new(file);
        // Fixed entry time so the jar bytes only depend on the manifest.
        let options = zip::write::SimpleFileOptions::default().last_modified_time(zip::DateTime::default());
        zip.start_file("META-INF/MANIFEST.MF", options)?;
        zip.write_all(manifest.as_bytes())
            .map_err(|e| InstallerError::io(&tmp_for_task, e))?;
        zip.finish()?;
        Ok(())
    })
    .await
    .map_err(|e| InstallerError::Other(format!("Writing launch jar panicked: {}", e)))?;

    if let Err(e) = written {
        remove_if_exists(&tmp).await;
        return Err(e);
    }
    rename_into_place(&tmp, &jar).await?;

    info!("Wrote {:?} (Main-Class {})", jar, main_class);
    Ok(jar)
}

// ── Vanilla server jar ──────────────────────────────────

pub async fn file_sha1(path: &Path) -> InstallerResult<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| InstallerError::io(path, e))?;
    let mut hasher = Sha1::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Whether `path` exists and matches `expected`. Unreadable counts as invalid.
pub async fn is_valid_jar(path: &Path, expected: &str) -> bool {
    if !path.is_file() {
        return false;
    }
    match file_sha1(path).await {
        Ok(actual) => actual.eq_ignore_ascii_case(expected),
        Err(e) => {
            warn!("Could not hash {:?}: {}", path, e);
            false
        }
    }
}

/// Place the vanilla server jar at `<target>/server.jar`.
///
/// A valid existing jar is reused. Otherwise it is downloaded to a temp path,
/// checked, and only then renamed into place.
pub async fn ensure_server_jar(meta: &MetaClient, target: &Path, game_version: &str) -> InstallerResult<PathBuf> {
    let download = meta.server_download(game_version).await?;
    let dest = target.join(SERVER_JAR_NAME);
    fetch_verified(meta, &download, &dest).await?;
    Ok(dest)
}

async fn fetch_verified(meta: &MetaClient, download: &DownloadArtifact, dest: &Path) -> InstallerResult<()> {
    if is_valid_jar(dest, &download.sha1).await {
        info!("Existing {:?} is valid, not downloading", dest);
        return Ok(());
    }
    if dest.exists() {
        warn!("{:?} is missing or corrupt, downloading again", dest);
    }

    let tmp = temp_path_for(dest);
    if let Err(e) = meta.resolver().fetcher().download(&download.url, &tmp).await {
        remove_if_exists(&tmp).await;
        return Err(e);
    }

    let actual = match file_sha1(&tmp).await {
        Ok(actual) => actual,
        Err(e) => {
            remove_if_exists(&tmp).await;
            return Err(e);
        }
    };
    if !actual.eq_ignore_ascii_case(&download.sha1) {
        remove_if_exists(&tmp).await;
        return Err(InstallerError::Sha1Mismatch {
            path: dest.to_path_buf(),
            expected: download.sha1.clone(),
            actual,
        });
    }

    rename_into_place(&tmp, dest).await?;
    info!("Downloaded vanilla server jar to {:?}", dest);
    Ok(())
}

/// Libraries, launch jar and (optionally) `server.jar`.
pub async fn materialize(
    meta: &MetaClient,
    target: &Path,
    descriptor: &LaunchDescriptor,
    local: Option<&LocalLoader>,
    download_server_jar: bool,
    progress: &ProgressSink,
    cancel: &CancellationToken,
) -> InstallerResult<PathBuf> {
    create_dir_safe(target).await?;

    let class_path = install_libraries(meta.resolver(), target, descriptor, local, progress, cancel).await?;

    let main_class = descriptor
        .main_class(Side::Server)
        .ok_or_else(|| InstallerError::descriptor("mainClass.server", "missing"))?;
    let jar = write_launch_jar(target, main_class, &class_path).await?;

    if download_server_jar {
        if cancel.is_cancelled() {
            return Err(InstallerError::Cancelled);
        }
        progress.message(format!("Downloading Minecraft {} server jar", descriptor.inherits_from));
        ensure_server_jar(meta, target, &descriptor.inherits_from).await?;
    }

    Ok(jar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::Arc;

    use crate::core::loaders::descriptor::InstallerMeta;
    use crate::core::net::testing::{Outcome, ScriptedTransport};
    use crate::core::net::{Fetcher, ProxySupplier};
    use crate::core::service::default_mirrors;
    use crate::core::version::manifest::VERSION_MANIFEST_URL;
    use serde_json::json;

    const MAVEN: &str = "https://maven.fabricmc.net/";

    fn meta_client(transport: Arc<ScriptedTransport>) -> MetaClient {
        let proxies = ProxySupplier::new(false).with_env_lookup(|_| None);
        let fetcher = Arc::new(Fetcher::new(transport, proxies));
        let resolver = Arc::new(EndpointResolver::new(fetcher, default_mirrors()).unwrap());
        MetaClient::new(resolver, VERSION_MANIFEST_URL)
    }

    fn descriptor() -> LaunchDescriptor {
        let meta = InstallerMeta::from_json(json!({
            "mainClass": { "client": "a.Client", "server": "net.fabricmc.loader.impl.launch.knot.KnotServer" },
            "libraries": { "common": [{ "name": "org.ow2.asm:asm:9.6", "url": MAVEN }] }
        }))
        .unwrap();
        LaunchDescriptor::build(&meta, "0.15.0", "1.20.1", Side::Server, MAVEN).unwrap()
    }

    fn unwrap_manifest(text: &str) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        for line in text.split("\r\n").filter(|l| !l.is_empty()) {
            match line.strip_prefix(' ') {
                Some(rest) => lines.last_mut().unwrap().push_str(rest),
                None => lines.push(line.to_string()),
            }
        }
        lines
    }

    #[test]
    fn manifest_lines_are_wrapped_at_72_bytes() {
        let class_path: Vec<String> = (0..10)
            .map(|i| format!("libraries/net/example/lib{i}/1.0/lib{i}-1.0.jar"))
            .collect();
        let text = manifest_text("a.Main", &class_path);

        assert!(text.split("\r\n").all(|l| l.len() <= 72));
        let lines = unwrap_manifest(&text);
        assert_eq!(lines[0], "Manifest-Version: 1.0");
        assert_eq!(lines[1], "Main-Class: a.Main");
        assert_eq!(lines[2], format!("Class-Path: {}", class_path.join(" ")));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn wrapping_respects_utf8_boundaries() {
        let value = "é".repeat(100);
        let mut out = String::new();
        push_attribute(&mut out, "X", &value);
        let lines = unwrap_manifest(&out);
        assert_eq!(lines, vec![format!("X: {}", value)]);
    }

    #[tokio::test]
    async fn libraries_present_on_disk_are_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let d = descriptor();
        let asm = dir.path().join(LIBRARIES_DIR).join(d.libraries[0].coordinate.local_path());
        std::fs::create_dir_all(asm.parent().unwrap()).unwrap();
        std::fs::write(&asm, b"cached").unwrap();

        let transport = Arc::new(ScriptedTransport::new().route_default(Outcome::Body(b"jar".to_vec())));
        let meta = meta_client(transport.clone());

        let class_path = install_libraries(
            meta.resolver(),
            dir.path(),
            &d,
            None,
            &ProgressSink::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(&asm).unwrap(), b"cached");
        assert_eq!(
            transport.attempted_urls(),
            vec![
                "https://maven.fabricmc.net/net/fabricmc/intermediary/1.20.1/intermediary-1.20.1.jar",
                "https://maven.fabricmc.net/net/fabricmc/fabric-loader/0.15.0/fabric-loader-0.15.0.jar",
            ]
        );
        assert_eq!(class_path[0], "libraries/org/ow2/asm/asm/9.6/asm-9.6.jar");
    }

    #[tokio::test]
    async fn local_loader_jar_is_copied_instead_of_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let loader_jar = dir.path().join("loader.jar");
        std::fs::write(&loader_jar, b"local-loader").unwrap();
        let local = LocalLoader {
            path: loader_jar,
            version: "0.15.0".into(),
            meta: InstallerMeta::from_json(json!({ "mainClass": "a.B" })).unwrap(),
        };
        let target = dir.path().join("srv");

        let transport = Arc::new(ScriptedTransport::new().route_default(Outcome::Body(b"jar".to_vec())));
        let meta = meta_client(transport.clone());

        install_libraries(
            meta.resolver(),
            &target,
            &descriptor(),
            Some(&local),
            &ProgressSink::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let copied = target.join("libraries/net/fabricmc/fabric-loader/0.15.0/fabric-loader-0.15.0.jar");
        assert_eq!(std::fs::read(copied).unwrap(), b"local-loader");
        assert!(transport.attempted_urls().iter().all(|u| !u.contains("fabric-loader")));
    }

    #[tokio::test]
    async fn cancelled_before_first_library() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        let meta = meta_client(transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = install_libraries(meta.resolver(), dir.path(), &descriptor(), None, &ProgressSink::default(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, InstallerError::Cancelled));
        assert!(transport.attempted_urls().is_empty());
    }

    #[tokio::test]
    async fn launch_jar_contains_only_the_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let jar = write_launch_jar(dir.path(), "a.Main", &["libraries/a.jar".to_string()])
            .await
            .unwrap();

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&jar).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut text = String::new();
        archive.by_name("META-INF/MANIFEST.MF").unwrap().read_to_string(&mut text).unwrap();
        assert!(text.contains("Main-Class: a.Main\r\n"));
        assert!(text.contains("Class-Path: libraries/a.jar\r\n"));
    }

    #[tokio::test]
    async fn rewriting_the_launch_jar_gives_identical_bytes() {
        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();
        let class_path = ["libraries/a.jar".to_string(), "libraries/b.jar".to_string()];

        let first = write_launch_jar(first_dir.path(), "a.Main", &class_path).await.unwrap();
        let second = write_launch_jar(second_dir.path(), "a.Main", &class_path).await.unwrap();

        let first = std::fs::read(first).unwrap();
        assert_eq!(first, std::fs::read(second).unwrap());
        // Local header DOS time and date: 00:00:00, 1980-01-01.
        assert_eq!(&first[10..14], &[0x00, 0x00, 0x21, 0x00]);
    }

    fn sha1_of(bytes: &[u8]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    #[tokio::test]
    async fn corrupt_server_jar_is_replaced_and_valid_one_reused() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join(SERVER_JAR_NAME);
        std::fs::write(&dest, b"truncated").unwrap();

        let url = "https://piston-data.mojang.com/server.jar";
        let transport = Arc::new(ScriptedTransport::new().url(url, Outcome::Body(b"server-bytes".to_vec())));
        let meta = meta_client(transport.clone());
        let download = DownloadArtifact {
            sha1: sha1_of(b"server-bytes"),
            size: 12,
            url: url.into(),
        };

        fetch_verified(&meta, &download, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"server-bytes");

        transport.clear_attempts();
        fetch_verified(&meta, &download, &dest).await.unwrap();
        assert!(transport.attempted_urls().is_empty());
    }

    #[tokio::test]
    async fn checksum_mismatch_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join(SERVER_JAR_NAME);

        let url = "https://piston-data.mojang.com/server.jar";
        let transport = Arc::new(ScriptedTransport::new().url(url, Outcome::Body(b"tampered".to_vec())));
        let meta = meta_client(transport);
        let download = DownloadArtifact {
            sha1: sha1_of(b"original"),
            size: 8,
            url: url.into(),
        };

        let err = fetch_verified(&meta, &download, &dest).await.unwrap_err();
        assert!(matches!(err, InstallerError::Sha1Mismatch { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
