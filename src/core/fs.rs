// ─── File Helpers ───
// Temp-then-rename writes shared by downloads, materialization and the
// profile store.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::core::error::{InstallerError, InstallerResult};

/// Unique sibling path so concurrent writers never share a temp file.
pub fn temp_path_for(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.{}.part", name, uuid::Uuid::new_v4().simple()))
}

pub async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove temp file {:?}: {}", path, e),
    }
}

/// Write `bytes` next to `path`, then rename over it.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> InstallerResult<()> {
    let tmp = temp_path_for(path);

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        remove_if_exists(&tmp).await;
        return Err(InstallerError::io(&tmp, e));
    }
    rename_into_place(&tmp, path).await
}

/// Rename `tmp` to `dest`; `tmp` is removed if that fails.
pub async fn rename_into_place(tmp: &Path, dest: &Path) -> InstallerResult<()> {
    if let Err(e) = tokio::fs::rename(tmp, dest).await {
        remove_if_exists(tmp).await;
        return Err(InstallerError::io(dest, e));
    }
    Ok(())
}

pub async fn create_dir_safe(path: &Path) -> InstallerResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| InstallerError::io(path, e))
}

/// Remove a directory tree; absence is fine.
pub async fn remove_dir_if_exists(path: &Path) -> InstallerResult<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstallerError::io(path, e)),
    }
}
