use std::path::{Path, PathBuf};

use crate::core::error::{InstallerError, InstallerResult, TargetProblem};

fn invalid(path: &Path, problem: TargetProblem) -> InstallerError {
    InstallerError::InvalidTarget {
        path: path.to_path_buf(),
        problem,
    }
}

/// The target exists and is a directory. Read-only.
pub fn check_directory(dir: &Path) -> InstallerResult<()> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(invalid(dir, TargetProblem::NotADirectory)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(invalid(dir, TargetProblem::Missing)),
        Err(e) => Err(InstallerError::io(dir, e)),
    }
}

/// A server target may be created later, but must not be a file.
pub fn check_server_directory(dir: &Path) -> InstallerResult<()> {
    match check_directory(dir) {
        Err(InstallerError::InvalidTarget {
            problem: TargetProblem::Missing,
            ..
        }) => Ok(()),
        other => other,
    }
}

pub fn vanilla_files(dir: &Path, game_version: &str) -> (PathBuf, PathBuf) {
    let version_dir = dir.join("versions").join(game_version);
    (
        version_dir.join(format!("{}.json", game_version)),
        version_dir.join(format!("{}.jar", game_version)),
    )
}

/// The vanilla version must have been launched once: both its json and jar
/// are present.
pub fn check_vanilla_launched(dir: &Path, game_version: &str) -> InstallerResult<()> {
    let (json, jar) = vanilla_files(dir, game_version);
    if json.is_file() && jar.is_file() {
        Ok(())
    } else {
        Err(invalid(dir, TargetProblem::VanillaNotLaunched(game_version.to_string())))
    }
}
