use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why an install target was rejected before anything was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetProblem {
    Missing,
    NotADirectory,
    /// The vanilla version folder (json + jar) is absent: the game was never launched.
    VanillaNotLaunched(String),
}

impl fmt::Display for TargetProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetProblem::Missing => write!(f, "directory does not exist"),
            TargetProblem::NotADirectory => write!(f, "not a directory"),
            TargetProblem::VanillaNotLaunched(version) => {
                write!(f, "vanilla version {} not launched", version)
            }
        }
    }
}

/// Central error type for the installer.
/// Every module returns `Result<T, InstallerError>`.
#[derive(Debug, Error)]
pub enum InstallerError {
    // ── Target ──────────────────────────────────────────
    #[error("Invalid install target {path:?}: {problem}")]
    InvalidTarget { path: PathBuf, problem: TargetProblem },

    #[error("Both launcher profile stores exist in {0:?}; pick a launcher type explicitly")]
    AmbiguousLauncher(PathBuf),

    // ── Versions ────────────────────────────────────────
    #[error("Unknown {kind} version: {version}")]
    VersionNotFound { kind: &'static str, version: String },

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request to {url} failed: {status}")]
    HttpStatus { url: String, status: u16 },

    /// One attempt through one proxy route (or one mirror) failed.
    #[error("Request to {url} using {via} failed: {source}")]
    Request {
        url: String,
        via: String,
        #[source]
        source: Box<InstallerError>,
    },

    /// Every candidate for a logical request failed; `attempts` is in attempt order.
    #[error("{target}: all {} attempts failed{}", .attempts.len(), render_attempts(.attempts))]
    NetworkExhausted {
        target: String,
        attempts: Vec<InstallerError>,
    },

    #[error("Invalid proxy address {value:?}: {reason}")]
    InvalidProxy { value: String, reason: String },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Metadata ────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    #[error("Invalid launch metadata at `{field}`: {message}")]
    Descriptor { field: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Control ─────────────────────────────────────────
    #[error("Installation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type InstallerResult<T> = Result<T, InstallerError>;

impl From<std::io::Error> for InstallerError {
    fn from(source: std::io::Error) -> Self {
        InstallerError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

fn render_attempts(attempts: &[InstallerError]) -> String {
    attempts
        .iter()
        .enumerate()
        .map(|(i, e)| format!("\n  [{}] {}", i + 1, e))
        .collect()
}

impl InstallerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallerError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn descriptor(field: impl Into<String>, message: impl Into<String>) -> Self {
        InstallerError::Descriptor {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Nested causes of an aggregated failure (empty for leaf errors).
    pub fn causes(&self) -> &[InstallerError] {
        match self {
            InstallerError::NetworkExhausted { attempts, .. } => attempts,
            _ => &[],
        }
    }

    /// Every leaf failure under this error, depth first, in attempt order.
    pub fn leaf_causes(&self) -> Vec<&InstallerError> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// Short status line for the caller's UI. Target and version problems get an
    /// actionable message; network exhaustion is summarised.
    pub fn status_message(&self) -> String {
        match self {
            InstallerError::InvalidTarget { path, problem } => match problem {
                TargetProblem::Missing => format!("{} does not exist", path.display()),
                TargetProblem::NotADirectory => format!("{} is not a directory", path.display()),
                TargetProblem::VanillaNotLaunched(version) => format!(
                    "Minecraft {} has not been launched in {} yet; start it once from the launcher",
                    version,
                    path.display()
                ),
            },
            InstallerError::VersionNotFound { kind, version } => {
                format!("Unknown {} version: {}", kind, version)
            }
            InstallerError::NetworkExhausted { target, attempts } => format!(
                "Could not reach {} ({} attempts failed, check your connection or proxy)",
                target,
                attempts.len()
            ),
            InstallerError::Cancelled => "Installation cancelled".to_string(),
            other => format!("Installation failed: {}", other),
        }
    }
}

fn collect_leaves<'a>(err: &'a InstallerError, out: &mut Vec<&'a InstallerError>) {
    match err {
        InstallerError::NetworkExhausted { attempts, .. } => {
            for attempt in attempts {
                collect_leaves(attempt, out);
            }
        }
        InstallerError::Request { source, .. } => collect_leaves(source, out),
        leaf => out.push(leaf),
    }
}
