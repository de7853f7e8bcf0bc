pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::config::InstallerConfig;
pub use crate::core::error::{InstallerError, InstallerResult};
pub use crate::core::install::{InstallFlavor, InstallOutcome, InstallPipeline, InstallProgress, InstallRequest};
pub use crate::core::state::InstallerContext;

/// Structured logging to stderr; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,loader_installer=debug")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
