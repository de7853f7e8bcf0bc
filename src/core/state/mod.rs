mod context;

pub use context::InstallerContext;
