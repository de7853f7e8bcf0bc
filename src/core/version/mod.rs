pub mod manifest;
pub mod mappings;
pub mod meta;

pub use manifest::{DownloadArtifact, VersionEntry, VersionManifest, VersionMeta};
pub use mappings::MappingsVersion;
pub use meta::{LoaderVersionEntry, MetaClient};
