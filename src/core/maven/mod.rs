mod artifact;

pub use artifact::ArtifactCoordinate;

/// Repository for libraries that don't name one.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net/";

pub const LOADER_GROUP: &str = "net.fabricmc";
pub const LOADER_ARTIFACT: &str = "fabric-loader";
pub const MAPPINGS_ARTIFACT: &str = "intermediary";
