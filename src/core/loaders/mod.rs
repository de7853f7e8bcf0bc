pub mod descriptor;
pub mod local;
pub mod source;

pub use descriptor::{InstallerMeta, LaunchDescriptor, Library, Side};
pub use local::LocalLoader;
pub use source::LoaderSource;
