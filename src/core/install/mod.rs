pub mod client;
pub mod pipeline;
pub mod progress;
pub mod server;
pub mod target;

pub use pipeline::{InstallFlavor, InstallOutcome, InstallPipeline, InstallRequest};
pub use progress::{InstallProgress, InstallStage, ProgressSink};
