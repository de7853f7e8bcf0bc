mod store;

pub use store::{merge_profile, profile_key, select_store, LauncherType, MergeOutcome};
