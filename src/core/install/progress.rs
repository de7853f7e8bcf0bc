use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

/// Pipeline states, in the order a successful run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStage {
    Validating,
    FetchingMetadata,
    Materializing,
    MergingProfile,
    Done,
    Failed,
}

impl InstallStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstallStage::Done | InstallStage::Failed)
    }
}

/// Payload sent to the caller while an install runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstallProgress {
    Stage { stage: InstallStage },
    Library { index: usize, total: usize, name: String, skipped: bool },
    Message { text: String },
    Finished { profile_id: String },
    Failed { status: String },
}

/// Optional channel to the UI. Sending never fails the install.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<UnboundedSender<InstallProgress>>,
}

impl ProgressSink {
    pub fn new(tx: Option<UnboundedSender<InstallProgress>>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: InstallProgress) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn stage(&self, stage: InstallStage) {
        info!("Install stage: {:?}", stage);
        self.emit(InstallProgress::Stage { stage });
    }

    pub fn message(&self, text: impl Into<String>) {
        self.emit(InstallProgress::Message { text: text.into() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        ProgressSink::new(Some(tx)).stage(InstallStage::Validating);
    }

    #[test]
    fn progress_serializes_with_a_kind_tag() {
        let event = InstallProgress::Stage {
            stage: InstallStage::FetchingMetadata,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({ "kind": "stage", "stage": "fetching_metadata" })
        );
    }
}
