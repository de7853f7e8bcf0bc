// ─── Install Pipeline ───
// VALIDATING -> FETCHING_METADATA -> MATERIALIZING -> MERGING_PROFILE -> DONE,
// with FAILED reachable from every non-terminal stage. One pipeline serves
// every install flavor; the flavor only picks the materialization step.

use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::progress::{InstallProgress, InstallStage, ProgressSink};
use super::{client, server, target};
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::loaders::{LoaderSource, LocalLoader, Side};
use crate::core::profile::{merge_profile, LauncherType, MergeOutcome};
use crate::core::state::InstallerContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallFlavor {
    Client,
    Server,
    /// Server install from a loader jar on disk.
    ServerFromLocalArtifact(PathBuf),
}

impl InstallFlavor {
    pub fn side(&self) -> Side {
        match self {
            InstallFlavor::Client => Side::Client,
            InstallFlavor::Server | InstallFlavor::ServerFromLocalArtifact(_) => Side::Server,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub target: PathBuf,
    pub flavor: InstallFlavor,
    /// Latest release when absent.
    pub game_version: Option<String>,
    /// Latest stable loader when absent.
    pub loader_version: Option<String>,
    /// Client only.
    pub create_profile: bool,
    pub launcher: Option<LauncherType>,
    /// Server only: also place the vanilla `server.jar`.
    pub download_server_jar: bool,
}

impl InstallRequest {
    pub fn client(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            flavor: InstallFlavor::Client,
            game_version: None,
            loader_version: None,
            create_profile: true,
            launcher: None,
            download_server_jar: false,
        }
    }

    pub fn server(target: impl Into<PathBuf>) -> Self {
        Self {
            flavor: InstallFlavor::Server,
            create_profile: false,
            ..Self::client(target)
        }
    }

    pub fn with_versions(mut self, game: Option<&str>, loader: Option<&str>) -> Self {
        self.game_version = game.map(str::to_string);
        self.loader_version = loader.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub profile_id: String,
    pub game_version: String,
    pub loader_version: String,
    /// Client: the version directory. Server: the launch jar.
    pub output: PathBuf,
    pub profile: Option<MergeOutcome>,
}

pub struct InstallPipeline<'a> {
    ctx: &'a InstallerContext,
    progress: ProgressSink,
    cancel: CancellationToken,
    stage: InstallStage,
}

impl<'a> InstallPipeline<'a> {
    pub fn new(ctx: &'a InstallerContext) -> Self {
        Self {
            ctx,
            progress: ProgressSink::default(),
            cancel: CancellationToken::new(),
            stage: InstallStage::Validating,
        }
    }

    pub fn with_progress(mut self, tx: UnboundedSender<InstallProgress>) -> Self {
        self.progress = ProgressSink::new(Some(tx));
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn stage(&self) -> InstallStage {
        self.stage
    }

    /// Run one install. On success the generated profile id is in the outcome.
    pub async fn run(&mut self, request: &InstallRequest) -> InstallerResult<InstallOutcome> {
        info!(
            "Installing {:?} into {:?} (game {:?}, loader {:?})",
            request.flavor, request.target, request.game_version, request.loader_version
        );

        match self.run_stages(request).await {
            Ok(outcome) => {
                self.enter(InstallStage::Done);
                self.progress.emit(InstallProgress::Finished {
                    profile_id: outcome.profile_id.clone(),
                });
                info!("Installed {}", outcome.profile_id);
                Ok(outcome)
            }
            Err(e) => {
                error!("Install failed during {:?}: {}", self.stage, e);
                self.enter(InstallStage::Failed);
                self.progress.emit(InstallProgress::Failed {
                    status: e.status_message(),
                });
                Err(e)
            }
        }
    }

    fn enter(&mut self, stage: InstallStage) {
        self.stage = stage;
        self.progress.stage(stage);
    }

    fn checkpoint(&self) -> InstallerResult<()> {
        if self.cancel.is_cancelled() {
            return Err(InstallerError::Cancelled);
        }
        Ok(())
    }

    async fn run_stages(&mut self, request: &InstallRequest) -> InstallerResult<InstallOutcome> {
        let ctx = self.ctx;
        let meta = &ctx.meta;
        let dir = request.target.as_path();
        let side = request.flavor.side();

        // ── VALIDATING ── (no writes)
        self.enter(InstallStage::Validating);
        match side {
            Side::Client => target::check_directory(dir)?,
            Side::Server => target::check_server_directory(dir)?,
        }
        if let (Side::Client, Some(game)) = (side, request.game_version.as_deref()) {
            target::check_vanilla_launched(dir, game)?;
        }

        let source = match &request.flavor {
            InstallFlavor::ServerFromLocalArtifact(jar) => LoaderSource::Local(LocalLoader::read(jar).await?),
            _ => LoaderSource::Remote,
        };

        let game_version = meta.resolve_game_version(request.game_version.as_deref()).await?;
        if side == Side::Client {
            target::check_vanilla_launched(dir, &game_version)?;
        }
        let loader_version = source
            .loader_version(meta, request.loader_version.as_deref())
            .await?;
        self.checkpoint()?;

        // ── FETCHING_METADATA ──
        self.enter(InstallStage::FetchingMetadata);
        let descriptor = source
            .descriptor(meta, &loader_version, &game_version, side)
            .await?;
        self.checkpoint()?;

        // ── MATERIALIZING ──
        self.enter(InstallStage::Materializing);
        let output = match side {
            Side::Client => client::materialize(dir, &descriptor).await?,
            Side::Server => {
                server::materialize(
                    meta,
                    dir,
                    &descriptor,
                    source.local(),
                    request.download_server_jar,
                    &self.progress,
                    &self.cancel,
                )
                .await?
            }
        };

        // ── MERGING_PROFILE ──
        let mut profile = None;
        if side == Side::Client && request.create_profile {
            self.checkpoint()?;
            self.enter(InstallStage::MergingProfile);
            profile = Some(
                merge_profile(
                    dir,
                    request.launcher,
                    &game_version,
                    &descriptor.profile_id,
                    Utc::now(),
                )
                .await?,
            );
        }

        Ok(InstallOutcome {
            profile_id: descriptor.profile_id,
            game_version,
            loader_version,
            output,
            profile,
        })
    }
}
