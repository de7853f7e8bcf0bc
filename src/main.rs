// ─── loader-installer CLI ───
// Thin wrapper over the install pipeline: parse flags, print progress,
// exit non-zero on failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use loader_installer::core::profile::LauncherType;
use loader_installer::{
    init_tracing, InstallFlavor, InstallPipeline, InstallProgress, InstallRequest, InstallerConfig,
    InstallerContext, InstallerResult,
};

#[derive(Debug, Parser)]
#[command(name = "loader-installer", version, about = "Install the Fabric loader into a client or server")]
struct Cli {
    /// JSON config file (mirrors, timeouts, proxy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use only this metadata server.
    #[arg(long, global = true)]
    meta_url: Option<String>,

    /// Use only this maven server.
    #[arg(long, global = true)]
    maven_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add a loader profile to a game installation.
    Client {
        #[command(flatten)]
        versions: VersionArgs,

        /// Game directory; defaults to the platform's .minecraft.
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Do not touch the launcher profile store.
        #[arg(long)]
        noprofile: bool,

        /// win32 or microsoft_store, when both stores exist.
        #[arg(long)]
        launcher: Option<LauncherType>,
    },
    /// Set up a dedicated server directory.
    Server {
        #[command(flatten)]
        versions: VersionArgs,

        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Also download the vanilla server.jar.
        #[arg(long)]
        download_server: bool,

        /// Install from a loader jar on disk instead of the maven.
        #[arg(long)]
        loader_jar: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct VersionArgs {
    /// Game version; latest release if omitted.
    #[arg(long)]
    mcversion: Option<String>,

    /// Loader version; latest stable if omitted.
    #[arg(long)]
    loader: Option<String>,
}

fn default_game_dir() -> PathBuf {
    let base = if cfg!(target_os = "linux") {
        dirs::home_dir()
    } else {
        dirs::data_dir()
    };
    let name = if cfg!(target_os = "macos") {
        "minecraft"
    } else {
        ".minecraft"
    };
    base.unwrap_or_else(|| PathBuf::from(".")).join(name)
}

/// The launcher may rewrite its profile store while we merge into it.
fn warn_if_launcher_running() {
    let mut system = sysinfo::System::new_all();
    system.refresh_all();
    let running = system.processes().values().any(|process| {
        let name = process.name().to_string_lossy().to_ascii_lowercase();
        name.contains("minecraftlauncher") || name.contains("minecraft-launcher")
    });
    if running {
        warn!("The Minecraft launcher is running; close it before installing or the profile may be lost");
    }
}

fn build_request(command: Command) -> InstallRequest {
    match command {
        Command::Client {
            versions,
            dir,
            noprofile,
            launcher,
        } => InstallRequest {
            create_profile: !noprofile,
            launcher,
            ..InstallRequest::client(dir.unwrap_or_else(default_game_dir))
        }
        .with_versions(versions.mcversion.as_deref(), versions.loader.as_deref()),
        Command::Server {
            versions,
            dir,
            download_server,
            loader_jar,
        } => InstallRequest {
            flavor: loader_jar
                .map(InstallFlavor::ServerFromLocalArtifact)
                .unwrap_or(InstallFlavor::Server),
            download_server_jar: download_server,
            ..InstallRequest::server(dir)
        }
        .with_versions(versions.mcversion.as_deref(), versions.loader.as_deref()),
    }
}

fn load_config(cli: &Cli) -> InstallerResult<InstallerConfig> {
    let config = match &cli.config {
        Some(path) => InstallerConfig::load(path)?,
        None => InstallerConfig::default(),
    };
    config.with_fixed_urls(cli.meta_url.as_deref(), cli.maven_url.as_deref())
}

fn print_progress(event: &InstallProgress) {
    match event {
        InstallProgress::Stage { stage } if !stage.is_terminal() => println!("==> {:?}", stage),
        InstallProgress::Stage { .. } => {}
        InstallProgress::Library {
            index,
            total,
            name,
            skipped,
        } => {
            let note = if *skipped { " (present)" } else { "" };
            println!("  [{}/{}] {}{}", index, total, name, note);
        }
        InstallProgress::Message { text } => println!("  {}", text),
        InstallProgress::Finished { profile_id } => println!("Installed {}", profile_id),
        InstallProgress::Failed { status } => eprintln!("Install failed: {}", status),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let ctx = match load_config(&cli).and_then(InstallerContext::new) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{}", e.status_message());
            return ExitCode::FAILURE;
        }
    };

    let request = build_request(cli.command);
    if request.flavor == InstallFlavor::Client && request.create_profile {
        warn_if_launcher_running();
    }

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_progress(&event);
        }
    });

    let mut pipeline = InstallPipeline::new(&ctx).with_progress(tx).with_cancel(cancel);
    let result = pipeline.run(&request).await;
    drop(pipeline);
    let _ = printer.await;

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            for cause in e.leaf_causes() {
                eprintln!("  caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
