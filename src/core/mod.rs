// ─── Loader Installer Core ───
// Installs the mod loader into a game client or a dedicated server.
//
// Architecture:
//   core/
//     net/      Proxy candidates + streaming fetcher
//     service/  Mirror ring with failover (meta + maven)
//     version/  Game manifest, loader list, mappings versions
//     maven/    Artifact coordinates
//     loaders/  Installer metadata, launch descriptor, local jars
//     install/  Pipeline, client and server materialization
//     profile/  Launcher profile store merge
//     state/    Per-process installer context

pub mod config;
pub mod error;
pub mod fs;
pub mod http;
pub mod install;
pub mod loaders;
pub mod maven;
pub mod net;
pub mod profile;
pub mod service;
pub mod state;
pub mod version;
