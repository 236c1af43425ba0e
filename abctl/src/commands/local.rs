//! `abctl local` subcommands
//!
//! Wires the production collaborators (docker, kind, helm, console) into the
//! [`Local`] orchestrator.

use crate::k8s::{KindClusters, Provider};
use crate::local::{Local, LocalRuntime};
use crate::paths::Paths;
use crate::service::{HelmManagers, InstallOpts, UninstallOpts};
use crate::settings::Settings;
use crate::telemetry::{self, ENV_DO_NOT_TRACK};
use crate::ui::{Console, Reporter};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

#[derive(Debug, Parser, Clone)]
pub enum LocalCommands {
    /// Install Airbyte on a local kind cluster, creating the cluster if needed
    Install {
        /// Host port the Airbyte UI is published on (default from settings)
        #[clap(long)]
        port: Option<u16>,

        /// Reduce resource requests for machines with little CPU or memory
        #[clap(long)]
        low_resource_mode: bool,

        /// Airbyte helm chart version (default: latest)
        #[clap(long)]
        chart_version: Option<String>,

        /// kind node image to create the cluster with
        #[clap(long)]
        node_image: Option<String>,
    },

    /// Remove Airbyte and delete the local cluster
    Uninstall {
        /// Also remove persisted data
        #[clap(long)]
        persisted: bool,
    },

    /// Show the state of the local cluster
    Status,
}

/// Merge command line overrides over the persisted settings.
fn install_opts(
    settings: &Settings,
    paths: &Paths,
    port: Option<u16>,
    low_resource_mode: bool,
    chart_version: Option<String>,
    node_image: Option<String>,
) -> InstallOpts {
    InstallOpts {
        port: port.unwrap_or(settings.port),
        node_image: node_image.or_else(|| settings.node_image.clone()),
        chart_repo: settings.chart_repo.clone(),
        chart_version: chart_version.or_else(|| settings.chart_version.clone()),
        low_resource_mode: low_resource_mode || settings.low_resource_mode,
        data_dir: paths.data.clone(),
    }
}

/// Handle local commands
pub async fn handle_local_command(cmd: LocalCommands, paths: &Paths) -> Result<()> {
    let settings = Settings::load(&paths.settings)
        .with_context(|| format!("Failed to load settings from {}", paths.settings.display()))?;

    let provider = Provider::default_for(paths);
    let runtime = LocalRuntime::new(paths);
    let clusters = KindClusters;
    let services = HelmManagers::new(&paths.data);
    let do_not_track = std::env::var(ENV_DO_NOT_TRACK).ok();
    let telemetry = telemetry::client(settings.telemetry, do_not_track.as_deref());
    let ui: Arc<dyn Reporter> = Arc::new(Console);

    let local = Local::new(
        &provider,
        &runtime,
        &clusters,
        &services,
        telemetry.as_ref(),
        ui,
    );

    match cmd {
        LocalCommands::Install {
            port,
            low_resource_mode,
            chart_version,
            node_image,
        } => {
            let opts = install_opts(
                &settings,
                paths,
                port,
                low_resource_mode,
                chart_version,
                node_image,
            );
            local.install(&opts).await?;
        }
        LocalCommands::Uninstall { persisted } => {
            local.uninstall(UninstallOpts { persisted }).await?;
        }
        LocalCommands::Status => local.status().await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_opts_from_settings() {
        let paths = Paths::from_home("/home/op");
        let settings = Settings {
            port: 9000,
            chart_version: Some("1.5.1".to_string()),
            low_resource_mode: true,
            ..Settings::default()
        };

        let opts = install_opts(&settings, &paths, None, false, None, None);

        assert_eq!(opts.port, 9000);
        assert_eq!(opts.chart_version.as_deref(), Some("1.5.1"));
        assert!(opts.low_resource_mode);
        assert_eq!(opts.data_dir, paths.data);
    }

    #[test]
    fn test_install_opts_flags_win() {
        let paths = Paths::from_home("/home/op");
        let opts = install_opts(
            &Settings::default(),
            &paths,
            Some(8006),
            true,
            Some("1.6.0".to_string()),
            Some("kindest/node:v1.30.4".to_string()),
        );

        assert_eq!(opts.port, 8006);
        assert_eq!(opts.chart_version.as_deref(), Some("1.6.0"));
        assert_eq!(opts.node_image.as_deref(), Some("kindest/node:v1.30.4"));
        assert!(opts.low_resource_mode);
    }

    #[test]
    fn test_parse_uninstall() {
        #[derive(Parser)]
        struct Wrapper {
            #[clap(subcommand)]
            cmd: LocalCommands,
        }

        let parsed = Wrapper::parse_from(["abctl", "uninstall", "--persisted"]);
        assert!(matches!(parsed.cmd, LocalCommands::Uninstall { persisted: true }));
    }
}
