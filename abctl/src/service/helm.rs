//! helm CLI wrapper

use crate::cmd;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tokio::process::Command;

/// The cluster a helm invocation targets.
#[derive(Debug, Clone)]
pub(super) struct KubeTarget {
    pub kubeconfig: PathBuf,
    pub context: String,
}

impl KubeTarget {
    fn args(&self) -> Vec<String> {
        vec![
            "--kubeconfig".to_string(),
            self.kubeconfig.display().to_string(),
            "--kube-context".to_string(),
            self.context.clone(),
        ]
    }
}

/// A chart release to install.
#[derive(Debug, Clone)]
pub(super) struct Chart<'a> {
    pub release: &'a str,
    pub name: &'a str,
    pub repo: &'a str,
    pub namespace: &'a str,
    pub version: Option<&'a str>,
}

fn upgrade_args(target: &KubeTarget, chart: &Chart<'_>) -> Vec<String> {
    let mut args: Vec<String> = [
        "upgrade",
        "--install",
        chart.release,
        chart.name,
        "--repo",
        chart.repo,
        "--namespace",
        chart.namespace,
        "--create-namespace",
        "--wait",
        "--timeout",
        "30m",
        "--values",
        "-",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();

    if let Some(version) = chart.version {
        args.push("--version".to_string());
        args.push(version.to_string());
    }

    args.extend(target.args());
    args
}

fn uninstall_args(target: &KubeTarget, release: &str, namespace: &str) -> Vec<String> {
    let mut args = vec![
        "uninstall".to_string(),
        release.to_string(),
        "--namespace".to_string(),
        namespace.to_string(),
        "--wait".to_string(),
    ];
    args.extend(target.args());
    args
}

/// Install or upgrade `chart`, passing `values` as a YAML document on stdin.
pub(super) async fn upgrade_install(target: &KubeTarget, chart: &Chart<'_>, values: &str) -> Result<()> {
    tracing::info!(release = chart.release, chart = chart.name, "installing chart");
    let mut command = Command::new("helm");
    command.args(upgrade_args(target, chart));

    cmd::run(&mut command, Some(values)).await?;
    Ok(())
}

/// Uninstall a release. A release that is not installed counts as removed.
pub(super) async fn uninstall(target: &KubeTarget, release: &str, namespace: &str) -> Result<()> {
    let mut command = Command::new("helm");
    command.args(uninstall_args(target, release, namespace));

    match cmd::run(&mut command, None).await {
        Ok(_) => Ok(()),
        Err(err) if is_not_found(&err) => {
            tracing::debug!(release, "release not installed");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn is_not_found(err: &Error) -> bool {
    matches!(err, Error::CommandFailed { message, .. } if message.contains("not found"))
}
