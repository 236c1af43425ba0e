//! kind CLI wrapper

use crate::cmd;
use crate::error::Result;
use std::path::Path;
use tokio::process::Command;

/// Binary invoked for every kind operation.
pub(super) const KIND_BINARY: &str = "kind";

/// Names of all kind clusters known to the local runtime.
pub(super) async fn get_clusters(bin: &str) -> Result<Vec<String>> {
    let out = cmd::run(Command::new(bin).args(["get", "clusters"]), None).await?;

    Ok(parse_clusters(&out))
}

fn parse_clusters(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Creates a cluster from a kind config passed on stdin.
pub(super) async fn create_cluster(
    bin: &str,
    name: &str,
    kubeconfig: &Path,
    config: &str,
) -> Result<()> {
    let mut command = Command::new(bin);
    command
        .args(["create", "cluster", "--name", name, "--config", "-"])
        .arg("--kubeconfig")
        .arg(kubeconfig);

    cmd::run(&mut command, Some(config)).await?;
    Ok(())
}

/// Writes the cluster's credentials into `kubeconfig`.
pub(super) async fn export_kubeconfig(bin: &str, name: &str, kubeconfig: &Path) -> Result<()> {
    let mut command = Command::new(bin);
    command
        .args(["export", "kubeconfig", "--name", name])
        .arg("--kubeconfig")
        .arg(kubeconfig);

    cmd::run(&mut command, None).await?;
    Ok(())
}

/// Deletes the cluster and prunes its entry from `kubeconfig`.
///
/// kind treats deleting a missing cluster as success.
pub(super) async fn delete_cluster(bin: &str, name: &str, kubeconfig: &Path) -> Result<()> {
    let mut command = Command::new(bin);
    command
        .args(["delete", "cluster", "--name", name])
        .arg("--kubeconfig")
        .arg(kubeconfig);

    cmd::run(&mut command, None).await?;
    Ok(())
}
