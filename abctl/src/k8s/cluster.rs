//! Cluster handles

use super::kind;
use crate::error::{ClusterCreateSnafu, DataDirSnafu, RenderConfigSnafu, Result};
use crate::prereq;
use async_trait::async_trait;
use serde::Serialize;
use snafu::ResultExt;
use std::path::{Path, PathBuf};

/// Where the kind node keeps local-path-provisioner volumes.
const PROVISIONER_PATH: &str = "/var/local-path-provisioner";

/// Live reference to a local cluster.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Name of the cluster.
    fn name(&self) -> &str;

    /// Create the cluster, or attach to it if it already exists.
    async fn create(&self, opts: &CreateOpts) -> Result<()>;

    /// Whether the cluster exists. Anything that prevents confirming the
    /// cluster is reported as `false`.
    async fn exists(&self) -> bool;

    /// Remove the cluster. Deleting a cluster that does not exist succeeds.
    async fn delete(&self) -> Result<()>;
}

/// Options used when creating a new cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOpts {
    /// Host port mapped to the ingress controller.
    pub port: u16,
    /// kind node image, kind's default when `None`.
    pub node_image: Option<String>,
    /// Host directory backing persistent volumes.
    pub data_dir: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KindConfig {
    kind: &'static str,
    api_version: &'static str,
    nodes: Vec<KindNode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KindNode {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    kubeadm_config_patches: Vec<String>,
    extra_mounts: Vec<KindMount>,
    extra_port_mappings: Vec<KindPortMapping>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KindMount {
    host_path: String,
    container_path: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KindPortMapping {
    container_port: u16,
    host_port: u16,
    protocol: &'static str,
}

/// Render the kind cluster configuration for `opts`.
///
/// A single control-plane node labelled for the nginx ingress, with the
/// ingress published on `opts.port` and the data directory mounted for
/// persistent volumes.
pub fn render_kind_config(opts: &CreateOpts) -> Result<String> {
    let config = KindConfig {
        kind: "Cluster",
        api_version: "kind.x-k8s.io/v1alpha4",
        nodes: vec![KindNode {
            role: "control-plane",
            image: opts.node_image.clone(),
            kubeadm_config_patches: vec![
                "kind: InitConfiguration\nnodeRegistration:\n  kubeletExtraArgs:\n    node-labels: \"ingress-ready=true\"\n"
                    .to_string(),
            ],
            extra_mounts: vec![KindMount {
                host_path: opts.data_dir.display().to_string(),
                container_path: PROVISIONER_PATH,
            }],
            extra_port_mappings: vec![KindPortMapping {
                container_port: 80,
                host_port: opts.port,
                protocol: "TCP",
            }],
        }],
    };

    serde_yaml::to_string(&config).context(RenderConfigSnafu {
        what: "kind cluster config",
    })
}

/// A kind cluster with its own kubeconfig file.
#[derive(Debug, Clone)]
pub struct KindCluster {
    name: String,
    kubeconfig: PathBuf,
    bin: String,
}

impl KindCluster {
    pub fn new(name: &str, kubeconfig: &Path) -> Self {
        Self {
            name: name.to_string(),
            kubeconfig: kubeconfig.to_path_buf(),
            bin: kind::KIND_BINARY.to_string(),
        }
    }

    /// Run `bin` in place of `kind`.
    #[cfg(test)]
    fn with_binary(mut self, bin: &str) -> Self {
        self.bin = bin.to_string();
        self
    }

    async fn create_inner(&self, opts: &CreateOpts) -> Result<()> {
        prereq::check(&prereq::KIND).await?;

        if self.exists().await {
            tracing::info!(cluster = %self.name, "cluster already exists, attaching");
            return kind::export_kubeconfig(&self.bin, &self.name, &self.kubeconfig).await;
        }

        tokio::fs::create_dir_all(&opts.data_dir)
            .await
            .context(DataDirSnafu {
                path: &opts.data_dir,
            })?;

        let config = render_kind_config(opts)?;
        tracing::info!(cluster = %self.name, port = opts.port, "creating cluster");
        kind::create_cluster(&self.bin, &self.name, &self.kubeconfig, &config).await
    }
}

#[async_trait]
impl Cluster for KindCluster {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, opts: &CreateOpts) -> Result<()> {
        self.create_inner(opts).await.context(ClusterCreateSnafu {
            cluster: &self.name,
        })
    }

    async fn exists(&self) -> bool {
        match kind::get_clusters(&self.bin).await {
            Ok(clusters) => clusters.iter().any(|c| c == &self.name),
            Err(err) => {
                tracing::debug!(cluster = %self.name, error = %err, "unable to list kind clusters");
                false
            }
        }
    }

    async fn delete(&self) -> Result<()> {
        tracing::info!(cluster = %self.name, "deleting cluster");
        kind::delete_cluster(&self.bin, &self.name, &self.kubeconfig).await
    }
}
