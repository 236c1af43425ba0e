//! Cluster providers
//!
//! A [`Provider`] is a named, immutable description of one local cluster: its
//! kind cluster name, kubeconfig context and kubeconfig location. The default
//! provider points at the operator's real kubeconfig; the test provider keeps
//! everything inside a throwaway directory.

mod cluster;
mod kind;

pub use cluster::{Cluster, CreateOpts, KindCluster, render_kind_config};

use crate::error::{ClusterLookupSnafu, Result};
use crate::paths::{FILE_KUBECONFIG, Paths};
use async_trait::async_trait;
use snafu::ResultExt;
use std::fmt;
use std::path::{Path, PathBuf};

/// Cluster name used by the default provider.
pub const DEFAULT_CLUSTER_NAME: &str = "airbyte-abctl";

/// Cluster name used by the test provider.
pub const TEST_CLUSTER_NAME: &str = "test-airbyte-abctl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Kind,
    Test,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind => f.write_str("kind"),
            Self::Test => f.write_str("test"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub name: ProviderKind,
    /// Name of the kind cluster.
    pub cluster_name: String,
    /// Kubeconfig context for the cluster.
    pub context: String,
    pub kubeconfig: PathBuf,
}

impl Provider {
    /// The provider used for real installations.
    pub fn default_for(paths: &Paths) -> Self {
        Self {
            name: ProviderKind::Kind,
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            context: format!("kind-{DEFAULT_CLUSTER_NAME}"),
            kubeconfig: paths.kubeconfig.clone(),
        }
    }

    /// A provider whose kubeconfig lives under `dir`, for test runs that must
    /// not touch the operator's kubeconfig.
    pub fn test_in(dir: &Path) -> Self {
        Self {
            name: ProviderKind::Test,
            cluster_name: TEST_CLUSTER_NAME.to_string(),
            context: TEST_CLUSTER_NAME.to_string(),
            kubeconfig: dir.join("abctl").join(FILE_KUBECONFIG),
        }
    }

    fn kubeconfig_dir(&self) -> &Path {
        self.kubeconfig.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Returns a handle to this provider's cluster.
    ///
    /// The kubeconfig directory is created if needed so that kind can write to
    /// it once the cluster is created. The cluster itself is neither created
    /// nor touched here.
    pub async fn cluster(&self) -> Result<KindCluster> {
        let dir = self.kubeconfig_dir();
        tokio::fs::create_dir_all(dir)
            .await
            .context(ClusterLookupSnafu {
                cluster: &self.cluster_name,
            })?;

        tracing::debug!(
            provider = %self.name,
            cluster = %self.cluster_name,
            kubeconfig = %self.kubeconfig.display(),
            "cluster handle ready"
        );

        Ok(KindCluster::new(&self.cluster_name, &self.kubeconfig))
    }
}

/// Produces cluster handles for a provider.
#[async_trait]
pub trait ClusterFactory: Send + Sync {
    async fn cluster(&self, provider: &Provider) -> Result<Box<dyn Cluster>>;
}

/// Factory backed by the kind CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct KindClusters;

#[async_trait]
impl ClusterFactory for KindClusters {
    async fn cluster(&self, provider: &Provider) -> Result<Box<dyn Cluster>> {
        let cluster = provider.cluster().await?;
        Ok(Box::new(cluster))
    }
}
