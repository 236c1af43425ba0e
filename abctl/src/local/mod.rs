//! Local install orchestration
//!
//! [`Local`] sequences the steps of `abctl local install|uninstall|status`
//! across the docker runtime, the kind cluster and the deployment manager.
//! Collaborators are borrowed trait objects so each sequence can be driven
//! against fakes.

mod install;
mod status;
mod uninstall;

pub use uninstall::Teardown;

use crate::docker::{self, Docker};
use crate::error::{DockerCheckSnafu, Result};
use crate::k8s::{ClusterFactory, Provider};
use crate::paths::Paths;
use crate::service::ManagerFactory;
use crate::telemetry;
use crate::ui::Reporter;
use async_trait::async_trait;
use snafu::ResultExt;
use std::sync::Arc;

/// Source of the docker connection.
#[async_trait]
pub trait Runtime: Send + Sync {
    async fn connect(&self) -> Result<Docker>;
}

/// Connects to the docker daemon on this machine.
#[derive(Debug, Clone)]
pub struct LocalRuntime {
    paths: Paths,
}

impl LocalRuntime {
    pub fn new(paths: &Paths) -> Self {
        Self { paths: paths.clone() }
    }
}

#[async_trait]
impl Runtime for LocalRuntime {
    async fn connect(&self) -> Result<Docker> {
        docker::connect(&self.paths).await
    }
}

pub struct Local<'a> {
    provider: &'a Provider,
    runtime: &'a dyn Runtime,
    clusters: &'a dyn ClusterFactory,
    services: &'a dyn ManagerFactory,
    telemetry: &'a dyn telemetry::Client,
    ui: Arc<dyn Reporter>,
}

impl<'a> Local<'a> {
    pub fn new(
        provider: &'a Provider,
        runtime: &'a dyn Runtime,
        clusters: &'a dyn ClusterFactory,
        services: &'a dyn ManagerFactory,
        telemetry: &'a dyn telemetry::Client,
        ui: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            provider,
            runtime,
            clusters,
            services,
            telemetry,
            ui,
        }
    }

    fn cluster_name(&self) -> &str {
        &self.provider.cluster_name
    }

    /// Connect to docker and report its version. Nothing else is touched when
    /// this fails.
    async fn check_docker(&self) -> Result<Docker> {
        self.ui.update("Checking for Docker installation");

        match self.docker_installed().await {
            Ok(docker) => Ok(docker),
            Err(err) => {
                self.ui.error("Unable to determine if Docker is installed");
                Err(err).context(DockerCheckSnafu)
            }
        }
    }

    async fn docker_installed(&self) -> Result<Docker> {
        let docker = self.runtime.connect().await?;
        let version = docker.version().await?;

        tracing::debug!(
            version = %version.version,
            arch = %version.arch,
            platform = %version.platform,
            "docker server"
        );
        self.ui.success(&format!(
            "Found Docker installation: version {}",
            version.version
        ));

        Ok(docker)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::k8s::TEST_CLUSTER_NAME;
    use crate::testing::{
        CallLog, FakeClusters, FakeManagers, FakeRuntime, Level, RecordingReporter, RecordingTelemetry,
    };

    /// Fakes for every collaborator, sharing one call log.
    pub(crate) struct Harness {
        pub provider: Provider,
        pub runtime: FakeRuntime,
        pub clusters: FakeClusters,
        pub services: FakeManagers,
        pub telemetry: RecordingTelemetry,
        pub ui: Arc<RecordingReporter>,
        pub log: CallLog,
        _tmp: tempfile::TempDir,
    }

    impl Harness {
        pub fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let log = CallLog::default();
            let mut clusters = FakeClusters::default();
            clusters.cluster.log = log.clone();
            let mut services = FakeManagers::default();
            services.manager.log = log.clone();

            Self {
                provider: Provider::test_in(tmp.path()),
                runtime: FakeRuntime::default(),
                clusters,
                services,
                telemetry: RecordingTelemetry::default(),
                ui: Arc::new(RecordingReporter::default()),
                log,
                _tmp: tmp,
            }
        }

        pub fn local(&self) -> Local<'_> {
            Local::new(
                &self.provider,
                &self.runtime,
                &self.clusters,
                &self.services,
                &self.telemetry,
                self.ui.clone(),
            )
        }
    }

    #[tokio::test]
    async fn test_check_docker_reports_version() {
        let mut h = Harness::new();
        h.runtime.client.version.version = "27.1.1".to_string();

        h.local().check_docker().await.unwrap();

        assert_eq!(
            h.ui.at(Level::Success),
            vec!["Found Docker installation: version 27.1.1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_check_docker_failure() {
        let mut h = Harness::new();
        h.runtime.unreachable = true;

        let err = h.local().check_docker().await.unwrap_err();

        assert_eq!(err.to_string(), "unable to determine docker installation status");
        assert_eq!(
            h.ui.at(Level::Error),
            vec!["Unable to determine if Docker is installed".to_string()]
        );
        assert_eq!(h.local().cluster_name(), TEST_CLUSTER_NAME);
    }
}
