use super::Local;
use crate::error::{self, ClusterDeletionSnafu, Error, Result};
use crate::service::UninstallOpts;
use crate::telemetry::EventType;
use snafu::ResultExt;
use std::sync::Arc;
use tracing::Instrument;

/// How far the application level teardown got before the cluster is deleted.
///
/// None of these outcomes stop the cluster deletion that follows.
#[derive(Debug)]
pub enum Teardown {
    Completed,
    /// The deployment manager could not be constructed.
    ManagerUnavailable(Error),
    /// The deployment manager failed part way through.
    Incomplete(Error),
}

impl Local<'_> {
    /// Remove the application and then the cluster.
    ///
    /// Cluster deletion is the authoritative step: application teardown
    /// failures are reported as warnings and the cluster is removed anyway.
    pub async fn uninstall(&self, opts: UninstallOpts) -> Result<()> {
        self.ui.update("Starting uninstallation");
        self.check_docker().await?;

        let span = tracing::info_span!("local uninstall", persisted = opts.persisted);
        self.telemetry
            .wrap(
                EventType::Uninstall,
                Box::pin(self.uninstall_cluster(opts).instrument(span)),
            )
            .await
    }

    async fn uninstall_cluster(&self, opts: UninstallOpts) -> Result<()> {
        let name = self.cluster_name();
        self.ui
            .update(&format!("Checking for existing Kubernetes cluster '{name}'"));

        let cluster = self.clusters.cluster(self.provider).await.inspect_err(|_| {
            self.ui
                .error(&format!("Unable to determine if the cluster '{name}' exists"));
        })?;

        if !cluster.exists().await {
            self.ui.success(&format!(
                "Cluster '{name}' does not exist\nNo additional action required"
            ));
            return Ok(());
        }

        self.ui.success(&format!("Existing cluster '{name}' found"));

        match self.teardown(&opts).await {
            Teardown::Completed => {}
            Teardown::ManagerUnavailable(err) => {
                self.ui
                    .warn("Failed to initialize 'local' command\nUninstallation attempt will continue");
                tracing::debug!(error = %error::chain(&err), "initialization of 'local' failed");
            }
            Teardown::Incomplete(err) => {
                self.ui.warn(&error::chain(&err));
                self.ui.warn("will still attempt to uninstall the cluster");
            }
        }

        self.ui
            .update(&format!("Verifying uninstallation status of cluster '{name}'"));
        if let Err(err) = cluster.delete().await {
            self.ui
                .error(&format!("Uninstallation of cluster '{name}' failed"));
            return Err(err).context(ClusterDeletionSnafu { cluster: name });
        }

        self.ui.success(&format!(
            "Uninstallation of cluster '{name}' completed successfully"
        ));
        self.ui.success("Airbyte uninstallation complete");
        Ok(())
    }

    async fn teardown(&self, opts: &UninstallOpts) -> Teardown {
        let manager = match self
            .services
            .manager(self.provider, Arc::clone(&self.ui))
            .await
        {
            Ok(manager) => manager,
            Err(err) => return Teardown::ManagerUnavailable(err),
        };

        match manager.uninstall(opts).await {
            Ok(()) => Teardown::Completed,
            Err(err) => Teardown::Incomplete(err),
        }
    }
}
