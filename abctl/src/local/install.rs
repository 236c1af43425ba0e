use super::Local;
use crate::error::Result;
use crate::service::InstallOpts;
use crate::telemetry::EventType;
use std::sync::Arc;
use tracing::Instrument;

impl Local<'_> {
    /// Create (or reuse) the cluster and deploy Airbyte onto it.
    ///
    /// Unlike uninstall every step here is fatal.
    pub async fn install(&self, opts: &InstallOpts) -> Result<()> {
        self.ui.update("Starting installation");
        self.check_docker().await?;

        let span = tracing::info_span!(
            "local install",
            port = opts.port,
            low_resource_mode = opts.low_resource_mode
        );
        self.telemetry
            .wrap(
                EventType::Install,
                Box::pin(self.install_cluster(opts).instrument(span)),
            )
            .await
    }

    async fn install_cluster(&self, opts: &InstallOpts) -> Result<()> {
        let name = self.cluster_name();
        self.ui
            .update(&format!("Checking for existing Kubernetes cluster '{name}'"));

        let cluster = self.clusters.cluster(self.provider).await.inspect_err(|_| {
            self.ui
                .error(&format!("Unable to determine if the cluster '{name}' exists"));
        })?;

        if cluster.exists().await {
            self.ui
                .success(&format!("Cluster '{name}' already exists"));
        } else {
            self.ui
                .update(&format!("Creating cluster '{name}'"));
            cluster.create(&opts.cluster_opts()).await.inspect_err(|_| {
                self.ui.error(&format!("Unable to create cluster '{name}'"));
            })?;
            self.ui.success(&format!("Cluster '{name}' created"));
        }

        let manager = self
            .services
            .manager(self.provider, Arc::clone(&self.ui))
            .await
            .inspect_err(|_| self.ui.error("Failed to initialize 'local' command"))?;

        manager
            .install(opts)
            .await
            .inspect_err(|_| self.ui.error("Airbyte installation failed"))?;

        self.ui.success(&format!(
            "Airbyte installation complete\nAirbyte can be accessed by navigating to {}",
            opts.url()
        ));
        Ok(())
    }
}
