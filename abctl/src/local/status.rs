use super::Local;
use crate::docker::Docker;
use crate::error::Result;
use crate::telemetry::EventType;
use tracing::Instrument;

impl Local<'_> {
    /// Report whether the cluster exists and its node container is running.
    pub async fn status(&self) -> Result<()> {
        let docker = self.check_docker().await?;

        let span = tracing::info_span!("local status");
        self.telemetry
            .wrap(
                EventType::Status,
                Box::pin(self.cluster_status(&docker).instrument(span)),
            )
            .await
    }

    async fn cluster_status(&self, docker: &Docker) -> Result<()> {
        let name = self.cluster_name();
        self.ui
            .update(&format!("Checking for existing Kubernetes cluster '{name}'"));

        let cluster = self.clusters.cluster(self.provider).await?;
        if !cluster.exists().await {
            self.ui.info(&format!("Cluster '{name}' does not exist"));
            return Ok(());
        }

        // kind names the single node container after the cluster
        let container = format!("{name}-control-plane");
        match docker.container_state(&container).await? {
            Some(state) if state.running => {
                self.ui.success(&format!("Cluster '{name}' is running"));
            }
            Some(state) => {
                self.ui.warn(&format!(
                    "Cluster '{name}' is not running (container status: {})",
                    state.status
                ));
            }
            None => {
                self.ui.warn(&format!(
                    "Cluster '{name}' exists but container '{container}' was not found"
                ));
            }
        }

        Ok(())
    }
}
