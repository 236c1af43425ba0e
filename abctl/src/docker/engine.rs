//! bollard backed [`Client`] implementation

use super::{Client, Connector, ContainerState, Version};
use crate::error::BoxError;
use async_trait::async_trait;
use bollard::container::InspectContainerOptions;
use bollard::errors::Error as BollardError;

/// Request timeout in seconds for the docker API.
const TIMEOUT_SECS: u64 = 120;

/// Connects to hosts using the bollard client.
#[derive(Debug, Clone, Copy, Default)]
pub struct BollardConnector;

impl Connector for BollardConnector {
    fn connect(&self, host: &str) -> Result<Box<dyn Client>, BoxError> {
        let docker = connect_host(host)?;
        Ok(Box::new(docker))
    }
}

/// Pick the bollard transport based on the host scheme.
fn connect_host(host: &str) -> Result<bollard::Docker, BoxError> {
    let version = bollard::API_DEFAULT_VERSION;

    if host.starts_with("unix://") {
        #[cfg(unix)]
        return Ok(bollard::Docker::connect_with_unix(host, TIMEOUT_SECS, version)?);
        #[cfg(not(unix))]
        return Err(format!("unix sockets are not supported on this platform: {host}").into());
    }

    if host.starts_with("npipe://") {
        #[cfg(windows)]
        return Ok(bollard::Docker::connect_with_named_pipe(host, TIMEOUT_SECS, version)?);
        #[cfg(not(windows))]
        return Err(format!("named pipes are only supported on windows: {host}").into());
    }

    if host.starts_with("tcp://") || host.starts_with("http://") {
        return Ok(bollard::Docker::connect_with_http(host, TIMEOUT_SECS, version)?);
    }

    Err(format!("unsupported docker host: {host}").into())
}

#[async_trait]
impl Client for bollard::Docker {
    async fn ping(&self) -> Result<(), BoxError> {
        bollard::Docker::ping(self).await?;
        Ok(())
    }

    async fn server_version(&self) -> Result<Version, BoxError> {
        let ver = self.version().await?;

        Ok(Version {
            version: ver.version.unwrap_or_default(),
            arch: ver.arch.unwrap_or_default(),
            platform: ver.platform.map(|p| p.name).unwrap_or_default(),
        })
    }

    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerState>, BoxError> {
        match bollard::Docker::inspect_container(self, name, None::<InspectContainerOptions>).await {
            Ok(resp) => {
                let state = resp.state.unwrap_or_default();
                Ok(Some(ContainerState {
                    running: state.running.unwrap_or(false),
                    status: state.status.map(|s| s.to_string()).unwrap_or_default(),
                }))
            }
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_scheme() {
        let err = connect_host("ssh://op@remote").unwrap_err();
        assert!(err.to_string().contains("unsupported docker host"));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_named_pipe_rejected_off_windows() {
        assert!(connect_host("npipe:////./pipe/docker_engine").is_err());
    }
}
