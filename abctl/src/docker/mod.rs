//! Container runtime discovery and connection
//!
//! Finds a reachable docker daemon by trying, in order, the host reported by
//! `docker context inspect` followed by platform specific guesses. The first
//! host that can be connected to and answers a ping wins.

mod engine;

pub use engine::BollardConnector;

use crate::error::{BoxError, ContainerInspectSnafu, Result, ServerVersionSnafu};
use crate::paths::Paths;
use async_trait::async_trait;
use serde::Deserialize;
use snafu::ResultExt;
use std::path::Path;
use tokio::process::Command;

/// Environment variable that overrides every computed host.
pub const ENV_DOCKER_HOST: &str = "DOCKER_HOST";

/// Version information reported by the docker server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Version {
    /// Engine version
    pub version: String,
    /// CPU architecture
    pub arch: String,
    /// Platform name, e.g. "Docker Desktop 4.30.0 (149282)"
    pub platform: String,
}

/// State of a single container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerState {
    pub running: bool,
    pub status: String,
}

/// The subset of the docker API abctl relies on.
#[async_trait]
pub trait Client: Send + Sync {
    async fn ping(&self) -> Result<(), BoxError>;

    async fn server_version(&self) -> Result<Version, BoxError>;

    /// `Ok(None)` when no container with that name exists.
    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerState>, BoxError>;
}

/// Builds a [`Client`] bound to a host address.
///
/// Swapped for a stub in tests so candidate probing can be exercised without
/// a daemon.
pub trait Connector: Send + Sync {
    fn connect(&self, host: &str) -> Result<Box<dyn Client>, BoxError>;
}

impl<F> Connector for F
where
    F: Fn(&str) -> Result<Box<dyn Client>, BoxError> + Send + Sync,
{
    fn connect(&self, host: &str) -> Result<Box<dyn Client>, BoxError> {
        self(host)
    }
}

/// Operating system family, selects the fallback host guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Mac,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => Self::Mac,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }
}

/// Handle to a live docker daemon.
pub struct Docker {
    client: Box<dyn Client>,
}

impl std::fmt::Debug for Docker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Docker").finish_non_exhaustive()
    }
}

impl Docker {
    pub fn new(client: Box<dyn Client>) -> Self {
        Self { client }
    }

    /// Returns the version information from the underlying docker process.
    pub async fn version(&self) -> Result<Version> {
        self.client.server_version().await.context(ServerVersionSnafu)
    }

    /// Look up a container by name.
    pub async fn container_state(&self, name: &str) -> Result<Option<ContainerState>> {
        self.client
            .inspect_container(name)
            .await
            .context(ContainerInspectSnafu { name })
    }
}

/// Connect to the local docker daemon.
pub async fn connect(paths: &Paths) -> Result<Docker> {
    let context_host = context_host().await;
    let hosts = candidate_hosts(context_host, Platform::current(), &paths.user_home);
    let env_host = std::env::var(ENV_DOCKER_HOST).ok().filter(|h| !h.is_empty());

    connect_with(&hosts, env_host.as_deref(), &BollardConnector).await
}

/// Build the ordered list of hosts to try.
///
/// The best guess comes from `docker context inspect`. The platform fallbacks
/// are easily wrong for non-standard installs, so they come last.
pub fn candidate_hosts(context_host: Option<String>, platform: Platform, home: &Path) -> Vec<String> {
    let mut hosts: Vec<String> = context_host.into_iter().collect();

    match platform {
        Platform::Mac => {
            hosts.push("unix:///var/run/docker.sock".to_string());
            hosts.push(format!("unix://{}/.docker/run/docker.sock", home.display()));
        }
        Platform::Windows => {
            hosts.push("npipe:////./pipe/docker_engine".to_string());
        }
        Platform::Other => {
            hosts.push("unix:///var/run/docker.sock".to_string());
            hosts.push(format!(
                "unix://{}/.docker/desktop/docker-cli.sock",
                home.display()
            ));
        }
    }

    hosts
}

/// Try each host in order, returning the first one that connects and pings.
///
/// `env_host`, when set, is the only host tried.
pub async fn connect_with(
    hosts: &[String],
    env_host: Option<&str>,
    connector: &dyn Connector,
) -> Result<Docker> {
    let targets: Vec<&str> = match env_host {
        Some(host) => vec![host],
        None => hosts.iter().map(String::as_str).collect(),
    };
    let mut last_err: BoxError = "no docker hosts to try".into();

    for target in targets {
        match create_and_ping(connector, target).await {
            Ok(client) => {
                tracing::debug!(host = %target, "connected to docker");
                return Ok(Docker::new(client));
            }
            Err(err) => {
                tracing::debug!(host = %target, error = %err, "error connecting to docker host");
                last_err = err;
            }
        }
    }

    Err(crate::error::Error::RuntimeUnavailable { source: last_err })
}

/// Create a client and ping it to ensure we can communicate
async fn create_and_ping(connector: &dyn Connector, host: &str) -> Result<Box<dyn Client>, BoxError> {
    let client = connector
        .connect(host)
        .map_err(|e| format!("unable to create docker client: {e}"))?;

    client
        .ping()
        .await
        .map_err(|e| format!("unable to ping docker client: {e}"))?;

    Ok(client)
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    #[serde(rename = "Endpoints")]
    endpoints: ContextEndpoints,
}

#[derive(Debug, Deserialize)]
struct ContextEndpoints {
    docker: ContextDocker,
}

#[derive(Debug, Deserialize)]
struct ContextDocker {
    #[serde(rename = "Host", default)]
    host: String,
}

/// Extract the docker host from `docker context inspect` output.
fn parse_context_host(out: &str) -> Option<String> {
    let entries: Vec<ContextEntry> = serde_json::from_str(out).ok()?;
    entries
        .into_iter()
        .next()
        .map(|entry| entry.endpoints.docker.host)
        .filter(|host| !host.is_empty())
}

/// Ask the docker CLI which host the current context points at.
async fn context_host() -> Option<String> {
    let mut cmd = Command::new("docker");
    cmd.args(["context", "inspect"]);

    match crate::cmd::run(&mut cmd, None).await {
        Ok(out) => parse_context_host(&out),
        Err(err) => {
            tracing::debug!(error = %err, "docker context inspect failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::FakeDockerClient;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn home() -> PathBuf {
        PathBuf::from("/home/op")
    }

    #[test]
    fn test_candidate_hosts_mac() {
        let hosts = candidate_hosts(None, Platform::Mac, &home());
        assert_eq!(
            hosts,
            vec![
                "unix:///var/run/docker.sock".to_string(),
                "unix:///home/op/.docker/run/docker.sock".to_string(),
            ]
        );
    }

    #[test]
    fn test_candidate_hosts_windows() {
        let hosts = candidate_hosts(None, Platform::Windows, &home());
        assert_eq!(hosts, vec!["npipe:////./pipe/docker_engine".to_string()]);
    }

    #[test]
    fn test_candidate_hosts_other_with_context_first() {
        let hosts = candidate_hosts(
            Some("unix:///run/user/1000/docker.sock".to_string()),
            Platform::Other,
            &home(),
        );
        assert_eq!(
            hosts,
            vec![
                "unix:///run/user/1000/docker.sock".to_string(),
                "unix:///var/run/docker.sock".to_string(),
                "unix:///home/op/.docker/desktop/docker-cli.sock".to_string(),
            ]
        );
    }

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("macos"), Platform::Mac);
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
        assert_eq!(Platform::from_os("linux"), Platform::Other);
    }

    #[test]
    fn test_parse_context_host() {
        let out = r#"[{"Name":"desktop-linux","Endpoints":{"docker":{"Host":"unix:///home/op/.docker/desktop/docker.sock","SkipTLSVerify":false}}}]"#;
        assert_eq!(
            parse_context_host(out),
            Some("unix:///home/op/.docker/desktop/docker.sock".to_string())
        );
        assert_eq!(parse_context_host(r#"[{"Endpoints":{"docker":{"Host":""}}}]"#), None);
        assert_eq!(parse_context_host("[]"), None);
        assert_eq!(parse_context_host("not json"), None);
    }

    /// Records every host it is asked for; only `good` pings successfully.
    struct RecordingConnector {
        good: Option<&'static str>,
        attempts: Mutex<Vec<String>>,
    }

    impl RecordingConnector {
        fn new(good: Option<&'static str>) -> Self {
            Self {
                good,
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    impl Connector for RecordingConnector {
        fn connect(&self, host: &str) -> Result<Box<dyn Client>, BoxError> {
            self.attempts.lock().unwrap().push(host.to_string());
            let client = if self.good == Some(host) {
                FakeDockerClient::default()
            } else {
                FakeDockerClient::unreachable(&format!("no daemon at {host}"))
            };
            Ok(Box::new(client))
        }
    }

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_connect_stops_at_first_pingable_host() {
        let connector = RecordingConnector::new(Some("h3"));
        let docker = connect_with(&hosts(&["h1", "h2", "h3", "h4"]), None, &connector).await;

        assert!(docker.is_ok());
        assert_eq!(connector.attempts(), hosts(&["h1", "h2", "h3"]));
    }

    #[tokio::test]
    async fn test_connect_exhausted_reports_last_error() {
        let connector = RecordingConnector::new(None);
        let err = connect_with(&hosts(&["h1", "h2"]), None, &connector)
            .await
            .unwrap_err();

        assert_eq!(connector.attempts(), hosts(&["h1", "h2"]));
        match err {
            Error::RuntimeUnavailable { source } => {
                let msg = source.to_string();
                assert!(msg.contains("unable to ping docker client"), "{msg}");
                assert!(msg.contains("no daemon at h2"), "{msg}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_connect_construction_failure_moves_on() {
        let connector = |host: &str| -> Result<Box<dyn Client>, BoxError> {
            if host == "bad" {
                Err("invalid host".into())
            } else {
                Ok(Box::new(FakeDockerClient::default()))
            }
        };

        let docker = connect_with(&hosts(&["bad", "good"]), None, &connector).await;
        assert!(docker.is_ok());
    }

    #[tokio::test]
    async fn test_env_host_overrides_candidates() {
        let connector = RecordingConnector::new(Some("tcp://10.0.0.5:2375"));
        let docker = connect_with(
            &hosts(&["h1", "h2"]),
            Some("tcp://10.0.0.5:2375"),
            &connector,
        )
        .await;

        assert!(docker.is_ok());
        assert_eq!(connector.attempts(), hosts(&["tcp://10.0.0.5:2375"]));
    }

    #[tokio::test]
    async fn test_unreachable_env_host_is_tried_once() {
        let connector = RecordingConnector::new(None);
        let err = connect_with(
            &hosts(&["h1", "h2", "h3"]),
            Some("tcp://10.0.0.5:2375"),
            &connector,
        )
        .await
        .unwrap_err();

        assert_eq!(connector.attempts(), hosts(&["tcp://10.0.0.5:2375"]));
        match err {
            Error::RuntimeUnavailable { source } => {
                assert!(source.to_string().contains("no daemon at tcp://10.0.0.5:2375"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_version() {
        let client = FakeDockerClient {
            version: Version {
                version: "27.1.1".to_string(),
                arch: "arm64".to_string(),
                platform: "Docker Desktop 4.33.0".to_string(),
            },
            ..FakeDockerClient::default()
        };
        let docker = Docker::new(Box::new(client));

        let version = docker.version().await.unwrap();
        assert_eq!(version.version, "27.1.1");
        assert_eq!(version.arch, "arm64");
        assert_eq!(version.platform, "Docker Desktop 4.33.0");
    }

    #[tokio::test]
    async fn test_version_error() {
        let docker = Docker::new(Box::new(FakeDockerClient::unreachable("gone")));
        let err = docker.version().await.unwrap_err();
        assert_eq!(err.to_string(), "unable to determine server version");
    }
}
