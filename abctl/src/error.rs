//! Error types for abctl
//!
//! Library code returns [`Error`]; the binary converts it into `anyhow` at the
//! command boundary.

use snafu::Snafu;
use std::path::PathBuf;

/// Boxed error used where the underlying cause comes from a swappable backend
/// (docker transport, fakes in tests).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// No candidate docker host answered a ping.
    #[snafu(display("unable to create docker client"))]
    RuntimeUnavailable { source: BoxError },

    #[snafu(display("unable to determine server version"))]
    ServerVersion { source: BoxError },

    #[snafu(display("unable to inspect container '{name}'"))]
    ContainerInspect { name: String, source: BoxError },

    #[snafu(display("unable to determine docker installation status"))]
    DockerCheck {
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display("unable to determine if the cluster '{cluster}' exists"))]
    ClusterLookup {
        cluster: String,
        source: std::io::Error,
    },

    #[snafu(display("unable to create cluster '{cluster}'"))]
    ClusterCreate {
        cluster: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display("unable to uninstall cluster {cluster}"))]
    ClusterDeletion {
        cluster: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    /// The deployment manager could not finish removing the application.
    #[snafu(display("unable to complete uninstall"))]
    AppTeardown {
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    /// The deployment manager could not be constructed.
    #[snafu(display("unable to initialize the service manager"))]
    ManagerInit {
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display("unable to load kubeconfig {}", path.display()))]
    KubeconfigLoad {
        path: PathBuf,
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("kubernetes api request failed"))]
    Kube { source: kube::Error },

    #[snafu(display("failed to execute: {command}"))]
    CommandSpawn {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("command failed: {command} - {message}"))]
    CommandFailed { command: String, message: String },

    #[snafu(display("prerequisite not found: {tool} - {hint}"))]
    PrerequisiteMissing { tool: String, hint: String },

    #[snafu(display("{tool} {found} does not satisfy {required}"))]
    PrerequisiteVersion {
        tool: String,
        found: String,
        required: String,
    },

    #[snafu(display("unable to load settings from {}", path.display()))]
    Settings {
        path: PathBuf,
        source: confy::ConfyError,
    },

    #[snafu(display("unable to determine user home directory"))]
    HomeDir,

    #[snafu(display("unable to render {what}"))]
    RenderConfig {
        what: String,
        source: serde_yaml::Error,
    },

    #[snafu(display("ingress at {url} did not become ready after {attempts} attempts"))]
    IngressNotReady { url: String, attempts: u32 },

    #[snafu(display("unable to build http client"))]
    Http { source: reqwest::Error },

    #[snafu(display("unable to remove data directory {}", path.display()))]
    DataDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Render an error and its sources on one line, `outer: inner: root`.
pub fn chain(err: &(dyn std::error::Error + 'static)) -> String {
    std::iter::successors(Some(err), |e| e.source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}
