//! In-memory stand-ins for docker, kind, helm and the terminal used by unit
//! tests.

use crate::docker::{Client, ContainerState, Docker, Version};
use crate::error::{BoxError, Error, Result};
use crate::k8s::{Cluster, ClusterFactory, CreateOpts, Provider};
use crate::local::Runtime;
use crate::service::{InstallOpts, ManagerFactory, ServiceManager, UninstallOpts};
use crate::telemetry::{self, EventType};
use crate::ui::Reporter;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shared, ordered record of the calls made against the fakes.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, call: &str) -> bool {
        self.0.lock().unwrap().iter().any(|c| c == call)
    }
}

fn failed(command: &str, message: &str) -> Error {
    Error::CommandFailed {
        command: command.to_string(),
        message: message.to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDockerClient {
    pub version: Version,
    /// When set, ping and version fail with this message.
    pub ping_error: Option<String>,
    pub containers: HashMap<String, ContainerState>,
}

impl FakeDockerClient {
    pub fn unreachable(msg: &str) -> Self {
        Self {
            ping_error: Some(msg.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Client for FakeDockerClient {
    async fn ping(&self) -> Result<(), BoxError> {
        match &self.ping_error {
            Some(msg) => Err(msg.clone().into()),
            None => Ok(()),
        }
    }

    async fn server_version(&self) -> Result<Version, BoxError> {
        match &self.ping_error {
            Some(msg) => Err(msg.clone().into()),
            None => Ok(self.version.clone()),
        }
    }

    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerState>, BoxError> {
        Ok(self.containers.get(name).cloned())
    }
}

/// Runtime that hands out a [`FakeDockerClient`], or fails to connect.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeRuntime {
    pub unreachable: bool,
    pub client: FakeDockerClient,
}

#[async_trait]
impl Runtime for FakeRuntime {
    async fn connect(&self) -> Result<Docker> {
        if self.unreachable {
            return Err(Error::RuntimeUnavailable {
                source: "no docker hosts answered".into(),
            });
        }
        Ok(Docker::new(Box::new(self.client.clone())))
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeCluster {
    pub name: String,
    pub exists: bool,
    pub create_error: Option<String>,
    pub delete_error: Option<String>,
    pub log: CallLog,
}

#[async_trait]
impl Cluster for FakeCluster {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, opts: &CreateOpts) -> Result<()> {
        self.log.push(format!("create port={}", opts.port));
        match &self.create_error {
            Some(msg) => Err(failed("kind create cluster", msg)),
            None => Ok(()),
        }
    }

    async fn exists(&self) -> bool {
        self.log.push("exists");
        self.exists
    }

    async fn delete(&self) -> Result<()> {
        self.log.push("delete");
        match &self.delete_error {
            Some(msg) => Err(failed("kind delete cluster", msg)),
            None => Ok(()),
        }
    }
}

/// Hands out clones of `cluster`, or fails the lookup.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeClusters {
    pub cluster: FakeCluster,
    pub lookup_error: bool,
}

#[async_trait]
impl ClusterFactory for FakeClusters {
    async fn cluster(&self, provider: &Provider) -> Result<Box<dyn Cluster>> {
        self.cluster.log.push("cluster");
        if self.lookup_error {
            return Err(Error::ClusterLookup {
                cluster: provider.cluster_name.clone(),
                source: std::io::Error::other("permission denied"),
            });
        }
        Ok(Box::new(FakeCluster {
            name: provider.cluster_name.clone(),
            ..self.cluster.clone()
        }))
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeManager {
    pub install_error: Option<String>,
    pub uninstall_error: Option<String>,
    pub log: CallLog,
}

#[async_trait]
impl ServiceManager for FakeManager {
    async fn install(&self, opts: &InstallOpts) -> Result<()> {
        self.log.push(format!("install port={}", opts.port));
        match &self.install_error {
            Some(msg) => Err(failed("helm upgrade --install", msg)),
            None => Ok(()),
        }
    }

    async fn uninstall(&self, opts: &UninstallOpts) -> Result<()> {
        self.log.push(format!("uninstall persisted={}", opts.persisted));
        match &self.uninstall_error {
            Some(msg) => Err(Error::AppTeardown {
                source: Box::new(failed("helm uninstall", msg)),
            }),
            None => Ok(()),
        }
    }
}

/// Hands out clones of `manager`, or fails construction.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeManagers {
    pub manager: FakeManager,
    pub init_error: Option<String>,
}

#[async_trait]
impl ManagerFactory for FakeManagers {
    async fn manager(&self, _provider: &Provider, _ui: Arc<dyn Reporter>) -> Result<Box<dyn ServiceManager>> {
        self.manager.log.push("manager");
        if let Some(msg) = &self.init_error {
            return Err(Error::ManagerInit {
                source: Box::new(failed("helm version", msg)),
            });
        }
        Ok(Box::new(self.manager.clone()))
    }
}

/// Telemetry client remembering which events it wrapped.
#[derive(Debug, Default)]
pub(crate) struct RecordingTelemetry {
    events: Mutex<Vec<EventType>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<EventType> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl telemetry::Client for RecordingTelemetry {
    async fn wrap(&self, event: EventType, op: BoxFuture<'_, Result<()>>) -> Result<()> {
        self.events.lock().unwrap().push(event);
        op.await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    Update,
    Info,
    Success,
    Warn,
    Error,
}

/// Reporter that keeps every message for later assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingReporter {
    fn record(&self, level: Level, msg: &str) {
        self.entries.lock().unwrap().push((level, msg.to_string()));
    }

    pub fn at(&self, level: Level) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.at(Level::Warn)
    }
}

impl Reporter for RecordingReporter {
    fn update(&self, msg: &str) {
        self.record(Level::Update, msg);
    }

    fn info(&self, msg: &str) {
        self.record(Level::Info, msg);
    }

    fn success(&self, msg: &str) {
        self.record(Level::Success, msg);
    }

    fn warn(&self, msg: &str) {
        self.record(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.record(Level::Error, msg);
    }
}
