//! Application deployment on the local cluster
//!
//! Airbyte and the nginx ingress controller are installed as helm releases;
//! the ingress object and persisted volume claims are managed directly through
//! the Kubernetes API.

mod helm;

use crate::error::{
    AppTeardownSnafu, DataDirSnafu, Error, HttpSnafu, IngressNotReadySnafu, KubeSnafu, KubeconfigLoadSnafu,
    ManagerInitSnafu, RenderConfigSnafu, Result,
};
use crate::k8s::{CreateOpts, Provider};
use crate::logs::LogScanner;
use crate::prereq;
use crate::ui::Reporter;
use async_trait::async_trait;
use helm::{Chart, KubeTarget};
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule, IngressServiceBackend,
    IngressSpec, ServiceBackendPort,
};
use kube::api::{Api, DeleteParams, ListParams, LogParams, ObjectMeta, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use snafu::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const AIRBYTE_RELEASE: &str = "airbyte-abctl";
pub const AIRBYTE_NAMESPACE: &str = "airbyte-abctl";
const AIRBYTE_CHART: &str = "airbyte";

const NGINX_RELEASE: &str = "ingress-nginx";
const NGINX_NAMESPACE: &str = "ingress-nginx";
const NGINX_CHART: &str = "ingress-nginx";
const NGINX_REPO: &str = "https://kubernetes.github.io/ingress-nginx";

/// Field manager name for server-side apply.
const FIELD_MANAGER: &str = "abctl";

const INGRESS_ATTEMPTS: u32 = 60;
const INGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Options for a local install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOpts {
    /// Host port the ingress is published on.
    pub port: u16,
    pub node_image: Option<String>,
    pub chart_repo: String,
    /// Chart version, latest when `None`.
    pub chart_version: Option<String>,
    /// Shrink resource requests so Airbyte fits on small machines.
    pub low_resource_mode: bool,
    /// Host directory backing persistent volumes.
    pub data_dir: PathBuf,
}

impl InstallOpts {
    /// The subset of these options needed to create the cluster.
    pub fn cluster_opts(&self) -> CreateOpts {
        CreateOpts {
            port: self.port,
            node_image: self.node_image.clone(),
            data_dir: self.data_dir.clone(),
        }
    }

    /// URL the installed application is reachable on.
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UninstallOpts {
    /// Also remove persistent volume claims and the host data directory.
    pub persisted: bool,
}

/// Installs and removes the application on an existing cluster.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn install(&self, opts: &InstallOpts) -> Result<()>;

    async fn uninstall(&self, opts: &UninstallOpts) -> Result<()>;
}

/// Builds a [`ServiceManager`] bound to a provider's cluster.
#[async_trait]
pub trait ManagerFactory: Send + Sync {
    async fn manager(&self, provider: &Provider, ui: Arc<dyn Reporter>) -> Result<Box<dyn ServiceManager>>;
}

/// Production factory producing [`HelmManager`]s.
#[derive(Debug, Clone)]
pub struct HelmManagers {
    data_dir: PathBuf,
}

impl HelmManagers {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }
}

#[async_trait]
impl ManagerFactory for HelmManagers {
    async fn manager(&self, provider: &Provider, ui: Arc<dyn Reporter>) -> Result<Box<dyn ServiceManager>> {
        let manager = HelmManager::connect(provider, &self.data_dir, ui)
            .await
            .context(ManagerInitSnafu)?;
        Ok(Box::new(manager))
    }
}

/// Deploys Airbyte with helm and the Kubernetes API.
pub struct HelmManager {
    client: kube::Client,
    target: KubeTarget,
    data_dir: PathBuf,
    ui: Arc<dyn Reporter>,
}

impl HelmManager {
    /// Verify helm is available and open a Kubernetes client for the
    /// provider's kubeconfig context.
    pub async fn connect(provider: &Provider, data_dir: &Path, ui: Arc<dyn Reporter>) -> Result<Self> {
        prereq::check(&prereq::HELM).await?;

        let path = &provider.kubeconfig;
        let kubeconfig = Kubeconfig::read_from(path).context(KubeconfigLoadSnafu { path })?;
        let options = KubeConfigOptions {
            context: Some(provider.context.clone()),
            ..Default::default()
        };
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .context(KubeconfigLoadSnafu { path })?;
        let client = kube::Client::try_from(config).context(KubeSnafu)?;

        Ok(Self {
            client,
            target: KubeTarget {
                kubeconfig: provider.kubeconfig.clone(),
                context: provider.context.clone(),
            },
            data_dir: data_dir.to_path_buf(),
            ui,
        })
    }

    async fn install_nginx(&self) -> Result<()> {
        self.ui.update("Installing ingress-nginx");
        let chart = Chart {
            release: NGINX_RELEASE,
            name: NGINX_CHART,
            repo: NGINX_REPO,
            namespace: NGINX_NAMESPACE,
            version: None,
        };
        helm::upgrade_install(&self.target, &chart, &nginx_values()?).await?;
        self.ui.success("Installed ingress-nginx");
        Ok(())
    }

    async fn install_airbyte(&self, opts: &InstallOpts) -> Result<()> {
        self.ui.update("Installing Airbyte, this may take a while");
        let chart = Chart {
            release: AIRBYTE_RELEASE,
            name: AIRBYTE_CHART,
            repo: &opts.chart_repo,
            namespace: AIRBYTE_NAMESPACE,
            version: opts.chart_version.as_deref(),
        };

        if let Err(err) = helm::upgrade_install(&self.target, &chart, &airbyte_values(opts)?).await {
            self.report_bootloader_logs().await;
            return Err(err);
        }

        self.ui.success("Installed Airbyte");
        Ok(())
    }

    /// Surface bootloader errors after a failed chart install.
    async fn report_bootloader_logs(&self) {
        let pod = format!("{AIRBYTE_RELEASE}-airbyte-bootloader");
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), AIRBYTE_NAMESPACE);

        match pods.logs(&pod, &LogParams::default()).await {
            Ok(logs) => {
                let found = report_log_problems(&logs, self.ui.as_ref());
                tracing::debug!(pod = %pod, found, "scanned bootloader logs");
            }
            Err(err) => tracing::debug!(pod = %pod, error = %err, "unable to read bootloader logs"),
        }
    }

    async fn apply_ingress(&self) -> Result<()> {
        self.ui.update("Configuring ingress");
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), AIRBYTE_NAMESPACE);
        let ingress = airbyte_ingress();
        let params = PatchParams::apply(FIELD_MANAGER).force();

        api.patch(AIRBYTE_RELEASE, &params, &Patch::Apply(&ingress))
            .await
            .context(KubeSnafu)?;
        Ok(())
    }
}

/// The individual steps of removing the application. Split from
/// [`HelmManager`] so [`teardown`] can be driven without a cluster.
#[async_trait]
trait TeardownSteps: Send + Sync {
    async fn uninstall_release(&self, release: &str, namespace: &str) -> Result<()>;

    async fn delete_volume_claims(&self) -> Result<()>;

    async fn remove_host_data(&self) -> Result<()>;
}

#[async_trait]
impl TeardownSteps for HelmManager {
    async fn uninstall_release(&self, release: &str, namespace: &str) -> Result<()> {
        helm::uninstall(&self.target, release, namespace).await
    }

    async fn delete_volume_claims(&self) -> Result<()> {
        let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), AIRBYTE_NAMESPACE);
        pvcs.delete_collection(&DeleteParams::default(), &ListParams::default())
            .await
            .context(KubeSnafu)?;
        Ok(())
    }

    async fn remove_host_data(&self) -> Result<()> {
        remove_data_dir(&self.data_dir).await
    }
}

fn keep_first(first: &mut Option<Error>, step: &str, result: Result<()>) {
    if let Err(err) = result {
        tracing::warn!(step, error = %crate::error::chain(&err), "teardown step failed");
        if first.is_none() {
            *first = Some(err);
        }
    }
}

/// Attempt every teardown step even after one fails, so persisted data is
/// removed whenever it was asked for. The first failure is returned.
async fn teardown(steps: &dyn TeardownSteps, ui: &dyn Reporter, opts: &UninstallOpts) -> Result<()> {
    let mut first = None;

    ui.update("Uninstalling Airbyte");
    let result = steps.uninstall_release(AIRBYTE_RELEASE, AIRBYTE_NAMESPACE).await;
    keep_first(&mut first, "airbyte release", result);

    ui.update("Uninstalling ingress-nginx");
    let result = steps.uninstall_release(NGINX_RELEASE, NGINX_NAMESPACE).await;
    keep_first(&mut first, "ingress-nginx release", result);

    if opts.persisted {
        ui.update("Removing persisted data");
        let result = steps.delete_volume_claims().await;
        keep_first(&mut first, "volume claims", result);

        let result = steps.remove_host_data().await;
        keep_first(&mut first, "host data directory", result);
    }

    match first {
        Some(err) => Err(err).context(AppTeardownSnafu),
        None => {
            if opts.persisted {
                ui.success("Removed persisted data");
            }
            Ok(())
        }
    }
}

#[async_trait]
impl ServiceManager for HelmManager {
    async fn install(&self, opts: &InstallOpts) -> Result<()> {
        self.install_nginx().await?;
        self.install_airbyte(opts).await?;
        self.apply_ingress().await?;

        self.ui.update("Waiting for the ingress to answer");
        wait_for_ingress(&opts.url(), INGRESS_ATTEMPTS, INGRESS_INTERVAL).await
    }

    async fn uninstall(&self, opts: &UninstallOpts) -> Result<()> {
        teardown(self, self.ui.as_ref(), opts).await
    }
}

fn nginx_values() -> Result<String> {
    let values = serde_json::json!({
        "controller": {
            "hostPort": { "enabled": true },
            "service": { "type": "NodePort" },
            "nodeSelector": { "ingress-ready": "true" },
            "updateStrategy": { "type": "Recreate" },
            "admissionWebhooks": { "enabled": false },
        }
    });
    serde_yaml::to_string(&values).context(RenderConfigSnafu {
        what: "ingress-nginx values",
    })
}

fn airbyte_values(opts: &InstallOpts) -> Result<String> {
    let mut values = serde_json::json!({
        "global": {
            "auth": { "enabled": false },
            "jobs": {
                "resources": {
                    "limits": { "cpu": "3", "memory": "4Gi" }
                }
            }
        }
    });

    if opts.low_resource_mode {
        values["global"]["jobs"]["resources"] = serde_json::json!({
            "requests": { "cpu": "0", "memory": "0" },
            "limits": { "cpu": "1", "memory": "2Gi" }
        });
        values["server"] = serde_json::json!({
            "env_vars": { "JOB_RESOURCE_VARIANT_OVERRIDE": "lowresource" }
        });
    }

    serde_yaml::to_string(&values).context(RenderConfigSnafu {
        what: "airbyte values",
    })
}

/// nginx ingress routing every host to the Airbyte webapp.
fn airbyte_ingress() -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some(AIRBYTE_RELEASE.to_string()),
            namespace: Some(AIRBYTE_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: Some("nginx".to_string()),
            rules: Some(vec![IngressRule {
                host: None,
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: format!("{AIRBYTE_RELEASE}-airbyte-webapp-svc"),
                                port: Some(ServiceBackendPort {
                                    number: Some(80),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Report ERROR and WARN lines from pod logs, returning how many were found.
fn report_log_problems(logs: &str, ui: &dyn Reporter) -> usize {
    let mut scanner = LogScanner::new(logs.as_bytes());
    let mut found = 0;

    while scanner.scan() {
        let line = scanner.line();
        if line.is_error() || line.is_warning() {
            ui.warn(&format!("bootloader {}: {}", line.level, line.message));
            found += 1;
        }
    }

    if let Some(err) = scanner.err() {
        tracing::debug!(error = %err, "bootloader log scan stopped");
    }

    found
}

/// Poll `url` until the ingress routes to a backend. nginx answers 404 until
/// the ingress is picked up and 5xx until the webapp is up.
async fn wait_for_ingress(url: &str, attempts: u32, interval: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context(HttpSnafu)?;

    for attempt in 1..=attempts {
        match client.get(url).send().await {
            Ok(resp) if !resp.status().is_server_error() && resp.status().as_u16() != 404 => {
                tracing::debug!(url, attempt, status = %resp.status(), "ingress ready");
                return Ok(());
            }
            Ok(resp) => tracing::debug!(url, attempt, status = %resp.status(), "ingress not ready"),
            Err(err) => tracing::debug!(url, attempt, error = %err, "ingress not reachable"),
        }

        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    IngressNotReadySnafu { url, attempts }.fail()
}

/// Remove the host data directory. A missing directory is not an error.
async fn remove_data_dir(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).context(DataDirSnafu { path }),
    }
}
