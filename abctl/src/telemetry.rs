//! Operation telemetry
//!
//! Every top level operation runs inside [`Client::wrap`]. Events are emitted
//! as structured `tracing` records; shipping them anywhere is the subscriber's
//! job.

use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Environment variable honoured to opt out of telemetry.
pub const ENV_DO_NOT_TRACK: &str = "DO_NOT_TRACK";

/// Targets whose events are never recorded. Docker transport URLs can carry
/// local socket paths.
const EXCLUDED_TARGETS: &[&str] = &["bollard", "hyper", "hyper_util", "h2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Install,
    Uninstall,
    Status,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => f.write_str("install"),
            Self::Uninstall => f.write_str("uninstall"),
            Self::Status => f.write_str("status"),
        }
    }
}

#[async_trait]
pub trait Client: Send + Sync {
    /// Run `op`, recording its start and outcome under `event`. The result of
    /// `op` is returned unchanged.
    async fn wrap(&self, event: EventType, op: BoxFuture<'_, Result<()>>) -> Result<()>;
}

/// Runs operations without recording anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClient;

#[async_trait]
impl Client for NoopClient {
    async fn wrap(&self, _event: EventType, op: BoxFuture<'_, Result<()>>) -> Result<()> {
        op.await
    }
}

/// Emits start/success/failure events tagged with a per-invocation session.
#[derive(Debug, Clone)]
pub struct TracingClient {
    session_id: Uuid,
}

impl TracingClient {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
        }
    }
}

impl Default for TracingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Client for TracingClient {
    async fn wrap(&self, event: EventType, op: BoxFuture<'_, Result<()>>) -> Result<()> {
        let started = chrono::Utc::now();
        tracing::info!(
            target: "abctl::telemetry",
            session = %self.session_id,
            %event,
            state = "started",
            at = %started.to_rfc3339(),
        );

        let result = op.await;
        let duration_ms = (chrono::Utc::now() - started).num_milliseconds();

        match &result {
            Ok(()) => tracing::info!(
                target: "abctl::telemetry",
                session = %self.session_id,
                %event,
                state = "succeeded",
                duration_ms,
            ),
            Err(err) => tracing::info!(
                target: "abctl::telemetry",
                session = %self.session_id,
                %event,
                state = "failed",
                duration_ms,
                error = %err,
            ),
        }

        result
    }
}

/// Whether a `DO_NOT_TRACK` value opts out. Any non-empty value other than
/// `0` or `false` counts.
fn do_not_track(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) => !(v == "0" || v.eq_ignore_ascii_case("false")),
    }
}

/// Select the telemetry client for this invocation.
pub fn client(enabled: bool, do_not_track_env: Option<&str>) -> Box<dyn Client> {
    if !enabled || do_not_track(do_not_track_env) {
        tracing::debug!("telemetry disabled");
        return Box::new(NoopClient);
    }
    Box::new(TracingClient::new())
}

/// Log filter used by the binary. `RUST_LOG` wins when set.
pub fn log_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "abctl=debug" } else { "abctl=info" };
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    for target in EXCLUDED_TARGETS {
        if let Ok(directive) = format!("{target}=off").parse() {
            filter = filter.add_directive(directive);
        }
    }

    filter
}
