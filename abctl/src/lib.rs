//! abctl: run Airbyte on a local kind cluster
//!
//! The library holds everything behind the `abctl` binary: docker discovery,
//! the kind cluster provider, the helm deployment manager and the local
//! install/uninstall orchestration.

pub mod cmd;
pub mod commands;
pub mod docker;
pub mod error;
pub mod k8s;
pub mod local;
pub mod logs;
pub mod paths;
pub mod prereq;
pub mod service;
pub mod settings;
pub mod telemetry;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
