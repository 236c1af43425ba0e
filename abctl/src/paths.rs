//! Well-known locations under the user's home directory
//!
//! Everything abctl persists lives under `~/.airbyte/abctl`. The layout is
//! built from an explicit home directory so tests never touch the real one.

use crate::error::{HomeDirSnafu, Result};
use snafu::OptionExt;
use std::path::PathBuf;

/// File name of the kubeconfig written for the managed cluster.
pub const FILE_KUBECONFIG: &str = "abctl.kubeconfig";

/// File name of the persisted settings.
pub const FILE_SETTINGS: &str = "settings.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub user_home: PathBuf,
    /// Host directory mounted into the kind node for persisted volumes.
    pub data: PathBuf,
    pub kubeconfig: PathBuf,
    pub settings: PathBuf,
}

impl Paths {
    /// Build the layout rooted at `home`.
    pub fn from_home(home: impl Into<PathBuf>) -> Self {
        let user_home = home.into();
        let abctl = user_home.join(".airbyte").join("abctl");

        Self {
            data: abctl.join("data"),
            kubeconfig: abctl.join(FILE_KUBECONFIG),
            settings: abctl.join(FILE_SETTINGS),
            user_home,
        }
    }

    /// Resolve the layout from an optional override (`--home`, `ABCTL_HOME`),
    /// falling back to the current user's home directory.
    pub fn discover(home_override: Option<&str>) -> Result<Self> {
        if let Some(home) = home_override {
            return Ok(Self::from_home(expand_path(home)));
        }

        let home = dirs::home_dir().context(HomeDirSnafu)?;
        Ok(Self::from_home(home))
    }
}

/// Expand path with tilde (~) and environment variables
fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}
