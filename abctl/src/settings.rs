//! Persisted user settings (`~/.airbyte/abctl/settings.toml`)

use crate::error::{Result, SettingsSnafu};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::path::Path;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CHART_REPO: &str = "https://airbytehq.github.io/helm-charts";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Host port the ingress is published on.
    pub port: u16,
    /// kind node image, kind's default when unset.
    pub node_image: Option<String>,
    pub chart_repo: String,
    /// Airbyte chart version, latest when unset.
    pub chart_version: Option<String>,
    pub low_resource_mode: bool,
    pub telemetry: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            node_image: None,
            chart_repo: DEFAULT_CHART_REPO.to_string(),
            chart_version: None,
            low_resource_mode: false,
            telemetry: true,
        }
    }
}

impl Settings {
    /// Load settings from `path`, writing the defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        confy::load_path(path).context(SettingsSnafu { path })
    }
}
