//! Prerequisite checks for the external tools abctl drives
//!
//! kind and helm are invoked as binaries, so before using them we make sure
//! they are on the PATH and new enough.

use crate::error::{PrerequisiteMissingSnafu, PrerequisiteVersionSnafu, Result};
use regex::Regex;
use semver::{Version, VersionReq};
use tokio::process::Command;

/// An external binary with a minimum supported version.
#[derive(Debug, Clone, Copy)]
pub struct Tool {
    pub name: &'static str,
    pub version_args: &'static [&'static str],
    /// semver requirement, e.g. ">=0.20.0"
    pub requirement: &'static str,
    pub install_hint: &'static str,
}

pub const KIND: Tool = Tool {
    name: "kind",
    version_args: &["version"],
    requirement: ">=0.20.0",
    install_hint: "see https://kind.sigs.k8s.io/docs/user/quick-start/#installation",
};

pub const HELM: Tool = Tool {
    name: "helm",
    version_args: &["version", "--short"],
    requirement: ">=3.8.0",
    install_hint: "see https://helm.sh/docs/intro/install/",
};

/// Extract semantic version from version output
/// Handles various formats:
///   "kind v0.24.0 go1.22.6 linux/amd64" -> "0.24.0"
///   "v3.15.2+g1a500d5" -> "3.15.2"
fn extract_version(output: &str) -> Option<String> {
    let re = Regex::new(r"v?(\d+\.\d+\.\d+)").ok()?;
    re.captures(output)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Check if installed version meets requirement
fn version_meets_requirement(installed: &str, requirement: &str) -> bool {
    let (Ok(installed), Ok(req)) = (Version::parse(installed.trim()), VersionReq::parse(requirement))
    else {
        return false;
    };
    req.matches(&installed)
}

/// Verify `tool` is installed and recent enough, returning its version.
pub async fn check(tool: &Tool) -> Result<String> {
    let mut cmd = Command::new(tool.name);
    cmd.args(tool.version_args);

    let output = crate::cmd::run(&mut cmd, None).await.map_err(|err| {
        tracing::debug!(tool = tool.name, error = %err, "version check failed");
        PrerequisiteMissingSnafu {
            tool: tool.name,
            hint: tool.install_hint,
        }
        .build()
    })?;

    // 🤓 Binary found but version unknown - assume OK
    let Some(version) = extract_version(&output) else {
        tracing::warn!(tool = tool.name, output = %output.trim(), "unable to parse version");
        return Ok("unknown".to_string());
    };

    if !version_meets_requirement(&version, tool.requirement) {
        return PrerequisiteVersionSnafu {
            tool: tool.name,
            found: version,
            required: tool.requirement,
        }
        .fail();
    }

    Ok(version)
}
