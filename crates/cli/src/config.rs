//! Configuration management for the CLI

use anyhow::{Context, Result};
use kready_lib::poll::PollSettings;
use kready_lib::tolerations::{parse_tolerations, Toleration};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// CLI settings, layered from an optional file and `KREADY_*` environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Namespace the workload is installed into
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Release name used for label selectors
    #[serde(default = "default_release")]
    pub release: String,

    #[serde(default)]
    pub poll: PollConfig,

    /// Serialized tolerations the workload already carries
    #[serde(default)]
    pub tolerations: Vec<String>,

    /// Endpoint probed by `wait connectivity` when no URL is given
    #[serde(default)]
    pub connectivity_url: Option<String>,
}

/// Poll bounds for every waiter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_namespace() -> String {
    "kready".to_string()
}

fn default_release() -> String {
    "kready".to_string()
}

fn default_interval_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_max_retries() -> u32 {
    u32::MAX
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// `KREADY_*` variables; nested keys use `__`
///
/// Serialized tolerations contain commas, so `KREADY_TOLERATIONS` separates
/// entries with `;`.
fn environment() -> config::Environment {
    config::Environment::with_prefix("KREADY")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(TOLERATION_SEPARATOR)
        .with_list_parse_key("tolerations")
}

const TOLERATION_SEPARATOR: &str = ";";

impl Settings {
    /// Load settings from an optional file, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, environment())
    }

    fn load_from(path: Option<&Path>, environment: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(environment)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings::new(
            Duration::from_secs(self.poll.interval_secs),
            Duration::from_secs(self.poll.timeout_secs),
            self.poll.max_retries,
        )
    }

    /// Configured tolerations plus any given on the command line
    pub fn known_tolerations(&self, extra: &[String]) -> Result<Vec<Toleration>> {
        let mut tolerations =
            parse_tolerations(&self.tolerations).context("Invalid toleration in configuration")?;
        tolerations.extend(parse_tolerations(extra).context("Invalid --tolerate value")?);
        Ok(tolerations)
    }

    /// Label selector matching every pod or claim of the release
    pub fn release_selector(&self) -> String {
        format!("app.kubernetes.io/instance={}", self.release)
    }
}
