use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Name of the configuration file looked up in the app directory.
pub const CONFIG_FILE: &str = "labelkit.yaml";

/// Top-level labelkit.yaml configuration.
///
/// Every section is optional; a missing file (or empty sections) falls back
/// to defaults that reproduce the stock dashboard behavior: a `conda_env`
/// environment pinned to Python 3.10.9 hosting Label Studio on port 8081,
/// and a 70/30 train/val split.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DashboardConfig {
    /// Runtime environment provisioning settings.
    #[serde(default)]
    pub env: EnvConfig,

    /// Annotation tool settings.
    #[serde(default)]
    pub tool: ToolConfig,

    /// Dataset split settings.
    #[serde(default)]
    pub split: SplitConfig,
}

/// Settings for the sandboxed runtime environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Directory name of the environment under the app dir.
    pub name: String,

    /// Environment manager binary.
    pub manager: String,

    /// Interpreter version the environment is pinned to.
    pub python: String,

    /// Package channel passed to the manager.
    pub channel: String,

    /// Dependency set installed into the environment.
    pub dependencies: Vec<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            name: "conda_env".to_string(),
            manager: "conda".to_string(),
            python: "3.10.9".to_string(),
            channel: "conda-forge".to_string(),
            dependencies: vec![
                "numpy".to_string(),
                "pandas".to_string(),
                "psycopg2".to_string(),
                "pyyaml".to_string(),
            ],
        }
    }
}

/// Settings for the annotation tool executable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Package name installed via pip.
    pub package: String,

    /// Executable name inside the environment's bin directory
    /// (platform suffix is appended automatically).
    pub executable: String,

    /// Listening port passed to the tool on launch.
    pub port: u16,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            package: "label-studio".to_string(),
            executable: "label-studio".to_string(),
            port: 8081,
        }
    }
}

/// Settings for the dataset split pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of pairs assigned to the train subset, in (0, 1).
    pub ratio: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { ratio: 0.7 }
    }
}

impl DashboardConfig {
    /// Load configuration from `dir/labelkit.yaml`.
    ///
    /// A missing file yields the default configuration; a present but
    /// unparseable file is an error (silent fallback would mask typos).
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = yaml_serde::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Run post-parse validation, returning warnings for the caller to
    /// present. Invalid values are reported, not repaired.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !(0.0..=1.0).contains(&self.split.ratio)
            || self.split.ratio == 0.0
            || self.split.ratio == 1.0
        {
            warnings.push(format!(
                "split.ratio {} is outside (0, 1); splits will degenerate",
                self.split.ratio
            ));
        }
        if self.env.name.trim().is_empty() {
            warnings.push("env.name is empty; provisioning cannot run".to_string());
        }
        if self.tool.port < 1024 {
            warnings.push(format!(
                "tool.port {} is privileged; the tool may fail to bind",
                self.tool.port
            ));
        }
        warnings
    }

    /// Absolute path of the config file within `dir`, whether or not it exists.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }
}

/// Default config file contents written by `labelkit init`.
pub fn default_config_yaml() -> String {
    "\
env:
  name: conda_env
  manager: conda
  python: \"3.10.9\"
  channel: conda-forge
  dependencies:
    - numpy
    - pandas
    - psycopg2
    - pyyaml

tool:
  package: label-studio
  executable: label-studio
  port: 8081

split:
  ratio: 0.7
"
    .to_string()
}
