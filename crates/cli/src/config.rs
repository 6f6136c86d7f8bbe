//! Configuration loading from tiller.toml and the environment.

use runtime::DEFAULT_MAX_ITERATIONS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Conversation loop settings.
    #[serde(default)]
    pub run: RunConfig,

    /// Chart output settings.
    #[serde(default)]
    pub chart: ChartSettings,
}

/// Settings for the orchestration run.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Iteration ceiling for one run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Dataset CSV to load instead of the embedded one.
    pub dataset: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            dataset: None,
        }
    }
}

/// Where chart files are written.
#[derive(Debug, Deserialize)]
pub struct ChartSettings {
    /// Output directory; defaults to the working directory.
    pub output_dir: Option<PathBuf>,

    /// Default chart filename.
    #[serde(default = "default_chart_filename")]
    pub filename: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            output_dir: None,
            filename: default_chart_filename(),
        }
    }
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_chart_filename() -> String {
    "iris_plot.svg".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Inference service credentials, read from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: require("AZURE_OPENAI_ENDPOINT")?,
            api_key: require("AZURE_OPENAI_API_KEY")?,
            deployment: require("AZURE_OPENAI_DEPLOYMENT")?.trim().to_string(),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnv(name))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("environment variable {0} must be set")]
    MissingEnv(&'static str),
}
