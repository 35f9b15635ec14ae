//! Daemon configuration
//!
//! Layered once at startup: built-in defaults, then the optional TOML file
//! (`JOBSYNC_CONFIG`, default `jobsync.toml`), then `JOBSYNC_*` environment
//! variables with `__` between nested keys (`JOBSYNC_SCHEDULE__SCRAPE`).

use config::{Config, ConfigError, Environment, File, FileFormat, Source};
use jobsync_api_rpc::RpcServerConfig;
use jobsync_core::config::PipelineConfig;
use jobsync_infra_web::{HealthConfig, HttpConfig, SourceSpec};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "jobsync.toml";
const DEFAULT_DATABASE_URL: &str = "sqlite://jobsync.db";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub database_url: String,
    pub rpc: RpcServerConfig,
    pub http: HttpConfig,
    pub health: HealthConfig,
    /// Empty means the built-in presets
    pub sources: Vec<SourceSpec>,
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            rpc: RpcServerConfig::default(),
            http: HttpConfig::default(),
            health: HealthConfig::default(),
            sources: Vec::new(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl DaemonConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("JOBSYNC_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::build(File::new(&path, FileFormat::Toml).required(false))
    }

    fn build<S>(file: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("JOBSYNC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
