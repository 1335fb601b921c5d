//! Configuration
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults
//! 2. TOML file: explicit path, else `HVML_CONFIG_PATH`, else `./hvml.toml` if present
//! 3. environment variables `HVML_<SECTION>__<KEY>` (e.g. `HVML_INTERPRETER__MAX_FRAMES`)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "hvml.toml";
pub const CONFIG_PATH_ENV: &str = "HVML_CONFIG_PATH";
const ENV_PREFIX: &str = "HVML";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/* ===================== Sections ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Frame depth limit per coroutine
    pub max_frames: usize,
    /// Steps a coroutine may run before yielding to the next ready one
    pub slice_steps: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_frames: 1024,
            slice_steps: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererProtocol {
    #[default]
    Headless,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub protocol: RendererProtocol,
    pub uri: String,
    /// Bound on one request/response round trip
    pub timeout_ms: u64,
    /// DOM handle targeted by `<request>`
    pub dom_handle: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            protocol: RendererProtocol::Headless,
            uri: "headless:".to_string(),
            timeout_ms: 5000,
            dom_handle: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hvml_core=info".to_string(),
        }
    }
}

/* ===================== Config ===================== */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interpreter: InterpreterConfig,
    pub renderer: RendererConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from the default sources
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interpreter.max_frames == 0 {
            return Err(ConfigError::Invalid(
                "interpreter.max_frames must be at least 1".into(),
            ));
        }
        if self.interpreter.slice_steps == 0 {
            return Err(ConfigError::Invalid(
                "interpreter.slice_steps must be at least 1".into(),
            ));
        }
        if self.renderer.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "renderer.timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Config file path (overrides `HVML_CONFIG_PATH` and the default file)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let explicit = self
            .config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
        let (path, required) = match explicit {
            Some(path) => (path, true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let config: Config = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}
