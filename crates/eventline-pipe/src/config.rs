use config::{Config as ConfigLoader, ConfigError, Environment, File};
use eventline::EventBufferConfig;
use serde::Deserialize;
use std::path::Path;

/// Directory holding the default.toml shipped with this crate
const SHIPPED_CONFIG_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config");

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub buffer: EventBufferConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Bytes read from stdin per write into the buffer
    pub read_chunk_size: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { read_chunk_size: 4096 }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. default.toml shipped next to this crate's manifest
    /// 2. config/default.toml relative to the working directory
    /// 3. config/{ENV}.toml relative to the working directory (ENV defaults to "dev")
    /// 4. Environment variables prefixed with EVENTLINE_, sections split by `__`
    ///    (e.g. EVENTLINE_BUFFER__MAX_LEN=512)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Same layering as [`Config::load`] with `dir` in place of `./config`
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());
        let dir = dir.as_ref();
        let shipped = Path::new(SHIPPED_CONFIG_DIR).join("default");

        let builder = ConfigLoader::builder()
            .add_source(File::with_name(&shipped.to_string_lossy()).required(false))
            .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
            .add_source(File::with_name(&dir.join(&env).to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix("EVENTLINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        let cfg: Config = config.try_deserialize()?;

        if cfg.input.read_chunk_size == 0 {
            return Err(ConfigError::Message(
                "input.read_chunk_size must be greater than zero".to_string(),
            ));
        }

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}
