//! Configuration for the image server.
//!
//! Vision parameters (the `params` table) are read through [`ParamSource`] and
//! checked by [`validate`]. Service settings (`api`, `engine`) are plain serde
//! structs with defaults.

mod params;
mod validator;

pub use params::{ConfigParams, ParamSource, PARAMS_TABLE};
pub use validator::{validate, Configuration, LogLevel, TaskConfig};

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Service-level settings that are not part of the validated vision parameters.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Where the inference daemon that owns the accelerator listens.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_engine_url(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_engine_url() -> String {
    "http://localhost:9300".to_string()
}

/// Load the raw configuration tree from file and environment variables.
///
/// Configuration sources (in order of precedence):
/// 1. Environment variables (NCS__SECTION__KEY format)
/// 2. The given file, or config.toml if present
/// 3. Built-in defaults
pub fn load(path: Option<&str>) -> Result<ConfigLoader, ConfigError> {
    let file = match path {
        Some(path) => File::with_name(path).required(true),
        None => File::with_name("config").required(false),
    };

    ConfigLoader::builder()
        .set_default("api.host", default_host())?
        .set_default("api.port", default_port() as i64)?
        .set_default("engine.base_url", default_engine_url())?
        .add_source(file)
        .add_source(
            Environment::with_prefix("NCS")
                .separator("__")
                .try_parsing(true),
        )
        .build()
}

impl Settings {
    pub fn from_raw(raw: &ConfigLoader) -> Result<Self, ConfigError> {
        raw.clone().try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_api_config() {
        let api = ApiConfig::default();
        assert_eq!(api.host, "0.0.0.0");
        assert_eq!(api.port, 8080);
    }

    #[test]
    fn test_settings_ignore_params_table() {
        let raw = ConfigLoader::builder()
            .add_source(File::from_str(
                r#"
                [api]
                port = 9000

                [engine]
                base_url = "http://ncs-daemon:9300"

                [params]
                cnn_type = "googlenet"
                "#,
                FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let settings = Settings::from_raw(&raw).unwrap();
        assert_eq!(settings.api.port, 9000);
        assert_eq!(settings.api.host, "0.0.0.0");
        assert_eq!(settings.engine.base_url, "http://ncs-daemon:9300");
    }
}
