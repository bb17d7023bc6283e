mod loader;
pub mod value;

use std::collections::HashMap;
use std::path::Path;

pub use value::{ConfigValue, FromConfigValue};

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    #[error("Config key not found: {0}")]
    NotFound(String),
    /// The value could not be converted to the requested type.
    #[error("Config type mismatch for '{key}': expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    #[error("Config load error: {0}")]
    Load(String),
}

/// Environment variable that selects the active profile.
pub const PROFILE_ENV: &str = "LUMEN_PROFILE";

/// Application configuration loaded from YAML files, `.env` files and
/// environment variables.
///
/// Resolution order (lowest to highest priority):
/// 1. `application.yaml`
/// 2. `application-{profile}.yaml`
/// 3. `.env`, then `.env.{profile}` (loaded into the process environment)
/// 4. Environment variables (`LUMEN_RENDER_TIMEOUT` overrides `lumen.render.timeout`)
///
/// `.env` files never overwrite already-set environment variables.
/// The profile is `LUMEN_PROFILE` if set, else the argument passed to [`load`](Self::load).
#[derive(Debug, Clone)]
pub struct LumenConfig {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

impl LumenConfig {
    /// Load configuration from the current working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile)
    }

    /// Load configuration with `dir` as the directory holding the YAML and `.env` files.
    pub fn load_from(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let active_profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();
        loader::load_yaml_file(&dir.join("application.yaml"), &mut values)?;
        loader::load_yaml_file(
            &dir.join(format!("application-{active_profile}.yaml")),
            &mut values,
        )?;

        // Missing .env files are fine.
        let _ = dotenvy::from_path(dir.join(".env"));
        let _ = dotenvy::from_path(dir.join(format!(".env.{active_profile}")));

        for (env_key, env_val) in std::env::vars() {
            let key = env_key.to_lowercase().replace('_', ".");
            values.insert(key, ConfigValue::String(env_val));
        }

        tracing::debug!(profile = %active_profile, keys = values.len(), "configuration loaded");
        Ok(LumenConfig {
            values,
            profile: active_profile,
        })
    }

    /// Create a config from a YAML string. Environment variables are not consulted.
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(LumenConfig {
            values,
            profile: profile.to_string(),
        })
    }

    /// An empty config; every typed view falls back to its defaults.
    pub fn empty() -> Self {
        LumenConfig {
            values: HashMap::new(),
            profile: "test".to_string(),
        }
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Get a typed value for the given dot-separated key.
    ///
    /// # Errors
    ///
    /// `ConfigError::NotFound` if the key does not exist, or
    /// `ConfigError::TypeMismatch` if the value cannot be converted.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Like [`get`](Self::get), but a missing key is `Ok(None)`. A present
    /// value of the wrong type is still an error.
    pub fn get_opt<V: FromConfigValue>(&self, key: &str) -> Result<Option<V>, ConfigError> {
        match self.values.get(key) {
            Some(value) => V::from_config_value(value, key).map(Some),
            None => Ok(None),
        }
    }

    /// Get a typed value, returning `default` if the key is missing or mistyped.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }
}

impl Default for LumenConfig {
    fn default() -> Self {
        Self::empty()
    }
}

/// Request handling settings (`lumen.http.*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Largest accepted request body, in bytes.
    pub body_limit: usize,
}

impl HttpConfig {
    pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

    pub fn from_config(config: &LumenConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            body_limit: config
                .get_opt("lumen.http.bodylimit")?
                .unwrap_or(Self::DEFAULT_BODY_LIMIT),
        })
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            body_limit: Self::DEFAULT_BODY_LIMIT,
        }
    }
}
