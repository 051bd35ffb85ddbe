//! Configuration for the Telegram API and export defaults
//!
//! Loads configuration from config.yml file; environment variables fill in
//! `${VAR}` placeholders and missing values.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::export::DEFAULT_BATCH_SIZE;

/// Default session name; the session file is `<name>_<api_id>.session`.
pub const SESSION_NAME: &str = "exporter";
pub const CONFIG_FILE: &str = "config.yml";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    telegram: Option<TelegramConfig>,
    export: Option<ExportConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramConfig {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    api_id: Option<String>,
    api_hash: Option<String>,
    phone: Option<String>,
    session_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportConfig {
    batch_size: Option<usize>,
    limit: Option<i64>,
    output_dir: Option<PathBuf>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_id: i32,
    pub api_hash: String,
    pub phone: String,
    pub session_name: String,
    pub batch_size: usize,
    /// Raw limit from config; non-positive means unbounded
    pub limit: Option<i64>,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    pub fn new() -> Self {
        Self::load_from_file(CONFIG_FILE)
            .or_else(|_| Self::load_from_file(Path::new("..").join(CONFIG_FILE)))
            .unwrap_or_else(|_| Self::from_env())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> String {
        if let Some(ref v) = value {
            if let Some(var_name) = placeholder(v) {
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
            } else {
                return v.clone();
            }
        }
        std::env::var(env_key).unwrap_or_default()
    }

    /// Resolve an integer value from string config or env var
    fn resolve_env_i32(value: Option<String>, env_key: &str) -> i32 {
        Self::resolve_env_string(value, env_key)
            .trim()
            .parse()
            .unwrap_or(0)
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::load_dotenv();

        let yaml: YamlConfig = serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;
        Ok(Self::from_parts(
            yaml.telegram.unwrap_or_default(),
            yaml.export.unwrap_or_default(),
        ))
    }

    /// Configuration from environment variables only
    pub fn from_env() -> Self {
        Self::load_dotenv();
        Self::from_parts(TelegramConfig::default(), ExportConfig::default())
    }

    fn from_parts(telegram: TelegramConfig, export: ExportConfig) -> Self {
        Self {
            api_id: Self::resolve_env_i32(telegram.api_id, "TELEGRAM_API_ID"),
            api_hash: Self::resolve_env_string(telegram.api_hash, "TELEGRAM_API_HASH"),
            phone: Self::resolve_env_string(telegram.phone, "TELEGRAM_PHONE"),
            session_name: telegram
                .session_name
                .unwrap_or_else(|| SESSION_NAME.to_string()),
            batch_size: export
                .batch_size
                .filter(|b| *b > 0)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            limit: export.limit,
            output_dir: export.output_dir.unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// Create config with empty defaults (fallback)
    fn defaults() -> Self {
        Self {
            api_id: 0,
            api_hash: String::new(),
            phone: String::new(),
            session_name: SESSION_NAME.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            limit: None,
            output_dir: PathBuf::from("."),
        }
    }

    /// Session file for the configured API id
    pub fn session_file(&self) -> PathBuf {
        PathBuf::from(format!("{}_{}.session", self.session_name, self.api_id))
    }

    /// Lock file guarding the session file
    pub fn lock_file(&self) -> PathBuf {
        PathBuf::from(format!("{}_{}.lock", self.session_name, self.api_id))
    }

    /// Fail early when API credentials are missing
    pub fn validate(&self) -> Result<()> {
        if self.api_id == 0 {
            return Err(Error::ConfigError(
                "api_id is missing (use --api-id or TELEGRAM_API_ID)".to_string(),
            ));
        }
        if self.api_hash.is_empty() {
            return Err(Error::ConfigError(
                "api_hash is missing (use --api-hash or TELEGRAM_API_HASH)".to_string(),
            ));
        }
        Ok(())
    }
}

/// `${VAR}` -> `Some("VAR")`
fn placeholder(value: &str) -> Option<&str> {
    value.strip_prefix("${")?.strip_suffix('}')
}
