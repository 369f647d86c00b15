use redactline_pii::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub uploads: UploadConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub detector: DetectorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted upload, in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// How long an uploaded document stays retrievable
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logging: LoggingConfig::default(),
            uploads: UploadConfig::default(),
            store: StoreConfig::default(),
            export: ExportConfig::default(),
            detector: DetectorConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_documents: default_max_documents(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("REDACTLINE_HOST") {
            self.host = val;
        }

        if let Some(port) = env_override("REDACTLINE_PORT") {
            self.port = port;
        }

        if let Ok(val) = std::env::var("REDACTLINE_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("REDACTLINE_LOG_FORMAT") {
            match val.to_lowercase().as_str() {
                "text" => self.logging.format = LogFormat::Text,
                "json" => self.logging.format = LogFormat::Json,
                _ => eprintln!("Warning: Invalid REDACTLINE_LOG_FORMAT '{}', ignoring", val),
            }
        }

        if let Some(size) = env_override("REDACTLINE_MAX_FILE_SIZE") {
            self.uploads.max_file_size = size;
        }

        if let Some(ttl) = env_override("REDACTLINE_STORE_TTL_SECS") {
            self.store.ttl_secs = ttl;
        }

        if let Ok(val) = std::env::var("REDACTLINE_OUTPUT_DIR") {
            self.export.output_dir = val;
        }
    }
}

/// Read and parse a numeric override, warning on stderr when it is invalid.
///
/// Runs before logging is installed, hence `eprintln!`.
fn env_override<T: FromStr>(name: &str) -> Option<T> {
    let val = std::env::var(name).ok()?;
    parse_override(name, &val)
}

fn parse_override<T: FromStr>(name: &str, val: &str) -> Option<T> {
    match val.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            eprintln!("Warning: Invalid {} '{}', ignoring", name, val);
            None
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_file_size() -> usize {
    50 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["txt".to_string(), "pdf".to_string()]
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_max_documents() -> usize {
    1000
}

fn default_output_dir() -> String {
    "./redacted".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use redactline_pii::PIIType;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.uploads.max_file_size, 50 * 1024 * 1024);
        assert_eq!(config.uploads.allowed_extensions, vec!["txt", "pdf"]);
        assert_eq!(config.store.ttl_secs, 3600);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "port: 8088\nlogging:\n  level: debug\n  format: json\ndetector:\n  disabled_types: [name]\n"
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 8088);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.detector.disabled_types, vec![PIIType::Name]);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "host = \"0.0.0.0\"\n\n[store]\nttl_secs = 60\n\n[uploads]\nallowed_extensions = [\"txt\", \"md\"]\n"
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.store.ttl_secs, 60);
        assert_eq!(config.store.max_documents, 1000);
        assert_eq!(config.uploads.allowed_extensions, vec!["txt", "md"]);
    }

    #[test]
    fn test_from_missing_file() {
        let result = ServerConfig::from_file("/nonexistent/redactline.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    #[serial_test::serial]
    fn test_merge_env_overrides() {
        unsafe {
            std::env::set_var("REDACTLINE_PORT", "9191");
            std::env::set_var("REDACTLINE_LOG_FORMAT", "JSON");
            std::env::set_var("REDACTLINE_STORE_TTL_SECS", "not-a-number");
        }

        let mut config = ServerConfig::default();
        config.merge_env();

        unsafe {
            std::env::remove_var("REDACTLINE_PORT");
            std::env::remove_var("REDACTLINE_LOG_FORMAT");
            std::env::remove_var("REDACTLINE_STORE_TTL_SECS");
        }

        assert_eq!(config.port, 9191);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.store.ttl_secs, 3600);
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_numeric_env_is_ignored() {
        unsafe {
            std::env::set_var("REDACTLINE_MAX_FILE_SIZE", "10MB");
            std::env::set_var("REDACTLINE_PORT", "99999");
        }

        let mut config = ServerConfig::default();
        config.merge_env();

        unsafe {
            std::env::remove_var("REDACTLINE_MAX_FILE_SIZE");
            std::env::remove_var("REDACTLINE_PORT");
        }

        assert_eq!(config.uploads.max_file_size, 50 * 1024 * 1024);
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(parse_override::<usize>("REDACTLINE_MAX_FILE_SIZE", " 1024 "), Some(1024));
        assert_eq!(parse_override::<usize>("REDACTLINE_MAX_FILE_SIZE", "10MB"), None);
        assert_eq!(parse_override::<u64>("REDACTLINE_STORE_TTL_SECS", "-5"), None);
        assert_eq!(parse_override::<u16>("REDACTLINE_PORT", "70000"), None);
    }
}
