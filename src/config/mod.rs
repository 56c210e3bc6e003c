/*!
Process configuration.

Loaded once at startup from a JSON file and read-only afterwards. The
compiler core never consults it; only the optional HTTP facade and debug
logging do. The `redis` and `es` sections are accepted for compatibility
with existing deployments but nothing in this process reads them.
*/

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GlobalConfig {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub es: Option<EsConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HttpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub listen: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub server: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, rename = "indexPrefix")]
    pub index_prefix: String,
    #[serde(default, rename = "indexSuffix")]
    pub index_suffix: String,
}

/// Errors while loading the configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "failed to read config file: {}", err),
            ConfigError::Parse(err) => write!(f, "failed to parse config file: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Load configuration from a JSON file.
pub fn load(path: &Path) -> Result<GlobalConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let cfg: GlobalConfig = serde_json::from_str(&content)?;
    Ok(cfg)
}

impl fmt::Display for GlobalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "debug={} http.enabled={} http.listen={}",
            self.debug, self.http.enabled, self.http.listen
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_sections() {
        let cfg: GlobalConfig = serde_json::from_str("{}").unwrap();
        assert!(!cfg.debug);
        assert!(!cfg.http.enabled);
        assert!(cfg.redis.is_none());
    }

    #[test]
    fn full_config_parses() {
        let cfg: GlobalConfig = serde_json::from_str(
            r#"{
                "debug": true,
                "http": {"enabled": true, "listen": "0.0.0.0:9200"},
                "redis": {"enabled": false, "server": "localhost:6379"},
                "es": {"enabled": true, "indexPrefix": "logs-", "indexSuffix": ""}
            }"#,
        )
        .unwrap();
        assert!(cfg.debug);
        assert_eq!(cfg.http.listen, "0.0.0.0:9200");
        assert_eq!(cfg.es.unwrap().index_prefix, "logs-");
    }
}
