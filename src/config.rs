use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upper bound for a single acme-dns round trip.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,  // 访问密钥，用于鉴权（可选）
    #[serde(flatten)]
    pub account: AcmeDnsConfig,
}

/// Credentials of one acme-dns registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AcmeDnsConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub subdomain: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[server]
port = 8053
log_level = "debug"

[[providers]]
name = "home"
key = "relay-secret"
endpoint = "https://auth.acme-dns.io"
username = "eabcdb41-d89f-4580-826f-3e62e9755ef2"
password = "pbAXVjlIOE01xbut7YnAbkhMQIkcwoHO0ek2j4Q0"
subdomain = "d420c923-bbd7-4056-ab64-c3ca54c9b3cf"

[[providers]]
name = "lab"
endpoint = "http://127.0.0.1:8080/"
username = "u"
password = "p"
subdomain = "s"
"#;

    #[test]
    fn test_parse_providers() {
        let config = Config::parse(SAMPLE).unwrap();

        assert_eq!(config.providers.len(), 2);
        let home = config.get_provider("home").unwrap();
        assert_eq!(home.key.as_deref(), Some("relay-secret"));
        assert_eq!(home.account.endpoint, "https://auth.acme-dns.io");
        assert_eq!(home.account.subdomain, "d420c923-bbd7-4056-ab64-c3ca54c9b3cf");

        let lab = config.get_provider("lab").unwrap();
        assert!(lab.key.is_none());
        assert_eq!(lab.account.username, "u");

        assert!(config.get_provider("missing").is_none());
    }

    #[test]
    fn test_server_defaults() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8053);
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));

        let bare = Config::parse("providers = []").unwrap();
        assert_eq!(bare.server.port, 3000);
        assert_eq!(bare.server.log_level, "info");
    }

    #[test]
    fn test_missing_credentials_fail() {
        let result = Config::parse(
            r#"
[[providers]]
name = "broken"
endpoint = "https://auth.acme-dns.io"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/acme-dns.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
