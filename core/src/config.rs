//! Client configuration.

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable read by `ClientConfig::from_env`.
pub const BASE_URL_VAR: &str = "API_BASE_URL";

/// Where the client sends its requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct ClientConfig {
    base_url: String,
}

#[derive(Deserialize)]
struct RawConfig {
    base_url: String,
}

impl TryFrom<RawConfig> for ClientConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        ClientConfig::new(&raw.base_url)
    }
}

impl ClientConfig {
    /// Validate `base_url` and strip trailing slashes.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let host = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"));
        match host {
            Some(host) if !host.is_empty() => Ok(Self {
                base_url: trimmed.to_string(),
            }),
            _ => Err(ConfigError::InvalidBaseUrl(base_url.to_string())),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var(BASE_URL_VAR).map_err(|_| ConfigError::MissingVar(BASE_URL_VAR))?;
        Self::new(&base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `path` appended to the base URL. `path` should start with `/`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("http://localhost:3000/").unwrap();
        assert_eq!(config.base_url(), "http://localhost:3000");
        assert_eq!(config.url_for("/items"), "http://localhost:3000/items");
    }

    #[test]
    fn rejects_urls_without_scheme_or_host() {
        assert!(matches!(
            ClientConfig::new("localhost:3000"),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
        assert!(matches!(ClientConfig::new("https://"), Err(ConfigError::InvalidBaseUrl(_))));
    }

    #[test]
    fn deserializes_through_validation() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"https://api.example.com/v1/"}"#).unwrap();
        assert_eq!(config.base_url(), "https://api.example.com/v1");

        let bad: Result<ClientConfig, _> = serde_json::from_str(r#"{"base_url":"ftp://x"}"#);
        assert!(bad.is_err());
    }
}
