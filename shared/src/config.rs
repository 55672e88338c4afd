use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::{AppError, ErrorKind, DEFAULT_MAP_BASE_URL, DEFAULT_STORAGE_BUCKET};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration document: {0}")]
    Malformed(String),
    #[error("invalid {field} '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}

fn default_bucket() -> String {
    DEFAULT_STORAGE_BUCKET.to_string()
}

fn default_map_base_url() -> String {
    DEFAULT_MAP_BASE_URL.to_string()
}

/// Connection settings for the hosted backend, handed over by the shell.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub project_url: String,
    pub anon_key: String,
    #[serde(default = "default_bucket")]
    pub storage_bucket: String,
    #[serde(default = "default_map_base_url")]
    pub map_base_url: String,
}

// The anon key is public-ish but has no business in logs.
impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("project_url", &self.project_url)
            .field("anon_key_present", &!self.anon_key.is_empty())
            .field("storage_bucket", &self.storage_bucket)
            .field("map_base_url", &self.map_base_url)
            .finish()
    }
}

impl BackendConfig {
    pub fn new(project_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            project_url: project_url.into(),
            anon_key: anon_key.into(),
            storage_bucket: default_bucket(),
            map_base_url: default_map_base_url(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    pub fn project_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("project_url", &self.project_url)
    }

    pub fn map_base_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("map_base_url", &self.map_base_url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.project_url()?;
        self.map_base_url()?;
        if self.anon_key.trim().is_empty() {
            return Err(ConfigError::Empty("anon_key"));
        }
        if self.storage_bucket.trim().is_empty() {
            return Err(ConfigError::Empty("storage_bucket"));
        }
        Ok(())
    }
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_applies_defaults() {
        let config = BackendConfig::from_json(
            r#"{"project_url":"https://abc.supabase.co","anon_key":"anon"}"#,
        )
        .unwrap();

        assert_eq!(config.storage_bucket, "uploads");
        assert_eq!(config.map_base_url, "https://www.google.com/maps");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            BackendConfig::from_json("{"),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_urls() {
        let config = BackendConfig::new("ftp://abc.supabase.co", "anon");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { field: "project_url", .. })
        ));

        let config = BackendConfig::new("not a url", "anon");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_key_and_bucket() {
        let config = BackendConfig::new("https://abc.supabase.co", "  ");
        assert_eq!(config.validate(), Err(ConfigError::Empty("anon_key")));

        let mut config = BackendConfig::new("https://abc.supabase.co", "anon");
        config.storage_bucket = String::new();
        assert_eq!(config.validate(), Err(ConfigError::Empty("storage_bucket")));
    }

    #[test]
    fn debug_hides_anon_key() {
        let config = BackendConfig::new("https://abc.supabase.co", "super-secret-key");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("anon_key_present: true"));
    }
}
