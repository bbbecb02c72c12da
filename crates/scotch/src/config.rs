//! Context configuration
//!
//! The only setting the core needs is the base URL of the remote API. It can
//! be given programmatically or read from `SCOTCH_API_URL`.

use std::env;

use url::Url;

use crate::error::{ScotchError, ScotchResult};

/// Environment variable holding the remote API base URL
pub const API_URL_ENV: &str = "SCOTCH_API_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScotchConfig {
    /// Base URL of the remote API, without trailing slash
    pub api_url: Option<String>,
}

impl ScotchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL, stripping surrounding slashes
    pub fn with_api_url(mut self, api_url: impl AsRef<str>) -> Self {
        self.api_url = normalize_api_url(api_url.as_ref());
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> ScotchResult<Self> {
        let api_url = match env::var(API_URL_ENV) {
            Ok(value) => normalize_api_url(&value),
            Err(env::VarError::NotPresent) => None,
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ScotchError::configuration(format!(
                    "{} is not valid unicode",
                    API_URL_ENV
                )))
            }
        };

        let config = Self { api_url };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ScotchResult<()> {
        if let Some(api_url) = &self.api_url {
            let parsed = Url::parse(api_url)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ScotchError::configuration(format!(
                    "API URL '{}' must use http or https",
                    api_url
                )));
            }
        }
        Ok(())
    }

    /// Parse the base URL, failing if none was configured
    pub fn base_url(&self) -> ScotchResult<Url> {
        let api_url = self.api_url.as_deref().ok_or_else(|| {
            ScotchError::configuration(format!(
                "scotch context has no API URL; set one on the builder or through {}",
                API_URL_ENV
            ))
        })?;
        Ok(Url::parse(api_url)?)
    }
}

fn normalize_api_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
