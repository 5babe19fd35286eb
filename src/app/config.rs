use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::models::catalog::ClassItem;
use crate::models::principal::Role;

pub const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
pub const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid callback URL {url:?}: {source}")]
    CallbackUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayEnvironment {
    Sandbox,
    #[default]
    Production,
}

impl GatewayEnvironment {
    /// Unknown values fall back to production, as the gateway operators expect.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "sandbox" => GatewayEnvironment::Sandbox,
            "production" => GatewayEnvironment::Production,
            other => {
                warn!(
                    mpesa_env = other,
                    "Unknown MPESA_ENV, defaulting to production gateway URLs"
                );
                GatewayEnvironment::Production
            }
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            GatewayEnvironment::Sandbox => SANDBOX_BASE_URL,
            GatewayEnvironment::Production => PRODUCTION_BASE_URL,
        }
    }
}

/// Gateway settings injected into the client at construction.
///
/// Every credential is optional here: a missing value is reported when a push is
/// attempted, not at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MpesaConfig {
    pub environment: GatewayEnvironment,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub short_code: Option<String>,
    pub passkey: Option<String>,
    pub callback_url: Option<String>,
    /// Overrides the environment base URL, e.g. to point at a fake gateway.
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for MpesaConfig {
    fn default() -> Self {
        Self {
            environment: GatewayEnvironment::default(),
            consumer_key: None,
            consumer_secret: None,
            short_code: None,
            passkey: None,
            callback_url: None,
            base_url: None,
            timeout_ms: 5000,
        }
    }
}

impl MpesaConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
            .trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSeed {
    pub token: String,
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_port: u16,
    pub mpesa: MpesaConfig,
    pub classes: Vec<ClassItem>,
    pub sessions: Vec<SessionSeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 5001,
            mpesa: MpesaConfig::default(),
            classes: Vec::new(),
            sessions: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads the optional file, then lets environment variables win.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(port) = env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server_port = port;
        }
        if let Ok(value) = env::var("MPESA_ENV") {
            self.mpesa.environment = GatewayEnvironment::parse(&value);
        }

        let mpesa = &mut self.mpesa;
        override_from_env(&mut mpesa.consumer_key, "MPESA_CONSUMER_KEY");
        override_from_env(&mut mpesa.consumer_secret, "MPESA_CONSUMER_SECRET");
        override_from_env(&mut mpesa.short_code, "MPESA_SHORTCODE");
        override_from_env(&mut mpesa.passkey, "MPESA_PASSKEY");
        override_from_env(&mut mpesa.callback_url, "MPESA_CALLBACK_URL");
        override_from_env(&mut mpesa.base_url, "MPESA_BASE_URL");

        if let Some(timeout) = env::var("MPESA_TIMEOUT_MS").ok().and_then(|t| t.parse().ok()) {
            mpesa.timeout_ms = timeout;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(callback_url) = &self.mpesa.callback_url {
            url::Url::parse(callback_url).map_err(|source| ConfigError::CallbackUrl {
                url: callback_url.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

fn override_from_env(slot: &mut Option<String>, key: &str) {
    if let Ok(value) = env::var(key) {
        let value = value.trim();
        if !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }
}
