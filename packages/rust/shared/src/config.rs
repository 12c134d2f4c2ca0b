//! Service configuration.
//!
//! The service reads a single TOML file (see [`AppConfig`]). Each component
//! receives only the slice it needs, built with `From<&AppConfig>` (or
//! `TryFrom` where a secret has to be resolved from the environment).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OnboardingError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "onboarding.toml";

// ---------------------------------------------------------------------------
// Config structs (matching onboarding.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,

    /// Request limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Hub key namespace.
    #[serde(default)]
    pub hub: HubConfig,

    /// Upstream service locations.
    #[serde(default)]
    pub services: ServicesConfig,

    /// Client credentials for the auth service.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8003
}

/// `[limits]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_post_body_size")]
    pub max_post_body_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_post_body_size: default_max_post_body_size(),
        }
    }
}

fn default_max_post_body_size() -> u64 {
    10 * 1024 * 1024
}

/// `[hub]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Resolver prefix of every hub key.
    #[serde(default = "default_resolver_id")]
    pub default_resolver_id: String,

    #[serde(default = "default_hub_id")]
    pub hub_id: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            default_resolver_id: default_resolver_id(),
            hub_id: default_hub_id(),
        }
    }
}

fn default_resolver_id() -> String {
    "https://openpermissions.org".into()
}
fn default_hub_id() -> String {
    "hub1".into()
}

/// `[services]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_url_auth")]
    pub url_auth: String,

    #[serde(default = "default_url_accounts")]
    pub url_accounts: String,

    #[serde(default = "default_url_transformation")]
    pub url_transformation: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            url_auth: default_url_auth(),
            url_accounts: default_url_accounts(),
            url_transformation: default_url_transformation(),
        }
    }
}

fn default_url_auth() -> String {
    "https://localhost:8007".into()
}
fn default_url_accounts() -> String {
    "https://localhost:8006".into()
}
fn default_url_transformation() -> String {
    "https://localhost:8005".into()
}

/// `[credentials]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Client id this service authenticates as.
    #[serde(default = "default_service_id")]
    pub service_id: String,

    /// Name of the env var holding the client secret (never store the secret itself).
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            service_id: default_service_id(),
            client_secret_env: default_client_secret_env(),
        }
    }
}

fn default_service_id() -> String {
    "onboarding".into()
}
fn default_client_secret_env() -> String {
    "ONBOARDING_CLIENT_SECRET".into()
}

// ---------------------------------------------------------------------------
// Component config (runtime slices of AppConfig)
// ---------------------------------------------------------------------------

/// Limits enforced on incoming payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_post_body_size: u64,
}

impl From<&AppConfig> for ValidationLimits {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_post_body_size: config.limits.max_post_body_size,
        }
    }
}

/// The namespace hub keys are minted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubIdentity {
    pub resolver_id: String,
    pub hub_id: String,
}

impl From<&AppConfig> for HubIdentity {
    fn from(config: &AppConfig) -> Self {
        Self {
            resolver_id: config.hub.default_resolver_id.clone(),
            hub_id: config.hub.hub_id.clone(),
        }
    }
}

/// Auth service location and this service's client credentials.
#[derive(Clone)]
pub struct AuthConfig {
    pub url_auth: String,
    pub service_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("url_auth", &self.url_auth)
            .field("service_id", &self.service_id)
            .finish_non_exhaustive()
    }
}

impl TryFrom<&AppConfig> for AuthConfig {
    type Error = OnboardingError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            url_auth: config.services.url_auth.clone(),
            service_id: config.credentials.service_id.clone(),
            client_secret: client_secret(config)?,
        })
    }
}

/// Transformation service location.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub url_transformation: String,
}

impl From<&AppConfig> for TransformConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            url_transformation: config.services.url_transformation.clone(),
        }
    }
}

/// Accounts service location.
#[derive(Debug, Clone)]
pub struct AccountsConfig {
    pub url_accounts: String,
}

impl From<&AppConfig> for AccountsConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            url_accounts: config.services.url_accounts.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the config from `path`. Returns defaults if the file does not exist.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| OnboardingError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        OnboardingError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Write a default config file to `path`, refusing to overwrite.
pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(OnboardingError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| OnboardingError::io(parent, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| OnboardingError::config(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| OnboardingError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

/// Reject configs the service cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    for (name, value) in [
        ("services.url_auth", &config.services.url_auth),
        ("services.url_accounts", &config.services.url_accounts),
        ("services.url_transformation", &config.services.url_transformation),
    ] {
        url::Url::parse(value)
            .map_err(|e| OnboardingError::config(format!("{name} '{value}' is not a URL: {e}")))?;
    }

    if config.hub.hub_id.is_empty() || config.hub.hub_id.contains('/') {
        return Err(OnboardingError::config(format!(
            "hub.hub_id '{}' must be a single non-empty path segment",
            config.hub.hub_id
        )));
    }

    Ok(())
}

/// Read the client secret from the env var named in the config.
pub fn client_secret(config: &AppConfig) -> Result<String> {
    let var_name = &config.credentials.client_secret_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(OnboardingError::config(format!(
            "client secret not found. Set the {var_name} environment variable."
        ))),
    }
}
