//! Shared types, error model, and configuration for the onboarding service.
//!
//! This crate is the foundation depended on by all other onboarding crates.
//! It provides:
//! - [`OnboardingError`]: the unified error type
//! - Domain types ([`AssetRecord`], [`IdMap`], [`TransformResult`], [`Credential`])
//! - Configuration ([`AppConfig`] and the per-component slices)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AccountsConfig, AppConfig, AuthConfig, CONFIG_FILE_NAME, CredentialsConfig, HubConfig,
    HubIdentity, LimitsConfig, ServerConfig, ServicesConfig, TransformConfig, ValidationLimits,
    client_secret, init_config, load_config, validate_config,
};
pub use error::{AUTHENTICATION_SOURCE, GENERIC_SERVER_ERROR, OnboardingError, Result};
pub use types::{
    ASSET_ENTITY_TYPE, AssetRecord, Credential, ErrorDetail, ID_MAP, IdMap, RDF_N3, SourceId,
    TransformResult,
};
