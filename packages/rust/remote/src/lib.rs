//! Clients for the services the onboarding pipeline depends on.
//!
//! This crate provides:
//! - [`RemoteClient`]: the shared HTTP adapter every outbound call goes through
//! - [`AuthClient`]: delegated-token exchange and service tokens
//! - [`AccountsClient`]: repository id → repository service location
//! - [`TransformClient`]: raw payload → RDF serializations
//! - [`RepositoryClient`]: store/delete RDF in a repository
//!
//! Each client sits behind a trait so the pipeline can be driven by fakes.

mod accounts;
mod auth;
mod client;
mod repository;
mod transform;

use async_trait::async_trait;
use onboarding_shared::{Credential, Result, TransformResult};

pub use accounts::AccountsClient;
pub use auth::{AuthClient, bearer_token, write_scope};
pub use client::{REMOTE_TIMEOUT, RemoteClient, RemoteResponse, endpoint};
pub use repository::RepositoryClient;
pub use transform::TransformClient;

/// Swaps a caller's delegated credential for a repository-scoped one.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// `authorization` is the raw `Authorization` header value, if any.
    async fn exchange(&self, authorization: Option<&str>, repository_id: &str)
    -> Result<Credential>;
}

/// Resolves a repository id to the base URL of its repository service.
#[async_trait]
pub trait RepositoryDirectory: Send + Sync {
    async fn location(&self, repository_id: &str) -> Result<String>;
}

/// Turns raw source data into RDF.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(
        &self,
        payload: Vec<u8>,
        content_type: &str,
        mapping_url: Option<&str>,
    ) -> Result<TransformResult>;
}

/// Writes transformed RDF to a repository, or withdraws it again.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn store(
        &self,
        result: &TransformResult,
        repository_url: &str,
        repository_id: &str,
        token: &Credential,
    ) -> Result<()>;

    /// Remove previously stored RDF. Used to compensate a partial onboarding.
    async fn delete(
        &self,
        result: &TransformResult,
        repository_url: &str,
        repository_id: &str,
        token: &Credential,
    ) -> Result<()>;
}
