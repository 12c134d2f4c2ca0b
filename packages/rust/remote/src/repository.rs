//! Repository service client: write (or withdraw) RDF for a repository.

use async_trait::async_trait;
use onboarding_shared::{Credential, OnboardingError, RDF_N3, Result, TransformResult};
use reqwest::{Method, StatusCode};
use tracing::{error, info, instrument, warn};

use crate::AssetStore;
use crate::client::{RemoteClient, endpoint};

/// Media type the repository service expects for asset RDF.
const RDF_N3_MEDIA_TYPE: &str = "text/rdf+n3";

/// Pushes transformed RDF to a repository service instance.
#[derive(Debug, Clone)]
pub struct RepositoryClient {
    remote: RemoteClient,
}

impl RepositoryClient {
    pub fn new(remote: RemoteClient) -> Self {
        Self { remote }
    }

    async fn push(
        &self,
        method: Method,
        result: &TransformResult,
        repository_url: &str,
        repository_id: &str,
        token: &Credential,
    ) -> Result<()> {
        let Some(rdf) = result.serialization(RDF_N3) else {
            error!("transformation output has no {RDF_N3} serialization");
            return Err(OnboardingError::service(format!(
                "Transformation output is missing {RDF_N3}"
            )));
        };

        let unreachable = || {
            OnboardingError::service(format!(
                "Repository service unreachable at {repository_url}"
            ))
        };

        let url = endpoint(
            repository_url,
            &["repository", "repositories", repository_id, "assets"],
        )
        .map_err(|_| unreachable())?;
        let request = self
            .remote
            .request(method.clone(), url)
            .bearer_auth(token.expose())
            .header(reqwest::header::CONTENT_TYPE, RDF_N3_MEDIA_TYPE)
            .header(reqwest::header::ACCEPT, "application/json")
            .body(rdf.to_string());
        // send() only fails on transport; name the instance we could not reach
        let response = self
            .remote
            .send("repository", request)
            .await
            .map_err(|_| unreachable())?;

        match response.status {
            s if s.is_success() => {
                info!(%method, bytes = rdf.len(), "repository accepted assets");
                Ok(())
            }
            StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN => {
                warn!(%method, status = %response.status, "repository rejected assets");
                let status = response.status.as_u16();
                Err(response.passthrough(|| format!("Repository service error {status}")))
            }
            s => {
                error!(
                    %method,
                    status = %s,
                    body = %String::from_utf8_lossy(&response.body),
                    "repository service failed"
                );
                Err(OnboardingError::service(format!(
                    "Repository service error {}",
                    s.as_u16()
                )))
            }
        }
    }
}

#[async_trait]
impl AssetStore for RepositoryClient {
    #[instrument(skip_all, fields(repository_id = %repository_id, repository_url = %repository_url))]
    async fn store(
        &self,
        result: &TransformResult,
        repository_url: &str,
        repository_id: &str,
        token: &Credential,
    ) -> Result<()> {
        self.push(Method::POST, result, repository_url, repository_id, token)
            .await
    }

    #[instrument(skip_all, fields(repository_id = %repository_id, repository_url = %repository_url))]
    async fn delete(
        &self,
        result: &TransformResult,
        repository_url: &str,
        repository_id: &str,
        token: &Credential,
    ) -> Result<()> {
        self.push(Method::DELETE, result, repository_url, repository_id, token)
            .await
    }
}
