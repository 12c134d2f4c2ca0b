//! Accounts service client: where does a repository live?

use async_trait::async_trait;
use onboarding_shared::{AccountsConfig, OnboardingError, Result};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, instrument};

use crate::RepositoryDirectory;
use crate::client::{RemoteClient, endpoint};

const REPOSITORY_NOT_FOUND: &str = "Cannot find a repository";

#[derive(Debug, Deserialize)]
struct RepositoryEnvelope {
    data: RepositoryData,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    service: RepositoryService,
}

#[derive(Debug, Deserialize)]
struct RepositoryService {
    location: String,
}

/// Looks repositories up in the accounts service.
#[derive(Debug, Clone)]
pub struct AccountsClient {
    remote: RemoteClient,
    config: AccountsConfig,
}

impl AccountsClient {
    pub fn new(remote: RemoteClient, config: AccountsConfig) -> Self {
        Self { remote, config }
    }
}

#[async_trait]
impl RepositoryDirectory for AccountsClient {
    #[instrument(skip_all, fields(repository_id = %repository_id))]
    async fn location(&self, repository_id: &str) -> Result<String> {
        let url = endpoint(
            &self.config.url_accounts,
            &["accounts", "repositories", repository_id],
        )?;
        let request = self
            .remote
            .request(Method::GET, url)
            .header(reqwest::header::ACCEPT, "application/json");
        let response = self.remote.send("accounts", request).await?;

        match response.status {
            s if s.is_success() => {
                let envelope: RepositoryEnvelope = response.json().map_err(|e| {
                    debug!(error = %e, "repository record has no service location");
                    OnboardingError::not_found(REPOSITORY_NOT_FOUND)
                })?;
                debug!(location = %envelope.data.service.location, "resolved repository");
                Ok(envelope.data.service.location)
            }
            StatusCode::NOT_FOUND => Err(OnboardingError::not_found(REPOSITORY_NOT_FOUND)),
            s if s.is_client_error() => {
                Err(response.passthrough(|| format!("Accounts service error {}", s.as_u16())))
            }
            s => {
                error!(status = %s, "accounts service failed");
                Err(OnboardingError::service(format!(
                    "Accounts service error {}",
                    s.as_u16()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> AccountsClient {
        AccountsClient::new(
            RemoteClient::new().unwrap(),
            AccountsConfig {
                url_accounts: server.uri(),
            },
        )
    }

    #[tokio::test]
    async fn resolves_service_location() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/accounts/repositories/repo1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 200,
                "data": {
                    "id": "repo1",
                    "name": "my repo",
                    "service": {"id": "svc1", "location": "https://repo.example.com:8004"},
                },
            })))
            .mount(&server)
            .await;

        let location = client_for(&server).location("repo1").await.unwrap();
        assert_eq!(location, "https://repo.example.com:8004");
    }

    #[tokio::test]
    async fn record_without_location_is_404() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/accounts/repositories/repo1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"id": "repo1"}})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).location("repo1").await.unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.details()[0].message, REPOSITORY_NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_repository_is_404() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/accounts/repositories/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server).location("nope").await.unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn accounts_outage_is_500() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client_for(&server).location("repo1").await.unwrap_err();
        assert_eq!(err.status(), 500);
    }
}
