//! Auth service client: delegated-token exchange and service tokens.

use async_trait::async_trait;
use onboarding_shared::{AuthConfig, Credential, OnboardingError, Result};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::TokenExchange;
use crate::client::{RemoteClient, RemoteResponse, endpoint};

/// OAuth grant used to swap a caller's JWT for a scoped one.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";

const MISSING_TOKEN: &str = "OAuth token not provided";

const AUTHORIZATION_FAILED: &str = "Error authorizing access to the repository";

/// Scope string granting write access to `target`.
pub fn write_scope(target: &str) -> String {
    format!("write:{target}")
}

/// Pull the token out of an `Authorization` header value.
///
/// The last whitespace-separated part wins, so both `Bearer <t>` and a bare
/// `<t>` work.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?.split_whitespace().last()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

// ---------------------------------------------------------------------------
// AuthClient
// ---------------------------------------------------------------------------

/// Client for the auth service's token endpoint.
#[derive(Debug, Clone)]
pub struct AuthClient {
    remote: RemoteClient,
    config: AuthConfig,
}

impl AuthClient {
    pub fn new(remote: RemoteClient, config: AuthConfig) -> Self {
        Self { remote, config }
    }

    /// Obtain a token for this service itself (client-credentials grant).
    #[instrument(skip_all, fields(scope = %scope))]
    pub async fn service_token(&self, scope: &str) -> Result<Credential> {
        let response = self
            .request_token(&[("grant_type", CLIENT_CREDENTIALS_GRANT), ("scope", scope)])
            .await?;

        if !response.is_success() {
            error!(status = %response.status, "auth service refused service token");
            return Err(OnboardingError::service("Error obtaining a service token"));
        }
        parse_token(&response)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<RemoteResponse> {
        let url = endpoint(&self.config.url_auth, &["auth", "token"])?;
        let request = self
            .remote
            .request(Method::POST, url)
            .basic_auth(&self.config.service_id, Some(&self.config.client_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form);
        self.remote.send("auth", request).await
    }
}

#[async_trait]
impl TokenExchange for AuthClient {
    #[instrument(skip_all, fields(repository_id = %repository_id))]
    async fn exchange(&self, authorization: Option<&str>, repository_id: &str) -> Result<Credential> {
        let Some(token) = bearer_token(authorization) else {
            return Err(OnboardingError::unauthenticated(MISSING_TOKEN));
        };

        let scope = write_scope(repository_id);
        let response = self
            .request_token(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", token),
                ("scope", scope.as_str()),
            ])
            .await
            .map_err(|_| OnboardingError::service(AUTHORIZATION_FAILED))?;

        match response.status {
            s if s.is_success() => {
                let credential =
                    parse_token(&response).map_err(|_| OnboardingError::service(AUTHORIZATION_FAILED))?;
                info!("delegated token exchanged");
                Ok(credential)
            }
            StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN => {
                let messages: Vec<String> = response
                    .error_details()
                    .map(|details| details.into_iter().map(|d| d.message).collect())
                    .unwrap_or_else(|| vec![format!("Access to repository {repository_id} denied")]);
                warn!(status = %response.status, ?messages, "auth service denied token exchange");
                Err(OnboardingError::forbidden(messages))
            }
            status => {
                error!(
                    %status,
                    body = %String::from_utf8_lossy(&response.body),
                    "auth service failed during token exchange"
                );
                Err(OnboardingError::service(AUTHORIZATION_FAILED))
            }
        }
    }
}

fn parse_token(response: &RemoteResponse) -> Result<Credential> {
    let body: TokenResponse = response.json().map_err(|e| {
        error!(error = %e, "auth service returned an unreadable token response");
        OnboardingError::service("Malformed token response from the auth service")
    })?;
    Ok(Credential::new(body.access_token))
}
