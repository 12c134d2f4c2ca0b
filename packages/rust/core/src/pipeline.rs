//! End-to-end onboarding: validate → exchange token → resolve repository →
//! transform → derive id-map → store.

use std::fmt;
use std::sync::Arc;

use onboarding_remote::{
    AccountsClient, AssetStore, AuthClient, RemoteClient, RepositoryClient, RepositoryDirectory,
    TokenExchange, TransformClient, Transformer,
};
use onboarding_shared::{
    AppConfig, AuthConfig, ErrorDetail, HubIdentity, IdMap, OnboardingError, Result,
    ValidationLimits,
};
use tracing::{info, instrument, warn};

use crate::validation::{Violation, validate};

/// One inbound onboarding call, as read off the wire.
#[derive(Debug, Clone, Default)]
pub struct OnboardingRequest {
    pub repository_id: String,
    /// `Content-Type` header as sent, parameters included.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Declared or measured body size; may exceed `body.len()` when the body
    /// was not read because it was already too large.
    pub body_length: u64,
    /// Optional R2RML mapping to hand to the transformation service.
    pub mapping_url: Option<String>,
    /// Raw `Authorization` header.
    pub authorization: Option<String>,
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    ExchangeToken,
    ResolveRepository,
    Transform,
    DeriveIdMap,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::ExchangeToken => "exchange_token",
            Self::ResolveRepository => "resolve_repository",
            Self::Transform => "transform",
            Self::DeriveIdMap => "derive_id_map",
            Self::Store => "store",
        };
        f.write_str(name)
    }
}

/// What the caller gets back.
///
/// `data` can be non-empty on failure: a store rejection still reports the
/// identifiers that were derived.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub status: u16,
    pub data: IdMap,
    pub errors: Vec<ErrorDetail>,
    pub failed_stage: Option<Stage>,
}

impl PipelineOutcome {
    fn success(data: IdMap) -> Self {
        Self {
            status: 200,
            data,
            errors: Vec::new(),
            failed_stage: None,
        }
    }

    fn failed(stage: Stage, err: &OnboardingError, data: IdMap) -> Self {
        warn!(%stage, status = err.status(), error = %err, "onboarding stage failed");
        Self {
            status: err.status(),
            data,
            errors: err.details(),
            failed_stage: Some(stage),
        }
    }

    fn rejected(violations: &[Violation]) -> Self {
        let status = violations.first().map_or(400, Violation::status);
        warn!(status, violations = violations.len(), "payload rejected");
        Self {
            status,
            data: IdMap::new(),
            errors: violations.iter().map(Violation::to_detail).collect(),
            failed_stage: Some(Stage::Validate),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed_stage.is_none()
    }
}

/// The remote collaborators a pipeline run talks to.
#[derive(Clone)]
pub struct Backends {
    pub tokens: Arc<dyn TokenExchange>,
    pub directory: Arc<dyn RepositoryDirectory>,
    pub transformer: Arc<dyn Transformer>,
    pub store: Arc<dyn AssetStore>,
}

impl Backends {
    /// Wire the HTTP clients for every peer service named in `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let remote = RemoteClient::new()?;
        let auth = AuthClient::new(remote.clone(), AuthConfig::try_from(config)?);

        Ok(Self {
            tokens: Arc::new(auth.clone()),
            directory: Arc::new(AccountsClient::new(remote.clone(), config.into())),
            transformer: Arc::new(TransformClient::new(remote.clone(), auth, config.into())),
            store: Arc::new(RepositoryClient::new(remote)),
        })
    }
}

/// Runs onboarding requests. Cheap to clone and share across tasks.
#[derive(Clone)]
pub struct Onboarder {
    limits: ValidationLimits,
    identity: HubIdentity,
    backends: Backends,
}

impl Onboarder {
    pub fn new(limits: ValidationLimits, identity: HubIdentity, backends: Backends) -> Self {
        Self {
            limits,
            identity,
            backends,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            config.into(),
            config.into(),
            Backends::from_config(config)?,
        ))
    }

    pub fn limits(&self) -> ValidationLimits {
        self.limits
    }

    pub fn identity(&self) -> &HubIdentity {
        &self.identity
    }

    /// Run one request through every stage, stopping at the first failure.
    ///
    /// Never returns an error: failures are folded into the outcome.
    #[instrument(
        skip_all,
        fields(
            request_id = %uuid::Uuid::now_v7(),
            repository_id = %request.repository_id,
        )
    )]
    pub async fn onboard(&self, request: OnboardingRequest) -> PipelineOutcome {
        let OnboardingRequest {
            repository_id,
            content_type,
            body,
            body_length,
            mapping_url,
            authorization,
        } = request;

        let violations = validate(content_type.as_deref(), body_length, &self.limits);
        if !violations.is_empty() {
            return PipelineOutcome::rejected(&violations);
        }
        let content_type = content_type.unwrap_or_default();

        let token = match self
            .backends
            .tokens
            .exchange(authorization.as_deref(), &repository_id)
            .await
        {
            Ok(token) => token,
            Err(e) => return PipelineOutcome::failed(Stage::ExchangeToken, &e, IdMap::new()),
        };

        let repository_url = match self.backends.directory.location(&repository_id).await {
            Ok(url) => url,
            Err(e) => return PipelineOutcome::failed(Stage::ResolveRepository, &e, IdMap::new()),
        };

        let result = match self
            .backends
            .transformer
            .transform(body, &content_type, mapping_url.as_deref())
            .await
        {
            Ok(result) => result,
            Err(e) => return PipelineOutcome::failed(Stage::Transform, &e, IdMap::new()),
        };

        let id_map = match &result.id_map {
            Some(precomputed) => precomputed.clone(),
            None => onboarding_idmap::derive(&result, &repository_id, &self.identity),
        };

        if let Err(e) = self
            .backends
            .store
            .store(&result, &repository_url, &repository_id, &token)
            .await
        {
            return PipelineOutcome::failed(Stage::Store, &e, id_map);
        }

        info!(assets = id_map.len(), "assets onboarded");
        PipelineOutcome::success(id_map)
    }
}
