//! HTTP surface: router construction and handlers.

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use onboarding_core::{OnboardingRequest, Onboarder, PipelineOutcome};
use onboarding_shared::{AppConfig, ErrorDetail, GENERIC_SERVER_ERROR};
use http_body_util::LengthLimitError;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, warn};

const SERVICE_NAME: &str = "Open Permissions Platform Onboarding Service";

const UNREADABLE_BODY: &str = "Could not read request body";

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub(crate) struct AppState {
    onboarder: Onboarder,
    service_id: String,
}

impl AppState {
    pub(crate) fn new(onboarder: Onboarder, config: &AppConfig) -> Self {
        Self {
            onboarder,
            service_id: config.credentials.service_id.clone(),
        }
    }
}

/// Build the full axum router with all routes and middleware.
pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_status))
        .route("/capabilities", get(capabilities))
        .route("/repositories/{repository_id}/assets", post(onboard_assets))
        // size is enforced by validation so oversized bodies get our error shape
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct Envelope<T> {
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<ErrorDetail>>,
    data: T,
}

fn reply<T: Serialize>(status: u16, errors: Option<Vec<ErrorDetail>>, data: T) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        code,
        Json(Envelope {
            status,
            errors,
            data,
        }),
    )
        .into_response()
}

fn client_error(status: StatusCode, message: impl Into<String>) -> Response {
    reply(
        status.as_u16(),
        Some(vec![ErrorDetail::new(message)]),
        Vec::<()>::new(),
    )
}

fn outcome_response(outcome: PipelineOutcome) -> Response {
    if outcome.is_success() {
        reply(outcome.status, None, outcome.data)
    } else {
        reply(outcome.status, Some(outcome.errors), outcome.data)
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ServiceStatus<'a> {
    service_name: &'a str,
    version: &'a str,
    service_id: &'a str,
    default_resolver_id: &'a str,
    hub_id: &'a str,
}

/// GET /: who and what this instance is.
async fn service_status(State(state): State<AppState>) -> Response {
    let identity = state.onboarder.identity();
    reply(
        200,
        None,
        ServiceStatus {
            service_name: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            service_id: &state.service_id,
            default_resolver_id: &identity.resolver_id,
            hub_id: &identity.hub_id,
        },
    )
}

#[derive(Debug, Serialize)]
struct Capabilities {
    max_post_body_size: u64,
}

/// GET /capabilities: limits a client should respect before uploading.
async fn capabilities(State(state): State<AppState>) -> Response {
    reply(
        200,
        None,
        Capabilities {
            max_post_body_size: state.onboarder.limits().max_post_body_size,
        },
    )
}

#[derive(Debug, Deserialize)]
struct OnboardQuery {
    r2rml_url: Option<String>,
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// True when reading stopped because the body outgrew the read limit.
fn exceeded_limit(err: &axum::Error) -> bool {
    std::error::Error::source(err).is_some_and(|source| source.is::<LengthLimitError>())
}

/// POST /repositories/{repository_id}/assets: onboard a CSV or JSON payload.
async fn onboard_assets(
    State(state): State<AppState>,
    Path(repository_id): Path<String>,
    query: Result<Query<OnboardQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            warn!(error = %rejection, "rejecting malformed query string");
            return client_error(rejection.status(), rejection.body_text());
        }
    };

    let limit = state.onboarder.limits().max_post_body_size;
    let declared_length = header_str(&headers, header::CONTENT_LENGTH)
        .and_then(|v| v.trim().parse::<u64>().ok());

    // Oversized bodies are never buffered; validation only needs the length.
    let (body, body_length) = match declared_length {
        Some(length) if length > limit => (Vec::new(), length),
        _ => {
            let read_limit = usize::try_from(limit.saturating_add(1)).unwrap_or(usize::MAX);
            match axum::body::to_bytes(body, read_limit).await {
                Ok(bytes) => {
                    let length = bytes.len() as u64;
                    (bytes.to_vec(), length)
                }
                Err(e) if exceeded_limit(&e) => {
                    debug!(error = %e, "request body exceeded limit while reading");
                    (Vec::new(), limit.saturating_add(1))
                }
                Err(e) => {
                    warn!(error = %e, "could not read request body");
                    return client_error(StatusCode::BAD_REQUEST, UNREADABLE_BODY);
                }
            }
        }
    };

    let request = OnboardingRequest {
        repository_id,
        content_type: header_str(&headers, header::CONTENT_TYPE),
        body,
        body_length,
        mapping_url: query.r2rml_url,
        authorization: header_str(&headers, header::AUTHORIZATION),
    };

    // Run detached so a dropped client connection does not abort remote legs.
    let onboarder = state.onboarder.clone();
    match tokio::spawn(async move { onboarder.onboard(request).await }).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => {
            error!(error = %e, "onboarding task did not complete");
            client_error(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_SERVER_ERROR)
        }
    }
}
