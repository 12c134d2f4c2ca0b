//! Transformation service client: raw CSV/JSON in, RDF serializations out.

use std::collections::BTreeMap;

use async_trait::async_trait;
use onboarding_shared::{
    GENERIC_SERVER_ERROR, ID_MAP, IdMap, OnboardingError, Result, TransformConfig, TransformResult,
};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::Transformer;
use crate::auth::{AuthClient, write_scope};
use crate::client::{RemoteClient, endpoint};

#[derive(Debug, Deserialize)]
struct TransformBody {
    data: serde_json::Map<String, serde_json::Value>,
}

/// Posts source data to the transformation service.
#[derive(Debug, Clone)]
pub struct TransformClient {
    remote: RemoteClient,
    auth: AuthClient,
    config: TransformConfig,
}

impl TransformClient {
    pub fn new(remote: RemoteClient, auth: AuthClient, config: TransformConfig) -> Self {
        Self {
            remote,
            auth,
            config,
        }
    }
}

#[async_trait]
impl Transformer for TransformClient {
    #[instrument(skip_all, fields(content_type = %content_type, bytes = payload.len()))]
    async fn transform(
        &self,
        payload: Vec<u8>,
        content_type: &str,
        mapping_url: Option<&str>,
    ) -> Result<TransformResult> {
        let token = self
            .auth
            .service_token(&write_scope(&self.config.url_transformation))
            .await
            .map_err(|e| {
                error!(error = %e, "could not get a token for the transformation service");
                OnboardingError::service(GENERIC_SERVER_ERROR)
            })?;

        let mut url = endpoint(&self.config.url_transformation, &["transformation", "assets"])?;
        if let Some(mapping_url) = mapping_url {
            url.query_pairs_mut().append_pair("r2rml_url", mapping_url);
        }

        let request = self
            .remote
            .request(Method::POST, url)
            .bearer_auth(token.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(payload);
        let response = self.remote.send("transformation", request).await?;

        if !response.is_success() {
            warn!(
                status = %response.status,
                body = %String::from_utf8_lossy(&response.body),
                "transformation service rejected payload"
            );
            let status = response.status.as_u16();
            return Err(response.passthrough(|| format!("Transformation service error {status}")));
        }

        let body: TransformBody = response.json().map_err(|e| {
            error!(error = %e, "transformation service returned an unreadable body");
            OnboardingError::service("Malformed response from the transformation service")
        })?;

        let result = into_result(response.status.as_u16(), body);
        info!(
            serializations = result.outputs.len(),
            precomputed_id_map = result.id_map.is_some(),
            "payload transformed"
        );
        Ok(result)
    }
}

/// Sort the `data` entries into serializations and an optional id-map.
fn into_result(status: u16, body: TransformBody) -> TransformResult {
    let mut outputs = BTreeMap::new();
    let mut id_map = None;

    for (name, value) in body.data {
        if name == ID_MAP {
            match serde_json::from_value::<IdMap>(value) {
                Ok(map) => id_map = Some(map),
                Err(e) => warn!(error = %e, "ignoring unreadable id_map from transformation"),
            }
            continue;
        }

        match value {
            serde_json::Value::String(text) => {
                outputs.insert(name, text);
            }
            serde_json::Value::Array(parts) => {
                let lines: Vec<&str> = parts.iter().filter_map(|p| p.as_str()).collect();
                outputs.insert(name, lines.join("\n"));
            }
            other => debug!(%name, kind = ?other, "skipping non-text transformation output"),
        }
    }

    TransformResult {
        status,
        outputs,
        id_map,
    }
}

#[cfg(test)]
mod tests {
    use onboarding_shared::{AuthConfig, RDF_N3};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> TransformClient {
        let remote = RemoteClient::new().unwrap();
        let auth = AuthClient::new(
            remote.clone(),
            AuthConfig {
                url_auth: server.uri(),
                service_id: "onboarding".into(),
                client_secret: "s3cret".into(),
            },
        );
        TransformClient::new(
            remote,
            auth,
            TransformConfig {
                url_transformation: server.uri(),
            },
        )
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "svc-token"})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn posts_payload_and_reads_serializations() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/transformation/assets"))
            .and(query_param("r2rml_url", "http://maps.example.com/karma.ttl"))
            .and(header("authorization", "Bearer svc-token"))
            .and(header("content-type", "text/csv; charset=utf-8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 200,
                "data": {"rdf_n3": "<a> <b> <c> .", "rdf_xml": ["<rdf:RDF>", "</rdf:RDF>"]},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .transform(
                b"source_id_type,source_id\nx,1\n".to_vec(),
                "text/csv; charset=utf-8",
                Some("http://maps.example.com/karma.ttl"),
            )
            .await
            .unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.serialization(RDF_N3), Some("<a> <b> <c> ."));
        assert_eq!(result.serialization("rdf_xml"), Some("<rdf:RDF>\n</rdf:RDF>"));
        assert!(result.id_map.is_none());
    }

    #[tokio::test]
    async fn precomputed_id_map_is_kept_apart() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/transformation/assets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 200,
                "data": {
                    "rdf_n3": "",
                    "id_map": [{
                        "entity_type": "asset",
                        "entity_id": "e1",
                        "hub_key": "https://openpermissions.org/s1/hub1/r/asset/e1",
                        "source_ids": [],
                    }],
                },
            })))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .transform(b"{}".to_vec(), "application/json", None)
            .await
            .unwrap();
        assert_eq!(result.id_map.map(|m| m.len()), Some(1));
        assert!(!result.outputs.contains_key(ID_MAP));
    }

    #[tokio::test]
    async fn remote_errors_pass_through_verbatim() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/transformation/assets"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "status": 400,
                "errors": [{"source": "transformation", "message": "missing source_id column"}],
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .transform(b"bad".to_vec(), "text/csv", None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.details()[0].message, "missing source_id column");
        assert_eq!(err.details()[0].source.as_deref(), Some("transformation"));
    }

    #[tokio::test]
    async fn success_without_data_is_500() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/transformation/assets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": 200})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .transform(b"x".to_vec(), "text/csv", None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 500);
        assert_eq!(
            err.details()[0].message,
            "Malformed response from the transformation service"
        );
    }

    #[tokio::test]
    async fn service_token_failure_is_generic_500() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/transformation/assets"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .transform(b"x".to_vec(), "text/csv", None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 500);
        assert_eq!(err.details()[0].message, GENERIC_SERVER_ERROR);
    }
}
