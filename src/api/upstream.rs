//! Client for the upstream diagnosis service.
//!
//! `DiagnosisUpstream` is the seam between the proxy endpoint and the
//! network: the endpoint only sees a status plus a parsed JSON body.

use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use futures_util::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::submission::{MultipartPayload, SubmissionError};

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Diagnosis service unreachable at {0}")]
    Connection(String),

    #[error("Diagnosis service timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Diagnosis service returned invalid JSON (status {status}): {reason}")]
    InvalidBody { status: u16, reason: String },

    #[error("Failed to build request: {0}")]
    Compose(#[from] SubmissionError),
}

/// Status and body returned by the diagnosis service.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
    /// Body bytes exactly as received.
    pub raw: Vec<u8>,
}

impl UpstreamResponse {
    /// Parse raw bytes as JSON.
    pub fn from_raw(status: u16, raw: Vec<u8>) -> Result<Self, UpstreamError> {
        let body = serde_json::from_slice(&raw).map_err(|e| UpstreamError::InvalidBody {
            status,
            reason: e.to_string(),
        })?;
        Ok(Self { status, body, raw })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Forwards a composed submission to the diagnosis service.
pub trait DiagnosisUpstream: Send + Sync {
    /// POST the payload with the given `Authorization` header value.
    fn predict(
        &self,
        authorization: String,
        payload: MultipartPayload,
    ) -> BoxFuture<'_, Result<UpstreamResponse, UpstreamError>>;
}

/// reqwest-backed client with a bounded request timeout.
pub struct HttpDiagnosisUpstream {
    predict_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpDiagnosisUpstream {
    pub fn new(predict_url: impl Into<String>, timeout_secs: u64) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;

        Ok(Self {
            predict_url: predict_url.into(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, UpstreamError> {
        Self::new(config.predict_url(), config.upstream_timeout_secs)
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    fn classify(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            UpstreamError::Connection(self.predict_url.clone())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

impl DiagnosisUpstream for HttpDiagnosisUpstream {
    fn predict(
        &self,
        authorization: String,
        payload: MultipartPayload,
    ) -> BoxFuture<'_, Result<UpstreamResponse, UpstreamError>> {
        Box::pin(async move {
            let image_count = payload.images().len();
            let form = payload.into_form()?;

            let response = self
                .client
                .post(&self.predict_url)
                .header(AUTHORIZATION, authorization)
                .multipart(form)
                .send()
                .await
                .map_err(|e| self.classify(e))?;

            let status = response.status().as_u16();
            let raw = response.bytes().await.map_err(|e| self.classify(e))?;

            tracing::info!(
                status,
                image_count,
                bytes = raw.len(),
                "Diagnosis service responded"
            );

            UpstreamResponse::from_raw(status, raw.to_vec())
        })
    }
}


#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::extract::Multipart;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::models::{ClinicalHistoryRecord, ImageFile};
    use crate::submission::compose;

    /// Echoes the auth header, history species and image part count.
    async fn echo_predict(headers: HeaderMap, mut multipart: Multipart) -> impl IntoResponse {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let mut species = String::new();
        let mut images = Vec::new();
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "history" => {
                    let text = field.text().await.unwrap_or_default();
                    let record: ClinicalHistoryRecord =
                        serde_json::from_str(&text).unwrap_or_default();
                    species = record.species.to_string();
                }
                "images" => {
                    let media_type = field.content_type().unwrap_or_default().to_string();
                    images.push(media_type);
                }
                _ => {}
            }
        }
        Json(json!({
            "authorization": authorization,
            "species": species,
            "images": images,
        }))
    }

    async fn reject_predict() -> impl IntoResponse {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "history missing Age" })),
        )
    }

    async fn spawn_stub(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn payload() -> MultipartPayload {
        let record = ClinicalHistoryRecord {
            species: "Turkey".into(),
            ..Default::default()
        };
        let images = vec![
            ImageFile::new("a.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]),
            ImageFile::new("b.png", "image/png", vec![0x89, 0x50]),
        ];
        compose(&record, &images).unwrap()
    }

    #[tokio::test]
    async fn forwards_multipart_with_authorization() {
        let addr = spawn_stub(Router::new().route("/predict", post(echo_predict))).await;
        let client = HttpDiagnosisUpstream::new(format!("http://{addr}/predict"), 5).unwrap();

        let response = client
            .predict("Bearer tok-1".into(), payload())
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.body["authorization"], "Bearer tok-1");
        assert_eq!(response.body["species"], "Turkey");
        assert_eq!(response.body["images"], json!(["image/jpeg", "image/png"]));
    }

    #[tokio::test]
    async fn non_success_status_is_returned_not_raised() {
        let addr = spawn_stub(Router::new().route("/predict", post(reject_predict))).await;
        let client = HttpDiagnosisUpstream::new(format!("http://{addr}/predict"), 5).unwrap();

        let response = client.predict("Bearer t".into(), payload()).await.unwrap();
        assert_eq!(response.status, 422);
        assert_eq!(response.body["detail"], "history missing Age");
    }

    #[tokio::test]
    async fn non_json_body_is_invalid() {
        let app = Router::new().route("/predict", post(|| async { "<html>bad gateway</html>" }));
        let addr = spawn_stub(app).await;
        let client = HttpDiagnosisUpstream::new(format!("http://{addr}/predict"), 5).unwrap();

        let err = client.predict("Bearer t".into(), payload()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidBody { status: 200, .. }));
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let app = Router::new().route(
            "/predict",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "{}"
            }),
        );
        let addr = spawn_stub(app).await;
        let client = HttpDiagnosisUpstream::new(format!("http://{addr}/predict"), 1).unwrap();

        let err = client.predict("Bearer t".into(), payload()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout(1)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_service_is_connection_error() {
        // Bind then drop to get a port nothing listens on.
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let client = HttpDiagnosisUpstream::new(format!("http://{addr}/predict"), 5).unwrap();

        let err = client.predict("Bearer t".into(), payload()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Connection(_)), "got {err:?}");
    }

    #[test]
    fn from_config_targets_predict_endpoint() {
        let config = GatewayConfig {
            upstream_base_url: "http://dx.internal:9000".into(),
            ..Default::default()
        };
        let client = HttpDiagnosisUpstream::from_config(&config).unwrap();
        assert_eq!(client.predict_url(), "http://dx.internal:9000/predict");
    }
}
