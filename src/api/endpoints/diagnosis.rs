//! Diagnosis proxy endpoint.
//!
//! `POST /api/diagnosis/predict` authenticates from the session cookie,
//! reads the multipart submission, re-validates it, and forwards a fresh
//! multipart body to the diagnosis service. Nothing is sent upstream
//! unless every local check passes.

use std::collections::HashMap;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::session::AuthContext;
use crate::api::types::ApiContext;
use crate::api::upstream::UpstreamResponse;
use crate::models::{HistoryError, HistorySource, ImageFile, HISTORY_FIELDS};
use crate::submission::{compose, HISTORY_FIELD, IMAGES_FIELD};
use crate::validation::validate_submission;

/// Submission as read from the inbound multipart body.
#[derive(Debug)]
struct InboundSubmission {
    history: HistorySource,
    images: Vec<ImageFile>,
}

/// `POST /api/diagnosis/predict`
pub async fn predict(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let dev_mode = ctx.config.dev_mode;
    match predict_inner(ctx, headers, multipart).await {
        Ok(response) => response,
        Err(err) => err.exposing_detail(dev_mode).into_response(),
    }
}

async fn predict_inner(
    ctx: ApiContext,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    // 1. Authenticate before touching the body
    let auth = AuthContext::from_headers(&headers).ok_or(ApiError::Unauthorized)?;

    // 2. Parse multipart body, resolve history shape once
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Diagnosis request is not multipart");
        ApiError::BadRequest("Invalid multipart body".into())
    })?;
    let inbound = read_submission(multipart).await?;
    let record = inbound.history.resolve().map_err(|e| match e {
        HistoryError::InvalidJson(reason) => {
            tracing::debug!(%reason, "Rejected history JSON");
            ApiError::BadRequest("Invalid history JSON".into())
        }
    })?;

    // 3-4. Re-validate everything locally
    if let Err(errors) = validate_submission(&record, &inbound.images) {
        tracing::info!(
            invalid_fields = errors.len(),
            image_count = inbound.images.len(),
            "Diagnosis submission failed validation"
        );
        return Err(ApiError::Validation(errors));
    }

    // 5-6. Re-compose and forward
    let payload = compose(&record, &inbound.images)
        .map_err(|e| ApiError::internal(format!("Compose failed: {e}")))?;
    let upstream = ctx
        .upstream
        .predict(auth.authorization(), payload)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    // 7-8. Relay success verbatim, normalize failures
    relay(upstream)
}

/// Read every multipart field. `history` wins over the discrete fields.
async fn read_submission(mut multipart: Multipart) -> Result<InboundSubmission, ApiError> {
    let mut history_json: Option<String> = None;
    let mut discrete: HashMap<String, String> = HashMap::new();
    let mut images: Vec<ImageFile> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e.status(), &e.body_text())),
        };

        let name = field.name().unwrap_or("").to_string();
        if name == HISTORY_FIELD {
            let text = field
                .text()
                .await
                .map_err(|e| multipart_error(e.status(), &e.body_text()))?;
            history_json = Some(text);
        } else if name == IMAGES_FIELD {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let media_type = match field.content_type() {
                Some(declared) => declared.to_string(),
                None => mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string(),
            };
            let data = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e.status(), &e.body_text()))?;
            images.push(ImageFile::new(file_name, media_type, data.to_vec()));
        } else if HISTORY_FIELDS.contains(&name.as_str()) {
            let text = field
                .text()
                .await
                .map_err(|e| multipart_error(e.status(), &e.body_text()))?;
            discrete.insert(name, text);
        }
    }

    let history = match history_json {
        Some(text) => HistorySource::Json(text),
        None => HistorySource::Fields(discrete),
    };

    Ok(InboundSubmission { history, images })
}

fn multipart_error(status: StatusCode, reason: &str) -> ApiError {
    tracing::debug!(%status, reason, "Failed to read multipart body");
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest("Invalid multipart body".into())
    }
}

fn relay(upstream: UpstreamResponse) -> Result<Response, ApiError> {
    let status = StatusCode::from_u16(upstream.status).map_err(|_| {
        ApiError::internal(format!("Invalid upstream status {}", upstream.status))
    })?;

    if !upstream.is_success() {
        tracing::warn!(status = upstream.status, "Diagnosis service rejected submission");
        return Err(ApiError::Upstream {
            status,
            body: normalize_upstream_error(&upstream.body),
        });
    }

    let mut response = (status, upstream.raw).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

/// Stable client-facing shape for upstream failures:
/// `{message, details, errors, backend_detail}`.
pub fn normalize_upstream_error(body: &Value) -> Value {
    let detail = body.get("detail");
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| detail.and_then(Value::as_str))
        .unwrap_or("Diagnosis service returned an error");

    json!({
        "message": message,
        "details": body.get("details").cloned().unwrap_or(Value::Null),
        "errors": body.get("errors").cloned().unwrap_or(Value::Null),
        "backend_detail": detail.cloned().unwrap_or_else(|| body.clone()),
    })
}
