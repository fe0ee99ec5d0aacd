//! Request tracing. Every request runs inside a span carrying a request id
//! (client-supplied when well formed, minted otherwise); the id is echoed in
//! `x-request-id` and stamped into error bodies as `traceId`.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;
use tracing::Instrument;

use crate::response::ErrorBody;

const MAX_REQUEST_ID_LEN: usize = 128;

pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let request_id = incoming_request_id(&req).unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!("request", request_id = %request_id);

    let mut response = async {
        let start = std::time::Instant::now();
        let response = next.run(req).await;
        tracing::info!(
            method = %method,
            path = %path,
            status = %response.status().as_u16(),
            latency_ms = %start.elapsed().as_millis(),
            "request completed"
        );
        response
    }
    .instrument(span)
    .await;

    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }

    if response.status().is_client_error() || response.status().is_server_error() {
        stamp_error_body(response, &request_id).await
    } else {
        response
    }
}

fn incoming_request_id(req: &Request) -> Option<String> {
    let id = req.headers().get("x-request-id")?.to_str().ok()?;
    let well_formed = !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    well_formed.then(|| id.to_string())
}

/// JSON error bodies get a `traceId` field; anything else (axum's own
/// rejections such as a 413 from the body limit) is rewrapped as an
/// `ErrorBody` so clients see one error shape.
async fn stamp_error_body(response: Response, request_id: &str) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    let status = response.status();
    let (mut parts, body) = response.into_parts();
    // The body is about to change size; a stale length would truncate it.
    parts.headers.remove(header::CONTENT_LENGTH);

    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    if is_json {
        let patched = match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(mut json) => {
                if let Some(obj) = json.as_object_mut() {
                    obj.insert("traceId".to_string(), request_id.into());
                }
                serde_json::to_vec(&json).unwrap_or_else(|_| bytes.to_vec())
            }
            Err(_) => bytes.to_vec(),
        };
        return Response::from_parts(parts, Body::from(patched));
    }

    let message = String::from_utf8_lossy(&bytes).trim().to_string();
    let message = if message.is_empty() {
        status.canonical_reason().unwrap_or("Error").to_string()
    } else {
        message
    };

    (
        status,
        axum::Json(ErrorBody {
            success: false,
            code: error_code_for_status(status).to_string(),
            message,
            trace_id: Some(request_id.to_string()),
        }),
    )
        .into_response()
}

fn error_code_for_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNAUTHORIZED => "AUTH_UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        StatusCode::TOO_MANY_REQUESTS => "RATE_LIMITED",
        StatusCode::SERVICE_UNAVAILABLE => "SERVICE_UNAVAILABLE",
        _ => "INTERNAL_ERROR",
    }
}
