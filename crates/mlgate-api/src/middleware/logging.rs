//! Per-request logging
//!
//! Every request gets a UUID request id (echoed in `x-request-id`). At debug
//! level the request and response headers and bodies are logged as well, with
//! credential-bearing headers masked.

use axum::{
    body::{Body, Bytes, to_bytes},
    http::{
        HeaderMap, HeaderName, HeaderValue, Request, StatusCode,
        header::{AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{Instrument, Level};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Bodies longer than this are cut in the log output
const LOGGED_BODY_LIMIT: usize = 2048;

/// Largest request body buffered for logging; same as axum's default body limit
pub const MAX_LOGGED_REQUEST_BYTES: usize = 2 * 1024 * 1024;

const REDACTED_HEADERS: [HeaderName; 4] = [AUTHORIZATION, PROXY_AUTHORIZATION, COOKIE, SET_COOKIE];

pub async fn log_request(request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let mut response = if tracing::enabled!(Level::DEBUG) {
            log_exchange(request, next).await
        } else {
            next.run(request).await
        };

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

async fn log_exchange(request: Request<Body>, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_LOGGED_REQUEST_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };
    tracing::debug!("Request headers: {:?}", redacted(&parts.headers));
    tracing::debug!("Request body: {}", preview(&bytes));

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to read response body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    tracing::debug!("Response status: {}", parts.status);
    tracing::debug!("Response headers: {:?}", redacted(&parts.headers));
    tracing::debug!("Response body: {}", preview(&bytes));

    Response::from_parts(parts, Body::from(bytes))
}

/// Copy of `headers` with credential values replaced by `***`
fn redacted(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    for name in REDACTED_HEADERS {
        if headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static("***"));
        }
    }
    headers
}

fn preview(bytes: &Bytes) -> String {
    let shown = &bytes[..bytes.len().min(LOGGED_BODY_LIMIT)];
    let mut text = String::from_utf8_lossy(shown).into_owned();
    if bytes.len() > LOGGED_BODY_LIMIT {
        text.push_str(&format!("... ({} bytes)", bytes.len()));
    }
    text
}
