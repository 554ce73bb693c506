//! HTTP response building module
//!
//! Provides builders for the status codes the server emits. Bodies are JSON
//! unless stated otherwise.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use serde_json::{json, Value};

const JSON: &str = "application/json";

/// Build a JSON response with the given status
pub fn build_json_response(status: StatusCode, value: &Value) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|e| {
        crate::logger::log_error(&format!("Failed to encode response body: {e}"));
        b"null".to_vec()
    });
    build_bytes_response(status, JSON, Bytes::from(body))
}

/// Build a response from an already encoded body
pub fn build_bytes_response(
    status: StatusCode,
    content_type: &str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let content_length = body.len();
    Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 200 HTML response
pub fn build_html_response(content: String) -> Response<Full<Bytes>> {
    build_bytes_response(
        StatusCode::OK,
        "text/html; charset=utf-8",
        Bytes::from(content),
    )
}

/// Build 307 Temporary Redirect response
pub fn build_redirect_response(target: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header("Location", target)
        .header("Content-Length", 0)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("307", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 400 Bad Request response
pub fn build_400_response(detail: &str) -> Response<Full<Bytes>> {
    build_json_response(StatusCode::BAD_REQUEST, &json!({"detail": detail}))
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_json_response(StatusCode::NOT_FOUND, &json!({"detail": "Not Found"}))
}

/// Build 405 Method Not Allowed response listing the allowed methods
pub fn build_405_response(allowed: &[Method]) -> Response<Full<Bytes>> {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let mut response = build_json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &json!({"detail": "Method Not Allowed"}),
    );
    match allow.parse() {
        Ok(value) => {
            response.headers_mut().insert("Allow", value);
        }
        Err(e) => crate::logger::log_error(&format!("Invalid Allow header '{allow}': {e}")),
    }
    response
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_json_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        &json!({"detail": "Payload Too Large"}),
    )
}

/// Build 422 Unprocessable Entity response from a validation detail body
pub fn build_422_response(detail: &Value) -> Response<Full<Bytes>> {
    build_json_response(StatusCode::UNPROCESSABLE_ENTITY, detail)
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Full<Bytes>> {
    build_json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &json!({"detail": "Internal Server Error"}),
    )
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
