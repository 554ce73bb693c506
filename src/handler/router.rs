//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body collection, route lookup,
//! parameter binding, handler invocation and access logging.

use crate::binding::{bind, RawRequest};
use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::openapi;
use crate::routing::{Lookup, Route};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, REFERER, SERVER, USER_AGENT};
use hyper::{Method, Request, Response, StatusCode, Uri, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let is_head = parts.method == Method::HEAD;

    let response = match read_body(&parts.headers, body, state.config.http.max_body_size).await {
        Ok(bytes) => dispatch(&state, &parts.method, &parts.uri, &bytes),
        Err(response) => response,
    };
    let response = finalize(response, &state.config.http.server_name, is_head);

    if state.cached_access_log.load(Ordering::Relaxed) {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            parts.method.to_string(),
            parts.uri.path().to_string(),
        );
        entry.query = parts.uri.query().map(ToString::to_string);
        entry.http_version = version_label(parts.version).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.referer = header_text(&parts.headers, REFERER.as_str());
        entry.user_agent = header_text(&parts.headers, USER_AGENT.as_str());
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route a fully read request to its response
///
/// `HEAD` requests get the `GET` response; the caller strips the body.
pub fn dispatch(state: &AppState, method: &Method, uri: &Uri, body: &[u8]) -> Response<Full<Bytes>> {
    let path = uri.path();

    let docs = &state.config.docs;
    if docs.enabled && (method == Method::GET || method == Method::HEAD) {
        if path == docs.openapi_path {
            return http::build_bytes_response(
                StatusCode::OK,
                "application/json",
                state.openapi.clone(),
            );
        }
        if path == docs.docs_path {
            return http::build_html_response(openapi::docs_page(&docs.title, &docs.openapi_path));
        }
    }

    match state.routes.lookup(method, path) {
        Lookup::Found { route, path_params } => {
            let raw = RawRequest::new(path_params, uri.query(), body);
            run_endpoint(route, &raw, method, path)
        }
        Lookup::MethodNotAllowed(allowed) => {
            logger::log_debug(&format!("Method not allowed: {method} {path}"));
            http::build_405_response(&allowed)
        }
        Lookup::Redirect(target) => {
            let location = match uri.query() {
                Some(query) => format!("{target}?{query}"),
                None => target,
            };
            http::build_redirect_response(&location)
        }
        Lookup::NotFound => http::build_404_response(),
    }
}

fn run_endpoint(
    route: &Route,
    raw: &RawRequest<'_>,
    method: &Method,
    path: &str,
) -> Response<Full<Bytes>> {
    let endpoint = &route.endpoint;
    let bound = match bind(&endpoint.params, raw) {
        Ok(bound) => bound,
        Err(errors) => {
            logger::log_validation_failed(method.as_str(), path, errors.len());
            return http::build_422_response(&errors.to_detail());
        }
    };

    match (endpoint.handler)(bound) {
        Ok(value) => http::build_json_response(StatusCode::OK, &value),
        Err(e) => {
            logger::log_error(&format!(
                "Handler '{}' failed for {method} {path}: {e}",
                endpoint.operation_id
            ));
            http::build_500_response()
        }
    }
}

/// Collect the request body, enforcing the configured size limit
async fn read_body(
    headers: &HeaderMap,
    body: Incoming,
    max_body_size: u64,
) -> Result<Bytes, Response<Full<Bytes>>> {
    if let Some(resp) = check_body_size(headers, max_body_size) {
        return Err(resp);
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_error(&format!(
                "Request body too large (max: {max_body_size} bytes)"
            ));
            Err(http::build_413_response())
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Err(http::build_400_response("Could not read request body"))
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = headers.get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Add the `Server` header and drop the body of `HEAD` responses
pub fn finalize(
    mut response: Response<Full<Bytes>>,
    server_name: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    match HeaderValue::from_str(server_name) {
        Ok(value) => {
            response.headers_mut().insert(SERVER, value);
        }
        Err(e) => logger::log_warning(&format!("Invalid server name '{server_name}': {e}")),
    }

    if is_head {
        *response.body_mut() = Full::new(Bytes::new());
    }
    response
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
