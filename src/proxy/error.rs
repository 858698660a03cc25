//! Proxy error types and response handling

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
    response::IntoResponse,
};
use serde_json::json;

use super::cors;

/// Errors that can occur during forwarding
#[derive(Debug)]
pub(crate) enum ProxyError {
    /// The inbound body could not be read in full
    BodyRead(String),
    /// The outbound call failed before a complete response was received
    Upstream(String),
    ResponseBuild(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response<Body> {
        let (status, message) = match self {
            ProxyError::BodyRead(msg) => (StatusCode::BAD_REQUEST, msg),
            ProxyError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ProxyError::ResponseBuild(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        tracing::error!("Proxy error: {} - {}", status, message);

        // Error responses keep the CORS set - the browser must be able to
        // read the failure, not just the success
        let body = json!({ "error": message }).to_string();

        cors::apply(Response::builder().status(status))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap_or_else(|_| Response::new(Body::from("Internal error building error response")))
    }
}
