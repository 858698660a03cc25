// Forwarding handler - maps one inbound request to one outbound call
//
// Branches, in order:
// 1. OPTIONS preflights are answered locally with the CORS set.
// 2. Methods other than GET/POST are rejected with 405.
// 3. The destination is read from X-Target-URL and must start with the
//    allowed upstream prefix, otherwise 400.
// 4. Only Authorization (verbatim) and Content-Type (forced to
//    application/json) cross the boundary upstream.
// 5. The upstream response is relayed with status and body verbatim;
//    transport failures become 502. One attempt, no retry.

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request, Response, StatusCode},
};
use bytes::Bytes;
use sha2::{Digest, Sha256};

use super::cors;
use super::error::ProxyError;
use super::ProxyState;

/// Header naming the destination the caller wants to reach
const TARGET_HEADER: &str = "x-target-url";

pub(crate) async fn forward_handler(
    State(state): State<ProxyState>,
    req: Request<Body>,
) -> Result<Response<Body>, ProxyError> {
    // Handle CORS preflight - no validation runs for OPTIONS
    if req.method() == Method::OPTIONS {
        return cors::apply(Response::builder())
            .body(Body::empty())
            .map_err(|e| ProxyError::ResponseBuild(e.to_string()));
    }

    // Only allow POST and GET
    if req.method() != Method::POST && req.method() != Method::GET {
        return cors::apply(Response::builder().status(StatusCode::METHOD_NOT_ALLOWED))
            .body(Body::from("Method not allowed"))
            .map_err(|e| ProxyError::ResponseBuild(e.to_string()));
    }

    // The destination comes from the X-Target-URL header, not the inbound
    // path. This is the sole authorization boundary: anything outside the
    // allow-listed prefix would turn this service into an open proxy.
    let target = req
        .headers()
        .get(TARGET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let target_url = match validate_target(target.as_deref(), &state.upstream_prefix) {
        Some(url) => url.to_string(),
        None => {
            let body = serde_json::json!({
                "error": format!(
                    "Invalid or missing X-Target-URL. Must start with {}",
                    state.upstream_prefix
                ),
            })
            .to_string();
            return cors::apply(Response::builder().status(StatusCode::BAD_REQUEST))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .map_err(|e| ProxyError::ResponseBuild(e.to_string()));
        }
    };

    let method = req.method().clone();
    let auth = req.headers().get(header::AUTHORIZATION).cloned();

    if let Some(auth) = &auth {
        // Log a fingerprint only - never the credential itself
        tracing::debug!(
            "Forwarding Authorization header (sha256 {})",
            auth_fingerprint(auth.as_bytes())
        );
    }

    // Read the inbound body in full; only POST carries it upstream
    let body_bytes: Bytes = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .map_err(|e| ProxyError::BodyRead(e.to_string()))?;

    tracing::debug!("Forwarding {} {}", method, target_url);

    // Build the outbound request with the explicit header allow-list.
    // Cookies and custom caller headers are intentionally dropped.
    let forward_method = reqwest::Method::from_bytes(method.as_str().as_bytes())
        .map_err(|e| ProxyError::Upstream(format!("Invalid HTTP method: {}", e)))?;

    let mut forward_req = state.client.request(forward_method, &target_url);

    if let Some(auth) = auth {
        forward_req = forward_req.header(header::AUTHORIZATION.as_str(), auth.as_bytes().to_vec());
    }
    forward_req = forward_req.header(header::CONTENT_TYPE.as_str(), "application/json");

    if method == Method::POST {
        forward_req = forward_req.body(body_bytes);
    }

    // Send the request to the upstream API. Failures while sending or while
    // draining the response body are terminal - surfaced as 502, no retry.
    let response = forward_req
        .send()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    let status = response.status();
    let response_body = response
        .bytes()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    tracing::debug!("Upstream answered {} ({} bytes)", status, response_body.len());

    // Relay the upstream status and body verbatim. Content-Type is pinned to
    // application/json regardless of what the upstream returned.
    cors::apply(Response::builder().status(status.as_u16()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(response_body))
        .map_err(|e| ProxyError::ResponseBuild(e.to_string()))
}

/// Check a candidate destination against the allow-list prefix.
/// Returns the URL only when it may be forwarded to.
fn validate_target<'a>(target: Option<&'a str>, prefix: &str) -> Option<&'a str> {
    target.filter(|url| url.starts_with(prefix))
}

/// Short SHA-256 fingerprint of a credential for log correlation.
/// The credential itself must never reach the logs.
fn auth_fingerprint(credential: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credential);
    let hash = hasher.finalize();
    format!("{:x}", hash)[..16].to_string()
}
