//! The fixed CORS header set stamped onto every response
//!
//! Browser clients are the whole reason this proxy exists, so every branch
//! of the handler (preflight, rejection, relay, upstream failure) carries
//! the same permissive policy.

use axum::http::response::Builder;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Target-URL";
pub const MAX_AGE: &str = "86400";

/// Add the CORS header set to a response under construction
pub fn apply(builder: Builder) -> Builder {
    builder
        .header("Access-Control-Allow-Origin", ALLOW_ORIGIN)
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .header("Access-Control-Max-Age", MAX_AGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Response;

    #[test]
    fn test_apply_sets_all_four_headers() {
        let response = apply(Response::builder()).body(Body::empty()).unwrap();
        let headers = response.headers();

        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
        assert_eq!(
            headers["access-control-allow-headers"],
            "Content-Type, Authorization, X-Target-URL"
        );
        assert_eq!(headers["access-control-max-age"], "86400");
    }

    #[test]
    fn test_apply_preserves_existing_status() {
        let response = apply(Response::builder().status(405))
            .body(Body::empty())
            .unwrap();
        assert_eq!(response.status(), 405);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
