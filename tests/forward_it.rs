// End-to-end forwarding tests
//
// Each test serves the real router on an ephemeral port and drives it with
// reqwest, with httpmock standing in for the Replicate API.

use httpmock::prelude::*;
use repligate::config::Config;
use repligate::proxy;
use tokio::net::TcpListener;

/// Serve the proxy on an ephemeral port, returning its base URL
async fn spawn_proxy(upstream_prefix: &str) -> String {
    let config = Config {
        upstream_prefix: upstream_prefix.to_string(),
        ..Config::default()
    };
    let app = proxy::app(&config).expect("Failed to build proxy app");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener
        .local_addr()
        .expect("Failed to read listener address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    format!("http://{}", addr)
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn preflight_carries_the_full_cors_set() {
    let proxy_url = spawn_proxy("https://api.replicate.com/").await;

    let response = client()
        .request(reqwest::Method::OPTIONS, &proxy_url)
        .send()
        .await
        .expect("Preflight request failed");

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        response.headers()["access-control-allow-methods"],
        "GET, POST, OPTIONS"
    );
    assert_eq!(
        response.headers()["access-control-allow-headers"],
        "Content-Type, Authorization, X-Target-URL"
    );
    assert_eq!(response.headers()["access-control-max-age"], "86400");
    assert_eq!(response.text().await.unwrap(), "");
}

#[tokio::test]
async fn non_get_post_methods_are_rejected() {
    let proxy_url = spawn_proxy("https://api.replicate.com/").await;

    for method in [
        reqwest::Method::PUT,
        reqwest::Method::DELETE,
        reqwest::Method::PATCH,
    ] {
        let response = client()
            .request(method.clone(), format!("{}/v1/predictions", proxy_url))
            .send()
            .await
            .expect("Request failed");

        assert_eq!(response.status(), 405, "{} should be rejected", method);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(response.text().await.unwrap(), "Method not allowed");
    }
}

#[tokio::test]
async fn missing_target_header_is_rejected() {
    let proxy_url = spawn_proxy("https://api.replicate.com/").await;

    let response = client().get(&proxy_url).send().await.unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Invalid or missing X-Target-URL. Must start with https://api.replicate.com/"
    );
}

#[tokio::test]
async fn targets_outside_the_allow_list_are_rejected() {
    let proxy_url = spawn_proxy("https://api.replicate.com/").await;

    let response = client()
        .get(&proxy_url)
        .header("X-Target-URL", "https://evil.example.com/v1/predictions")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("X-Target-URL"));
}

#[tokio::test]
async fn upstream_response_is_relayed_verbatim() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/predictions");
            then.status(201)
                .header("content-type", "text/plain")
                .body(r#"{"id":"abc"}"#);
        })
        .await;

    let proxy_url = spawn_proxy(&format!("{}/", server.base_url())).await;

    let response = client()
        .post(format!("{}/forward", proxy_url))
        .header("X-Target-URL", server.url("/v1/predictions"))
        .body(r#"{"input":"x"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    // The upstream Content-Type is discarded and replaced
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.text().await.unwrap(), r#"{"id":"abc"}"#);

    mock.assert_async().await;
}

#[tokio::test]
async fn upstream_errors_pass_through_untouched() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/predictions/missing");
            then.status(404).body(r#"{"detail":"Not found"}"#);
        })
        .await;

    let proxy_url = spawn_proxy(&format!("{}/", server.base_url())).await;

    let response = client()
        .get(&proxy_url)
        .header("X-Target-URL", server.url("/v1/predictions/missing"))
        .send()
        .await
        .unwrap();

    // Upstream 4xx is not an error here - it is relayed as-is
    assert_eq!(response.status(), 404);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.text().await.unwrap(), r#"{"detail":"Not found"}"#);
}

#[tokio::test]
async fn unreachable_upstream_maps_to_bad_gateway() {
    // Nothing listens on port 1; the outbound call fails at the transport
    let proxy_url = spawn_proxy("http://127.0.0.1:1/").await;

    let response = client()
        .get(&proxy_url)
        .header("X-Target-URL", "http://127.0.0.1:1/v1/predictions")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(
        !message.is_empty(),
        "502 body should carry the transport failure message"
    );
}

#[tokio::test]
async fn outbound_request_carries_only_the_allowed_headers() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/predictions")
                .header("content-type", "application/json")
                .header("authorization", "Bearer t1")
                .body(r#"{"input":"x"}"#);
            then.status(201).body(r#"{"id":"abc"}"#);
        })
        .await;

    let proxy_url = spawn_proxy(&format!("{}/", server.base_url())).await;

    let response = client()
        .post(&proxy_url)
        .header("X-Target-URL", server.url("/v1/predictions"))
        .header("Authorization", "Bearer t1")
        // Caller-side Content-Type is overridden, not forwarded
        .header("Content-Type", "text/plain")
        .body(r#"{"input":"x"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    mock.assert_async().await;
}

#[tokio::test]
async fn repeated_requests_yield_identical_responses() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/models");
            then.status(200).body(r#"{"results":[]}"#);
        })
        .await;

    let proxy_url = spawn_proxy(&format!("{}/", server.base_url())).await;

    let mut seen = Vec::new();
    for _ in 0..2 {
        let response = client()
            .get(&proxy_url)
            .header("X-Target-URL", server.url("/v1/models"))
            .send()
            .await
            .unwrap();
        seen.push((response.status(), response.text().await.unwrap()));
    }

    assert_eq!(seen[0], seen[1]);
    mock.assert_calls_async(2).await;
}
