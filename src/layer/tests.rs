//! Tests for `IdentityLayer` in front of an axum router.
//!
//! These tests use `oneshot()` for fast, in-process testing without network I/O.

use super::*;
use crate::{
    ClientCertificates, Error, RequestIdentity, Result, SecureTransport, SecurityContext,
    UserPrincipal, context, headers, identity::certificate::tests::certificate_der,
};
use axum::{Extension, Json, Router, body::Body, http::StatusCode, routing::get};
use http::request::Parts;
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
};
use tower::ServiceExt;

// ============================================================================
// Helpers
// ============================================================================

/// Echoes the propagation context seen by the handler.
async fn echo_context() -> Json<BTreeMap<String, String>> {
    Json(context::snapshot().into_iter().collect())
}

async fn echo_identity(Extension(identity): Extension<RequestIdentity>) -> String {
    identity.user().unwrap_or("anonymous").to_string()
}

async fn failing_handler() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

fn config(
    extract_headers: bool,
    extract_origin_header: bool,
    force_new_request_id: bool,
) -> IdentityConfig {
    IdentityConfig {
        extract_headers,
        extract_origin_header,
        force_new_request_id,
    }
}

fn router(layer: IdentityLayer) -> Router {
    Router::new()
        .route("/context", get(echo_context))
        .route("/identity", get(echo_identity))
        .route("/fail", get(failing_handler))
        .layer(layer)
}

async fn get_context(app: Router, request: Request<Body>) -> BTreeMap<String, String> {
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn request(uri: &str) -> http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

struct FailingStore;

impl SecurityContextStore for FailingStore {
    fn session_context(&self, _parts: &Parts) -> Result<Option<SecurityContext>> {
        Err(Error::security_context("session store unavailable"))
    }
}

#[derive(Default)]
struct CountingSink(AtomicUsize);

impl AlternateContextSink for CountingSink {
    fn clear(&self) -> Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Identity precedence
// ============================================================================

#[tokio::test]
async fn session_principal_is_propagated() {
    let app = router(IdentityLayer::new(config(true, false, false)));
    let mut req = request("/context")
        .header(headers::USER, "mallory")
        .header(headers::ACCOUNTS, "everything")
        .body(Body::empty())
        .unwrap();
    req.extensions_mut().insert(SecurityContext::Authenticated(
        UserPrincipal::new("u", ["a", "b"]),
    ));

    let seen = get_context(app, req).await;

    assert_eq!(seen.get(headers::USER).map(String::as_str), Some("u"));
    assert_eq!(seen.get(headers::ACCOUNTS).map(String::as_str), Some("a,b"));
}

#[tokio::test]
async fn principal_without_accounts_hides_header_accounts() {
    let app = router(IdentityLayer::new(config(true, false, false)));
    let mut req = request("/context")
        .header(headers::USER, "mallory")
        .header(headers::ACCOUNTS, "everything")
        .body(Body::empty())
        .unwrap();
    req.extensions_mut().insert(SecurityContext::Authenticated(
        UserPrincipal::new("alice", Vec::<String>::new()),
    ));

    let seen = get_context(app, req).await;

    assert_eq!(seen.get(headers::USER).map(String::as_str), Some("alice"));
    assert!(!seen.contains_key(headers::ACCOUNTS));
}

#[tokio::test]
async fn principal_with_empty_username_hides_header_user() {
    let app = router(IdentityLayer::new(config(true, false, false)));
    let mut req = request("/context")
        .header(headers::USER, "mallory")
        .header(headers::ACCOUNTS, "everything")
        .body(Body::empty())
        .unwrap();
    req.extensions_mut().insert(SecurityContext::Authenticated(
        UserPrincipal::new("", Vec::<String>::new()),
    ));

    let seen = get_context(app, req).await;

    assert!(seen.is_empty());
}

#[tokio::test]
async fn trusted_headers_are_propagated_verbatim() {
    let app = router(IdentityLayer::new(config(true, false, false)));
    let req = request("/context")
        .header(headers::USER, "svc-orca")
        .header(headers::ACCOUNTS, "prod,staging")
        .header("x-spinnaker-execution-id", "01J9X")
        .header("x-unrelated", "dropped")
        .body(Body::empty())
        .unwrap();

    let seen = get_context(app, req).await;

    assert_eq!(seen.get(headers::USER).map(String::as_str), Some("svc-orca"));
    assert_eq!(
        seen.get(headers::ACCOUNTS).map(String::as_str),
        Some("prod,staging")
    );
    assert_eq!(
        seen.get("x-spinnaker-execution-id").map(String::as_str),
        Some("01J9X")
    );
    assert!(!seen.contains_key("x-unrelated"));
}

#[tokio::test]
async fn headers_ignored_when_extraction_disabled() {
    let app = router(IdentityLayer::new(config(false, false, false)));
    let req = request("/context")
        .header(headers::USER, "svc-orca")
        .header(headers::ACCOUNTS, "prod")
        .header("x-spinnaker-execution-id", "01J9X")
        .body(Body::empty())
        .unwrap();

    let seen = get_context(app, req).await;

    assert!(seen.is_empty());
}

#[tokio::test]
async fn certificate_identity_over_secure_transport() {
    let app = router(IdentityLayer::new(config(false, false, false)));
    let mut req = request("/identity").body(Body::empty()).unwrap();
    req.extensions_mut().insert(SecureTransport);
    req.extensions_mut()
        .insert(ClientCertificates(vec![certificate_der(&["e@x.com"], &[])]));

    let response = app.oneshot(req).await.unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    assert_eq!(body, "e@x.com");
}

#[tokio::test]
async fn malformed_certificate_rejects_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let app = Router::new()
        .route(
            "/",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "OK"
                }
            }),
        )
        .layer(IdentityLayer::new(config(false, false, false)));

    let mut req = request("https://svc.mesh.internal/")
        .body(Body::empty())
        .unwrap();
    req.extensions_mut()
        .insert(ClientCertificates(vec![vec![0x30, 0x01]]));

    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn anonymous_request_reaches_handler() {
    let app = router(IdentityLayer::new(config(true, false, false)));
    let response = app
        .oneshot(request("/identity").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body, "anonymous");
}

#[tokio::test]
async fn store_failure_never_blocks_the_request() {
    let layer = IdentityLayer::new(config(true, false, false))
        .with_security_context_store(Arc::new(FailingStore));
    let req = request("/context")
        .header(headers::USER, "svc-orca")
        .body(Body::empty())
        .unwrap();

    let seen = get_context(router(layer), req).await;

    assert_eq!(seen.get(headers::USER).map(String::as_str), Some("svc-orca"));
}

// ============================================================================
// Augmentation
// ============================================================================

#[tokio::test]
async fn origin_tag_from_signal_header() {
    let app = router(IdentityLayer::new(config(false, true, false)));

    let deck = request("/context")
        .header(headers::ORIGIN_SIGNAL, "DeCk")
        .body(Body::empty())
        .unwrap();
    let seen = get_context(app.clone(), deck).await;
    assert_eq!(seen.get(headers::USER_ORIGIN).map(String::as_str), Some("deck"));

    let bare = request("/context").body(Body::empty()).unwrap();
    let seen = get_context(app, bare).await;
    assert_eq!(seen.get(headers::USER_ORIGIN).map(String::as_str), Some("api"));
}

#[tokio::test]
async fn forced_request_ids_are_unique() {
    let app = router(IdentityLayer::new(config(true, false, true)));

    let first = get_context(
        app.clone(),
        request("/context")
            .header(headers::REQUEST_ID, "inbound")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let second = get_context(
        app,
        request("/context")
            .header(headers::REQUEST_ID, "inbound")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    let first = first.get(headers::REQUEST_ID).unwrap();
    let second = second.get(headers::REQUEST_ID).unwrap();
    assert_ne!(first, "inbound");
    assert_ne!(first, second);
}

#[tokio::test]
async fn inbound_request_id_forwarded_without_forcing() {
    let app = router(IdentityLayer::new(config(true, false, false)));
    let seen = get_context(
        app,
        request("/context")
            .header(headers::REQUEST_ID, "inbound")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(seen.get(headers::REQUEST_ID).map(String::as_str), Some("inbound"));
}

// ============================================================================
// Scope release
// ============================================================================

#[tokio::test]
async fn context_cleared_after_each_request() {
    let sink = Arc::new(CountingSink::default());
    let layer = IdentityLayer::new(config(true, true, true)).with_alternate_sink(sink.clone());
    let app = router(layer);

    for uri in ["/context", "/fail"] {
        let req = request(uri)
            .header(headers::USER, "svc-orca")
            .body(Body::empty())
            .unwrap();
        let _ = app.clone().oneshot(req).await.unwrap();
        assert!(!context::is_active());
        assert!(context::snapshot().is_empty());
    }

    assert_eq!(sink.0.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_are_isolated() {
    let app = router(IdentityLayer::new(config(true, false, false)));

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let user = format!("user-{i}");
                let req = request("/context")
                    .header(headers::USER, user.as_str())
                    .body(Body::empty())
                    .unwrap();
                let seen = get_context(app, req).await;
                seen.get(headers::USER) == Some(&user)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap());
    }
}
