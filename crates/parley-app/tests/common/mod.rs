//! Shared helpers for the front-end integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use parley_app::context::{AppContext, Parts};
use parley_catalog::CatalogConfig;
use parley_core::clock::SystemClock;
use parley_core::credentials::TokenStore;
use parley_core::scenario::Scenario;
use parley_navigation::{Navigator, Screen};
use parley_reveal::{CueConfig, RevealConfig};
use parley_test_support::{RecordingCueSink, ScriptedCatalogTransport, StaticAuthProvider};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Everything a test needs to drive and inspect an application context.
pub struct Harness {
    pub context: AppContext,
    pub provider: Arc<StaticAuthProvider>,
    pub transport: Arc<ScriptedCatalogTransport>,
    pub sink: Arc<RecordingCueSink>,
}

/// Builds a context on test doubles. Timers follow the tokio clock, so
/// paused-runtime tests control them.
pub fn harness(provider: StaticAuthProvider, transport: ScriptedCatalogTransport) -> Harness {
    let provider = Arc::new(provider);
    let transport = Arc::new(transport);
    let sink = Arc::new(RecordingCueSink::new());
    let context = AppContext::from_parts(Parts {
        tokens: Arc::new(TokenStore::new()),
        provider: provider.clone(),
        transport: transport.clone(),
        sink: sink.clone(),
        clock: Arc::new(SystemClock),
        catalog: CatalogConfig::default(),
        cue: CueConfig::default(),
        reveal: RevealConfig::default(),
    });
    Harness {
        context,
        provider,
        transport,
        sink,
    }
}

/// Two scenarios in server order.
pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario::new("salary", "Salary talk", "Your manager has ten minutes."),
        Scenario::new("landlord", "Landlord", "The heating has been broken for a week."),
    ]
}

/// Waits until `navigator` shows `screen`. Guest starts move in the
/// background, so tests wait for the screen instead of assuming it.
pub async fn reach_screen(navigator: &Navigator, screen: Screen) {
    let mut screens = navigator.watch();
    tokio::time::timeout(
        Duration::from_secs(60),
        screens.wait_for(|snapshot| snapshot.screen == screen),
    )
    .await
    .expect("screen not reached in time")
    .expect("navigator dropped");
}

/// Lets spawned tasks run to their next suspension point.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn me(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some("Bearer member") => (
            StatusCode::OK,
            Json(json!({
                "authenticated": true,
                "user": { "sub": "google:7", "name": "Grace", "provider": "google" }
            })),
        ),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "authenticated": false }))),
    }
}

async fn scenarios(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some("Bearer member") => (
            StatusCode::OK,
            Json(json!([
                { "id": 1, "name": "Salary talk", "story": "Your manager has ten minutes." },
                { "id": 2, "name": "Members only", "story": "A longer negotiation." }
            ])),
        ),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "login required" }))),
    }
}

async fn public_scenarios() -> Json<Value> {
    Json(json!([
        { "id": 1, "name": "Salary talk", "story": "Your manager has ten minutes." }
    ]))
}

/// Serves `/api/auth/me`, `/api/scenarios` (members) and
/// `/api/public/scenarios` on an ephemeral port. Returns the base URL.
pub async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/scenarios", get(scenarios))
        .route("/api/public/scenarios", get(public_scenarios));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{address}")
}
