//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules: an in-memory `MockTarget`
//! for paused-clock runs and an axum mock of the shop API for real HTTP runs.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use merch_loadgen::target::{Credentials, Reply, TargetError, TargetService, Transfer};
use serde_json::json;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// In-memory target
// ============================================================================

#[derive(Default)]
struct MockState {
    latency: Duration,
    rejected_users: HashSet<String>,
    expected_identities: usize,
    /// Fail every n-th info call with 500
    info_fail_every: Option<usize>,

    auth_calls: AtomicUsize,
    info_calls: AtomicUsize,
    send_coin_calls: AtomicUsize,
    buy_calls: AtomicUsize,
    scenario_before_setup: AtomicBool,
    tokens_seen: Mutex<HashSet<String>>,
}

/// Target service double with a fixed simulated latency.
///
/// Auth hands out `tok-{username}`. Works with a paused tokio clock.
#[derive(Clone, Default)]
pub struct MockTarget {
    state: Arc<MockState>,
}

impl MockTarget {
    /// `expected_identities` is the setup size; any scenario call arriving before that
    /// many auth calls completed is flagged.
    pub fn new(latency: Duration, expected_identities: usize) -> Self {
        Self {
            state: Arc::new(MockState {
                latency,
                expected_identities,
                ..Default::default()
            }),
        }
    }

    pub fn rejecting<I: IntoIterator<Item = String>>(mut self, users: I) -> Self {
        let state = Arc::get_mut(&mut self.state).expect("configure MockTarget before cloning");
        state.rejected_users.extend(users);
        self
    }

    pub fn failing_info_every(mut self, n: usize) -> Self {
        let state = Arc::get_mut(&mut self.state).expect("configure MockTarget before cloning");
        state.info_fail_every = Some(n);
        self
    }

    pub fn auth_calls(&self) -> usize {
        self.state.auth_calls.load(Ordering::SeqCst)
    }

    pub fn info_calls(&self) -> usize {
        self.state.info_calls.load(Ordering::SeqCst)
    }

    pub fn send_coin_calls(&self) -> usize {
        self.state.send_coin_calls.load(Ordering::SeqCst)
    }

    pub fn buy_calls(&self) -> usize {
        self.state.buy_calls.load(Ordering::SeqCst)
    }

    /// Whether a scenario request arrived before setup finished
    pub fn scenario_before_setup(&self) -> bool {
        self.state.scenario_before_setup.load(Ordering::SeqCst)
    }

    pub fn tokens_seen(&self) -> HashSet<String> {
        self.state.tokens_seen.lock().unwrap().clone()
    }

    async fn respond(&self, status: u16, body: String) -> Reply {
        let start = Instant::now();
        tokio::time::sleep(self.state.latency).await;
        Reply::new(status, start.elapsed(), body)
    }

    fn scenario_call(&self, token: &str) {
        if self.auth_calls() < self.state.expected_identities {
            self.state.scenario_before_setup.store(true, Ordering::SeqCst);
        }
        self.state
            .tokens_seen
            .lock()
            .unwrap()
            .insert(token.to_string());
    }
}

#[async_trait]
impl TargetService for MockTarget {
    async fn auth(&self, credentials: &Credentials) -> Result<Reply, TargetError> {
        let reply = if self.state.rejected_users.contains(&credentials.username) {
            self.respond(401, json!({"errors": "invalid credentials"}).to_string())
                .await
        } else {
            let token = format!("tok-{}", credentials.username);
            self.respond(200, json!({ "token": token }).to_string()).await
        };
        self.state.auth_calls.fetch_add(1, Ordering::SeqCst);
        Ok(reply)
    }

    async fn info(&self, token: &str) -> Result<Reply, TargetError> {
        self.scenario_call(token);
        let n = self.state.info_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let status = match self.state.info_fail_every {
            Some(every) if n % every == 0 => 500,
            _ => 200,
        };
        Ok(self.respond(status, json!({"coins": 1000}).to_string()).await)
    }

    async fn send_coin(&self, token: &str, _transfer: &Transfer) -> Result<Reply, TargetError> {
        self.scenario_call(token);
        self.state.send_coin_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.respond(200, String::new()).await)
    }

    async fn buy(&self, token: &str, _item: &str) -> Result<Reply, TargetError> {
        self.scenario_call(token);
        self.state.buy_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.respond(200, String::new()).await)
    }
}

// ============================================================================
// HTTP mock of the shop API
// ============================================================================

/// Requests seen by the HTTP mock
#[derive(Default)]
pub struct ShopLedger {
    pub logins: AtomicUsize,
    pub infos: AtomicUsize,
    pub transfers: Mutex<Vec<(String, Transfer)>>,
    pub purchases: Mutex<Vec<String>>,
}

#[derive(Clone)]
struct ShopState {
    password: String,
    catalog: Vec<String>,
    ledger: Arc<ShopLedger>,
}

/// Bearer token -> username
fn authorized(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer tok-")
        .map(String::from)
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "errors": message })))
}

async fn auth(
    State(state): State<ShopState>,
    Json(credentials): Json<Credentials>,
) -> (StatusCode, Json<serde_json::Value>) {
    state.ledger.logins.fetch_add(1, Ordering::SeqCst);
    if credentials.password != state.password {
        return error(StatusCode::UNAUTHORIZED, "invalid credentials");
    }
    (
        StatusCode::OK,
        Json(json!({ "token": format!("tok-{}", credentials.username) })),
    )
}

async fn info(
    State(state): State<ShopState>,
    headers: HeaderMap,
) -> (StatusCode, Json<serde_json::Value>) {
    if authorized(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "unauthorized");
    }
    state.ledger.infos.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!({ "coins": 1000, "inventory": [], "coinHistory": {} })),
    )
}

async fn send_coin(
    State(state): State<ShopState>,
    headers: HeaderMap,
    Json(transfer): Json<Transfer>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(sender) = authorized(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "unauthorized");
    };
    if sender == transfer.to_user {
        return error(StatusCode::BAD_REQUEST, "cannot send coins to yourself");
    }
    state.ledger.transfers.lock().unwrap().push((sender, transfer));
    (StatusCode::OK, Json(json!({})))
}

async fn buy(
    State(state): State<ShopState>,
    headers: HeaderMap,
    Path(item): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    if authorized(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "unauthorized");
    }
    if !state.catalog.contains(&item) {
        return error(StatusCode::BAD_REQUEST, "unknown item");
    }
    state.ledger.purchases.lock().unwrap().push(item);
    (StatusCode::OK, Json(json!({})))
}

/// Create the shop API router
pub fn create_shop_app(password: &str, catalog: &[&str], ledger: Arc<ShopLedger>) -> Router {
    let state = ShopState {
        password: password.to_string(),
        catalog: catalog.iter().map(|s| s.to_string()).collect(),
        ledger,
    };

    Router::new()
        .route("/api/auth", post(auth))
        .route("/api/info", get(info))
        .route("/api/sendCoin", post(send_coin))
        .route("/api/buy/:item", get(buy))
        .with_state(state)
}

/// Serve the shop API on an ephemeral port; returns its base URL and ledger
pub async fn spawn_shop(password: &str, catalog: &[&str]) -> (String, Arc<ShopLedger>) {
    let ledger = Arc::new(ShopLedger::default());
    let app = create_shop_app(password, catalog, ledger.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock shop");
    let addr: SocketAddr = listener.local_addr().expect("Mock shop has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock shop failed");
    });

    (format!("http://{}", addr), ledger)
}

// ============================================================================
// Logging
// ============================================================================

/// Initialize test logging for detailed output
pub fn init_test_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "merch_loadgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
