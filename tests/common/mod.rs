// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test harness: a mock gateway plus wired client handles.
//!
//! The mock gateway is a real axum server on an ephemeral port. It mints
//! sequential tokens (`A1`/`R1`, `A2`/`R2`, ...) and tracks every hit so
//! tests can assert on exact request counts.

use axum::extract::{Form, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mesa_client::config::Config;
use mesa_client::guards::{Navigator, Route};
use mesa_client::store::MemoryStore;
use mesa_client::MesaClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

pub const USER_EMAIL: &str = "alma@mesa.example";
pub const USER_PASSWORD: &str = "hunter2";

static INIT: Once = Once::new();

/// Initialize test logging once (RUST_LOG controls verbosity).
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Mutable behavior and counters of the mock gateway.
#[derive(Default)]
pub struct GatewayState {
    /// Access token the protected endpoints currently accept
    pub valid_access: Mutex<String>,
    /// Refresh token the token endpoint currently accepts
    pub valid_refresh: Mutex<String>,
    pub token_counter: AtomicUsize,
    pub password_hits: AtomicUsize,
    pub refresh_hits: AtomicUsize,
    pub protected_hits: AtomicUsize,
    /// Whether any public endpoint ever saw an Authorization header
    pub public_auth_header_seen: AtomicBool,
    /// Form fields of the most recent token request
    pub last_token_request: Mutex<Option<HashMap<String, String>>>,
    /// Reject refresh grants with 401
    pub fail_refresh: AtomicBool,
    /// Protected endpoints answer 401 regardless of token
    pub reject_all: AtomicBool,
    /// User endpoints answer 500
    pub fail_users: AtomicBool,
    /// Delay applied to refresh grants, for overlap tests
    pub refresh_delay_ms: AtomicU64,
    /// expires_in reported by the token endpoints
    pub expires_in_secs: AtomicI64,
    /// Role names returned by the user endpoints
    pub roles: Mutex<Vec<String>>,
}

impl GatewayState {
    fn mint_tokens(&self) -> Value {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let access = format!("A{n}");
        let refresh = format!("R{n}");
        *self.valid_access.lock().unwrap() = access.clone();
        *self.valid_refresh.lock().unwrap() = refresh.clone();
        json!({
            "access_token": access,
            "refresh_token": refresh,
            "expires_in": self.expires_in_secs.load(Ordering::SeqCst),
            "token_type": "Bearer",
        })
    }

    fn profile(&self, id: u64) -> Value {
        let roles: Vec<Value> = self
            .roles
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                json!({
                    "id": i + 1,
                    "nombre": name,
                    "descripcion": "rol de prueba",
                    "activo": true,
                })
            })
            .collect();

        json!({
            "id": id,
            "nombre": "Alma",
            "apellido": "Reyes",
            "correo": USER_EMAIL,
            "activo": true,
            "roles": roles,
        })
    }
}

/// Running mock gateway.
pub struct MockGateway {
    pub base_url: String,
    pub state: Arc<GatewayState>,
}

#[allow(dead_code)]
impl MockGateway {
    pub fn refresh_hits(&self) -> usize {
        self.state.refresh_hits.load(Ordering::SeqCst)
    }

    pub fn protected_hits(&self) -> usize {
        self.state.protected_hits.load(Ordering::SeqCst)
    }

    pub fn current_access(&self) -> String {
        self.state.valid_access.lock().unwrap().clone()
    }

    /// Make every previously issued access token invalid without touching
    /// the refresh token (simulates server-side invalidation).
    pub fn invalidate_access(&self) {
        *self.state.valid_access.lock().unwrap() = "<revoked>".to_string();
    }

    pub fn set_fail_refresh(&self, fail: bool) {
        self.state.fail_refresh.store(fail, Ordering::SeqCst);
    }

    pub fn set_reject_all(&self, reject: bool) {
        self.state.reject_all.store(reject, Ordering::SeqCst);
    }

    pub fn set_fail_users(&self, fail: bool) {
        self.state.fail_users.store(fail, Ordering::SeqCst);
    }

    pub fn set_refresh_delay_ms(&self, delay: u64) {
        self.state.refresh_delay_ms.store(delay, Ordering::SeqCst);
    }

    pub fn set_expires_in_secs(&self, secs: i64) {
        self.state.expires_in_secs.store(secs, Ordering::SeqCst);
    }

    pub fn set_roles(&self, roles: &[&str]) {
        *self.state.roles.lock().unwrap() = roles.iter().map(|r| r.to_string()).collect();
    }

    pub fn last_token_request(&self) -> Option<HashMap<String, String>> {
        self.state.last_token_request.lock().unwrap().clone()
    }
}

/// Spawn the mock gateway on an ephemeral port.
pub async fn spawn_gateway() -> MockGateway {
    init_tracing();

    let state = Arc::new(GatewayState::default());
    state.expires_in_secs.store(3600, Ordering::SeqCst);
    state
        .roles
        .lock()
        .unwrap()
        .push("usuario".to_string());

    let app = Router::new()
        .route("/auth/token", post(token_endpoint))
        .route("/auth/login", post(app_login))
        .route("/api/users/me", get(user_me))
        .route("/api/users/{id}", get(user_by_id))
        .route("/api/reservas", get(reservations))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock gateway");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock gateway");
    });

    MockGateway {
        base_url: format!("http://{addr}"),
        state,
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

type Shared = Arc<GatewayState>;

fn error_body(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "error": error }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
}

async fn token_endpoint(
    State(state): State<Shared>,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    state
        .public_auth_header_seen
        .fetch_or(headers.contains_key(header::AUTHORIZATION), Ordering::SeqCst);
    *state.last_token_request.lock().unwrap() = Some(params.clone());

    match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            state.password_hits.fetch_add(1, Ordering::SeqCst);
            let ok = params.get("username").map(String::as_str) == Some(USER_EMAIL)
                && params.get("password").map(String::as_str) == Some(USER_PASSWORD);
            if !ok {
                return error_body(StatusCode::UNAUTHORIZED, "invalid_grant");
            }
            Json(state.mint_tokens()).into_response()
        }
        Some("refresh_token") => {
            state.refresh_hits.fetch_add(1, Ordering::SeqCst);

            let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            if state.fail_refresh.load(Ordering::SeqCst) {
                return error_body(StatusCode::UNAUTHORIZED, "invalid_grant");
            }

            let expected = state.valid_refresh.lock().unwrap().clone();
            if params.get("refresh_token") != Some(&expected) {
                return error_body(StatusCode::UNAUTHORIZED, "invalid_grant");
            }

            Json(state.mint_tokens()).into_response()
        }
        _ => error_body(StatusCode::BAD_REQUEST, "unsupported_grant_type"),
    }
}

async fn app_login(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state
        .public_auth_header_seen
        .fetch_or(headers.contains_key(header::AUTHORIZATION), Ordering::SeqCst);

    let ok = body.get("email").and_then(Value::as_str) == Some(USER_EMAIL)
        && body.get("password").and_then(Value::as_str) == Some(USER_PASSWORD);
    if !ok {
        return error_body(StatusCode::UNAUTHORIZED, "invalid_credentials");
    }

    Json(state.mint_tokens()).into_response()
}

fn check_protected(state: &GatewayState, headers: &HeaderMap) -> Option<Response> {
    if state.reject_all.load(Ordering::SeqCst) {
        return Some(error_body(StatusCode::UNAUTHORIZED, "unauthorized"));
    }
    let expected = state.valid_access.lock().unwrap().clone();
    match bearer(headers) {
        Some(token) if token == expected => None,
        _ => Some(error_body(StatusCode::UNAUTHORIZED, "unauthorized")),
    }
}

async fn user_me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if state.fail_users.load(Ordering::SeqCst) {
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, "boom");
    }
    if let Some(denied) = check_protected(&state, &headers) {
        return denied;
    }
    Json(state.profile(7)).into_response()
}

async fn user_by_id(
    State(state): State<Shared>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    if state.fail_users.load(Ordering::SeqCst) {
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, "boom");
    }
    if let Some(denied) = check_protected(&state, &headers) {
        return denied;
    }
    Json(state.profile(id)).into_response()
}

async fn reservations(State(state): State<Shared>, headers: HeaderMap) -> Response {
    state.protected_hits.fetch_add(1, Ordering::SeqCst);
    if let Some(denied) = check_protected(&state, &headers) {
        return denied;
    }
    Json(json!([
        { "id": 1, "restaurante": "La Parrilla", "estado": "confirmada" },
        { "id": 2, "restaurante": "Casa Verde", "estado": "pendiente" }
    ]))
    .into_response()
}

// ─── Client Wiring ───────────────────────────────────────────────────────────

/// Navigator that records every navigation request.
#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

/// Wired client plus direct handles on its collaborators.
pub struct TestClient {
    pub client: MesaClient,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
}

/// Config pointed at the mock gateway.
pub fn test_config(gateway: &MockGateway) -> Config {
    Config {
        api_base_url: gateway.base_url.clone(),
        token_url: format!("{}/auth/token", gateway.base_url),
        client_id: "mesa-web".to_string(),
        client_secret: "s3cret".to_string(),
        scope: Some("api".to_string()),
        renewal_margin_secs: 60,
    }
}

/// Build a client with the default test config.
#[allow(dead_code)]
pub fn build_client(gateway: &MockGateway) -> TestClient {
    build_client_with(test_config(gateway))
}

/// Build a client with a custom config (e.g. a short renewal margin).
pub fn build_client_with(config: Config) -> TestClient {
    let store = Arc::new(MemoryStore::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let client = MesaClient::new(config, store.clone(), navigator.clone());
    TestClient {
        client,
        store,
        navigator,
    }
}
