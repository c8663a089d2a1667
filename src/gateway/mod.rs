//! Axum-based HTTP gateway.
//!
//! - JSON auth endpoints: `/register`, `/login`, `/logout`, `/me`,
//!   `/check-username`
//! - Gated JSON endpoints: `/hello`, `/hash`
//! - Server-rendered pages: `/`, `/auth.html`, gated `/api.html`
//! - Request body limit and request timeout on every route

pub mod cookie;
pub mod gate;
pub mod pages;
pub mod responses;

use crate::auth::{
    AuthError, AuthService, AuthSettings, CredentialStore, PasswordHasher, Registration,
    SessionRegistry, SessionStore,
};
use crate::config::{Config, GatewayConfig};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::FormRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{any, get, post},
    Form, Router,
};
use self::cookie::CookieSettings;
use responses::{error_reply, ApiReply, ApiResponse, HashResponse, MeResponse, UsernameAvailability};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    /// Same registry the auth service writes to; read by the access gate.
    pub sessions: Arc<dyn SessionStore>,
    pub cookie: CookieSettings,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, cookie: CookieSettings) -> Self {
        let sessions = Arc::clone(auth.sessions());
        Self {
            auth,
            sessions,
            cookie,
        }
    }

    /// Wire the store, hasher and a fresh session registry together.
    pub fn from_parts(
        store: CredentialStore,
        hasher: PasswordHasher,
        settings: AuthSettings,
        cookie: CookieSettings,
    ) -> Result<Self, AuthError> {
        let sessions: Arc<dyn SessionStore> = Arc::new(SessionRegistry::new());
        let auth = AuthService::new(Arc::new(store), hasher, sessions, settings)?;
        Ok(Self::new(Arc::new(auth), cookie))
    }

    fn distinct_login_errors(&self) -> bool {
        self.auth.settings().distinct_login_errors
    }
}

/// Build the state described by `config`. Fails if the database cannot be
/// opened.
pub fn build_state(config: &Config) -> Result<AppState> {
    let db_path = config.storage.resolved_db_path();
    let store = CredentialStore::open(&db_path)
        .with_context(|| format!("failed to open credential store at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "Credential store ready");

    let hasher = PasswordHasher::new(config.auth.bcrypt_cost)?;
    let settings = AuthSettings {
        allow_registration: config.auth.allow_registration,
        distinct_login_errors: config.auth.distinct_login_errors,
    };
    let cookie = CookieSettings {
        name: config.auth.cookie_name.clone(),
        max_age_secs: config.auth.cookie_max_age_secs,
    };
    Ok(AppState::from_parts(store, hasher, settings, cookie)?)
}

/// All routes plus body-limit and timeout middleware.
pub fn router(state: AppState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/", get(pages::handle_index))
        .route("/auth.html", get(pages::handle_auth_page))
        .route("/api.html", get(pages::handle_api_page))
        .route("/health", get(handle_health))
        .route("/register", post(handle_register).get(handle_register_get))
        .route("/login", post(handle_login))
        .route("/logout", any(handle_logout))
        .route("/me", get(handle_me))
        .route("/check-username", get(handle_check_username))
        .route("/hello", get(handle_hello))
        .route("/hash", get(handle_hash))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(gateway.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(gateway.request_timeout_secs),
        ))
}

/// Run the HTTP gateway until Ctrl-C.
pub async fn run_gateway(config: Config) -> Result<()> {
    let state = build_state(&config)?;

    let host = config.gateway.host.as_str();
    let port = config.gateway.port;
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        addr = %local_addr,
        bcrypt_cost = config.auth.bcrypt_cost,
        "authgate listening"
    );

    let app = router(state, &config.gateway);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("authgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Run blocking auth work (SQLite, bcrypt) off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, AuthError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AuthError::Internal(format!("blocking task failed: {e}")))?
}

// ══════════════════════════════════════════════════════════════════════════════
// AUTH HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// Form body for registration. Missing fields deserialize as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Form body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsernameQuery {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HashQuery {
    #[serde(default)]
    pub password: Option<String>,
}

fn form_rejection(err: &FormRejection) -> ApiReply {
    error_reply(&AuthError::Validation(format!("invalid form: {err}")), false)
}

/// GET /health
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.sessions.len(),
    }))
}

/// POST /register: create a user from `username`, `password`, `email`.
async fn handle_register(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> ApiReply {
    let form = match form {
        Ok(Form(f)) => f,
        Err(e) => return form_rejection(&e),
    };

    let current_token = state.cookie.read(&headers);
    let registration = Registration {
        username: form.username,
        password: form.password,
        email: form.email,
    };

    let auth = Arc::clone(&state.auth);
    match run_blocking(move || auth.register(&registration, current_token.as_deref())).await {
        Ok(_) => (StatusCode::OK, Json(ApiResponse::ok_with("user registered"))),
        Err(e) => error_reply(&e, state.distinct_login_errors()),
    }
}

/// GET /register
async fn handle_register_get() -> ApiReply {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiResponse::err("registration requires POST")),
    )
}

/// POST /login: verify credentials and set the session cookie.
async fn handle_login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(f)) => f,
        Err(e) => return form_rejection(&e).into_response(),
    };

    let auth = Arc::clone(&state.auth);
    let token = match run_blocking(move || auth.login(&form.username, &form.password)).await {
        Ok(token) => token,
        Err(e) => return error_reply(&e, state.distinct_login_errors()).into_response(),
    };

    match state.cookie.issue(&token) {
        Ok(cookie) => (
            [(header::SET_COOKIE, cookie)],
            Json(ApiResponse::ok()),
        )
            .into_response(),
        Err(e) => {
            state.sessions.delete(&token);
            error_reply(
                &AuthError::Internal(format!("session cookie rejected: {e}")),
                false,
            )
            .into_response()
        }
    }
}

/// ANY /logout: drop the session and clear the cookie.
async fn handle_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let body = Json(ApiResponse::ok_with("logged out"));
    if !state.auth.logout(state.cookie.read(&headers).as_deref()) {
        return body.into_response();
    }
    match state.cookie.clear() {
        Ok(cookie) => ([(header::SET_COOKIE, cookie)], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to build clearing cookie: {e}");
            body.into_response()
        }
    }
}

/// GET /me: who the session cookie belongs to.
async fn handle_me(State(state): State<AppState>, headers: HeaderMap) -> Json<MeResponse> {
    let username = match gate::resolve(&state, &headers) {
        gate::Access::Authenticated(username) => Some(username),
        gate::Access::Unauthenticated => None,
    };
    Json(MeResponse {
        logged: username.is_some(),
        username,
    })
}

/// GET /check-username?username=
async fn handle_check_username(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Response {
    let username = query.username.unwrap_or_default();
    let auth = Arc::clone(&state.auth);
    match run_blocking(move || auth.username_available(&username)).await {
        Ok(available) => Json(UsernameAvailability {
            success: true,
            available,
            message: if available {
                "username available".into()
            } else {
                "username already taken".into()
            },
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// GATED API HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// GET /hello
async fn handle_hello(State(state): State<AppState>, headers: HeaderMap) -> ApiReply {
    match gate::require_api_session(&state, &headers) {
        Ok(_) => (StatusCode::OK, Json(ApiResponse::ok_with("Hello, API!"))),
        Err(rejection) => rejection,
    }
}

/// GET /hash?password=: bcrypt a password with the configured cost.
async fn handle_hash(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashQuery>,
) -> Response {
    if let Err(rejection) = gate::require_api_session(&state, &headers) {
        return rejection.into_response();
    }

    let password = query.password.unwrap_or_default();
    let auth = Arc::clone(&state.auth);
    match run_blocking(move || auth.hash_password(&password)).await {
        Ok(hash) => Json(HashResponse {
            success: true,
            hash,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    test_state_with(AuthSettings::default())
}

#[cfg(test)]
pub(crate) fn test_state_with(settings: AuthSettings) -> AppState {
    AppState::from_parts(
        CredentialStore::in_memory().unwrap(),
        PasswordHasher::new(crate::auth::password::MIN_COST).unwrap(),
        settings,
        CookieSettings::default(),
    )
    .unwrap()
}
