//! # solace_api
//!
//! HTTP API library for Solace.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{delete, get, post};
use solace_core::auth::accounts::AccountService;
use solace_core::auth::queries::PgAuthStore;
use solace_core::auth::session::SessionManager;
use solace_core::auth::store::AuthStore;
use solace_core::llm::{self, ChatCompletion, LlmError, openai};
use sqlx::PgPool;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{agent, auth, chat, contacts, emotion, health, mood};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: Arc<ApiConfig>,
    pub sessions: Arc<SessionManager>,
    pub accounts: Arc<AccountService>,
    /// Classification and chat oracle.
    pub llm: Arc<dyn ChatCompletion>,
}

impl AppState {
    /// Assemble state from explicit collaborators.
    pub fn new(
        pool: PgPool,
        config: ApiConfig,
        store: Arc<dyn AuthStore>,
        llm: Arc<dyn ChatCompletion>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::from_settings(store, &config.auth));
        let accounts = Arc::new(AccountService::new(
            sessions.clone(),
            config.auth.registration_enabled,
        ));
        Self {
            pool,
            config: Arc::new(config),
            sessions,
            accounts,
            llm,
        }
    }

    /// Production wiring: PostgreSQL auth store and the configured oracle.
    pub fn from_config(pool: PgPool, config: ApiConfig) -> Result<Self, LlmError> {
        let llm = llm::from_settings(&config.llm)?;
        let store = Arc::new(PgAuthStore::new(pool.clone()));
        Ok(Self::new(pool, config, store, llm))
    }
}

/// Run embedded database migrations.
///
/// Delegates to `solace_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    solace_core::migrate::migrate(pool).await
}

/// Slack on top of the oracle's worst case for the rest of a request.
const REQUEST_SLACK: Duration = Duration::from_secs(30);

/// Upper bound for one request: the slowest oracle call plus slack.
fn request_timeout(config: &ApiConfig) -> Duration {
    openai::worst_case_duration(&config.llm) + REQUEST_SLACK
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public = Router::new()
        .route("/api/health", get(health::health_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/refresh", post(auth::refresh_handler))
        .route("/api/auth/logout", post(auth::logout_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(
            "/api/auth/me",
            get(auth::me_handler).put(auth::update_me_handler),
        )
        .route("/api/auth/logout-all", post(auth::logout_all_handler))
        .route("/api/auth/sessions", get(auth::sessions_handler))
        .route("/api/emotion", post(emotion::emotion_handler))
        .route("/api/agent/decide", post(agent::decide_handler))
        .route("/api/chat", post(chat::chat_handler))
        .route(
            "/api/mood",
            get(mood::list_entries_handler).post(mood::create_entry_handler),
        )
        .route(
            "/api/mood/{id}",
            get(mood::get_entry_handler)
                .put(mood::update_entry_handler)
                .delete(mood::delete_entry_handler),
        )
        .route(
            "/api/emergency-contacts",
            get(contacts::list_contacts_handler).post(contacts::create_contact_handler),
        )
        .route(
            "/api/emergency-contacts/{id}",
            delete(contacts::delete_contact_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let timeout = request_timeout(&state.config);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
