//! HTTP and WebSocket surface of the newsroom service.

use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod auth;
pub mod error;
pub mod events;
pub mod extract;
pub mod handlers;
pub mod services;
pub mod state;

pub use auth::AuthConfig;
pub use error::{ApiError, ApiResult};
pub use events::EventHub;
pub use state::AppState;

pub const DEFAULT_UPLOAD_LIMIT_MB: usize = 10;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub upload_limit_bytes: usize,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            upload_limit_bytes: DEFAULT_UPLOAD_LIMIT_MB * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    use handlers::{articles, auth as auth_routes, brand_voices, distribute, process, ws};

    let protected = Router::new()
        .route("/api/auth/me", get(auth_routes::me))
        .route("/api/auth/preferences", put(auth_routes::update_preferences))
        .route(
            "/api/auth/social/:platform",
            post(auth_routes::connect_social).delete(auth_routes::disconnect_social),
        )
        .route("/api/auth/users", get(auth_routes::list_users))
        .route("/api/auth/users/:id/role", put(auth_routes::update_role))
        .route("/api/articles", get(articles::list_articles).post(articles::create_article))
        .route("/api/articles/upload", post(articles::upload_article))
        .route("/api/articles/import", post(articles::import_article))
        .route("/api/articles/generate", post(articles::generate_article))
        .route(
            "/api/articles/:id",
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        .route("/api/articles/:id/content", get(articles::article_contents))
        .route(
            "/api/brand-voices",
            get(brand_voices::list_brand_voices).post(brand_voices::create_brand_voice),
        )
        .route(
            "/api/brand-voices/:id",
            get(brand_voices::get_brand_voice)
                .put(brand_voices::update_brand_voice)
                .delete(brand_voices::delete_brand_voice),
        )
        .route("/api/process/detect", post(process::detect))
        .route("/api/process/content/:content_id", put(process::update_content))
        .route("/api/process/:article_id", post(process::process_article))
        .route("/api/process/:article_id/status", get(process::status))
        .route("/api/distribute/article/:article_id", post(distribute::distribute_article))
        .route("/api/distribute/:content_id", post(distribute::distribute_content))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware));

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/register", post(auth_routes::register))
        .route("/api/auth/login", post(auth_routes::login))
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(config.upload_limit_bytes))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the listener and serves until the process is stopped.
pub async fn serve(state: AppState, config: ServerConfig) -> nr_core::Result<()> {
    let app = build_router(state, &config);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("🚀 Newsroom listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{build_router, serve, AppState, AuthConfig, ServerConfig};
    pub use nr_core::{Error, Result};
}
