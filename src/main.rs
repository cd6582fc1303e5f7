//! Directory Admin Backend
//!
//! Moderation, taxonomy and user management for the product directory, with
//! optimistic view state and undoable deletes over a SQLite store.

mod api;
mod auth;
mod cache;
mod config;
mod dashboard;
mod db;
mod errors;
mod models;
mod optimistic;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::{AuthProvider, SessionAuth};
use cache::ViewCache;
use config::Config;
use dashboard::Dashboard;
use db::{DataStore, SqliteStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub auth: Arc<dyn AuthProvider>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Directory Admin Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Undo window: {:?}", config.undo_window);

    if config.service_key.is_none() {
        tracing::warn!(
            "No service key configured (DIRADMIN_SERVICE_KEY). Only session tokens can reach the dashboard"
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let store: Arc<dyn DataStore> = Arc::new(SqliteStore::new(pool));

    // Mount every view
    let dashboard =
        Dashboard::mount(store.clone(), Arc::new(ViewCache::new()), config.undo_window).await?;

    let state = AppState {
        dashboard: Arc::new(dashboard),
        auth: Arc::new(SessionAuth::new(store, config.service_key.clone())),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Admin routes
    let admin_routes = Router::new()
        // Overview
        .route("/overview", get(api::get_overview))
        // Products
        .route("/products", get(api::list_products))
        .route("/products/approve-pending", post(api::approve_pending))
        .route("/products/{id}", delete(api::delete_product))
        .route("/products/{id}/approval", put(api::set_approval))
        .route("/products/{id}/undo", post(api::undo_delete))
        // Filters
        .route("/filters", get(api::list_filters))
        .route("/filters/{kind}/{id}", put(api::update_filter))
        // Users
        .route("/users", get(api::list_users))
        .route("/users/{id}", put(api::update_user))
        // Apply the admin gate
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_admin,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api/admin", admin_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod testing;
