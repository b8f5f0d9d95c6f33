use std::net::SocketAddr;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod extract;
mod middleware;
mod routes;
mod services;

use services::ai::AiGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studyhub_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env();

    // Initialize database
    let db = db::Database::connect(&config.database_url).await?;
    db.run_migrations().await?;

    let ai = AiGateway::new(config.ai.clone())?;
    if !ai.is_configured() {
        tracing::warn!("OPENROUTER_API_KEY not set, AI features will answer with a notice");
    }

    // Build application state
    let state = AppState {
        db,
        config: config.clone(),
        ai,
    };

    let app = app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {} (public url {})", addr, config.public_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn app(state: AppState) -> Router {
    // Build protected routes (require a session)
    let protected_routes = Router::new()
        .nest("/auth", routes::auth::session_router())
        .merge(routes::dashboard::router())
        .nest("/subjects", routes::subjects::router())
        .nest("/notes", routes::notes::router())
        .merge(routes::ai::router())
        .nest("/exams", routes::exams::router())
        .nest("/groups", routes::groups::router())
        .nest("/leaderboard", routes::leaderboard::router())
        .nest("/notifications", routes::notifications::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Build API router
    let api_router = Router::new()
        .nest("/auth", routes::auth::router())
        .merge(protected_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub config: config::Config,
    pub ai: AiGateway,
}
