mod config;
mod docs;
mod handlers;
mod models;
mod routes;
mod services;
mod session;
mod websocket;

use axum::{routing::get, Router};
use std::panic;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use docs::ApiDoc;
use routes::create_api_routes;
use services::exec_service::ExecService;
use session::registry::SessionRegistry;
use websocket::gateway::ConnectionGateway;
use websocket::handler::websocket_handler;

/// Shared process state: the room registry, the connection gateway and
/// the execution collaborator
pub struct AppState {
    pub config: Config,
    pub registry: Arc<SessionRegistry>,
    pub gateway: ConnectionGateway,
    pub executor: ExecService,
}

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "pairpad=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    info!("Environment: {}", config.environment);

    let executor = ExecService::new(&config);
    let state = Arc::new(AppState {
        registry: Arc::new(SessionRegistry::new()),
        gateway: ConnectionGateway::new(),
        executor,
        config,
    });

    // Start the idle-room reaper
    let sweeper = SessionRegistry::start_sweeper(
        state.registry.clone(),
        state.config.room_sweep_interval(),
        state.config.room_idle_timeout(),
    );

    // Combine all routes
    let app_routes = Router::new()
        // Mount API routes
        .nest("/api", create_api_routes(state.clone()))
        // Mount the collaboration websocket
        .merge(
            Router::new()
                .route("/ws", get(websocket_handler))
                .with_state(state.clone()),
        )
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing and CORS layers
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(state.config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", state.config.server_address()));

    info!("🚀 Server running on http://{}", state.config.server_address());
    info!("📡 WebSocket available at ws://{}/ws", state.config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", state.config.server_address());

    axum::serve(listener, app_routes)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed to start");

    // Stop the reaper with the server
    sweeper.abort();
    info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
