//! Market Data Backend Server
//!
//! Real-time price streaming server: upstream vendor feed, latest-price
//! cache, and WebSocket fan-out to dashboard clients.

use market_data_backend::api::create_router;
use market_data_backend::config::Config;
use market_data_backend::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use market_data_backend::models::{
    FeedActionResponse, FeedStatusResponse, HealthResponse, PriceResponse, PricesListResponse,
};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        market_data_backend::api::handlers::health_check,
        market_data_backend::api::handlers::get_all_prices,
        market_data_backend::api::handlers::get_latest_price,
        market_data_backend::api::handlers::get_feed_status,
        market_data_backend::api::handlers::connect_feed,
        market_data_backend::api::handlers::disconnect_feed,
        market_data_backend::api::websocket::ws_handler,
    ),
    components(
        schemas(
            HealthResponse,
            PriceResponse,
            PricesListResponse,
            FeedStatusResponse,
            FeedActionResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Prices", description = "Cached price queries"),
        (name = "Feed", description = "Upstream feed control"),
        (name = "WebSocket", description = "Real-time streaming"),
    ),
    info(
        title = "Market Data API",
        version = "0.2.0",
        description = "Real-time market data streaming backend",
        license(name = "MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration: CONFIG_PATH, else config.toml, else defaults
    let config = match std::env::var("CONFIG_PATH") {
        Ok(path) => Config::load(&path)?,
        Err(_) => match Config::load("config.toml") {
            Ok(config) => config,
            Err(err) => {
                warn!("no config file loaded ({}), using defaults", err);
                Config::default()
            }
        },
    }
    .with_env_overrides();

    let host = config.server.host.clone();
    let port = config.server.port;

    // Create application state
    let state = Arc::new(AppState::from_config(config));

    // Drain feed events into the hub
    state.spawn_event_pump();

    // Open the upstream feed in the background; failures are retried
    // with backoff and never block startup.
    if state.feed.enabled() {
        let feed = Arc::clone(&state.feed);
        tokio::spawn(async move {
            feed.connect().await;
        });
    }

    info!("Starting Market Data Backend on {}:{}", host, port);
    info!(
        "Swagger UI available at http://{}:{}/swagger-ui/",
        host, port
    );

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = create_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start the server
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
