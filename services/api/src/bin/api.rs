//! services/api/src/bin/api.rs

use api_lib::{
    adapters::IntercomSource,
    config::Config,
    error::ApiError,
    web::{conversations_handler, health_handler, require_key, rest::ApiDoc, state::AppState},
};
use axum::{
    http::{
        header::{HeaderName, ACCEPT, CONTENT_TYPE},
        Method,
    },
    middleware as axum_middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize the Upstream Adapter ---
    let source = Arc::new(IntercomSource::new(
        config.intercom_base_url.clone(),
        config.intercom_access_token.clone(),
        config.fetch_timeout_cap,
    )?);

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(source, config.clone()));

    // The report endpoint is called from browser pages on other origins; the
    // anonymous key, not the origin, is the gate.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static("x-api-key")]);

    // --- 4. Create the Web Router ---
    let protected_routes = Router::new()
        .route("/api", get(conversations_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_key,
        ));

    let api_router = Router::new()
        .route("/health", get(health_handler))
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
