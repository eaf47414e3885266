use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use runtime::{CommandRunner, ContainerRuntime};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{health, shops, translations};
use crate::services::{Provisioner, TranslationExchange};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub provisioner: Arc<Provisioner>,
    pub translations: Arc<TranslationExchange>,
}

/// Builds the router with the standard translation source chain.
pub fn create_app(config: Config, runtime: Arc<dyn ContainerRuntime>) -> Router {
    let runner = CommandRunner::new(runtime.clone(), config.docker.app_container.clone());
    let translations = TranslationExchange::new(runner, &config.translations);
    create_app_with_translations(config, runtime, translations)
}

pub fn create_app_with_translations(
    config: Config,
    runtime: Arc<dyn ContainerRuntime>,
    translations: TranslationExchange,
) -> Router {
    let config = Arc::new(config);
    let provisioner = Provisioner::new(runtime.clone(), config.clone());

    let state = AppState {
        config: config.clone(),
        runtime,
        provisioner: Arc::new(provisioner),
        translations: Arc::new(translations),
    };

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // No request timeout here: a cold run takes minutes and is bounded by
    // the readiness probe and its own commands.
    let shop_routes = Router::new().route("/create_shop", post(shops::create_shop));

    let request_timeout = TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs));

    let translation_routes = Router::new()
        .route(
            "/download_transcriptions/:tenant",
            get(translations::download_transcriptions),
        )
        .route("/download_csv/:tenant", get(translations::download_csv))
        .route(
            "/upload_csv/:tenant",
            post(translations::upload_csv)
                .layer(DefaultBodyLimit::max(config.server.max_upload_bytes)),
        )
        .layer(request_timeout.clone());

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler))
        .layer(request_timeout);

    Router::new()
        .merge(public_routes)
        .merge(shop_routes)
        .merge(translation_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
