mod handlers;
pub mod middleware;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::sync::Semaphore;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use middleware::{rate_limit_middleware, RateLimiter};

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Bounds how many jobs run external tools at once.
    pub job_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let slots = config.server.max_concurrent_jobs;
        Self {
            config: Arc::new(config),
            job_slots: Arc::new(Semaphore::new(slots)),
        }
    }
}

pub fn create_router(config: Config) -> Router {
    let state = AppState::new(config);

    let mut jobs: Router<AppState> = Router::new()
        .route("/jobs", post(handlers::submit_job))
        .layer(DefaultBodyLimit::max(state.config.server.max_body_bytes));
    if let Some(max_requests) = state.config.server.rate_limit_per_minute {
        let limiter = RateLimiter::new(max_requests, Duration::from_secs(60));
        jobs = jobs.route_layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    let api = Router::new()
        .merge(jobs)
        .route("/databases", get(handlers::list_databases))
        .route("/health", get(handlers::health));

    let cors = cors_layer(state.config.server.cors_origins.as_deref());

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = origins else {
        return CorsLayer::permissive();
    };

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
