//! HTTP API Layer
//!
//! REST surface of the claim decision engine using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: claim decisions, the human review queue, health
//! - **Middleware**: JWT authentication and request logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: domain errors mapped onto HTTP status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(orchestrator, config).with_health_check(store);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_claims::DecisionOrchestrator;

use crate::config::ApiConfig;
use crate::handlers::{decisions, health, reviews};
use crate::middleware::{auth_middleware, request_log_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DecisionOrchestrator>,
    /// Adapters consulted by the readiness probe
    pub health: Arc<Vec<Arc<dyn HealthCheckable>>>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(orchestrator: Arc<DecisionOrchestrator>, config: ApiConfig) -> Self {
        Self {
            orchestrator,
            health: Arc::new(Vec::new()),
            config,
        }
    }

    pub fn with_health_check(mut self, check: Arc<dyn HealthCheckable>) -> Self {
        Arc::make_mut(&mut self.health).push(check);
        self
    }
}

/// Creates the main API router
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let claims_routes = Router::new().route("/decisions", post(decisions::decide_claim));

    let review_routes = Router::new()
        .route("/", get(reviews::list_pending))
        .route("/history", get(reviews::list_history))
        .route("/stats", get(reviews::statistics))
        .route("/:id", get(reviews::get_review))
        .route("/:id/resolve", post(reviews::resolve_review));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/claims", claims_routes)
        .nest("/reviews", review_routes)
        .layer(axum_middleware::from_fn(request_log_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
