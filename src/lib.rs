//! Tenant API Gateway
//!
//! Authenticates API clients on behalf of registered third-party domains,
//! issues and verifies short-lived bearer tokens, and enforces per-tenant
//! usage tiers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        TENANT GATEWAY                           │
//! │                                                                 │
//! │  request ─▶ ┌──────────┐ ─▶ ┌──────┐ ─▶ ┌─────────┐ ─▶ ┌───────┐ ─▶ handler
//! │             │  Origin  │    │ CORS │    │  Rate   │    │ Token │   │
//! │             │  Guard   │    │      │    │ Limiter │    │ Codec │   │
//! │             └────┬─────┘    └──────┘    └─────────┘    └───────┘   │
//! │                  │                                              │
//! │  ┌───────────────▼───────────────┐  ┌────────────────────────┐  │
//! │  │        Tenant Registry        │  │     Content Store      │  │
//! │  │  by origin host | by secret   │  │ posts | tags | follows │  │
//! │  └───────────────────────────────┘  └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod middleware;
pub mod models;
pub mod registry;
pub mod routes;
pub mod token;

use axum::{
    middleware::from_fn_with_state,
    routing::{any, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::clock::{Clock, SystemClock};
use crate::config::GatewayConfig;
use crate::content::{ContentStore, InMemoryContentStore};
use crate::middleware::{
    origin::cors_layer, OriginGuard, Pipeline, RateLimitStage, RateLimiter, Stage, TokenAuthStage,
};
use crate::registry::{InMemoryTenantRegistry, TenantRegistry};
use crate::token::TokenCodec;

pub use error::{GatewayError, GatewayResult};
pub use models::*;

/// Shared gateway state
pub struct GatewayState {
    pub registry: Arc<dyn TenantRegistry>,
    pub content: Arc<dyn ContentStore>,
    pub codec: Arc<TokenCodec>,
    pub limiter: Arc<RateLimiter>,
    /// `iss` claim of issued tokens
    pub issuer: String,
    pub config: GatewayConfig,
}

impl GatewayState {
    /// Wire the gateway against explicit collaborators and clock
    pub fn new(
        config: GatewayConfig,
        registry: Arc<dyn TenantRegistry>,
        content: Arc<dyn ContentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(config.auth.jwt_secret.as_bytes(), clock.clone()));
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone(), clock));

        Self {
            registry,
            content,
            codec,
            limiter,
            issuer: config.auth.issuer.clone(),
            config,
        }
    }

    /// Build state backed by the in-memory stores seeded from `config`
    pub fn from_config(config: GatewayConfig) -> Self {
        let registry = InMemoryTenantRegistry::seeded(config.tenants.clone(), config.accounts.clone());
        let content = InMemoryContentStore::seeded(
            config.accounts.clone(),
            config.content.posts.clone(),
            config.content.follows.clone(),
        );
        tracing::info!(tenants = registry.len(), "tenant registry loaded");

        Self::new(config, Arc::new(registry), Arc::new(content), Arc::new(SystemClock))
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tenant Gateway API",
        version = "2.0.0",
        description = "Token issuance and tenant-scoped resources",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::health_check,
        routes::token::issue_token,
        routes::posts::whoami,
        routes::posts::my_posts,
        routes::posts::posts_by_hashtag,
        routes::follow::follow_graph,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            TokenRequest, TokenIssued, ErrorBody,
            PostsResponse, FollowResponse,
            Post, Account, AccountId,
            token::Claims
        )
    ),
    modifiers(&TokenSecurity),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "token", description = "Token issuance"),
        (name = "posts", description = "Posts of the token's account"),
        (name = "follow", description = "Follow graph of the token's account")
    )
)]
pub struct ApiDoc;

struct TokenSecurity;

impl Modify for TokenSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            );
        }
    }
}

/// Build the gateway router
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let origin: Arc<dyn Stage> = Arc::new(OriginGuard::new(state.registry.clone()));
    let rate_limit: Arc<dyn Stage> = Arc::new(RateLimitStage::new(state.limiter.clone()));
    let token_auth: Arc<dyn Stage> = Arc::new(TokenAuthStage::new(state.codec.clone()));

    let public = Pipeline::new(vec![rate_limit.clone()]);
    let protected = Pipeline::new(vec![rate_limit, token_auth]);

    // Layers added last run first: origin guard, then CORS, then the v2 pipelines
    let v2 = v2_routes(public, protected)
        .layer(cors_layer(&state.config.cors))
        .layer(from_fn_with_state(Pipeline::new(vec![origin]), middleware::gateway));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/v2", v2)
        .route("/v1", any(routes::deprecated::deprecated))
        .route("/v1/*rest", any(routes::deprecated::deprecated))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn v2_routes(public: Pipeline, protected: Pipeline) -> Router<Arc<GatewayState>> {
    let issuance = Router::new()
        .route("/token", post(routes::token::issue_token))
        .layer(from_fn_with_state(public, middleware::gateway));

    let resources = Router::new()
        .route("/test", get(routes::posts::whoami))
        .route("/posts/my", get(routes::posts::my_posts))
        .route("/posts/hashtag/:title", get(routes::posts::posts_by_hashtag))
        .route("/follow", get(routes::follow::follow_graph))
        .layer(from_fn_with_state(protected, middleware::gateway));

    issuance.merge(resources)
}
