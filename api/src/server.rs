//! Axum-based HTTP server.

use std::future::Future;
use std::net::SocketAddr;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{optional_auth, require_auth};
use crate::error::ApiError;
use crate::handlers;
use crate::state::AppState;

/// Assemble every route over `state`.
///
/// Follow and membership routes require a bearer token. Search routes are
/// open, but `/searchUsersGroupMember` uses the caller when one is present.
pub fn build_router(state: AppState, cors_allow_any: bool) -> Router {
    let protected = Router::new()
        .route("/follow", post(handlers::follow))
        .route("/unfollow", post(handlers::unfollow))
        .route("/follow-status", get(handlers::follow_status))
        .route("/addMember", post(handlers::add_members))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let caller_aware = Router::new()
        .route(
            "/searchUsersGroupMember",
            get(handlers::search_users_excluding_group_members),
        )
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let public = Router::new()
        .route("/search", get(handlers::search_influencers_and_brands))
        .route("/searchUsersGroup", get(handlers::search_users))
        .route("/group/:group_id", get(handlers::group))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics));

    let router = Router::new()
        .merge(protected)
        .merge(caller_aware)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_allow_any {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// The HTTP server, bound to one address.
pub struct ApiServer {
    pub bind_addr: SocketAddr,
    pub state: AppState,
    pub cors_allow_any: bool,
}

impl ApiServer {
    pub fn new(bind_addr: SocketAddr, state: AppState) -> Self {
        Self {
            bind_addr,
            state,
            cors_allow_any: true,
        }
    }

    pub fn with_cors(mut self, allow_any: bool) -> Self {
        self.cors_allow_any = allow_any;
        self
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ApiError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = build_router(self.state, self.cors_allow_any);
        let listener = tokio::net::TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| ApiError::Server(format!("failed to bind {}: {e}", self.bind_addr)))?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ApiError::Server(e.to_string()))?;
        info!("HTTP server stopped");
        Ok(())
    }
}
