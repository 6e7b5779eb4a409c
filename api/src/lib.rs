//! HTTP server for the Circles service.
//!
//! Provides endpoints for:
//! - Follow / unfollow a group and follow status (bearer token required)
//! - Adding members to a group (bearer token required)
//! - Directory search over users
//! - Group details, health and Prometheus metrics

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod state;

pub use auth::{AuthUser, JwtConfig};
pub use error::ApiError;
pub use metrics::ApiMetrics;
pub use server::{build_router, ApiServer};
pub use state::AppState;
