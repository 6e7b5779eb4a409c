//! Shared handler state.

use std::sync::Arc;

use circles_directory::DirectoryGateway;
use circles_membership::Reconciler;
use circles_store::MembershipStore;

use crate::auth::JwtConfig;
use crate::metrics::ApiMetrics;

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Reconciler,
    pub directory: DirectoryGateway,
    pub jwt: Arc<JwtConfig>,
    pub metrics: Option<Arc<ApiMetrics>>,
    /// Backfill follows from membership when follow status is read.
    pub repair_on_read: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn MembershipStore>, jwt: JwtConfig) -> Self {
        Self {
            reconciler: Reconciler::new(Arc::clone(&store)),
            directory: DirectoryGateway::new(store),
            jwt: Arc::new(jwt),
            metrics: None,
            repair_on_read: true,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ApiMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_repair_on_read(mut self, enabled: bool) -> Self {
        self.repair_on_read = enabled;
        self
    }
}
