//! Prometheus metrics for the HTTP surface.
//!
//! [`ApiMetrics`] owns a dedicated [`Registry`] that the `/metrics` endpoint
//! encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    Opts, Registry, TextEncoder,
};

pub struct ApiMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Follow state changes, labelled `follow` / `unfollow`.
    pub follow_changes: IntCounterVec,
    /// Follow relations backfilled by the repair-on-read pass.
    pub follows_repaired: IntCounter,
    /// Members added through the add-members endpoint.
    pub members_added: IntCounter,
    /// Searches served, labelled by search kind.
    pub searches: IntCounterVec,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time of a directory search, labelled by search kind.
    pub search_seconds: HistogramVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let follow_changes = register_int_counter_vec_with_registry!(
            Opts::new(
                "circles_follow_changes_total",
                "Follow relations created or removed"
            ),
            &["change"],
            registry
        )?;

        let follows_repaired = register_int_counter_with_registry!(
            Opts::new(
                "circles_follows_repaired_total",
                "Follow relations backfilled from group membership"
            ),
            registry
        )?;

        let members_added = register_int_counter_with_registry!(
            Opts::new(
                "circles_members_added_total",
                "Users added to groups via add-members"
            ),
            registry
        )?;

        let searches = register_int_counter_vec_with_registry!(
            Opts::new("circles_searches_total", "Directory searches served"),
            &["kind"],
            registry
        )?;

        let search_seconds = register_histogram_vec_with_registry!(
            HistogramOpts::new(
                "circles_search_seconds",
                "Directory search latency in seconds"
            ),
            &["kind"],
            registry
        )?;

        Ok(Self {
            registry,
            follow_changes,
            follows_repaired,
            members_added,
            searches,
            search_seconds,
        })
    }

    /// Encode every registered metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
