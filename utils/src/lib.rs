//! Shared utilities for the Circles service.

pub mod logging;

pub use logging::{init_logging, LogFormat};
