//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies are abstracted behind traits. This crate provides
//! test-friendly implementations that never touch the filesystem or network
//! and whose state can be inspected and seeded directly.
//!
//! Usage: swap real implementations for nullables in tests.

pub mod store;

pub use store::NullStore;
