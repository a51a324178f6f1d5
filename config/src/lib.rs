//! # Dynamic Configuration Binding
//!
//! Configuration the application under test reads at startup, with values
//! resolved at runtime from freshly provisioned resources rather than
//! fixed in source.
//!
//! This crate provides:
//! - An override registry of lazy, readiness-gated accessors
//! - `DS_*` environment variable loading (12-factor app principles)
//! - Configuration precedence (dynamic overrides > env > defaults)
//! - The datasource configuration consumed by the storage layer
//!
//! Accessors registered against a live resource fail loudly with a
//! not-ready error instead of silently falling back to stale or default
//! values; a silent fallback would mask an ordering race and produce
//! flaky, hard-to-diagnose failures.

pub mod datasource;
pub mod keys;
pub mod loader;
pub mod overrides;
pub mod precedence;

pub use datasource::DatasourceConfig;
pub use loader::load_from_env;
pub use overrides::{OverrideRegistry, bind_datasource};
pub use precedence::{merge_datasource, resolve_datasource};
