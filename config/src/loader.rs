//! # Environment Variable Loader
//!
//! Loads datasource configuration from environment variables following
//! 12-factor app principles.
//!
//! # Naming Convention
//! - `DS_URL`: Datasource connection url
//! - `DS_USERNAME`: Datasource user
//! - `DS_PASSWORD`: Datasource password
//! - `DS_POOL_SIZE`: Connection pool size (default: 5)
//! - `DS_TIMEOUT_SECONDS`: Acquire timeout in seconds (default: 30)

use std::env;

use crate::datasource::DatasourceConfig;

/// Load datasource configuration from `DS_*` environment variables.
/// Unset variables keep their default values; environment values can be
/// overridden by dynamic overrides during precedence merge.
pub fn load_from_env() -> DatasourceConfig {
    let defaults = DatasourceConfig::default();
    DatasourceConfig {
        url: env::var("DS_URL").unwrap_or(defaults.url),
        username: env::var("DS_USERNAME").unwrap_or(defaults.username),
        password: env::var("DS_PASSWORD").unwrap_or(defaults.password),
        pool_size: parse_env("DS_POOL_SIZE").unwrap_or(defaults.pool_size),
        timeout_seconds: parse_env("DS_TIMEOUT_SECONDS").unwrap_or(defaults.timeout_seconds)
    }
}

fn parse_env<T>(key: &str) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(s) => s
            .parse::<T>()
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>),
        Err(e) => Err(Box::new(e) as Box<dyn std::error::Error>),
    }
}
