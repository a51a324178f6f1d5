//! Canonical resource specs for commonly provisioned images.

use mf_core::types::ResourceSpec;

pub const POSTGRES_IMAGE: &str = "postgres";
pub const POSTGRES_TAG: &str = "16-alpine";
pub const POSTGRES_PORT: u16 = 5432;

/// PostgreSQL spec with the stock test credentials. The host port stays
/// dynamic; callers needing isolation override the database name.
pub fn postgres() -> ResourceSpec {
    ResourceSpec::new(POSTGRES_IMAGE, POSTGRES_TAG)
        .with_exposed_port(POSTGRES_PORT)
        .with_env("POSTGRES_USER", "testuser")
        .with_env("POSTGRES_PASSWORD", "testpass")
        .with_env("POSTGRES_DB", "testdb")
        .with_credentials("testuser", "testpass")
        .with_database("testdb")
}
