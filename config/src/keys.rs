//! Stable configuration key contract consumed by the application layer
//! at context-construction time.

pub const DATASOURCE_URL: &str = "datasource.url";
pub const DATASOURCE_USERNAME: &str = "datasource.username";
pub const DATASOURCE_PASSWORD: &str = "datasource.password";
