pub mod loader;
pub mod schema;

pub use loader::{CONFIG_ENV, ConfigError, ConfigLoader, ConfigSource};
pub use schema::{EngineConfig, SecurityConfig, SessionConfig, SnapshotConfig, TapwrightConfig};
