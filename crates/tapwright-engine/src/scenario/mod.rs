pub mod loader;
pub mod schema;

pub use loader::{LoadedScenario, ScenarioLoadError, ScenarioLoader};
pub use schema::{Validatable, ValidationError};
