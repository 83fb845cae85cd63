use super::schema::{Validatable, ValidationError};
use crate::protocol::Flow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScenarioLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Glob iteration error: {0}")]
    Glob(#[from] glob::GlobError),
    #[error("Invalid scenario {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
    #[error("No scenario files match {0}")]
    NoMatches(String),
}

/// A flow together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedScenario {
    pub path: PathBuf,
    pub flow: Flow,
}

pub struct ScenarioLoader;

impl ScenarioLoader {
    pub async fn load_file(path: &Path) -> Result<Flow, ScenarioLoadError> {
        let content = tokio::fs::read_to_string(path).await?;
        let flow: Flow = serde_yaml::from_str(&content)?;
        flow.validate().map_err(|source| ScenarioLoadError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded scenario '{}' from {:?}", flow.name, path);
        Ok(flow)
    }

    /// Load every `.yaml`/`.yml` file matching `pattern`, sorted by path.
    ///
    /// A plain file path is a pattern that matches itself. Invalid files fail
    /// the whole load.
    pub async fn load_glob(pattern: &str) -> Result<Vec<LoadedScenario>, ScenarioLoadError> {
        let mut paths = Vec::new();
        for entry in glob::glob(pattern)? {
            let path = entry?;
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "yaml" || e == "yml");
            if path.is_file() && is_yaml {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            return Err(ScenarioLoadError::NoMatches(pattern.to_string()));
        }
        paths.sort();

        let mut scenarios = Vec::with_capacity(paths.len());
        for path in paths {
            let flow = Self::load_file(&path).await?;
            scenarios.push(LoadedScenario { path, flow });
        }
        Ok(scenarios)
    }
}
