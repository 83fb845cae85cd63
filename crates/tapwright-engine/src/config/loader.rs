use super::schema::TapwrightConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming a config file when none is given explicitly.
pub const CONFIG_ENV: &str = "TAPWRIGHT_CONFIG";

const LOCAL_CONFIG: &str = "tapwright.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file {0:?} does not exist")]
    Missing(PathBuf),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Where a config file was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named on the command line.
    Explicit(PathBuf),
    /// Named by `TAPWRIGHT_CONFIG`.
    Env(PathBuf),
    /// `tapwright.yaml` in the working directory or `~/.tapwright/config.yaml`.
    Discovered(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::Env(p) | ConfigSource::Discovered(p) => p,
        }
    }

    /// Named sources must exist; discovered ones are only offered when they do.
    fn is_required(&self) -> bool {
        !matches!(self, ConfigSource::Discovered(_))
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Pick the config file to use, in order:
    /// 1. `explicit` (`--config`)
    /// 2. `env_value` (`TAPWRIGHT_CONFIG`, ignored when empty)
    /// 3. `tapwright.yaml` in `cwd`
    /// 4. `.tapwright/config.yaml` under `home`
    ///
    /// `None` means run with defaults.
    pub fn locate(
        explicit: Option<&Path>,
        env_value: Option<&str>,
        cwd: &Path,
        home: Option<&Path>,
    ) -> Option<ConfigSource> {
        if let Some(path) = explicit {
            return Some(ConfigSource::Explicit(path.to_path_buf()));
        }
        if let Some(value) = env_value
            && !value.trim().is_empty()
        {
            return Some(ConfigSource::Env(PathBuf::from(value)));
        }

        let local = cwd.join(LOCAL_CONFIG);
        if local.is_file() {
            return Some(ConfigSource::Discovered(local));
        }
        home.map(|h| h.join(".tapwright").join("config.yaml"))
            .filter(|p| p.is_file())
            .map(ConfigSource::Discovered)
    }

    /// Resolve the config for this process from `explicit`, the environment
    /// and the default locations.
    pub async fn load(explicit: Option<&Path>) -> Result<TapwrightConfig, ConfigError> {
        let env_value = std::env::var(CONFIG_ENV).ok();
        let home = dirs::home_dir();
        let source = Self::locate(
            explicit,
            env_value.as_deref(),
            Path::new("."),
            home.as_deref(),
        );
        Self::load_source(source).await
    }

    pub async fn load_source(source: Option<ConfigSource>) -> Result<TapwrightConfig, ConfigError> {
        let Some(source) = source else {
            debug!("No config file found, using defaults");
            return Ok(TapwrightConfig::default());
        };
        if source.is_required() && !source.path().is_file() {
            return Err(ConfigError::Missing(source.path().to_path_buf()));
        }
        let config = Self::load_from(source.path()).await?;
        info!("Using config {:?}", source);
        Ok(config)
    }

    pub async fn load_from(path: &Path) -> Result<TapwrightConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: TapwrightConfig = serde_yaml::from_str(&content)?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }
}
