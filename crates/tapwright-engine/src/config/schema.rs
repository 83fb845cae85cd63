use crate::executor::{ActionExecutor, ExecutorOptions};
use crate::flow::FlowRunner;
use crate::locator::ChainOptions;
use crate::protocol::Platform;
use crate::snapshot::{SnapshotCollector, SnapshotProfile};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TapwrightConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_min_attempt_ms")]
    pub min_attempt_ms: u64,
    #[serde(default = "default_stale_retries")]
    pub stale_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            min_attempt_ms: default_min_attempt_ms(),
            stale_retries: default_stale_retries(),
            step_timeout_ms: None,
        }
    }
}

fn default_timeout_ms() -> u64 {
    20000
}

fn default_poll_interval_ms() -> u64 {
    400
}

fn default_min_attempt_ms() -> u64 {
    1000
}

fn default_stale_retries() -> u32 {
    1
}

/// Snapshot bounds and optional per-category class overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_max_nodes")]
    pub max_nodes_per_category: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_classes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_classes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive_classes: Option<Vec<String>>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_nodes_per_category: default_max_nodes(),
            text_classes: None,
            input_classes: None,
            interactive_classes: None,
        }
    }
}

fn default_max_nodes() -> usize {
    crate::snapshot::DEFAULT_MAX_NODES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default)]
    pub platform: Platform,
    /// Passed to the server unchanged when the session is created.
    #[serde(default)]
    pub capabilities: Map<String, Value>,
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            platform: Platform::default(),
            capabilities: Map::new(),
            ready_timeout_ms: default_ready_timeout_ms(),
        }
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:4723".to_string()
}

fn default_ready_timeout_ms() -> u64 {
    10000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Extra field names to mask, on top of the built-in list.
    #[serde(default)]
    pub sensitive_fields: Vec<String>,
    #[serde(default = "default_true")]
    pub redact_in_logs: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            sensitive_fields: Vec::new(),
            redact_in_logs: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl TapwrightConfig {
    pub fn chain_options(&self) -> ChainOptions {
        ChainOptions {
            default_timeout: Duration::from_millis(self.engine.default_timeout_ms),
            min_attempt: Duration::from_millis(self.engine.min_attempt_ms),
            poll_interval: Duration::from_millis(self.engine.poll_interval_ms),
        }
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            chain: self.chain_options(),
            stale_retries: self.engine.stale_retries,
            sensitive_fields: self.security.sensitive_fields.clone(),
            redact: self.security.redact_in_logs,
        }
    }

    /// Platform defaults with any configured class overrides applied.
    pub fn snapshot_profile(&self) -> SnapshotProfile {
        let mut profile = SnapshotProfile::for_platform(self.session.platform);
        if let Some(classes) = &self.snapshot.text_classes {
            profile.text_classes = classes.clone();
        }
        if let Some(classes) = &self.snapshot.input_classes {
            profile.input_classes = classes.clone();
        }
        if let Some(classes) = &self.snapshot.interactive_classes {
            profile.interactive_classes = classes.clone();
        }
        profile
    }

    pub fn snapshot_collector(&self) -> SnapshotCollector {
        SnapshotCollector::new(
            self.snapshot_profile(),
            self.snapshot.max_nodes_per_category,
        )
    }

    /// A runner without a manual gate; attach one with [`FlowRunner::with_gate`].
    pub fn flow_runner(&self) -> FlowRunner {
        let runner = FlowRunner::new(
            ActionExecutor::new(self.executor_options()),
            self.snapshot_collector(),
        );
        match self.engine.step_timeout_ms {
            Some(ms) => runner.with_step_timeout(Duration::from_millis(ms)),
            None => runner,
        }
    }
}
