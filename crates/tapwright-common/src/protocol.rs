use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Locators and Targets
// =============================================================================

/// Which kind of remote UI tree a session drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Native Android app through an Appium UiAutomator2 server.
    #[default]
    Android,
    /// Web page through a W3C WebDriver server.
    Web,
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "android" | "mobile" => Ok(Platform::Android),
            "web" | "browser" => Ok(Platform::Web),
            other => Err(format!("Unsupported platform: {}", other)),
        }
    }
}

/// A screen position in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Center of a rectangle given by its top-left corner and size.
    pub fn center_of(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            x: (left + width / 2.0) as i64,
            y: (top + height / 2.0) as i64,
        }
    }
}

/// One way of finding a UI element.
///
/// `Coordinate` never identifies an element; it is a position to act at and is
/// only valid as the last strategy of a [`Target`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorSpec {
    /// Stable identifier (Android resource-id, DOM id).
    Identifier(String),
    /// Attribute whose value contains `substring` (hint, placeholder, href, ...).
    AttributeContains { attr: String, substring: String },
    /// Visible text equal to the given string.
    TextEquals(String),
    /// Visible text containing the given string.
    TextContains(String),
    /// The `index`-th element of a widget class / tag name.
    Class {
        class_name: String,
        #[serde(default)]
        index: usize,
    },
    /// Fixed screen position.
    Coordinate { x: i64, y: i64 },
}

impl LocatorSpec {
    pub fn identifier(id: impl Into<String>) -> Self {
        LocatorSpec::Identifier(id.into())
    }

    pub fn attribute_contains(attr: impl Into<String>, substring: impl Into<String>) -> Self {
        LocatorSpec::AttributeContains {
            attr: attr.into(),
            substring: substring.into(),
        }
    }

    pub fn text_equals(text: impl Into<String>) -> Self {
        LocatorSpec::TextEquals(text.into())
    }

    pub fn text_contains(text: impl Into<String>) -> Self {
        LocatorSpec::TextContains(text.into())
    }

    pub fn class(class_name: impl Into<String>, index: usize) -> Self {
        LocatorSpec::Class {
            class_name: class_name.into(),
            index,
        }
    }

    pub fn coordinate(x: i64, y: i64) -> Self {
        LocatorSpec::Coordinate { x, y }
    }

    pub fn is_coordinate(&self) -> bool {
        matches!(self, LocatorSpec::Coordinate { .. })
    }

    /// Short name of the strategy kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LocatorSpec::Identifier(_) => "identifier",
            LocatorSpec::AttributeContains { .. } => "attribute_contains",
            LocatorSpec::TextEquals(_) => "text_equals",
            LocatorSpec::TextContains(_) => "text_contains",
            LocatorSpec::Class { .. } => "class",
            LocatorSpec::Coordinate { .. } => "coordinate",
        }
    }
}

impl fmt::Display for LocatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorSpec::Identifier(id) => write!(f, "id={}", id),
            LocatorSpec::AttributeContains { attr, substring } => {
                write!(f, "[{}*={:?}]", attr, substring)
            }
            LocatorSpec::TextEquals(text) => write!(f, "text={:?}", text),
            LocatorSpec::TextContains(text) => write!(f, "text*={:?}", text),
            LocatorSpec::Class { class_name, index } => write!(f, "{}[{}]", class_name, index),
            LocatorSpec::Coordinate { x, y } => write!(f, "@({}, {})", x, y),
        }
    }
}

/// A logical UI element: a human label plus the ordered ways to find it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub strategies: Vec<LocatorSpec>,
    /// Wait budget for the whole chain. Falls back to the engine default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategies: Vec::new(),
            timeout_ms: None,
        }
    }

    /// Append a strategy to the chain.
    pub fn by(mut self, locator: LocatorSpec) -> Self {
        self.strategies.push(locator);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn ends_with_coordinate(&self) -> bool {
        self.strategies.last().is_some_and(LocatorSpec::is_coordinate)
    }
}

/// Opaque reference to a live node of the remote UI tree.
///
/// Only valid for the tree it was found in; backends report
/// [`crate::error::BackendError::ElementStale`] once the node is gone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The product of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedElement {
    Element(ElementHandle),
    Point(Point),
}

impl fmt::Display for ResolvedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedElement::Element(handle) => write!(f, "element {}", handle),
            ResolvedElement::Point(p) => write!(f, "point ({}, {})", p.x, p.y),
        }
    }
}

// =============================================================================
// Actions
// =============================================================================

/// What a scenario step does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Click,
    /// Clear the element, then type the text.
    Type(String),
    Clear,
    ScrollIntoView,
    /// Read the element's visible text into the step report.
    ReadText,
    /// Navigate back (hardware back on mobile, history back on web).
    Back,
    Navigate(String),
    /// Capture and log a diagnostic snapshot without failing.
    Inspect,
    /// Suspend until a human confirms. Unbounded: never subject to timeouts.
    Manual(String),
}

impl Action {
    pub fn needs_target(&self) -> bool {
        matches!(
            self,
            Action::Click | Action::Type(_) | Action::Clear | Action::ScrollIntoView | Action::ReadText
        )
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Action::Manual(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::Type(_) => "type",
            Action::Clear => "clear",
            Action::ScrollIntoView => "scroll_into_view",
            Action::ReadText => "read_text",
            Action::Back => "back",
            Action::Navigate(_) => "navigate",
            Action::Inspect => "inspect",
            Action::Manual(_) => "manual",
        }
    }
}

/// Element-level command sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementCommand {
    Click,
    Clear,
    SendKeys(String),
    ScrollIntoView,
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of one locator strategy attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Matched,
    NotFound,
    /// Found, but never displayed and enabled within the attempt budget.
    NotInteractable,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: LocatorSpec,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

/// Failure taxonomy of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    StaleElement,
    ActionRejected,
    Timeout,
    Backend,
}

impl FailureKind {
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "NOT_FOUND",
            FailureKind::StaleElement => "STALE_ELEMENT",
            FailureKind::ActionRejected => "ACTION_REJECTED",
            FailureKind::Timeout => "TIMEOUT",
            FailureKind::Backend => "BACKEND_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActionResult {
    Succeeded {
        /// Strategy that resolved the target, if the action had one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strategy: Option<LocatorSpec>,
        #[serde(default)]
        attempts: Vec<StrategyAttempt>,
        /// Text produced by the action (`read_text`).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    Failed {
        kind: FailureKind,
        reason: String,
        #[serde(default)]
        attempts: Vec<StrategyAttempt>,
    },
}

impl ActionResult {
    pub fn success() -> Self {
        ActionResult::Succeeded {
            strategy: None,
            attempts: Vec::new(),
            output: None,
        }
    }

    pub fn failed(kind: FailureKind, reason: impl Into<String>) -> Self {
        ActionResult::Failed {
            kind,
            reason: reason.into(),
            attempts: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Succeeded { .. })
    }

    pub fn attempts(&self) -> &[StrategyAttempt] {
        match self {
            ActionResult::Succeeded { attempts, .. } | ActionResult::Failed { attempts, .. } => {
                attempts
            }
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ActionResult::Failed { kind, .. } => Some(*kind),
            ActionResult::Succeeded { .. } => None,
        }
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            ActionResult::Succeeded { output, .. } => output.as_deref(),
            ActionResult::Failed { .. } => None,
        }
    }
}

// =============================================================================
// Diagnostic Snapshot
// =============================================================================

/// One node listed in a snapshot. Every field is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub index: usize,
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Nodes of one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeGroup {
    /// How many matching nodes the tree held.
    pub found: usize,
    /// Listed nodes, never more than the configured bound.
    pub nodes: Vec<SnapshotNode>,
    /// Nodes dropped because reading them failed.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Length of the page source, when it could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_size: Option<usize>,
    pub text_nodes: NodeGroup,
    pub input_nodes: NodeGroup,
    pub interactive_nodes: NodeGroup,
    /// Set when the tree could not be read at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_error: Option<String>,
}

impl Snapshot {
    pub fn with_capture_error(message: impl Into<String>) -> Self {
        Self {
            capture_error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text_nodes.nodes.is_empty()
            && self.input_nodes.nodes.is_empty()
            && self.interactive_nodes.nodes.is_empty()
    }
}

// =============================================================================
// Flows
// =============================================================================

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    pub action: Action,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Pause after a successful action, for screens that animate before the next
    /// step can find anything. Zero by default.
    #[serde(default)]
    pub settle_ms: u64,
}

impl ScenarioStep {
    pub fn new(name: impl Into<String>, target: Option<Target>, action: Action) -> Self {
        Self {
            name: name.into(),
            target,
            action,
            required: true,
            settle_ms: 0,
        }
    }

    /// A required step acting on `target`.
    pub fn on(target: Target, action: Action) -> Self {
        Self::new(target.name.clone(), Some(target), action)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.settle_ms = ms;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    pub steps: Vec<ScenarioStep>,
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: ScenarioStep) -> Self {
        self.steps.push(step);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ActionResult>,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowResult {
    pub flow: String,
    pub status: FlowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    /// Position of the failed step in `steps`. Step names need not be unique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    pub steps: Vec<StepReport>,
}

impl FlowResult {
    pub fn succeeded(&self) -> bool {
        self.status == FlowStatus::Succeeded
    }

    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// The failed step's report, if the flow failed.
    pub fn failure(&self) -> Option<&StepReport> {
        self.failed_index.and_then(|i| self.steps.get(i))
    }
}
