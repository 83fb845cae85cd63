/// Errors reported by a remote UI-tree accessor.
///
/// Element-level variants carry the handle (or locator) they refer to so the
/// attempt log can say which lookup went wrong.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    // ============================================================
    // Navigation Errors
    // ============================================================
    #[error("Navigation failed: {0}")]
    Navigation(String),

    // ============================================================
    // Element Errors
    // ============================================================
    #[error("Element {0} not found")]
    ElementNotFound(String),

    #[error("Element {0} is stale (no longer attached to the UI tree)")]
    ElementStale(String),

    #[error("Element {0} is not visible")]
    ElementNotVisible(String),

    #[error("Element {0} is disabled")]
    ElementDisabled(String),

    #[error("Element {handle} is not interactable: {reason}")]
    ElementNotInteractable { handle: String, reason: String },

    #[error("Invalid selector: {selector}")]
    SelectorInvalid { selector: String },

    // ============================================================
    // Execution Errors
    // ============================================================
    #[error("Script execution error: {0}")]
    ScriptError(String),

    #[error("Timeout: {operation}")]
    TimeoutWithContext { operation: String },

    #[error("Timeout")]
    Timeout,

    // ============================================================
    // Session Errors
    // ============================================================
    #[error("Session error: {0}")]
    Session(String),

    #[error("Connection lost")]
    ConnectionLost,

    #[error("Not ready")]
    NotReady,

    // ============================================================
    // System Errors
    // ============================================================
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other: {0}")]
    Other(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}

impl BackendError {
    /// Stable error code, used in reports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::Navigation(_) => "NAVIGATION_ERROR",
            BackendError::ElementNotFound(_) => "ELEMENT_NOT_FOUND",
            BackendError::ElementStale(_) => "ELEMENT_STALE",
            BackendError::ElementNotVisible(_) => "ELEMENT_NOT_VISIBLE",
            BackendError::ElementDisabled(_) => "ELEMENT_DISABLED",
            BackendError::ElementNotInteractable { .. } => "ELEMENT_NOT_INTERACTABLE",
            BackendError::SelectorInvalid { .. } => "SELECTOR_INVALID",
            BackendError::ScriptError(_) => "SCRIPT_ERROR",
            BackendError::TimeoutWithContext { .. } | BackendError::Timeout => "TIMEOUT",
            BackendError::Session(_) => "SESSION_ERROR",
            BackendError::ConnectionLost => "CONNECTION_LOST",
            BackendError::NotReady => "NOT_READY",
            BackendError::Io(_) => "IO_ERROR",
            BackendError::Serialization(_) => "SERIALIZATION_ERROR",
            BackendError::Other(_) => "INTERNAL_ERROR",
            BackendError::NotSupported(_) => "NOT_SUPPORTED",
        }
    }

    /// Returns a recovery hint for this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            BackendError::ElementNotFound(_) => "Check the locator against the current screen",
            BackendError::ElementStale(_) => "Resolve the element again after the screen settles",
            BackendError::ElementNotVisible(_) => "Scroll element into view or wait",
            BackendError::ElementDisabled(_) => "Wait for element to become enabled",
            BackendError::ElementNotInteractable { .. } => "Element may be covered; try waiting",
            BackendError::SelectorInvalid { .. } => "Verify the locator syntax",
            BackendError::TimeoutWithContext { .. } | BackendError::Timeout => {
                "Increase timeout or verify condition"
            }
            BackendError::Navigation(_) => "Check URL is valid and accessible",
            BackendError::Session(_) | BackendError::NotReady => {
                "Check that the automation server is running and the session started"
            }
            BackendError::ConnectionLost => "Restart the automation session",
            _ => "Check the logs for details",
        }
    }

    /// Whether polling may continue after this error.
    ///
    /// Element-level errors describe a UI tree that is still changing; any other
    /// error ends the wait.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::ElementNotFound(_)
                | BackendError::ElementStale(_)
                | BackendError::ElementNotVisible(_)
                | BackendError::ElementNotInteractable { .. }
        )
    }

    /// Whether the session itself is gone, so no later strategy can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BackendError::ConnectionLost | BackendError::NotReady | BackendError::Session(_)
        )
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, BackendError::ElementStale(_))
    }
}
