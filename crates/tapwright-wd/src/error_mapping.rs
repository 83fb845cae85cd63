//! WebDriver error mapping.
//!
//! Remote errors arrive as W3C error strings wrapped by the client library.
//! They are classified by message so the wait engine can tell "not yet" from
//! "session gone".

use fantoccini::error::CmdError;
use tapwright_engine::backend::BackendError;

/// Classify a WebDriver error message. `subject` names the element or locator
/// the command was about.
pub fn classify_error_message(message: &str, subject: &str) -> BackendError {
    let lower = message.to_lowercase();

    if lower.contains("stale element") {
        BackendError::ElementStale(subject.to_string())
    } else if lower.contains("no such element") || lower.contains("could not be located") {
        BackendError::ElementNotFound(subject.to_string())
    } else if lower.contains("not interactable") || lower.contains("click intercepted") {
        BackendError::ElementNotInteractable {
            handle: subject.to_string(),
            reason: message.to_string(),
        }
    } else if lower.contains("invalid selector") || lower.contains("invalid xpath") {
        BackendError::SelectorInvalid {
            selector: subject.to_string(),
        }
    } else if lower.contains("invalid session")
        || lower.contains("session not created")
        || lower.contains("session is either terminated")
    {
        BackendError::Session(message.to_string())
    } else if lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("broken pipe")
        || lower.contains("webdriver session has been closed")
    {
        BackendError::ConnectionLost
    } else if lower.contains("javascript error") || lower.contains("unknown method") {
        BackendError::ScriptError(message.to_string())
    } else if lower.contains("timeout") || lower.contains("timed out") {
        BackendError::TimeoutWithContext {
            operation: message.to_string(),
        }
    } else {
        BackendError::Other(message.to_string())
    }
}

pub fn map_cmd_error(err: CmdError, subject: &str) -> BackendError {
    classify_error_message(&err.to_string(), subject)
}
