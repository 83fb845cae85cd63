//! Action execution on top of the locator chain.

use crate::backend::{Backend, BackendError};
use crate::formatter::mask_sensitive;
use crate::locator::{ChainOptions, Requirement, ResolutionFailure, resolve};
use crate::protocol::{
    Action, ActionResult, ElementCommand, FailureKind, ResolvedElement, Target,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub chain: ChainOptions,
    /// How many times a stale element is re-resolved before the action fails.
    pub stale_retries: u32,
    pub sensitive_fields: Vec<String>,
    /// Mask typed values for sensitive targets in logs.
    pub redact: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            chain: ChainOptions::default(),
            stale_retries: 1,
            sensitive_fields: Vec::new(),
            redact: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActionExecutor {
    options: ExecutorOptions,
}

fn failure_kind(err: &BackendError) -> FailureKind {
    if err.is_stale() {
        FailureKind::StaleElement
    } else if err.is_fatal() {
        FailureKind::Backend
    } else if matches!(
        err,
        BackendError::Timeout | BackendError::TimeoutWithContext { .. }
    ) {
        FailureKind::Timeout
    } else {
        FailureKind::ActionRejected
    }
}

/// Reason text for a backend error, with its code and a recovery hint.
fn describe(err: &BackendError) -> String {
    format!("{} [{}] (hint: {})", err, err.code(), err.recovery_hint())
}

impl ActionExecutor {
    pub fn new(options: ExecutorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Run one action, resolving `target` first when the action needs one.
    ///
    /// Never returns an error: every failure is folded into the
    /// [`ActionResult`] together with the attempts of the last resolution.
    pub async fn execute<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        target: Option<&Target>,
        action: &Action,
    ) -> ActionResult {
        match action {
            Action::Back => {
                info!("Navigating back");
                return Self::targetless(backend.navigate_back().await);
            }
            Action::Navigate(url) => {
                info!("Navigating to {}", url);
                return Self::targetless(backend.navigate(url).await);
            }
            Action::Inspect | Action::Manual(_) => {
                return ActionResult::failed(
                    FailureKind::ActionRejected,
                    format!("'{}' is not an element action", action.label()),
                );
            }
            _ => {}
        }

        let Some(target) = target else {
            return ActionResult::failed(
                FailureKind::ActionRejected,
                format!("'{}' requires a target", action.label()),
            );
        };

        let requirement = match action {
            Action::Click => Requirement::Interactable,
            _ => Requirement::Present,
        };

        let mut stale_left = self.options.stale_retries;
        loop {
            let resolution =
                match resolve(backend, target, requirement, &self.options.chain).await {
                    Ok(resolution) => resolution,
                    Err(failure) => return self.resolution_failed(failure),
                };

            debug!(
                "'{}' resolved to {} via {}",
                target.name, resolution.element, resolution.strategy
            );

            match self
                .perform(backend, target, &resolution.element, action)
                .await
            {
                Ok(output) => {
                    return ActionResult::Succeeded {
                        strategy: Some(resolution.strategy),
                        attempts: resolution.attempts,
                        output,
                    };
                }
                Err(e) if e.is_stale() && stale_left > 0 => {
                    stale_left -= 1;
                    warn!(
                        "'{}' went stale during {}, resolving again",
                        target.name,
                        action.label()
                    );
                }
                Err(e) => {
                    warn!("{} on '{}' failed: {}", action.label(), target.name, e);
                    return ActionResult::Failed {
                        kind: failure_kind(&e),
                        reason: describe(&e),
                        attempts: resolution.attempts,
                    };
                }
            }
        }
    }

    fn targetless(outcome: Result<(), BackendError>) -> ActionResult {
        match outcome {
            Ok(()) => ActionResult::success(),
            Err(e) => ActionResult::failed(failure_kind(&e), describe(&e)),
        }
    }

    fn resolution_failed(&self, failure: ResolutionFailure) -> ActionResult {
        let (kind, reason) = match &failure {
            ResolutionFailure::NotFound { .. } => (FailureKind::NotFound, failure.to_string()),
            ResolutionFailure::Backend { target, source, .. } => (
                failure_kind(source),
                format!("Backend failed while resolving '{}': {}", target, describe(source)),
            ),
            ResolutionFailure::InvalidTarget(_) => {
                (FailureKind::ActionRejected, failure.to_string())
            }
        };
        ActionResult::Failed {
            kind,
            reason,
            attempts: failure.into_attempts(),
        }
    }

    fn loggable(&self, target: &Target, text: &str) -> String {
        if self.options.redact {
            mask_sensitive(text, &target.name, &self.options.sensitive_fields)
        } else {
            text.to_string()
        }
    }

    async fn perform<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        target: &Target,
        element: &ResolvedElement,
        action: &Action,
    ) -> Result<Option<String>, BackendError> {
        match (element, action) {
            (ResolvedElement::Element(handle), Action::Click) => {
                info!("Clicking '{}'", target.name);
                backend.act(handle, ElementCommand::Click).await?;
            }
            (ResolvedElement::Element(handle), Action::Type(text)) => {
                info!("Typing {:?} into '{}'", self.loggable(target, text), target.name);
                backend.act(handle, ElementCommand::Clear).await?;
                backend
                    .act(handle, ElementCommand::SendKeys(text.clone()))
                    .await?;
            }
            (ResolvedElement::Element(handle), Action::Clear) => {
                info!("Clearing '{}'", target.name);
                backend.act(handle, ElementCommand::Clear).await?;
            }
            (ResolvedElement::Element(handle), Action::ScrollIntoView) => {
                debug!("Scrolling '{}' into view", target.name);
                backend.act(handle, ElementCommand::ScrollIntoView).await?;
            }
            (ResolvedElement::Element(handle), Action::ReadText) => {
                let text = backend.element_text(handle).await?;
                info!("Read '{}': {:?}", target.name, self.loggable(target, &text));
                return Ok(Some(text));
            }
            (ResolvedElement::Point(point), Action::Click) => {
                info!("Tapping '{}' at ({}, {})", target.name, point.x, point.y);
                backend.tap_at(*point).await?;
            }
            (ResolvedElement::Point(point), Action::Type(text)) => {
                info!(
                    "Typing {:?} into '{}' after tapping ({}, {})",
                    self.loggable(target, text),
                    target.name,
                    point.x,
                    point.y
                );
                backend.tap_at(*point).await?;
                backend.send_keys_to_focused(text).await?;
            }
            (ResolvedElement::Point(_), other) => {
                return Err(BackendError::NotSupported(format!(
                    "'{}' at a screen coordinate",
                    other.label()
                )));
            }
            (_, other) => {
                return Err(BackendError::NotSupported(format!(
                    "'{}' on an element",
                    other.label()
                )));
            }
        }
        Ok(None)
    }
}
