//! Ordered locator strategy chains.
//!
//! A [`Target`] lists several ways to find one logical element. [`resolve`]
//! walks them in declared order, giving each a bounded wait, and returns the
//! first match together with a record of every attempt.

use crate::backend::{Backend, BackendError};
use crate::protocol::{
    AttemptOutcome, ElementHandle, LocatorSpec, Point, ResolvedElement, StrategyAttempt, Target,
};
use crate::scenario::schema::{Validatable, ValidationError};
use crate::wait::{Condition, DEFAULT_POLL_INTERVAL, WaitError, WaitOptions, wait_until};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// What a resolved element must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The element exists in the tree.
    Present,
    /// The element exists, is displayed and is enabled.
    Interactable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainOptions {
    /// Budget for a whole chain when the target does not set one.
    pub default_timeout: Duration,
    /// Lower bound for a single strategy's wait.
    pub min_attempt: Duration,
    pub poll_interval: Duration,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(20_000),
            min_attempt: Duration::from_millis(1_000),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub element: ResolvedElement,
    pub strategy: LocatorSpec,
    /// Every attempt made, the matching one last.
    pub attempts: Vec<StrategyAttempt>,
}

#[derive(Debug, Error)]
pub enum ResolutionFailure {
    #[error("Invalid target: {0}")]
    InvalidTarget(#[from] ValidationError),

    #[error("No strategy for '{target}' matched ({} tried)", attempts.len())]
    NotFound {
        target: String,
        attempts: Vec<StrategyAttempt>,
    },

    #[error("Backend failed while resolving '{target}': {source}")]
    Backend {
        target: String,
        #[source]
        source: BackendError,
        attempts: Vec<StrategyAttempt>,
    },
}

impl ResolutionFailure {
    pub fn attempts(&self) -> &[StrategyAttempt] {
        match self {
            ResolutionFailure::InvalidTarget(_) => &[],
            ResolutionFailure::NotFound { attempts, .. }
            | ResolutionFailure::Backend { attempts, .. } => attempts,
        }
    }

    pub fn into_attempts(self) -> Vec<StrategyAttempt> {
        match self {
            ResolutionFailure::InvalidTarget(_) => Vec::new(),
            ResolutionFailure::NotFound { attempts, .. }
            | ResolutionFailure::Backend { attempts, .. } => attempts,
        }
    }
}

/// Polls one element strategy.
struct ElementCondition {
    locator: LocatorSpec,
    requirement: Requirement,
    /// Set once the locator matched, even if the element was not yet usable.
    seen: bool,
}

impl ElementCondition {
    fn new(locator: LocatorSpec, requirement: Requirement) -> Self {
        Self {
            locator,
            requirement,
            seen: false,
        }
    }

    fn pick(&self, handles: Vec<ElementHandle>) -> Option<ElementHandle> {
        match &self.locator {
            LocatorSpec::Class { index, .. } => handles.into_iter().nth(*index),
            _ => handles.into_iter().next(),
        }
    }
}

#[async_trait]
impl<B: Backend + ?Sized> Condition<B> for ElementCondition {
    type Output = ElementHandle;

    async fn check(&mut self, backend: &mut B) -> Result<Option<ElementHandle>, BackendError> {
        let handles = backend.find_elements(&self.locator).await?;
        let Some(handle) = self.pick(handles) else {
            return Ok(None);
        };
        self.seen = true;

        match self.requirement {
            Requirement::Present => Ok(Some(handle)),
            Requirement::Interactable => {
                if backend.is_displayed(&handle).await? && backend.is_enabled(&handle).await? {
                    Ok(Some(handle))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Resolve `target` to a live element or a screen position.
///
/// Strategies are tried strictly in order. Each element strategy waits for
/// `max(remaining / element_strategies_left, min_attempt)`; a coordinate always
/// resolves. Session-level errors abort the chain, other non-transient errors
/// are recorded and the next strategy is tried.
#[instrument(skip(backend, target, options), fields(element = %target.name))]
pub async fn resolve<B: Backend + ?Sized>(
    backend: &mut B,
    target: &Target,
    requirement: Requirement,
    options: &ChainOptions,
) -> Result<Resolution, ResolutionFailure> {
    target.validate()?;

    let budget = target
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(options.default_timeout);
    let chain_start = Instant::now();
    let mut attempts = Vec::with_capacity(target.strategies.len());

    for (i, strategy) in target.strategies.iter().enumerate() {
        let attempt_start = Instant::now();

        if let LocatorSpec::Coordinate { x, y } = strategy {
            debug!("Falling back to coordinate ({}, {})", x, y);
            attempts.push(StrategyAttempt {
                strategy: strategy.clone(),
                outcome: AttemptOutcome::Matched,
                elapsed_ms: 0,
            });
            return Ok(Resolution {
                element: ResolvedElement::Point(Point::new(*x, *y)),
                strategy: strategy.clone(),
                attempts,
            });
        }

        let left = target.strategies[i..]
            .iter()
            .filter(|s| !s.is_coordinate())
            .count()
            .max(1) as u32;
        let remaining = budget.saturating_sub(chain_start.elapsed());
        let attempt_timeout = (remaining / left).max(options.min_attempt);

        debug!(
            "Trying {} '{}' for {:?}",
            strategy.kind(),
            strategy,
            attempt_timeout
        );

        let mut condition = ElementCondition::new(strategy.clone(), requirement);
        let waited = wait_until(
            backend,
            &mut condition,
            WaitOptions::new(attempt_timeout, options.poll_interval),
        )
        .await;

        match waited {
            Ok(handle) => {
                attempts.push(StrategyAttempt {
                    strategy: strategy.clone(),
                    outcome: AttemptOutcome::Matched,
                    elapsed_ms: elapsed_ms(attempt_start),
                });
                debug!("Matched via {}", strategy);
                return Ok(Resolution {
                    element: ResolvedElement::Element(handle),
                    strategy: strategy.clone(),
                    attempts,
                });
            }
            Err(WaitError::Timeout { .. }) => {
                let outcome = if condition.seen {
                    AttemptOutcome::NotInteractable
                } else {
                    AttemptOutcome::NotFound
                };
                attempts.push(StrategyAttempt {
                    strategy: strategy.clone(),
                    outcome,
                    elapsed_ms: elapsed_ms(attempt_start),
                });
            }
            Err(WaitError::Backend(e)) if e.is_fatal() => {
                warn!("Session error while resolving '{}': {}", target.name, e);
                attempts.push(StrategyAttempt {
                    strategy: strategy.clone(),
                    outcome: AttemptOutcome::Error(e.to_string()),
                    elapsed_ms: elapsed_ms(attempt_start),
                });
                return Err(ResolutionFailure::Backend {
                    target: target.name.clone(),
                    source: e,
                    attempts,
                });
            }
            Err(WaitError::Backend(e)) => {
                debug!("Strategy {} failed: {}", strategy, e);
                attempts.push(StrategyAttempt {
                    strategy: strategy.clone(),
                    outcome: AttemptOutcome::Error(e.to_string()),
                    elapsed_ms: elapsed_ms(attempt_start),
                });
            }
        }
    }

    warn!(
        "No strategy matched '{}' after {} attempts",
        target.name,
        attempts.len()
    );
    Err(ResolutionFailure::NotFound {
        target: target.name.clone(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_picks_nth_handle() {
        let cond = ElementCondition::new(
            LocatorSpec::class("android.widget.EditText", 1),
            Requirement::Present,
        );
        let handles = vec![ElementHandle::new("a"), ElementHandle::new("b")];
        assert_eq!(cond.pick(handles), Some(ElementHandle::new("b")));

        let cond = ElementCondition::new(
            LocatorSpec::class("android.widget.EditText", 2),
            Requirement::Present,
        );
        assert_eq!(cond.pick(vec![ElementHandle::new("a")]), None);
    }

    #[test]
    fn test_failure_attempts_accessor() {
        let failure = ResolutionFailure::NotFound {
            target: "x".into(),
            attempts: vec![StrategyAttempt {
                strategy: LocatorSpec::identifier("x"),
                outcome: AttemptOutcome::NotFound,
                elapsed_ms: 5,
            }],
        };
        assert_eq!(failure.attempts().len(), 1);
        assert!(failure.to_string().contains("1 tried"));
    }
}
