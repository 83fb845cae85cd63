//! Sequential scenario execution.

use crate::backend::Backend;
use crate::executor::ActionExecutor;
use crate::formatter::{format_action_result, format_snapshot};
use crate::protocol::{
    Action, ActionResult, FailureKind, Flow, FlowResult, FlowStatus, ScenarioStep, Snapshot,
    StepReport, StepStatus,
};
use crate::snapshot::SnapshotCollector;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep, timeout};
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ManualError {
    #[error("Manual step '{0}' was abandoned")]
    Abandoned(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Releases a manual step once a human has done their part.
///
/// Waiting is unbounded; implementations decide what counts as confirmation.
#[async_trait]
pub trait ManualGate: Send {
    async fn wait_for_confirmation(&mut self, step: &str, prompt: &str) -> Result<(), ManualError>;
}

/// A gate that answers from a fixed script. Used in tests.
pub struct ScriptedGate {
    responses: VecDeque<bool>,
    fallback: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGate {
    /// Answer with `responses` in order, then confirm everything.
    pub fn new(responses: impl IntoIterator<Item = bool>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            fallback: true,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn confirming() -> Self {
        Self::new(Vec::new())
    }

    pub fn abandoning() -> Self {
        Self {
            fallback: false,
            ..Self::new(Vec::new())
        }
    }

    /// Shared log of every prompt shown, in order.
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }
}

#[async_trait]
impl ManualGate for ScriptedGate {
    async fn wait_for_confirmation(&mut self, step: &str, prompt: &str) -> Result<(), ManualError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if self.responses.pop_front().unwrap_or(self.fallback) {
            Ok(())
        } else {
            Err(ManualError::Abandoned(step.to_string()))
        }
    }
}

pub struct FlowRunner {
    executor: ActionExecutor,
    collector: SnapshotCollector,
    gate: Option<Box<dyn ManualGate>>,
    step_timeout: Option<Duration>,
}

impl FlowRunner {
    pub fn new(executor: ActionExecutor, collector: SnapshotCollector) -> Self {
        Self {
            executor,
            collector,
            gate: None,
            step_timeout: None,
        }
    }

    pub fn with_gate(mut self, gate: impl ManualGate + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }

    /// Bound every non-manual step by `limit`.
    pub fn with_step_timeout(mut self, limit: Duration) -> Self {
        self.step_timeout = Some(limit);
        self
    }

    /// Run `flow` step by step against one session.
    ///
    /// The first failing required step ends the run: a snapshot is captured
    /// and every later step stays `Pending`. Failing optional steps are marked
    /// `Skipped` and the run continues.
    pub async fn run<B: Backend + ?Sized>(&mut self, backend: &mut B, flow: &Flow) -> FlowResult {
        let mut result = FlowResult {
            flow: flow.name.clone(),
            status: FlowStatus::Running,
            failed_step: None,
            failed_index: None,
            snapshot: None,
            steps: flow
                .steps
                .iter()
                .map(|step| StepReport {
                    name: step.name.clone(),
                    status: StepStatus::Pending,
                    result: None,
                    duration_ms: 0,
                })
                .collect(),
        };

        info!("Running flow '{}' ({} steps)", flow.name, flow.steps.len());

        for (i, step) in flow.steps.iter().enumerate() {
            result.steps[i].status = StepStatus::Running;
            info!("Step {}/{}: {}", i + 1, flow.steps.len(), step.name);

            let started = Instant::now();
            let outcome = self.run_step(backend, step).await;
            result.steps[i].duration_ms = started.elapsed().as_millis() as u64;

            if outcome.is_success() {
                result.steps[i].status = StepStatus::Succeeded;
                result.steps[i].result = Some(outcome);
                if step.settle_ms > 0 {
                    sleep(Duration::from_millis(step.settle_ms)).await;
                }
                continue;
            }

            if step.required {
                error!(
                    "Required step '{}' failed:\n{}",
                    step.name,
                    format_action_result(&outcome)
                );
                result.steps[i].status = StepStatus::Failed;
                result.steps[i].result = Some(outcome);
                result.failed_step = Some(step.name.clone());
                result.failed_index = Some(i);

                let snapshot = self.collector.capture(backend).await;
                log_snapshot(&snapshot);
                result.snapshot = Some(snapshot);
                result.status = FlowStatus::Failed;
                return result;
            }

            warn!(
                "Optional step '{}' failed, continuing:\n{}",
                step.name,
                format_action_result(&outcome)
            );
            result.steps[i].status = StepStatus::Skipped;
            result.steps[i].result = Some(outcome);
        }

        info!("Flow '{}' succeeded", flow.name);
        result.status = FlowStatus::Succeeded;
        result
    }

    async fn run_step<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        step: &ScenarioStep,
    ) -> ActionResult {
        match &step.action {
            Action::Manual(prompt) => {
                let Some(gate) = self.gate.as_mut() else {
                    return ActionResult::failed(
                        FailureKind::ActionRejected,
                        "no manual gate configured",
                    );
                };
                info!("Waiting for manual step '{}': {}", step.name, prompt);
                match gate.wait_for_confirmation(&step.name, prompt).await {
                    Ok(()) => ActionResult::success(),
                    Err(e) => ActionResult::failed(FailureKind::ActionRejected, e.to_string()),
                }
            }
            Action::Inspect => {
                let snapshot = self.collector.capture(backend).await;
                log_snapshot(&snapshot);
                ActionResult::success()
            }
            action => {
                let execution = self
                    .executor
                    .execute(backend, step.target.as_ref(), action);
                match self.step_timeout {
                    Some(limit) => match timeout(limit, execution).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            warn!("Step '{}' exceeded {:?}", step.name, limit);
                            ActionResult::failed(
                                FailureKind::Timeout,
                                format!("step exceeded {} ms", limit.as_millis()),
                            )
                        }
                    },
                    None => execution.await,
                }
            }
        }
    }
}

fn log_snapshot(snapshot: &Snapshot) {
    for line in format_snapshot(snapshot) {
        info!("{}", line);
    }
}
