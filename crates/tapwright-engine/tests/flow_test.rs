mod common;

use async_trait::async_trait;
use common::{MockBackend, MockElement, fast_chain, init_tracing};
use std::time::Duration;
use tapwright_engine::executor::{ActionExecutor, ExecutorOptions};
use tapwright_engine::flow::{FlowRunner, ManualError, ManualGate, ScriptedGate};
use tapwright_engine::formatter::format_flow_result;
use tapwright_engine::protocol::{
    Action, FailureKind, Flow, FlowStatus, LocatorSpec, Platform, ScenarioStep, StepStatus, Target,
};
use tapwright_engine::snapshot::SnapshotCollector;
use tokio::time::Instant;

fn runner() -> FlowRunner {
    FlowRunner::new(
        ActionExecutor::new(ExecutorOptions {
            chain: fast_chain(),
            ..Default::default()
        }),
        SnapshotCollector::for_platform(Platform::Android),
    )
}

fn button(id: &str) -> Target {
    Target::new(id).by(LocatorSpec::identifier(id))
}

fn click(id: &str) -> ScenarioStep {
    ScenarioStep::on(button(id), Action::Click)
}

fn abc_backend() -> MockBackend {
    MockBackend::new(vec![
        MockElement::button("a", "A"),
        MockElement::button("c", "C"),
        MockElement::text_view("Home"),
    ])
}

#[tokio::test]
async fn test_required_failure_stops_flow() {
    init_tracing();
    let mut backend = abc_backend();
    let flow = Flow::new("abc")
        .step(click("a"))
        .step(click("b"))
        .step(click("c"));

    let result = runner().run(&mut backend, &flow).await;

    assert_eq!(result.status, FlowStatus::Failed);
    assert_eq!(result.failed_step.as_deref(), Some("b"));
    assert_eq!(result.steps[0].status, StepStatus::Succeeded);
    assert_eq!(result.steps[1].status, StepStatus::Failed);
    assert_eq!(result.steps[2].status, StepStatus::Pending);
    assert!(result.steps[2].result.is_none());

    let snapshot = result.snapshot.as_ref().expect("snapshot on failure");
    assert_eq!(snapshot.text_nodes.nodes.len(), 1);

    assert_eq!(backend.clicks(), vec!["a"]);
    let failure = result.failure().unwrap().result.as_ref().unwrap();
    assert_eq!(failure.failure_kind(), Some(FailureKind::NotFound));
    assert_eq!(failure.attempts().len(), 1);
}

#[tokio::test]
async fn test_optional_failure_is_skipped() {
    let mut backend = abc_backend();
    let flow = Flow::new("abc")
        .step(click("a"))
        .step(click("b").optional())
        .step(click("c"));

    let result = runner().run(&mut backend, &flow).await;

    assert!(result.succeeded());
    assert!(result.failed_step.is_none());
    assert!(result.snapshot.is_none());
    let statuses: Vec<_> = result.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            StepStatus::Succeeded,
            StepStatus::Skipped,
            StepStatus::Succeeded
        ]
    );
    assert_eq!(backend.clicks(), vec!["a", "c"]);
}

#[tokio::test]
async fn test_manual_step_waits_for_gate() {
    let mut backend = abc_backend();
    let gate = ScriptedGate::confirming();
    let prompts = gate.prompts();
    let flow = Flow::new("upload")
        .step(ScenarioStep::new(
            "Upload documents",
            None,
            Action::Manual("Upload the company documents on the device".into()),
        ))
        .step(click("c"));

    let result = runner().with_gate(gate).run(&mut backend, &flow).await;

    assert!(result.succeeded());
    assert_eq!(
        *prompts.lock().unwrap(),
        vec!["Upload the company documents on the device".to_string()]
    );
}

#[tokio::test]
async fn test_abandoned_manual_step_fails_flow() {
    let mut backend = abc_backend();
    let flow = Flow::new("upload")
        .step(ScenarioStep::new("Upload", None, Action::Manual("Upload".into())))
        .step(click("a"));

    let result = runner()
        .with_gate(ScriptedGate::abandoning())
        .run(&mut backend, &flow)
        .await;

    assert_eq!(result.status, FlowStatus::Failed);
    assert_eq!(result.failed_step.as_deref(), Some("Upload"));
    assert!(backend.clicks().is_empty());
}

#[tokio::test]
async fn test_manual_step_without_gate_fails() {
    let mut backend = abc_backend();
    let flow = Flow::new("upload").step(ScenarioStep::new(
        "Upload",
        None,
        Action::Manual("Upload".into()),
    ));

    let result = runner().run(&mut backend, &flow).await;
    assert_eq!(result.status, FlowStatus::Failed);
}

struct SlowGate(Duration);

#[async_trait]
impl ManualGate for SlowGate {
    async fn wait_for_confirmation(&mut self, _step: &str, _prompt: &str) -> Result<(), ManualError> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_step_timeout_bounds_actions_but_not_manual_steps() {
    let mut backend = abc_backend();
    let flow = Flow::new("slow")
        .step(ScenarioStep::new(
            "Human",
            None,
            Action::Manual("take your time".into()),
        ))
        .step(ScenarioStep::on(
            button("missing").with_timeout_ms(5000),
            Action::Click,
        ));

    let start = Instant::now();
    let result = runner()
        .with_gate(SlowGate(Duration::from_millis(300)))
        .with_step_timeout(Duration::from_millis(150))
        .run(&mut backend, &flow)
        .await;

    assert_eq!(result.steps[0].status, StepStatus::Succeeded);
    assert_eq!(result.steps[1].status, StepStatus::Failed);
    let failure = result.steps[1].result.as_ref().unwrap();
    assert_eq!(failure.failure_kind(), Some(FailureKind::Timeout));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_inspect_and_read_text_steps() {
    let mut backend = abc_backend();
    let flow = Flow::new("inspect")
        .step(ScenarioStep::new("Look around", None, Action::Inspect))
        .step(ScenarioStep::on(
            Target::new("Title").by(LocatorSpec::text_equals("Home")),
            Action::ReadText,
        ))
        .step(ScenarioStep::new("Back", None, Action::Back));

    let result = runner().run(&mut backend, &flow).await;

    assert!(result.succeeded());
    assert!(result.snapshot.is_none());
    let title = result.step("Title").unwrap().result.as_ref().unwrap();
    assert_eq!(title.output(), Some("Home"));
    assert_eq!(backend.log.last().map(String::as_str), Some("back"));
}

#[tokio::test]
async fn test_settle_delay_applies_after_success() {
    let mut backend = abc_backend();
    let flow = Flow::new("settle").step(click("a").settle_ms(200));

    let start = Instant::now();
    let result = runner().run(&mut backend, &flow).await;

    assert!(result.succeeded());
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert!(result.steps[0].duration_ms < 200);
}

#[tokio::test]
async fn test_failure_report_with_repeated_step_name() {
    let mut backend = abc_backend();
    // Both steps are named after their target "a"; the second looks in the wrong place.
    let flow = Flow::new("repeat").step(click("a")).step(ScenarioStep::on(
        Target::new("a").by(LocatorSpec::identifier("missing")),
        Action::Click,
    ));

    let result = runner().run(&mut backend, &flow).await;

    assert_eq!(result.status, FlowStatus::Failed);
    assert_eq!(result.failed_index, Some(1));
    let failure = result.failure().unwrap();
    assert_eq!(failure.status, StepStatus::Failed);
    let outcome = failure.result.as_ref().unwrap();
    assert_eq!(outcome.failure_kind(), Some(FailureKind::NotFound));
    assert_eq!(outcome.attempts().len(), 1);

    let report = format_flow_result(&result);
    assert!(report.contains("Failed step: a\nfailed [NOT_FOUND]"));
    assert!(report.contains("id=missing -> not found"));
}
