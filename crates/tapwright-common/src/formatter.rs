use crate::protocol::{
    ActionResult, AttemptOutcome, FlowResult, FlowStatus, NodeGroup, Snapshot, StepStatus,
    StrategyAttempt,
};

/// Default sensitive field names that should be masked in output.
const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "secret",
    "token",
    "key",
    "cvv",
    "ssn",
    "card_number",
    "credit_card",
];

/// Mask `value` when `field_name` looks like a secret.
pub fn mask_sensitive(value: &str, field_name: &str, sensitive_fields: &[String]) -> String {
    let field = field_name.to_lowercase();
    let is_sensitive = sensitive_fields
        .iter()
        .any(|f| field.contains(&f.to_lowercase()))
        || DEFAULT_SENSITIVE_FIELDS.iter().any(|f| field.contains(*f));

    if is_sensitive {
        "••••••••".to_string()
    } else {
        value.to_string()
    }
}

fn format_outcome(outcome: &AttemptOutcome) -> String {
    match outcome {
        AttemptOutcome::Matched => "matched".to_string(),
        AttemptOutcome::NotFound => "not found".to_string(),
        AttemptOutcome::NotInteractable => "found but not interactable".to_string(),
        AttemptOutcome::Error(msg) => format!("error: {}", msg),
    }
}

/// One line per attempted strategy, in attempt order.
pub fn format_attempts(attempts: &[StrategyAttempt]) -> Vec<String> {
    attempts
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "  {}. {} -> {} ({} ms)",
                i + 1,
                a.strategy,
                format_outcome(&a.outcome),
                a.elapsed_ms
            )
        })
        .collect()
}

pub fn format_action_result(result: &ActionResult) -> String {
    match result {
        ActionResult::Succeeded {
            strategy, output, ..
        } => {
            let mut line = match strategy {
                Some(s) => format!("ok via {}", s),
                None => "ok".to_string(),
            };
            if let Some(text) = output {
                line.push_str(&format!(" -> {:?}", text));
            }
            line
        }
        ActionResult::Failed {
            kind,
            reason,
            attempts,
        } => {
            let mut lines = vec![format!("failed [{}]: {}", kind.code(), reason)];
            lines.extend(format_attempts(attempts));
            lines.join("\n")
        }
    }
}

fn format_group(title: &str, group: &NodeGroup, out: &mut Vec<String>) {
    out.push(format!(
        "{}: {} found, {} listed{}",
        title,
        group.found,
        group.nodes.len(),
        if group.skipped > 0 {
            format!(", {} unreadable", group.skipped)
        } else {
            String::new()
        }
    ));

    for node in &group.nodes {
        let mut line = format!("  [{}] {}", node.index, node.class_name);
        if let Some(text) = &node.text
            && !text.is_empty()
        {
            line.push_str(&format!(" {:?}", text));
        }
        if let Some(hint) = &node.hint
            && !hint.is_empty()
        {
            line.push_str(&format!(" hint={:?}", hint));
        }
        if let Some(id) = &node.identifier
            && !id.is_empty()
        {
            line.push_str(&format!(" #{}", id));
        }

        let mut flags = Vec::new();
        if node.displayed == Some(false) {
            flags.push("hidden");
        }
        if node.enabled == Some(false) {
            flags.push("disabled");
        }
        if !flags.is_empty() {
            line.push_str(&format!(" {{{}}}", flags.join(", ")));
        }
        out.push(line);
    }
}

/// Render a snapshot as log lines.
pub fn format_snapshot(snapshot: &Snapshot) -> Vec<String> {
    let mut out = Vec::new();
    out.push("=== UI snapshot ===".to_string());
    if let Some(err) = &snapshot.capture_error {
        out.push(format!("capture error: {}", err));
    }
    if let Some(size) = snapshot.tree_size {
        out.push(format!("page source: {} characters", size));
    }
    format_group("Text nodes", &snapshot.text_nodes, &mut out);
    format_group("Input nodes", &snapshot.input_nodes, &mut out);
    format_group("Interactive nodes", &snapshot.interactive_nodes, &mut out);
    out.push("=== end snapshot ===".to_string());
    out
}

fn status_mark(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Succeeded => "ok",
        StepStatus::Failed => "FAILED",
        StepStatus::Skipped => "skipped",
        StepStatus::Pending => "not run",
        StepStatus::Running => "running",
    }
}

/// Human-readable report of a whole flow run.
pub fn format_flow_result(result: &FlowResult) -> String {
    let mut out = Vec::new();
    let status = match result.status {
        FlowStatus::Succeeded => "SUCCEEDED",
        FlowStatus::Failed => "FAILED",
        FlowStatus::Running => "RUNNING",
        FlowStatus::Pending => "PENDING",
    };
    out.push(format!("Flow '{}': {}", result.flow, status));

    for step in &result.steps {
        let mut line = format!(
            "- {} [{}] ({} ms)",
            step.name,
            status_mark(step.status),
            step.duration_ms
        );
        if let Some(text) = step.result.as_ref().and_then(ActionResult::output) {
            line.push_str(&format!(" -> {:?}", text));
        }
        out.push(line);
    }

    if let Some(failure) = result.failure() {
        out.push(format!("Failed step: {}", failure.name));
        if let Some(r) = &failure.result {
            out.push(format_action_result(r));
        }
    }

    if let Some(snapshot) = &result.snapshot {
        out.extend(format_snapshot(snapshot));
    }

    out.join("\n")
}
