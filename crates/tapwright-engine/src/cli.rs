use crate::backend::Backend;
use crate::flow::{FlowRunner, ManualError, ManualGate};
use crate::formatter::format_flow_result;
use crate::scenario::{LoadedScenario, ScenarioLoadError, ScenarioLoader};
use async_trait::async_trait;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Clone, Copy)]
pub struct OutputHandlers {
    pub out: fn(&str),
    pub err: fn(&str),
}

pub struct FileOptions {
    /// Stop after the first failed flow.
    pub stop_on_error: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    /// Flows never started because an earlier one failed.
    pub not_run: usize,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.not_run == 0
    }
}

/// Load every scenario matched by `patterns`, then run them in order.
///
/// All files are loaded and validated before the first flow starts, so a
/// broken file never leaves a half-run session behind.
pub async fn run_files<B: Backend + ?Sized>(
    backend: &mut B,
    runner: &mut FlowRunner,
    output: OutputHandlers,
    patterns: &[String],
    options: FileOptions,
) -> Result<RunSummary, ScenarioLoadError> {
    let mut scenarios: Vec<LoadedScenario> = Vec::new();
    for pattern in patterns {
        scenarios.extend(ScenarioLoader::load_glob(pattern).await?);
    }
    info!("Loaded {} scenario(s)", scenarios.len());

    let mut summary = RunSummary::default();
    let total = scenarios.len();
    for (i, scenario) in scenarios.iter().enumerate() {
        let result = runner.run(backend, &scenario.flow).await;
        if result.succeeded() {
            summary.passed += 1;
            (output.out)(&format_flow_result(&result));
            continue;
        }

        summary.failed += 1;
        (output.err)(&format_flow_result(&result));
        if options.stop_on_error {
            summary.not_run = total - i - 1;
            if summary.not_run > 0 {
                warn!("Stopping after failed flow, {} not run", summary.not_run);
            }
            break;
        }
    }
    Ok(summary)
}

/// Manual gate reading confirmations from the terminal.
///
/// Any line on stdin confirms; end of input or Ctrl+C abandons the step.
pub struct StdinGate {
    reader: tokio::io::Lines<BufReader<tokio::io::Stdin>>,
}

impl Default for StdinGate {
    fn default() -> Self {
        Self::new()
    }
}

impl StdinGate {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

fn classify_line(step: &str, result: Result<Option<String>, io::Error>) -> Result<(), ManualError> {
    match result {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(ManualError::Abandoned(step.to_string())),
        Err(e) => Err(ManualError::Io(e)),
    }
}

#[async_trait]
impl ManualGate for StdinGate {
    async fn wait_for_confirmation(&mut self, step: &str, prompt: &str) -> Result<(), ManualError> {
        let mut stdout = io::stdout();
        writeln!(stdout, "\n[{}] {}", step, prompt)?;
        write!(stdout, "Press ENTER when done... ")?;
        stdout.flush()?;

        tokio::select! {
            line = self.reader.next_line() => classify_line(step, line),
            _ = tokio::signal::ctrl_c() => Err(ManualError::Abandoned(step.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_line() {
        assert!(classify_line("upload", Ok(Some(String::new()))).is_ok());
        assert!(matches!(
            classify_line("upload", Ok(None)),
            Err(ManualError::Abandoned(step)) if step == "upload"
        ));
        assert!(matches!(
            classify_line("upload", Err(io::Error::other("closed"))),
            Err(ManualError::Io(_))
        ));
    }

    #[test]
    fn test_summary() {
        let summary = RunSummary {
            passed: 2,
            failed: 0,
            not_run: 0,
        };
        assert!(summary.all_passed());
        assert!(
            !RunSummary {
                failed: 1,
                ..summary
            }
            .all_passed()
        );
    }
}
