//! Terminal rendering of request outcomes.

use crate::degrade::DegradeReport;
use crate::message::Message;
use crate::outcome::{OutcomeKind, RequestOutcome};
use console::style;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output for scripting
    Json,
}

/// Print a success message
pub fn success(msg: impl Display) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: impl Display) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: impl Display) {
    println!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print a section header
pub fn header(msg: impl Display) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Serializable digest of an outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeSummary {
    /// Terminal state
    pub outcome: String,
    /// Attempts made
    pub attempts: u32,
    /// Error message for failed outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error kind for failed outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Assistant text, in order
    pub text: Vec<String>,
    /// Structured result, when the agent returned JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl OutcomeSummary {
    /// Summarize an outcome.
    pub fn from_outcome(outcome: &RequestOutcome<Message>) -> Self {
        let (text, result) = match outcome {
            RequestOutcome::Success { items, .. } => (
                items
                    .iter()
                    .flat_map(|message| message.text_blocks().map(str::to_string))
                    .collect(),
                items.iter().rev().find_map(Message::result_json),
            ),
            _ => (Vec::new(), None),
        };

        let error = match outcome {
            RequestOutcome::Timeout { elapsed, .. } => {
                Some(format!("Operation timed out after {:.1}s", elapsed.as_secs_f64()))
            }
            _ => outcome.error().map(ToString::to_string),
        };

        Self {
            outcome: outcome.kind().to_string(),
            attempts: outcome.attempts(),
            error,
            error_kind: outcome.error_kind().map(|kind| kind.to_string()),
            text,
            result,
        }
    }
}

/// Print an outcome.
pub fn render_outcome(outcome: &RequestOutcome<Message>, format: OutputFormat) {
    let summary = OutcomeSummary::from_outcome(outcome);
    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Human => render_human(&summary, outcome.kind()),
    }
}

/// Print a degradation report.
pub fn render_degrade_report(report: &DegradeReport<Message>, format: OutputFormat) {
    if format == OutputFormat::Json {
        let tiers: Vec<Value> = report
            .tiers
            .iter()
            .map(|tier| {
                serde_json::json!({
                    "label": tier.label,
                    "outcome": tier.outcome.to_string(),
                    "attempts": tier.attempts,
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "tiers": tiers,
            "final": OutcomeSummary::from_outcome(&report.outcome),
        }));
        return;
    }

    for tier in &report.tiers {
        let line = format!("{} ({} attempt(s))", tier.label, tier.attempts);
        match tier.outcome {
            OutcomeKind::Success => success(line),
            _ => warning(format!("{}: {}", line, tier.outcome)),
        }
    }
    render_outcome(&report.outcome, OutputFormat::Human);
}

fn render_human(summary: &OutcomeSummary, kind: OutcomeKind) {
    for text in &summary.text {
        println!("Agent: {}", text);
    }
    if let Some(result) = &summary.result {
        header("Structured result");
        match serde_json::to_string_pretty(result) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", result),
        }
    }

    match kind {
        OutcomeKind::Success => success(format!(
            "Completed after {} attempt(s)",
            summary.attempts
        )),
        _ => error(format!(
            "{} after {} attempt(s): {}",
            kind,
            summary.attempts,
            summary.error.as_deref().unwrap_or("no details")
        )),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error(format!("Failed to serialize output: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::message::ContentBlock;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_summary_of_success() {
        let outcome = RequestOutcome::Success {
            items: vec![
                Message::Assistant {
                    content: vec![ContentBlock::Text {
                        text: "The sum is: 100".to_string(),
                    }],
                },
                Message::Result {
                    subtype: "success".to_string(),
                    is_error: false,
                    num_turns: 1,
                    session_id: "s".to_string(),
                    duration_ms: 10,
                    total_cost_usd: None,
                    result: Some("{\"answer\":100}".to_string()),
                    structured_output: None,
                },
            ],
            attempts: 2,
        };

        let summary = OutcomeSummary::from_outcome(&outcome);
        assert_eq!(summary.outcome, "success");
        assert_eq!(summary.attempts, 2);
        assert_eq!(summary.text, vec!["The sum is: 100".to_string()]);
        assert_eq!(summary.result, Some(json!({"answer": 100})));
        assert!(summary.error.is_none());
    }

    #[test]
    fn test_summary_of_failures() {
        let fatal: RequestOutcome<Message> = RequestOutcome::Fatal {
            error: Error::DependencyMissing {
                program: "claude".to_string(),
            },
            attempts: 1,
        };
        let summary = OutcomeSummary::from_outcome(&fatal);
        assert_eq!(summary.outcome, "fatal");
        assert_eq!(summary.error_kind.as_deref(), Some("fatal"));
        assert!(summary.error.unwrap().contains("R001"));

        let timeout: RequestOutcome<Message> = RequestOutcome::Timeout {
            attempts: 2,
            elapsed: Duration::from_millis(1500),
        };
        let summary = OutcomeSummary::from_outcome(&timeout);
        assert_eq!(summary.error.as_deref(), Some("Operation timed out after 1.5s"));
        assert_eq!(summary.error_kind.as_deref(), Some("timeout"));
    }
}
