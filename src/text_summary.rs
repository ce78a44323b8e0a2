//! Text summary builder for CLI output.
//!
//! Formats a finished wizard run as human-readable lines for text mode.

use crate::model::WizardOutcome;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(outcome: &WizardOutcome) -> TextSummary {
    let mut lines = Vec::new();

    if let Some(template) = outcome.template.as_deref() {
        lines.push(format!("Template: {template}"));
    }
    lines.push(format!("Session: {}", outcome.file_id));

    let width = outcome.answers.keys().map(|k| k.len()).max().unwrap_or(0);
    lines.push("Answers:".to_string());
    for (key, value) in &outcome.answers {
        let shown = if value.is_empty() {
            "(empty)"
        } else {
            value.as_str()
        };
        lines.push(format!("  {key:<width$}  {shown}"));
    }

    lines.push(format!("Download: {}", outcome.download_url));
    if let Some(path) = outcome.saved_to.as_deref() {
        lines.push(format!("Saved: {}", path.display()));
    }

    TextSummary { lines }
}
