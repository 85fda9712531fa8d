//! Terminal output for run summaries

use console::style;
use pagewright::RunSummary;

/// One-line summary of a feature run
#[must_use]
pub fn format_summary(summary: &RunSummary) -> String {
    let status = if summary.failed() {
        style("FAILED").red().bold()
    } else {
        style("PASSED").green().bold()
    };
    let mut line = format!(
        "{status}: {} passed, {} failed, {} skipped",
        summary.passed_steps, summary.failed_steps, summary.skipped_steps
    );
    if summary.parsing_errors > 0 {
        line.push_str(&format!(", {} parsing error(s)", summary.parsing_errors));
    }
    if summary.hook_errors > 0 {
        line.push_str(&format!(", {} hook error(s)", summary.hook_errors));
    }
    line
}

/// Section heading
#[must_use]
pub fn heading(text: &str) -> String {
    style(text).bold().underlined().to_string()
}
