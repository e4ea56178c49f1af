//! Plain text quality report

use super::{BatchMetrics, REPORT_TIMESTAMP_FORMAT};

const RULE_WIDTH: usize = 70;
const TOP_ISSUES: usize = 10;

/// Render the batch summary as plain text
pub fn generate_text_report(metrics: &BatchMetrics) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let end_time = metrics
        .end_time
        .map(|t| t.format(REPORT_TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "In Progress".to_string());

    let mut lines = vec![
        rule.clone(),
        "HPRA Parser - Quality Summary Report".to_string(),
        rule.clone(),
        String::new(),
        "Batch Information:".to_string(),
        format!("  Start Time: {}", metrics.start_time.format(REPORT_TIMESTAMP_FORMAT)),
        format!("  End Time: {}", end_time),
    ];

    if let Some(duration) = metrics.duration_seconds() {
        lines.push(format!("  Duration: {:.2} seconds", duration));
    }

    lines.extend([
        String::new(),
        "Processing Counts:".to_string(),
        format!("  Total Files: {}", metrics.total_files()),
        format!("  Successfully Processed: {}", metrics.total_processed()),
        format!("  Skipped: {}", metrics.total_skipped()),
        format!("  Warnings: {}", metrics.total_warnings()),
        format!("  Failures: {}", metrics.total_failures()),
        format!("  Total Records: {}", metrics.total_records()),
        String::new(),
        format!("Success Rate: {:.2}%", metrics.success_rate()),
        String::new(),
    ]);

    let issues = metrics.frequent_issues(TOP_ISSUES);
    if !issues.is_empty() {
        lines.push("Most Frequent Issues:".to_string());
        lines.push(String::new());
        for (issue, count) in issues {
            lines.push(format!("  [{}x] {}", count, issue));
        }
    }

    lines.push(rule);
    lines.join("\n")
}
