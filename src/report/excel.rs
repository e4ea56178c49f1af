//! Spreadsheet quality report
//!
//! Three sheets: "Summary", "Detailed Results" and "Frequent Issues".
//! Only available with the `excel` feature; without it generation fails
//! and the caller falls back to the text report.

use std::path::Path;

use super::BatchMetrics;
use crate::error::Result;

#[cfg(not(feature = "excel"))]
/// Spreadsheet support is not compiled in
pub fn generate_excel_report(_metrics: &BatchMetrics, _path: &Path) -> Result<()> {
    Err(crate::error::Error::Report(
        "spreadsheet reports need the `excel` feature".to_string(),
    ))
}

#[cfg(feature = "excel")]
pub use self::xlsx::generate_excel_report;

#[cfg(feature = "excel")]
mod xlsx {
    use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet, XlsxError};

    use super::super::{ProcessingStatus, REPORT_TIMESTAMP_FORMAT};
    use super::*;

    const HEADER_FILL: u32 = 0x366092;
    const TOP_ISSUES: usize = 20;

    /// Write the batch summary as an `.xlsx` workbook
    pub fn generate_excel_report(metrics: &BatchMetrics, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();

        let summary = workbook.add_worksheet();
        summary.set_name("Summary")?;
        populate_summary_sheet(summary, metrics)?;

        let details = workbook.add_worksheet();
        details.set_name("Detailed Results")?;
        populate_details_sheet(details, metrics)?;

        let issues = workbook.add_worksheet();
        issues.set_name("Frequent Issues")?;
        populate_issues_sheet(issues, metrics)?;

        workbook.save(path)?;
        Ok(())
    }

    fn header_format(size: f64) -> Format {
        Format::new()
            .set_bold()
            .set_font_size(size)
            .set_font_color(Color::RGB(0xFFFFFF))
            .set_background_color(Color::RGB(HEADER_FILL))
    }

    fn populate_summary_sheet(ws: &mut Worksheet, metrics: &BatchMetrics) -> std::result::Result<(), XlsxError> {
        let title = Format::new().set_bold().set_font_size(14.0);
        let section = Format::new().set_bold().set_font_size(12.0);
        let header = header_format(12.0);
        let bold = Format::new().set_bold();

        ws.write_string_with_format(0, 0, "HPRA Parser - Quality Summary Report", &title)?;

        ws.write_string_with_format(2, 0, "Batch Information", &section)?;
        ws.write_string(3, 0, "Start Time")?;
        ws.write_string(3, 1, &metrics.start_time.format(REPORT_TIMESTAMP_FORMAT).to_string())?;
        ws.write_string(4, 0, "End Time")?;
        let end_time = metrics
            .end_time
            .map(|t| t.format(REPORT_TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| "In Progress".to_string());
        ws.write_string(4, 1, &end_time)?;
        ws.write_string(5, 0, "Duration (seconds)")?;
        ws.write_string(5, 1, &format!("{:.2}", metrics.duration_seconds().unwrap_or(0.0)))?;

        ws.write_string_with_format(7, 0, "Processing Counts", &section)?;
        ws.write_string_with_format(8, 0, "Metric", &header)?;
        ws.write_string_with_format(8, 1, "Count", &header)?;

        let counts = [
            ("Total Files", metrics.total_files()),
            ("Successfully Processed", metrics.total_processed()),
            ("Skipped", metrics.total_skipped()),
            ("Warnings", metrics.total_warnings()),
            ("Failures", metrics.total_failures()),
            ("Total Records Processed", metrics.total_records()),
        ];
        for (offset, (label, count)) in counts.iter().enumerate() {
            let row = 9 + offset as u32;
            ws.write_string(row, 0, *label)?;
            ws.write_number(row, 1, *count as f64)?;
        }

        ws.write_string_with_format(16, 0, "Success Rate", &bold)?;
        ws.write_string(16, 1, &format!("{:.2}%", metrics.success_rate()))?;

        ws.set_column_width(0, 30.0)?;
        ws.set_column_width(1, 20.0)?;
        Ok(())
    }

    fn status_format(status: ProcessingStatus) -> Format {
        let (fill, font) = match status {
            ProcessingStatus::Success => (0xC6EFCE, 0x006100),
            ProcessingStatus::Failure => (0xFFC7CE, 0x9C0006),
            ProcessingStatus::Warning => (0xFFEB9C, 0x9C6500),
            ProcessingStatus::Skipped => (0xE7E6E6, 0x000000),
        };
        Format::new()
            .set_background_color(Color::RGB(fill))
            .set_font_color(Color::RGB(font))
    }

    fn populate_details_sheet(ws: &mut Worksheet, metrics: &BatchMetrics) -> std::result::Result<(), XlsxError> {
        let header = header_format(11.0)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);

        let headers = ["Filename", "Status", "Timestamp", "Records", "Error/Warning Message"];
        for (col, title) in headers.iter().enumerate() {
            ws.write_string_with_format(0, col as u16, *title, &header)?;
        }

        for (index, result) in metrics.results.iter().enumerate() {
            let row = 1 + index as u32;
            ws.write_string(row, 0, &result.filename)?;
            ws.write_string_with_format(row, 1, result.status.label(), &status_format(result.status))?;
            ws.write_string(row, 2, &result.timestamp.format(REPORT_TIMESTAMP_FORMAT).to_string())?;
            ws.write_number(row, 3, result.records_processed as f64)?;
            ws.write_string(row, 4, result.message())?;
        }

        for (col, width) in [30.0, 15.0, 20.0, 10.0, 60.0].into_iter().enumerate() {
            ws.set_column_width(col as u16, width)?;
        }
        ws.set_freeze_panes(1, 0)?;
        Ok(())
    }

    fn populate_issues_sheet(ws: &mut Worksheet, metrics: &BatchMetrics) -> std::result::Result<(), XlsxError> {
        let section = Format::new().set_bold().set_font_size(12.0);
        let header = header_format(11.0)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);

        ws.write_string_with_format(0, 0, "Most Frequent Issues", &section)?;
        ws.write_string_with_format(2, 0, "Issue Description", &header)?;
        ws.write_string_with_format(2, 1, "Occurrences", &header)?;

        let issues = metrics.frequent_issues(TOP_ISSUES);
        if issues.is_empty() {
            ws.write_string(3, 0, "No issues recorded")?;
            ws.write_string(3, 1, "0")?;
        }
        for (index, (issue, count)) in issues.iter().enumerate() {
            let row = 3 + index as u32;
            ws.write_string(row, 0, issue)?;
            ws.write_number(row, 1, *count as f64)?;
        }

        ws.set_column_width(0, 80.0)?;
        ws.set_column_width(1, 15.0)?;
        ws.set_freeze_panes(3, 0)?;
        Ok(())
    }

}
