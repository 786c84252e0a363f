//! Writing analysis artifacts to disk

use crate::analysis::{AnalysisReport, ForecastRow};
use crate::error::Result;
use crate::metrics::ModelPerformance;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Forecast table file name
pub const FORECAST_TABLE: &str = "tb_forecasts.csv";
/// Performance table file name
pub const PERFORMANCE_TABLE: &str = "model_performance.csv";
/// Machine readable report file name
pub const REPORT_JSON: &str = "analysis_report.json";
/// Narrative report file name
pub const REPORT_MARKDOWN: &str = "analysis_report.md";

fn write_rows<P: AsRef<Path>, T: Serialize>(path: P, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the per-period forecast table as CSV
pub fn write_forecast_table<P: AsRef<Path>>(path: P, rows: &[ForecastRow]) -> Result<()> {
    write_rows(path, rows)
}

/// Write the model performance table as CSV
pub fn write_performance_table<P: AsRef<Path>>(path: P, rows: &[ModelPerformance]) -> Result<()> {
    write_rows(path, rows)
}

/// Write the full report as pretty-printed JSON
pub fn write_report_json<P: AsRef<Path>>(path: P, report: &AnalysisReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

/// Render the narrative report
pub fn render_markdown(report: &AnalysisReport) -> String {
    let s = &report.summary;
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "# TB Incidence Forecast Report\n");
    let _ = writeln!(out, "Generated {}\n", report.generated_at.format("%Y-%m-%d %H:%M UTC"));

    let _ = writeln!(out, "## Historical data\n");
    let _ = writeln!(out, "| Statistic | Value |");
    let _ = writeln!(out, "|---|---|");
    let _ = writeln!(out, "| Observations | {} |", s.observations);
    let _ = writeln!(out, "| Period | {} to {} |", s.first_period, s.last_period);
    let _ = writeln!(out, "| First value | {:.1} |", s.first_value);
    let _ = writeln!(out, "| Midpoint value | {:.1} |", s.midpoint_value);
    let _ = writeln!(out, "| Last value | {:.1} |", s.last_value);
    let _ = writeln!(out, "| Mean | {:.1} |", s.mean);
    let _ = writeln!(out, "| Standard deviation | {:.1} |", s.std_dev);
    let _ = writeln!(out, "| Reduction | {:.1}% |", s.reduction_pct);
    let _ = writeln!(out, "| Average change per period | {:.2} |\n", s.avg_period_change);

    let _ = writeln!(out, "## Forecasts\n");
    let _ = writeln!(out, "| Period | Trend | Trend interval | ARIMA | Sequence |");
    let _ = writeln!(out, "|---|---|---|---|---|");
    for row in &report.forecasts {
        let sequence = match (row.sequence_lower, row.sequence_upper) {
            (Some(lo), Some(hi)) => format!("{:.1} ({:.1} - {:.1})", row.sequence, lo, hi),
            _ => format!("{:.1}", row.sequence),
        };
        let _ = writeln!(
            out,
            "| {} | {:.1} | {:.1} - {:.1} | {:.1} | {} |",
            row.period, row.trend, row.trend_lower, row.trend_upper, row.arima, sequence
        );
    }
    let _ = writeln!(
        out,
        "\nFinal period forecasts range from {:.1} to {:.1}.\n",
        report.final_period_range.0, report.final_period_range.1
    );

    let _ = writeln!(out, "## Model performance\n");
    if report.performance.is_empty() {
        let _ = writeln!(out, "No held-out periods were available for evaluation.\n");
    } else {
        let _ = writeln!(out, "| Model | MSE | RMSE |");
        let _ = writeln!(out, "|---|---|---|");
        for perf in &report.performance {
            let _ = writeln!(out, "| {} | {:.2} | {:.2} |", perf.model, perf.mse, perf.rmse);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Caveats\n");
    let _ = writeln!(
        out,
        "The sequence forecast is recursive: each step is predicted from earlier \
         predictions rather than observations, so errors compound with the horizon."
    );
    if !report.extrapolated_steps.is_empty() {
        let steps: Vec<String> = report.extrapolated_steps.iter().map(|s| s.to_string()).collect();
        let _ = writeln!(
            out,
            "Steps {} fall outside the range seen in training and are extrapolations.",
            steps.join(", ")
        );
    }

    out
}

/// Write the narrative report as Markdown
pub fn write_markdown_report<P: AsRef<Path>>(path: P, report: &AnalysisReport) -> Result<()> {
    fs::write(path, render_markdown(report))?;
    Ok(())
}

/// Write every artifact into `dir`, creating it if needed
///
/// Returns the written paths in the order forecasts, performance, JSON, Markdown.
pub fn write_artifacts<P: AsRef<Path>>(dir: P, report: &AnalysisReport) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let forecasts = dir.join(FORECAST_TABLE);
    let performance = dir.join(PERFORMANCE_TABLE);
    let json = dir.join(REPORT_JSON);
    let markdown = dir.join(REPORT_MARKDOWN);

    write_forecast_table(&forecasts, &report.forecasts)?;
    write_performance_table(&performance, &report.performance)?;
    write_report_json(&json, report)?;
    write_markdown_report(&markdown, report)?;

    info!(dir = %dir.display(), "artifacts written");
    Ok(vec![forecasts, performance, json, markdown])
}
