//! Console rendering of a [`BenchmarkReport`].

use std::fmt::Write as _;

use crate::runner::BenchmarkReport;

fn table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    render_row(&mut out, &widths, header.iter().copied());
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    render_row(&mut out, &widths, rule.iter().map(String::as_str));
    for row in rows {
        render_row(&mut out, &widths, row.iter().map(String::as_str));
    }
    out
}

fn render_row<'a>(out: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    let line = cells
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &width))| {
            // First column left-aligned, numbers right-aligned.
            if i == 0 {
                format!("{cell:<width$}")
            } else {
                format!("{cell:>width$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_owned(), |value| format!("{value:.precision$}"))
}

/// One row per approach, in plan order.
pub fn render_approaches(report: &BenchmarkReport) -> String {
    let rows: Vec<Vec<String>> = report
        .approaches
        .iter()
        .map(|result| {
            let s = &result.summary;
            let errors = s
                .error_counts
                .iter()
                .map(|(kind, count)| format!("{kind}={count}"))
                .collect::<Vec<_>>()
                .join(",");
            vec![
                s.key(),
                s.runs.to_string(),
                format!("{:.1}%", s.parse_success_rate),
                format!("{:.1}", s.mean_latency_ms),
                format!("{:.1}", s.median_latency_ms),
                format!("{:.1}", s.p95_latency_ms),
                format!("{:.2}", s.avg_valid_hint_count),
                optional(s.avg_score, 2),
                optional(s.avg_cost, 6),
                if errors.is_empty() { "-".to_owned() } else { errors },
            ]
        })
        .collect();

    table(
        &[
            "approach", "runs", "success", "mean ms", "p50 ms", "p95 ms", "edits", "score",
            "cost $", "errors",
        ],
        &rows,
    )
}

pub fn render_models(report: &BenchmarkReport) -> String {
    let rows: Vec<Vec<String>> = report
        .models
        .iter()
        .map(|model| {
            vec![
                model.model.clone(),
                model.runs.to_string(),
                format!("{:.1}%", model.parse_success_rate),
                format!("{:.1}", model.mean_latency_ms),
                optional(model.avg_score, 2),
                optional(model.total_cost, 6),
                model
                    .best_strategy
                    .map_or_else(|| "-".to_owned(), |strategy| strategy.to_string()),
            ]
        })
        .collect();

    table(
        &["model", "runs", "success", "mean ms", "score", "total $", "best strategy"],
        &rows,
    )
}

/// Diffs of each case's first run, grouped by approach.
pub fn render_previews(report: &BenchmarkReport) -> String {
    let mut out = String::new();
    for result in &report.approaches {
        for preview in &result.previews {
            let _ = writeln!(out, "=== {} / {} ===", result.summary.key(), preview.case);
            out.push_str(&preview.diff);
            if !preview.diff.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}
