//! Per-run metrics and their aggregates.

use std::collections::BTreeMap;
use std::time::Duration;

use hdrhistogram::Histogram;
use nova_ai::{ParseErrorKind, Strategy, TokenUsage};
use serde::Serialize;

// Latencies are recorded in microseconds.
const LATENCY_SIGFIG: u8 = 3;
// Provider timeouts sit well below this. Values above it are clamped.
const MAX_LATENCY_US: u64 = 10 * 60 * 1_000_000;

/// Outcome of a single benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetric {
    pub parse_success: bool,
    pub hint_count: usize,
    pub valid_hint_count: usize,
    /// [`ParseErrorKind::None`] exactly when `parse_success` is set.
    pub parse_error_type: ParseErrorKind,
    pub gen_latency: Duration,
    pub score: Option<f64>,
    pub token_metrics: Option<TokenUsage>,
}

impl RunMetric {
    pub fn failure(kind: ParseErrorKind, gen_latency: Duration) -> Self {
        Self {
            parse_success: false,
            hint_count: 0,
            valid_hint_count: 0,
            parse_error_type: kind,
            gen_latency,
            score: None,
            token_metrics: None,
        }
    }
}

/// Aggregate for one `(model, strategy)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApproachSummary {
    pub model: String,
    pub strategy: Strategy,
    pub runs: usize,
    pub successes: usize,
    /// Percentage in `0..=100`.
    pub parse_success_rate: f64,
    pub mean_latency_ms: f64,
    pub median_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub avg_hint_count: f64,
    pub avg_valid_hint_count: f64,
    /// Mean critic score over successful, scored runs.
    pub avg_score: Option<f64>,
    pub scored_runs: usize,
    pub avg_input_tokens: f64,
    pub avg_output_tokens: f64,
    pub avg_cost: Option<f64>,
    pub avg_cost_without_cache: Option<f64>,
    pub total_cost: Option<f64>,
    /// Failed runs by kind. Successful runs are not counted.
    pub error_counts: BTreeMap<ParseErrorKind, usize>,
}

impl ApproachSummary {
    pub fn from_runs(model: &str, strategy: Strategy, runs: &[RunMetric]) -> Self {
        let latencies: Vec<f64> = runs.iter().map(|run| millis(run.gen_latency)).collect();
        let (median_latency_ms, p95_latency_ms) =
            latency_quantiles(runs.iter().map(|run| run.gen_latency));
        let successes = runs.iter().filter(|run| run.parse_success).count();

        let scores: Vec<f64> = runs
            .iter()
            .filter(|run| run.parse_success)
            .filter_map(|run| run.score)
            .collect();

        let tokens: Vec<&TokenUsage> = runs.iter().filter_map(|run| run.token_metrics.as_ref()).collect();
        let costs: Vec<f64> = tokens.iter().filter_map(|usage| usage.cost).collect();
        let uncached: Vec<f64> = tokens
            .iter()
            .filter_map(|usage| usage.cost_without_cache)
            .collect();

        let mut error_counts = BTreeMap::new();
        for run in runs.iter().filter(|run| !run.parse_success) {
            *error_counts.entry(run.parse_error_type).or_insert(0) += 1;
        }

        Self {
            model: model.to_owned(),
            strategy,
            runs: runs.len(),
            successes,
            parse_success_rate: rate(successes, runs.len()),
            mean_latency_ms: mean(&latencies).unwrap_or(0.0),
            median_latency_ms,
            p95_latency_ms,
            avg_hint_count: mean_of(runs, |run| run.hint_count as f64).unwrap_or(0.0),
            avg_valid_hint_count: mean_of(runs, |run| run.valid_hint_count as f64).unwrap_or(0.0),
            avg_score: mean(&scores),
            scored_runs: scores.len(),
            avg_input_tokens: mean_of(&tokens, |usage| usage.input as f64).unwrap_or(0.0),
            avg_output_tokens: mean_of(&tokens, |usage| usage.output as f64).unwrap_or(0.0),
            avg_cost: mean(&costs),
            avg_cost_without_cache: mean(&uncached),
            total_cost: (!costs.is_empty()).then(|| costs.iter().sum()),
            error_counts,
        }
    }

    /// `"<model>:<strategy>"`, the key used in exports.
    pub fn key(&self) -> String {
        format!("{}:{}", self.model, self.strategy)
    }

    pub fn failures(&self) -> usize {
        self.error_counts.values().sum()
    }
}

/// Aggregate across every strategy run for one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub model: String,
    pub runs: usize,
    pub parse_success_rate: f64,
    pub mean_latency_ms: f64,
    pub avg_score: Option<f64>,
    pub total_cost: Option<f64>,
    /// Strategy with the highest success rate (earliest on ties).
    pub best_strategy: Option<Strategy>,
}

impl ModelSummary {
    pub fn from_approaches<'a>(
        model: &str,
        approaches: impl IntoIterator<Item = (&'a ApproachSummary, &'a [RunMetric])>,
    ) -> Self {
        let mut all: Vec<&RunMetric> = Vec::new();
        let mut best: Option<(Strategy, f64)> = None;
        for (summary, runs) in approaches {
            all.extend(runs);
            if best.map_or(true, |(_, rate)| summary.parse_success_rate > rate) {
                best = Some((summary.strategy, summary.parse_success_rate));
            }
        }

        let successes = all.iter().filter(|run| run.parse_success).count();
        let latencies: Vec<f64> = all.iter().map(|run| millis(run.gen_latency)).collect();
        let scores: Vec<f64> = all
            .iter()
            .filter(|run| run.parse_success)
            .filter_map(|run| run.score)
            .collect();
        let costs: Vec<f64> = all
            .iter()
            .filter_map(|run| run.token_metrics.and_then(|usage| usage.cost))
            .collect();

        Self {
            model: model.to_owned(),
            runs: all.len(),
            parse_success_rate: rate(successes, all.len()),
            mean_latency_ms: mean(&latencies).unwrap_or(0.0),
            avg_score: mean(&scores),
            total_cost: (!costs.is_empty()).then(|| costs.iter().sum()),
            best_strategy: best.map(|(strategy, _)| strategy),
        }
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

fn rate(successes: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        successes as f64 / total as f64 * 100.0
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn mean_of<T>(items: &[T], f: impl Fn(&T) -> f64) -> Option<f64> {
    (!items.is_empty()).then(|| items.iter().map(f).sum::<f64>() / items.len() as f64)
}

/// Median and p95 of `samples` in milliseconds, read from an HDR histogram.
///
/// Empty input yields `(0.0, 0.0)`.
pub fn latency_quantiles(samples: impl IntoIterator<Item = Duration>) -> (f64, f64) {
    let mut hist = match Histogram::<u64>::new_with_bounds(1, MAX_LATENCY_US, LATENCY_SIGFIG) {
        Ok(hist) => hist,
        Err(err) => {
            tracing::debug!(
                target: "nova.ai.bench",
                error = %err,
                "failed to construct latency histogram"
            );
            return (0.0, 0.0);
        }
    };

    for sample in samples {
        let micros = sample.as_micros().min(u128::from(MAX_LATENCY_US)) as u64;
        if let Err(err) = hist.record(micros) {
            tracing::debug!(
                target: "nova.ai.bench",
                error = %err,
                micros,
                "failed to record latency sample"
            );
        }
    }

    if hist.is_empty() {
        return (0.0, 0.0);
    }
    (
        micros_to_millis(hist.value_at_quantile(0.50)),
        micros_to_millis(hist.value_at_quantile(0.95)),
    )
}

fn micros_to_millis(micros: u64) -> f64 {
    micros as f64 / 1_000.0
}
