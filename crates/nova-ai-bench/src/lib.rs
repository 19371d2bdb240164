//! Benchmark harness for the `nova-ai` edit pipeline.
//!
//! Runs every `(model, strategy)` approach over a set of test cases, several times each, under a
//! concurrency cap, and aggregates success rates, latency, cost and (optionally) critic scores.

mod cases;
mod critic;
mod export;
mod metrics;
pub mod report;
mod runner;

pub use cases::{load_cases, parse_cases, CaseLoadError, TestCase};
pub use critic::{parse_score, Critic, ModelCritic, Review, MAX_SCORE};
pub use export::{export_json, write_export, ExportError};
pub use metrics::{latency_quantiles, ApproachSummary, ModelSummary, RunMetric};
pub use runner::{
    Approach, ApproachResult, BenchmarkPlan, BenchmarkReport, BenchmarkRunner, CasePreview,
    EngineGenerator, Generator,
};
