use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use nova_ai::{GenerationOutcome, ParseErrorKind, PipelineError, Strategy};
use nova_ai_bench::{parse_cases, BenchmarkPlan, BenchmarkRunner, Generator, TestCase};
use pretty_assertions::assert_eq;

fn cases(count: usize) -> Vec<TestCase> {
    let json = (0..count)
        .map(|i| format!(r#"{{"name": "case-{i}", "document": "x = <|cursor|>{i}"}}"#))
        .collect::<Vec<_>>()
        .join(",");
    parse_cases(&format!("[{json}]")).unwrap()
}

fn empty_outcome(strategy: Strategy) -> GenerationOutcome {
    GenerationOutcome {
        strategy,
        raw: "[]".to_owned(),
        edits: Vec::new(),
        completion: None,
        hint_count: 0,
        valid_hint_count: 0,
        usage: None,
    }
}

#[derive(Default)]
struct Instrumented {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl Generator for Instrumented {
    fn generate<'a>(
        &'a self,
        _case: &'a TestCase,
        _model: &'a str,
        strategy: Strategy,
    ) -> BoxFuture<'a, Result<GenerationOutcome, PipelineError>> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(3)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(empty_outcome(strategy))
        })
    }
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn never_exceeds_the_concurrency_cap() {
    let generator = Arc::new(Instrumented::default());
    let runner = BenchmarkRunner::new(generator.clone());
    let plan = BenchmarkPlan::cross(
        &["a".to_owned(), "b".to_owned()],
        &[Strategy::Chat, Strategy::Fim, Strategy::LineNumber],
        cases(5),
        10,
        4,
    );
    assert_eq!(plan.total_runs(), 300);

    let report = runner.run(&plan).await;

    assert_eq!(generator.calls.load(Ordering::SeqCst), 300);
    assert_eq!(generator.max_in_flight.load(Ordering::SeqCst), 4);
    assert_eq!(generator.in_flight.load(Ordering::SeqCst), 0);
    assert!(report
        .approaches
        .iter()
        .all(|result| result.runs.len() == 50 && result.summary.parse_success_rate == 100.0));
}

/// Succeeds for the first four calls, then cycles through failure kinds.
#[derive(Default)]
struct FourThenFail {
    calls: AtomicUsize,
}

impl Generator for FourThenFail {
    fn generate<'a>(
        &'a self,
        _case: &'a TestCase,
        _model: &'a str,
        strategy: Strategy,
    ) -> BoxFuture<'a, Result<GenerationOutcome, PipelineError>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            match call {
                0..=3 => Ok(empty_outcome(strategy)),
                4 | 5 => Err(PipelineError::JsonParse("eof".into())),
                6 => Err(PipelineError::ConversionFailed { attempted: 1 }),
                _ => Err(PipelineError::ExtractionFailed("prose".into())),
            }
        })
    }
}

#[tokio::test(flavor = "current_thread")]
async fn four_successes_out_of_ten_is_forty_percent() {
    let runner = BenchmarkRunner::new(Arc::new(FourThenFail::default()));
    let plan = BenchmarkPlan::cross(&["m".to_owned()], &[Strategy::PrefixSuffix], cases(1), 10, 1);
    let report = runner.run(&plan).await;

    let summary = &report.approaches[0].summary;
    assert_eq!(summary.parse_success_rate, 40.0);
    assert_eq!(summary.error_counts.values().sum::<usize>(), 6);
    assert_eq!(summary.error_counts[&ParseErrorKind::JsonParse], 2);
    assert_eq!(summary.error_counts[&ParseErrorKind::ConversionFailed], 1);
    assert_eq!(summary.error_counts[&ParseErrorKind::ExtractionFailed], 3);

    let runs = &report.approaches[0].runs;
    assert!(runs[..4].iter().all(|run| run.parse_success));
    assert!(runs[4..]
        .iter()
        .all(|run| !run.parse_success && run.parse_error_type.is_failure()));
}

struct PanicsOnFim;

impl Generator for PanicsOnFim {
    fn generate<'a>(
        &'a self,
        _case: &'a TestCase,
        _model: &'a str,
        strategy: Strategy,
    ) -> BoxFuture<'a, Result<GenerationOutcome, PipelineError>> {
        Box::pin(async move {
            if strategy == Strategy::Fim {
                panic!("tokenizer exploded");
            }
            Ok(empty_outcome(strategy))
        })
    }
}

#[tokio::test(flavor = "current_thread")]
async fn panics_are_recorded_and_order_is_preserved() {
    let runner = BenchmarkRunner::new(Arc::new(PanicsOnFim));
    let strategies = [Strategy::Fim, Strategy::Chat];
    let plan = BenchmarkPlan::cross(&["m".to_owned(), "n".to_owned()], &strategies, cases(2), 2, 3);
    let report = runner.run(&plan).await;

    let keys: Vec<String> = report
        .approaches
        .iter()
        .map(|result| result.summary.key())
        .collect();
    assert_eq!(keys, ["m:fim", "m:chat", "n:fim", "n:chat"]);

    let fim = &report.approaches[0].summary;
    assert_eq!(fim.parse_success_rate, 0.0);
    assert_eq!(fim.error_counts[&ParseErrorKind::GenerationFailed], 4);
    assert_eq!(report.approaches[1].summary.parse_success_rate, 100.0);

    let models: Vec<&str> = report.models.iter().map(|m| m.model.as_str()).collect();
    assert_eq!(models, ["m", "n"]);
    assert_eq!(report.models[0].parse_success_rate, 50.0);
    assert_eq!(report.models[0].best_strategy, Some(Strategy::Chat));
}
