//! Scheduling benchmark runs under a concurrency cap.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use nova_ai::providers::ReplayClient;
use nova_ai::{
    classify, ClientCache, CompletionEngine, EditPreview, GenerationOutcome, ModelClient,
    ModelError, ParseErrorKind, PipelineError, PriceTable, PromptBuilder, Stopwatch, Strategy,
    TemplateSelection,
};
use nova_config::{NovaAiConfig, ProviderConfig};
use nova_core::panic_payload_to_str;
use tokio::sync::Semaphore;

use crate::cases::TestCase;
use crate::critic::{Critic, Review};
use crate::metrics::{ApproachSummary, ModelSummary, RunMetric};

/// Produces one generation for a case. The runner's only dependency on the model side.
pub trait Generator: Send + Sync {
    fn generate<'a>(
        &'a self,
        case: &'a TestCase,
        model: &'a str,
        strategy: Strategy,
    ) -> BoxFuture<'a, Result<GenerationOutcome, PipelineError>>;
}

enum ClientSource {
    /// One client per model from the configured provider.
    Provider {
        cache: Arc<ClientCache>,
        provider: ProviderConfig,
    },
    /// One [`ReplayClient`] per `(case, model)`, answering from the case's recorded responses.
    /// Repeated runs walk through the recordings in order.
    CaseReplay {
        clients: Mutex<HashMap<(String, String), Arc<dyn ModelClient>>>,
    },
}

/// [`Generator`] running the full [`CompletionEngine`] pipeline.
pub struct EngineGenerator {
    source: ClientSource,
    builder: PromptBuilder,
    max_tokens: u32,
    temperature: f32,
}

impl EngineGenerator {
    /// Clients come from `cache`, built from `[provider]` with the model swapped per approach.
    pub fn with_provider(cache: Arc<ClientCache>, config: &NovaAiConfig) -> Result<Self, ModelError> {
        Self::new(
            ClientSource::Provider {
                cache,
                provider: config.provider.clone(),
            },
            config,
        )
    }

    /// Every run replays the responses recorded in its test case.
    pub fn replay(config: &NovaAiConfig) -> Result<Self, ModelError> {
        Self::new(
            ClientSource::CaseReplay {
                clients: Mutex::new(HashMap::new()),
            },
            config,
        )
    }

    fn new(source: ClientSource, config: &NovaAiConfig) -> Result<Self, ModelError> {
        let builder = PromptBuilder::new()
            .with_context_chars(config.completion.context_chars)
            .with_fim_selection(TemplateSelection::from_config(&config.fim))?;
        Ok(Self {
            source,
            builder,
            max_tokens: config.completion.max_tokens,
            temperature: config.completion.temperature,
        })
    }

    fn client(&self, case: &TestCase, model: &str) -> Result<Arc<dyn ModelClient>, ModelError> {
        match &self.source {
            ClientSource::Provider { cache, provider } => cache.get_or_create(&ProviderConfig {
                model: Some(model.to_owned()),
                ..provider.clone()
            }),
            ClientSource::CaseReplay { clients } => {
                let mut clients = clients.lock().unwrap_or_else(|err| err.into_inner());
                let client = clients
                    .entry((case.name.clone(), model.to_owned()))
                    .or_insert_with(|| {
                        Arc::new(ReplayClient::from_responses(model, &case.responses))
                    });
                Ok(Arc::clone(client))
            }
        }
    }
}

impl Generator for EngineGenerator {
    fn generate<'a>(
        &'a self,
        case: &'a TestCase,
        model: &'a str,
        strategy: Strategy,
    ) -> BoxFuture<'a, Result<GenerationOutcome, PipelineError>> {
        Box::pin(async move {
            let engine = CompletionEngine::new(self.client(case, model)?)
                .with_prompt_builder(self.builder.clone())
                .with_max_tokens(self.max_tokens)
                .with_temperature(self.temperature);
            engine
                .try_generate(&case.document, case.cursor, strategy, model)
                .await
        })
    }
}

/// One `(model, strategy)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Approach {
    pub model: String,
    pub strategy: Strategy,
}

impl Approach {
    pub fn new(model: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            model: model.into(),
            strategy,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BenchmarkPlan {
    /// Reported in this order.
    pub approaches: Vec<Approach>,
    pub cases: Vec<TestCase>,
    pub runs: usize,
    pub concurrency: usize,
}

impl BenchmarkPlan {
    /// Every model crossed with every strategy, models outermost.
    pub fn cross(
        models: &[String],
        strategies: &[Strategy],
        cases: Vec<TestCase>,
        runs: usize,
        concurrency: usize,
    ) -> Self {
        let approaches = models
            .iter()
            .flat_map(|model| {
                strategies
                    .iter()
                    .map(move |strategy| Approach::new(model.clone(), *strategy))
            })
            .collect();
        Self {
            approaches,
            cases,
            runs,
            concurrency,
        }
    }

    pub fn total_runs(&self) -> usize {
        self.approaches.len() * self.cases.len() * self.runs
    }
}

/// Diff of a case's first successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasePreview {
    pub case: String,
    pub diff: String,
}

#[derive(Debug, Clone)]
pub struct ApproachResult {
    pub approach: Approach,
    pub runs: Vec<RunMetric>,
    pub summary: ApproachSummary,
    pub previews: Vec<CasePreview>,
}

#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub approaches: Vec<ApproachResult>,
    pub models: Vec<ModelSummary>,
}

struct Job<'a> {
    approach: usize,
    case: &'a TestCase,
    run: usize,
}

struct JobResult {
    metric: RunMetric,
    preview: Option<CasePreview>,
}

pub struct BenchmarkRunner {
    generator: Arc<dyn Generator>,
    critic: Option<Arc<dyn Critic>>,
    prices: PriceTable,
}

impl BenchmarkRunner {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            critic: None,
            prices: PriceTable::new(),
        }
    }

    pub fn with_critic(mut self, critic: Arc<dyn Critic>) -> Self {
        self.critic = Some(critic);
        self
    }

    pub fn with_prices(mut self, prices: PriceTable) -> Self {
        self.prices = prices;
        self
    }

    /// Run every job in `plan`. Individual failures and panics are recorded, never propagated.
    pub async fn run(&self, plan: &BenchmarkPlan) -> BenchmarkReport {
        let jobs: Vec<Job<'_>> = (0..plan.approaches.len())
            .flat_map(move |approach| {
                plan.cases.iter().flat_map(move |case| {
                    (0..plan.runs).map(move |run| Job {
                        approach,
                        case,
                        run,
                    })
                })
            })
            .collect();

        tracing::info!(
            target: "nova.ai.bench",
            approaches = plan.approaches.len(),
            cases = plan.cases.len(),
            runs = plan.runs,
            total = jobs.len(),
            concurrency = plan.concurrency,
            "starting benchmark"
        );

        // Fair semaphore: permits are granted in the order `join_all` first polls the jobs, which
        // is schedule order.
        let semaphore = Semaphore::new(plan.concurrency.max(1));
        let results = join_all(jobs.iter().map(|job| {
            let semaphore = &semaphore;
            let approach = &plan.approaches[job.approach];
            async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return JobResult {
                            metric: RunMetric::failure(
                                ParseErrorKind::GenerationFailed,
                                std::time::Duration::ZERO,
                            ),
                            preview: None,
                        }
                    }
                };
                self.run_one(approach, job.case, job.run).await
            }
        }))
        .await;

        let mut grouped: Vec<(Vec<RunMetric>, Vec<CasePreview>)> =
            vec![(Vec::new(), Vec::new()); plan.approaches.len()];
        for (job, result) in jobs.iter().zip(results) {
            let (runs, previews) = &mut grouped[job.approach];
            runs.push(result.metric);
            previews.extend(result.preview);
        }

        let approaches: Vec<ApproachResult> = plan
            .approaches
            .iter()
            .zip(grouped)
            .map(|(approach, (runs, previews))| ApproachResult {
                summary: ApproachSummary::from_runs(&approach.model, approach.strategy, &runs),
                approach: approach.clone(),
                runs,
                previews,
            })
            .collect();

        let mut model_names: Vec<&str> = Vec::new();
        for result in &approaches {
            if !model_names.contains(&result.approach.model.as_str()) {
                model_names.push(&result.approach.model);
            }
        }
        let models = model_names
            .into_iter()
            .map(|model| {
                ModelSummary::from_approaches(
                    model,
                    approaches
                        .iter()
                        .filter(|result| result.approach.model == model)
                        .map(|result| (&result.summary, result.runs.as_slice())),
                )
            })
            .collect();

        BenchmarkReport { approaches, models }
    }

    async fn run_one(&self, approach: &Approach, case: &TestCase, run: usize) -> JobResult {
        let mut watch = Stopwatch::start("benchmark run");
        let generation = self
            .generator
            .generate(case, &approach.model, approach.strategy);
        let generated = AssertUnwindSafe(generation).catch_unwind().await;
        let gen_latency = watch.stop();

        let outcome = match generated {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                let kind = classify(&err);
                tracing::debug!(
                    target: "nova.ai.bench",
                    model = %approach.model,
                    strategy = %approach.strategy,
                    case = %case.name,
                    run,
                    kind = %kind,
                    error = %err,
                    "run failed"
                );
                return JobResult {
                    metric: RunMetric::failure(kind, gen_latency),
                    preview: None,
                };
            }
            Err(panic) => {
                tracing::warn!(
                    target: "nova.ai.bench",
                    model = %approach.model,
                    strategy = %approach.strategy,
                    case = %case.name,
                    run,
                    panic = %panic_payload_to_str(&*panic),
                    "generation panicked"
                );
                return JobResult {
                    metric: RunMetric::failure(ParseErrorKind::GenerationFailed, gen_latency),
                    preview: None,
                };
            }
        };

        let preview = EditPreview::new(&case.document, &outcome.edits).ok();
        let score = match (&self.critic, &preview) {
            (Some(critic), Some(preview)) => {
                critic
                    .score(Review {
                        case,
                        strategy: approach.strategy,
                        outcome: &outcome,
                        after: &preview.after,
                    })
                    .await
            }
            _ => None,
        };

        tracing::trace!(
            target: "nova.ai.bench",
            model = %approach.model,
            strategy = %approach.strategy,
            case = %case.name,
            run,
            latency_ms = gen_latency.as_secs_f64() * 1_000.0,
            edits = outcome.edits.len(),
            "run succeeded"
        );

        JobResult {
            metric: RunMetric {
                parse_success: true,
                hint_count: outcome.hint_count,
                valid_hint_count: outcome.valid_hint_count,
                parse_error_type: ParseErrorKind::None,
                gen_latency,
                score,
                token_metrics: outcome
                    .usage
                    .map(|usage| self.prices.token_usage(&approach.model, &usage)),
            },
            preview: preview
                .filter(|preview| run == 0 && !preview.is_noop())
                .map(|preview| CasePreview {
                    case: case.name.clone(),
                    diff: preview.diff,
                }),
        }
    }
}
