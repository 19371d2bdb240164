use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use nova_ai::{ClientCache, PriceTable, ProviderRegistry, Strategy};
use nova_ai_bench::{
    export_json, load_cases, report, write_export, BenchmarkPlan, BenchmarkRunner,
    EngineGenerator, Generator, ModelCritic,
};
use nova_config::{NovaAiConfig, ProviderConfig};

#[derive(Parser)]
#[command(
    name = "nova-ai-bench",
    version,
    about = "Benchmark AI edit strategies across models"
)]
struct Cli {
    /// JSON file with test cases
    #[arg(long)]
    cases: PathBuf,
    /// Comma-separated model ids (defaults to `[bench] models`, then `[provider] model`)
    #[arg(long, value_delimiter = ',')]
    models: Vec<String>,
    /// Comma-separated strategies: prefix-suffix, line-number, chat, fim (defaults to all)
    #[arg(long, value_delimiter = ',')]
    strategies: Vec<Strategy>,
    /// Runs per case and approach
    #[arg(long)]
    runs: Option<usize>,
    /// Maximum generations in flight
    #[arg(long)]
    concurrency: Option<usize>,
    /// Print the diff of each case's first run
    #[arg(long)]
    preview: bool,
    /// Score successful runs with a critic model
    #[arg(long)]
    critic: bool,
    /// Model used by the critic (defaults to `[bench] critic_model`, then the first model)
    #[arg(long)]
    critic_model: Option<String>,
    /// Write summaries as JSON to this path
    #[arg(long)]
    export: Option<PathBuf>,
    /// Configuration file (defaults to `NOVA_AI_CONFIG_PATH`, else built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the JSON summaries instead of tables
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = NovaAiConfig::discover(cli.config.as_deref()).context("failed to load config")?;
    nova_config::init_tracing(&config.logging);

    let cases = load_cases(&cli.cases)?;
    let models = pick_models(&cli, &config)?;
    let strategies = pick_strategies(&cli, &config)?;
    let runs = cli.runs.unwrap_or(config.bench.runs);
    let concurrency = cli.concurrency.unwrap_or(config.bench.concurrency);
    if runs == 0 {
        bail!("--runs must be at least 1");
    }
    if concurrency == 0 {
        bail!("--concurrency must be at least 1");
    }

    let cache = Arc::new(ClientCache::new(ProviderRegistry::builtin()));
    let generator: Arc<dyn Generator> = if config.provider.kind.eq_ignore_ascii_case("replay") {
        Arc::new(EngineGenerator::replay(&config)?)
    } else {
        Arc::new(EngineGenerator::with_provider(Arc::clone(&cache), &config)?)
    };

    let mut runner =
        BenchmarkRunner::new(generator).with_prices(PriceTable::from_config(&config.pricing));
    if cli.critic {
        let critic_model = cli
            .critic_model
            .clone()
            .or_else(|| config.bench.critic_model.clone())
            .unwrap_or_else(|| models[0].clone());
        let client = cache
            .get_or_create(&ProviderConfig {
                model: Some(critic_model.clone()),
                ..config.provider.clone()
            })
            .context("failed to build critic client")?;
        runner = runner.with_critic(Arc::new(ModelCritic::new(client, critic_model)));
    }

    let plan = BenchmarkPlan::cross(&models, &strategies, cases, runs, concurrency);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let report = runtime.block_on(runner.run(&plan));

    if cli.json {
        print!("{}", export_json(&report)?);
    } else {
        println!("{}", report::render_approaches(&report));
        println!("{}", report::render_models(&report));
        if cli.preview || config.bench.preview {
            print!("{}", report::render_previews(&report));
        }
    }

    if let Some(path) = &cli.export {
        write_export(path, &report)?;
        eprintln!("wrote {}", path.display());
    }

    Ok(0)
}

fn pick_models(cli: &Cli, config: &NovaAiConfig) -> Result<Vec<String>> {
    let models: Vec<String> = if !cli.models.is_empty() {
        cli.models.clone()
    } else if !config.bench.models.is_empty() {
        config.bench.models.clone()
    } else {
        config.provider.model.iter().cloned().collect()
    };

    let models: Vec<String> = models
        .into_iter()
        .map(|model| model.trim().to_owned())
        .filter(|model| !model.is_empty())
        .collect();
    if models.is_empty() {
        bail!("no models to benchmark: pass --models or set `[bench] models` in the config");
    }
    Ok(models)
}

fn pick_strategies(cli: &Cli, config: &NovaAiConfig) -> Result<Vec<Strategy>> {
    if !cli.strategies.is_empty() {
        return Ok(cli.strategies.clone());
    }
    if config.bench.strategies.is_empty() {
        return Ok(Strategy::ALL.to_vec());
    }
    config
        .bench
        .strategies
        .iter()
        .map(|name| {
            name.parse::<Strategy>()
                .with_context(|| "invalid `[bench] strategies` entry")
        })
        .collect()
}
