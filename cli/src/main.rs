//! CLI entrypoint for colloquy
//!
//! Wires the infrastructure adapters into the pipeline engine, handles
//! logging, cancellation, and process exit codes:
//! 0 accepted artifact, 1 configuration or fatal error, 2 pipeline completed
//! but the final artifact failed its quality gate, 130 cancelled.

mod cli;
mod progress;
mod render;

use anyhow::Context;
use clap::Parser;
use colloquy_application::{
    engine::artifact_accepted, Auditor, EvidenceRetriever, Grounder, Interpreter, Judge,
    ModelRuntime, ModelSlot, PipelineEngine, PipelineProgress, Planner, RunRequest, Visualizer,
};
use colloquy_domain::{AgentId, Brief, Mode, ModelDescriptor};
use colloquy_infrastructure::{
    search::cache::{default_cache_dir, SearchCache},
    ConfigLoader, DuckDuckGoSearch, EmbeddingClient, FileConfig, OllamaRuntime, SqliteVectorStore,
};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const EXIT_GATE_FAILED: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

/// Resolve the log directory under the platform data dir.
fn log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("colloquy")
        .join("logs")
}

/// Initialize console logging plus an optional per-session file layer.
fn init_logging(verbose: u8, no_log_file: bool) -> Option<WorkerGuard> {
    let console_filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    if no_log_file {
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    let dir = log_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("warning: could not create log directory {}: {e}", dir.display());
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    let filename = format!(
        "session-{}-{}.log",
        chrono::Local::now().format("%Y-%m-%dT%H-%M-%S"),
        std::process::id()
    );
    let appender = tracing_appender::rolling::never(&dir, filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();
    let _log_guard = init_logging(args.verbose, args.no_log_file);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: cli::Cli) -> anyhow::Result<ExitCode> {
    let mode: Mode = args.mode.parse()?;
    let brief = Brief::new(args.brief_text())?;

    let mut file_config = if args.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(args.config.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?
    };
    if let Some(single) = &args.single_model {
        file_config.models.single_model = Some(single.clone());
    }
    file_config.validate()?;
    let engine_config = file_config.engine_config();

    let runtime = Arc::new(OllamaRuntime::new(&file_config.runtime.base_url));
    let models = resolve_models(&file_config);
    preflight(runtime.as_ref(), &models).await;

    let cache = SearchCache::new(
        default_cache_dir(),
        Duration::from_secs(file_config.retrieval.cache_ttl_days * 24 * 3600),
    );
    let web = Arc::new(DuckDuckGoSearch::new(cache));
    let embedder = EmbeddingClient::new(
        &file_config.runtime.base_url,
        &file_config.retrieval.embedding_model,
    );
    let vector = Arc::new(
        SqliteVectorStore::open(&file_config.retrieval.persist_dir, embedder)
            .context("failed to open the vector store")?,
    );
    let retriever = EvidenceRetriever::new(web, vector, &engine_config);

    let slot = Arc::new(ModelSlot::new(
        Arc::clone(&runtime) as Arc<dyn ModelRuntime>,
        &engine_config,
    ));
    let progress: Arc<dyn PipelineProgress> =
        Arc::new(progress::ConsoleProgress::new(args.plain || !file_config.output.rich));
    let cancel = CancellationToken::new();

    let mut engine = PipelineEngine::new(slot, engine_config)?
        .with_progress(progress)
        .with_cancellation(cancel.clone());
    engine.register(Arc::new(Interpreter::new(models.interpreter.clone())));
    engine.register(Arc::new(Planner::new(models.planner.clone())));
    engine.register(Arc::new(Grounder::new(models.grounder.clone(), retriever)));
    engine.register(Arc::new(Auditor::new(models.auditor.clone())));
    engine.register(Arc::new(Visualizer::new(models.visualizer.clone())));
    engine.register(Arc::new(Judge::new(
        models.judge.clone(),
        file_config.deliberation.consensus_threshold,
        file_config.deliberation.max_rounds,
    )));

    let ctrl_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupt received, finishing the current step...");
            ctrl_cancel.cancel();
        }
    });

    let session_id = args
        .session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut request = RunRequest::new(brief, mode, session_id);
    if let Some(seconds) = args.budget_seconds {
        request = request.with_overall_budget(Duration::from_secs(seconds));
    }

    let state = engine.run(request).await?;

    let document = render::render_markdown(&state);
    match &args.output {
        Some(path) => {
            std::fs::write(path, &document)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} {}", "wrote".green(), path.display());
        }
        None => println!("{document}"),
    }

    if cancel.is_cancelled() {
        return Ok(ExitCode::from(EXIT_CANCELLED));
    }
    if artifact_accepted(&state) {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "{} the artifact did not pass the final quality gate",
            "warning:".yellow().bold()
        );
        Ok(ExitCode::from(EXIT_GATE_FAILED))
    }
}

/// The resolved model descriptor for each agent.
struct AgentModels {
    interpreter: ModelDescriptor,
    planner: ModelDescriptor,
    grounder: ModelDescriptor,
    auditor: ModelDescriptor,
    visualizer: ModelDescriptor,
    judge: ModelDescriptor,
}

fn resolve_models(config: &FileConfig) -> AgentModels {
    AgentModels {
        interpreter: config.model_for(AgentId::Interpreter, Interpreter::default_model()),
        planner: config.model_for(AgentId::Planner, Planner::default_model()),
        grounder: config.model_for(AgentId::Grounder, Grounder::default_model()),
        auditor: config.model_for(AgentId::Auditor, Auditor::default_model()),
        visualizer: config.model_for(AgentId::Visualizer, Visualizer::default_model()),
        judge: config.model_for(AgentId::Judge, Judge::default_model()),
    }
}

/// Probe the runtime for each distinct model; absence is only a warning,
/// the slot will retry and agents degrade.
async fn preflight(runtime: &OllamaRuntime, models: &AgentModels) {
    let mut seen = std::collections::BTreeSet::new();
    let all = [
        &models.interpreter,
        &models.planner,
        &models.grounder,
        &models.auditor,
        &models.visualizer,
        &models.judge,
    ];
    for model in all {
        if !seen.insert(model.id.clone()) {
            continue;
        }
        if let Err(e) = runtime
            .ensure_present(&model.id, Duration::from_secs(5))
            .await
        {
            warn!(model = %model.id, error = %e, "Model not reachable during preflight");
        }
    }
}
