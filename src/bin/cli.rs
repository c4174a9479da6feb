use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use agentflow::engine::validation::{validate as validate_graph, GraphIssue};
use agentflow::engine::PublishedEvent;
use agentflow::prelude::*;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_CONFIG_FILE: &str = "engine.yaml";

#[derive(Parser)]
#[command(name = "agentflow")]
#[command(about = "Run node-based workflow graphs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to engine config (default: ./engine.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a job file, or every job in a directory
    Run {
        /// Path to a job file (JSON/YAML) or a directory of jobs
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Trigger data as JSON, overriding the job's own
        #[arg(short, long)]
        trigger_data: Option<String>,

        /// Print progress events to stdout as JSON lines
        #[arg(short, long)]
        events: bool,
    },

    /// Check job files without running them
    Validate {
        /// Path to a job file or directory
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// List the registered node types
    Nodes,

    /// Read jobs as JSON lines from stdin and run them on a worker pool
    Serve {
        /// Number of workers (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

#[cfg(feature = "otel")]
fn init_otel_tracing(verbose: bool) {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::runtime::Tokio;
    use opentelemetry_sdk::trace::TracerProvider;

    let filter = if verbose {
        "agentflow=debug"
    } else {
        "agentflow=info"
    };

    let otlp_endpoint =
        std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or_else(|_| "http://localhost:4317".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()
        .expect("Failed to create OTLP exporter");

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .build();

    let tracer = provider.tracer("agentflow-engine");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(otel_layer)
        .init();

    opentelemetry::global::set_tracer_provider(provider);
}

#[cfg(not(feature = "otel"))]
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "agentflow=debug"
    } else {
        "agentflow=info"
    };

    // Logs go to stderr so stdout can carry event lines
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "otel")]
    init_otel_tracing(cli.verbose);

    #[cfg(not(feature = "otel"))]
    init_tracing(cli.verbose);

    let result = run(cli).await;

    #[cfg(feature = "otel")]
    opentelemetry::global::shutdown_tracer_provider();

    match result {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Engine failed");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            path,
            trigger_data,
            events,
        } => run_jobs(&config, path, trigger_data, events).await,
        Commands::Validate { path } => validate(&config, path),
        Commands::Nodes => list_nodes(&config),
        Commands::Serve { workers } => serve(&config, workers).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Ok(EngineConfig::load(path)?)
        }
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Ok(EngineConfig::load(DEFAULT_CONFIG_FILE)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn build_registry(config: &EngineConfig) -> NodeRegistry {
    let credentials = InMemoryCredentialStore::from_map(config.credentials.clone());
    NodeRegistry::with_builtins(Arc::new(credentials), config)
}

/// Executor publishing into a channel, plus a task draining that channel
fn build_executor(
    config: &EngineConfig,
    print_events: bool,
) -> (Arc<GraphExecutor>, JoinHandle<()>) {
    let (publisher, rx) = ChannelPublisher::bounded(config.event_buffer);
    let executor = GraphExecutor::new(
        Arc::new(build_registry(config)),
        Arc::new(publisher),
        Arc::new(InMemoryStatusSink::new()),
    );

    let drain = tokio::spawn(async move {
        while let Ok(PublishedEvent { event, .. }) = rx.recv().await {
            if !print_events {
                continue;
            }
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize event"),
            }
        }
    });

    (Arc::new(executor), drain)
}

fn load_jobs(path: &Path) -> anyhow::Result<Vec<WorkflowJob>> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }
    if path.is_dir() {
        Ok(JobLoader::load_directory(path)?)
    } else {
        Ok(vec![JobLoader::load_file(path)?])
    }
}

async fn run_jobs(
    config: &EngineConfig,
    path: PathBuf,
    trigger_data: Option<String>,
    print_events: bool,
) -> anyhow::Result<bool> {
    let mut jobs = load_jobs(&path)?;
    if jobs.is_empty() {
        eprintln!("No jobs found in: {}", path.display());
        return Ok(true);
    }

    if let Some(raw) = trigger_data {
        let data: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid --trigger-data JSON: {}", e))?;
        for job in &mut jobs {
            job.trigger_data = Some(data.clone());
        }
    }

    let (executor, drain) = build_executor(config, print_events);
    let mut all_success = true;

    for job in jobs {
        let workflow_id = job.workflow_id.clone();
        match executor.run_job(job).await {
            Ok(report) => print_report(&report, print_events),
            Err(e) => {
                all_success = false;
                eprintln!("✗ {}: {}", workflow_id, e);
            }
        }
    }

    let dropped = executor.publish_stats().failed();
    if dropped > 0 {
        tracing::warn!(dropped, "Some progress events were not delivered");
    }

    // Closing the last sender lets the drain task finish
    drop(executor);
    drain.await?;

    Ok(all_success)
}

fn print_report(report: &ExecutionReport, print_events: bool) {
    let summary = format!(
        "✓ {} (execution {}, {} nodes)",
        report.workflow_id,
        report.execution_id,
        report.visited.len()
    );
    if print_events {
        eprintln!("{}", summary);
        return;
    }

    println!("{}", summary);
    match serde_json::to_string_pretty(&report.outputs) {
        Ok(outputs) => println!("{}", outputs),
        Err(e) => tracing::warn!(error = %e, "Failed to render outputs"),
    }
}

fn validate(config: &EngineConfig, path: PathBuf) -> anyhow::Result<bool> {
    let jobs = load_jobs(&path)?;
    if jobs.is_empty() {
        println!("No jobs found in: {}", path.display());
        return Ok(true);
    }

    let registry = build_registry(config);
    let mut all_valid = true;

    for job in jobs {
        let workflow_id = job.workflow_id.clone();
        let ctx = job.into_context();
        let issues = validate_graph(&ctx, &registry);
        let fatal = issues.iter().any(GraphIssue::is_fatal);

        if fatal {
            all_valid = false;
            println!("✗ {}", workflow_id);
        } else {
            println!("✓ {}", workflow_id);
        }
        for issue in &issues {
            let level = if issue.is_fatal() { "error" } else { "warning" };
            println!("    {}: {}", level, issue);
        }
    }

    Ok(all_valid)
}

fn list_nodes(config: &EngineConfig) -> anyhow::Result<bool> {
    let registry = build_registry(config);

    println!("Registered nodes:\n");
    for (kind, name, description) in registry.list() {
        println!("  {:<8} {:<18} {}", kind.to_string(), name, description);
    }

    Ok(true)
}

async fn serve(config: &EngineConfig, workers: Option<usize>) -> anyhow::Result<bool> {
    let workers = workers.unwrap_or(config.workers).max(1);
    let (executor, drain) = build_executor(config, true);
    let queue = JobQueue::bounded(workers * 4);

    let pool = tokio::spawn(run_workers(executor.clone(), queue.receiver(), workers));
    tracing::info!(workers, "Reading jobs from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut rejected = 0usize;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<WorkflowJob>(&line) {
            Ok(job) => queue.enqueue(job).await?,
            Err(e) => {
                rejected += 1;
                tracing::error!(error = %e, "Rejected malformed job");
            }
        }
    }

    queue.close();
    let summary = pool.await?;
    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        rejected,
        "Job intake closed"
    );

    drop(executor);
    drain.await?;

    Ok(summary.failed == 0 && rejected == 0)
}
