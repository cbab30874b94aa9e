//! ShieldBench - security-review agent benchmark
//!
//! A CLI tool that asks a reasoning model to find the vulnerability in code
//! samples, grades each answer against a known finding with a second model,
//! and scans whole repositories for vulnerabilities.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (arguments, config, problem file, reasoning request, etc.)

mod agent;
mod analysis;
mod cli;
mod config;
mod judge;
mod llm;
mod models;
mod pipeline;
mod problems;
mod repo;
mod report;
mod scanner;

use agent::{AnalysisInvoker, InvokerConfig};
use anyhow::{Context, Result};
use cli::{Args, Command, RunArgs, ScanArgs};
use config::{Config, CONFIG_FILE_NAME};
use judge::{AlignmentJudge, JudgeConfig};
use llm::SharedBackend;
use models::ScoreBucket;
use pipeline::{BatchPipeline, PipelineConfig};
use repo::{scan_repository, ScanSettings};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Lines of the scan report echoed to the console.
const REPORT_PREVIEW_LINES: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // No logging needed to write the config file
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    init_logging(&args);

    info!("ShieldBench v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle `init-config`: generate a default .shieldbench.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize models, batch size, and scan settings.");
    Ok(())
}

/// Initialize the logging system.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;
    debug!("Effective config: {:?}", config);

    let backend = llm::build_backend(&config.model).context("Failed to set up the model client")?;
    let show_progress = !args.quiet;

    match &args.command {
        Command::Run(run_args) => run_benchmark(run_args, &config, backend, show_progress).await,
        Command::Scan(scan_args) => run_scan(scan_args, &config, backend, show_progress).await,
        Command::InitConfig => Ok(()),
    }
}

fn build_invoker(config: &Config, backend: SharedBackend) -> AnalysisInvoker {
    AnalysisInvoker::new(
        backend,
        InvokerConfig {
            model: config.model.name.clone(),
            web_search: config.model.web_search,
            concurrency: config.general.concurrency,
            system_prompt: config.model.system_prompt.clone(),
        },
    )
}

/// `run`: process a problem set in batches and print the summary.
async fn run_benchmark(
    run_args: &RunArgs,
    config: &Config,
    backend: SharedBackend,
    show_progress: bool,
) -> Result<()> {
    let problems = match run_args.problems {
        Some(ref path) => {
            info!("Loading problems from {}", path.display());
            problems::load_problems(path)?
        }
        None => {
            info!("No problem file given, using the built-in samples");
            problems::builtin_problems()
        }
    };

    if problems.is_empty() {
        warn!("Problem set is empty");
    }

    let invoker = build_invoker(config, backend.clone());
    let judge = AlignmentJudge::new(
        backend,
        JudgeConfig {
            model: config.model.judge_name.clone(),
            concurrency: config.general.concurrency,
        },
    );
    let pipeline = BatchPipeline::new(
        invoker,
        judge,
        PipelineConfig {
            chunk_size: config.general.chunk_size,
            isolate_failures: config.general.isolate_failures,
            log_dir: config.general.log_dir.clone(),
            show_progress,
        },
    );

    let start_time = Instant::now();
    let outcome = pipeline.run(&problems).await?;
    let summary = &outcome.summary;

    println!(
        "\nAll batches processed. Full results available in {}",
        outcome.log_path.display()
    );
    println!(
        "Average score across all problems: {:.2}/10 ({} scored, {} failed)",
        summary.average_score, summary.total_count, summary.failed_count
    );
    for bucket in ScoreBucket::ALL {
        println!(
            "  {:>5}: {} ({:.1}%)",
            bucket.label(),
            summary.distribution.get(&bucket).copied().unwrap_or(0),
            summary.percentage(bucket)
        );
    }
    if let Some(((best_id, best), (worst_id, worst))) =
        analysis::best_and_worst(&outcome.batches)
    {
        println!("Best problem: {} ({:.1}/10)", best_id, best);
        println!("Worst problem: {} ({:.1}/10)", worst_id, worst);
    }
    println!("Completed in {:.1}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// `scan`: clone and analyze one repository, then save the report.
async fn run_scan(
    scan_args: &ScanArgs,
    config: &Config,
    backend: SharedBackend,
    show_progress: bool,
) -> Result<()> {
    let settings = ScanSettings::from_config(&config.scan, scan_args.branch.clone(), show_progress);
    let invoker = build_invoker(config, backend);

    let report = scan_repository(&scan_args.url, &settings, &invoker).await?;
    let output_path = report::save_report(
        &report,
        scan_args.output.as_deref(),
        &config.general.reports_dir,
    )?;

    println!("\nVulnerability scan completed!");
    println!("Report saved to: {}", output_path.display());
    println!("\nSummary of findings:");
    for line in report::preview_lines(&report, REPORT_PREVIEW_LINES) {
        println!("{}", line);
    }
    println!("...");

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
