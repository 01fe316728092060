use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use summarize_client::display;
use summarize_client::shutdown::ShutdownCoordinator;
use summarize_client::{
    ClientState, Config, FileUsageStore, HttpSummarizeApi, JobOutcome, JobService, PdfUpload,
    QuotaGuard, SummarizeApi, UsageStore,
};

#[derive(Parser)]
#[command(name = "summarize-client", version, about = "Summarize PDFs with the remote service")]
struct Cli {
    /// Service base URL (overrides SUMMARIZE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Usage counter file (overrides USAGE_FILE)
    #[arg(long, global = true)]
    usage_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a PDF and wait for its summary
    Submit { path: PathBuf },
    /// Follow a job that was submitted earlier
    Poll { job_id: String },
    /// Show how many submissions have been used
    Usage,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(api_url) = cli.api_url {
        config.api_base_url = api_url;
    }
    if let Some(usage_file) = cli.usage_file {
        config.usage_file = usage_file;
    }

    if let Err(e) = init_logging(&config.log_dir) {
        eprintln!("Failed to create log directory {}: {}", config.log_dir.display(), e);
        return ExitCode::FAILURE;
    }

    info!("Starting summarize-client");
    info!("  - Service: {}", config.api_base_url);
    info!(
        "  - Poll every {:?}, at most {} times",
        config.poll_interval, config.max_poll_attempts
    );
    info!("  - Usage file: {}", config.usage_file.display());

    let coordinator = ShutdownCoordinator::new();
    let service = JobService::with_shutdown(
        HttpSummarizeApi::new(config.api_base_url.clone()),
        QuotaGuard::new(FileUsageStore::new(&config.usage_file), config.quota_limit),
        config.job_settings(),
        coordinator.token(),
    );
    let signals = coordinator.spawn();

    let code = match cli.command {
        Command::Usage => {
            let quota = service.quota();
            println!("{}/{} submissions used", quota.usage(), quota.limit());
            ExitCode::SUCCESS
        }
        Command::Submit { path } => {
            let upload = PdfUpload::from_path(&path).await.ok();
            let outcome = with_renderer(&service, service.submit(upload)).await;
            report(outcome, &path)
        }
        Command::Poll { job_id } => {
            let outcome = with_renderer(&service, service.track(&job_id)).await;
            report(outcome, Path::new(&job_id))
        }
    };

    signals.abort();
    code
}

/// Initialize console logging plus daily rotating files split by level.
/// Files are created as: logs/info.log.2024-12-22, logs/error.log.2024-12-22
fn init_logging(log_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let info_file = tracing_appender::rolling::daily(log_dir, "info.log");
    let error_file = tracing_appender::rolling::daily(log_dir, "error.log");

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(info_file)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_file)
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    // stdout carries the progress lines, so the console only gets warnings
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(info_layer)
        .with(error_layer)
        .init();

    Ok(())
}

/// Run `job` while printing every distinct status line it produces.
async fn with_renderer<A, S>(
    service: &JobService<A, S>,
    job: impl std::future::Future<Output = JobOutcome>,
) -> JobOutcome
where
    A: SummarizeApi,
    S: UsageStore,
{
    let done = CancellationToken::new();
    let renderer = spawn_renderer(service.subscribe(), done.clone());

    let outcome = job.await;

    done.cancel();
    if let Err(e) = renderer.await {
        tracing::error!("Progress renderer failed: {:?}", e);
    }
    outcome
}

fn spawn_renderer(mut rx: watch::Receiver<ClientState>, done: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: Option<String> = None;
        loop {
            let stop = tokio::select! {
                changed = rx.changed() => changed.is_err(),
                _ = done.cancelled() => true,
            };

            let line = display::status_line(&rx.borrow_and_update());
            if line.is_some() && line != last {
                if let Some(text) = &line {
                    println!("{}", text);
                }
                last = line;
            }

            if stop {
                break;
            }
        }
    })
}

fn report(outcome: JobOutcome, subject: &Path) -> ExitCode {
    match outcome {
        JobOutcome::Completed(result) => {
            let name = result
                .filename
                .clone()
                .unwrap_or_else(|| subject.display().to_string());
            println!();
            println!("Summary of {}", name);
            if let Some(length) = result.text_length {
                println!("({} characters extracted)", length);
            }
            println!();
            println!("{}", result.summary.as_deref().unwrap_or("(empty summary)"));
            ExitCode::SUCCESS
        }
        JobOutcome::QuotaExceeded { used, limit } => {
            eprintln!(
                "Free limit reached: {}/{} summaries used. Upgrade your plan to keep summarizing.",
                used, limit
            );
            ExitCode::from(2)
        }
        JobOutcome::Failed(fault) => {
            eprintln!("Error: {}", fault);
            ExitCode::FAILURE
        }
        JobOutcome::Cancelled => {
            eprintln!("Cancelled.");
            ExitCode::from(130)
        }
    }
}
