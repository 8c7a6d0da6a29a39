//! acctload - bulk account import

use acctload_common::logging::{init_logging, LogConfig, LogLevel};
use acctload_ingest::{
    config::{DatabaseConfig, FailurePolicy, ImportConfig, PipelineConfig, SourceConfig},
    storage::{self, PgAccountGateway},
    IngestOrchestrator, IngestReport, IngestResult, XmlAccountSource,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "acctload")]
#[command(author, version, about = "Import trading accounts from an XML export into PostgreSQL")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show a progress bar on stderr
    #[arg(long, global = true)]
    progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import every account in the document
    Run {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        database: DatabaseArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Apply schema migrations before importing
        #[arg(long)]
        migrate: bool,

        /// Write the run report as JSON to this file
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Apply schema migrations and exit
    Migrate {
        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Decode the document and print a summary without touching the database
    Inspect {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of records to print
        #[arg(long, default_value_t = 3)]
        sample: usize,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Account export to read [env: ACCTLOAD_DOCUMENT]
    #[arg(short, long, value_name = "PATH")]
    document: Option<PathBuf>,

    /// Namespace of <Account> elements; empty matches any [env: ACCTLOAD_NAMESPACE]
    #[arg(long)]
    namespace: Option<String>,
}

#[derive(Args, Debug)]
struct DatabaseArgs {
    /// Connection URL, replaces the individual settings [env: DATABASE_URL]
    #[arg(long)]
    database_url: Option<String>,

    /// [env: ACCTLOAD_DB_HOST]
    #[arg(long)]
    db_host: Option<String>,

    /// [env: ACCTLOAD_DB_PORT]
    #[arg(long)]
    db_port: Option<u16>,

    /// [env: ACCTLOAD_DB_USER]
    #[arg(long)]
    db_user: Option<String>,

    /// [env: ACCTLOAD_DB_NAME]
    #[arg(long)]
    db_name: Option<String>,

    /// Connection pool size [env: ACCTLOAD_DB_MAX_CONNECTIONS]
    #[arg(long)]
    max_connections: Option<u32>,
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Concurrent insert workers [env: ACCTLOAD_WORKERS]
    #[arg(short, long)]
    workers: Option<usize>,

    /// Bound on queued records; defaults to the document size [env: ACCTLOAD_QUEUE_CAPACITY]
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// What to do after a failed insert [env: ACCTLOAD_ON_ERROR]
    #[arg(long, value_enum)]
    on_error: Option<FailurePolicy>,
}

impl SourceArgs {
    fn apply(self, config: &mut SourceConfig) {
        if let Some(path) = self.document {
            config.path = path;
        }
        if let Some(namespace) = self.namespace {
            config.namespace = Some(namespace).filter(|ns| !ns.is_empty());
        }
    }
}

impl DatabaseArgs {
    fn apply(self, config: &mut DatabaseConfig) {
        if let Some(url) = self.database_url {
            config.url = Some(url);
        }
        if let Some(host) = self.db_host {
            config.host = host;
        }
        if let Some(port) = self.db_port {
            config.port = port;
        }
        if let Some(user) = self.db_user {
            config.user = user;
        }
        if let Some(name) = self.db_name {
            config.database = name;
        }
        if let Some(max) = self.max_connections {
            config.max_connections = max;
        }
    }
}

impl PipelineArgs {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = Some(capacity);
        }
        if let Some(policy) = self.on_error {
            config.failure_policy = policy;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("acctload")
        .filter_directives("sqlx=warn")
        .build();

    // Environment variables take precedence over flags
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        },
    };

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        },
    }
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let mut config = ImportConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        Command::Run {
            source,
            database,
            pipeline,
            migrate,
            report,
        } => {
            source.apply(&mut config.source);
            database.apply(&mut config.database);
            pipeline.apply(&mut config.pipeline);
            run(config, migrate, report.as_deref(), cli.progress).await
        },
        Command::Migrate { database } => {
            database.apply(&mut config.database);
            config.database.validate().context("Invalid database configuration")?;

            let pool = storage::connect(&config.database).await?;
            storage::migrate(&pool).await?;
            pool.close().await;
            Ok(ExitCode::SUCCESS)
        },
        Command::Inspect { source, sample } => {
            source.apply(&mut config.source);
            inspect(&config.source, sample).await
        },
    }
}

async fn run(
    config: ImportConfig,
    migrate: bool,
    report_path: Option<&Path>,
    progress: bool,
) -> Result<ExitCode> {
    config.validate().context("Invalid configuration")?;

    info!(
        database = %config.database.summary(),
        document = %config.source.path.display(),
        workers = config.pipeline.workers,
        policy = %config.pipeline.failure_policy,
        "Configuration loaded"
    );

    let pool = storage::connect(&config.database).await?;
    if migrate {
        storage::migrate(&pool).await?;
    }

    let shutdown = CancellationToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling import");
            interrupt.cancel();
        }
    });

    let bar = if progress {
        create_progress_bar()
    } else {
        ProgressBar::hidden()
    };

    let gateway = Arc::new(PgAccountGateway::new(pool.clone()));
    let orchestrator = IngestOrchestrator::new(config.pipeline.clone(), gateway)
        .with_shutdown(shutdown)
        .with_progress(bar.clone());
    let source = XmlAccountSource::from_config(&config.source);

    let started = Instant::now();
    let outcome = orchestrator.run_source(&source).await;
    bar.finish_and_clear();
    pool.close().await;

    if let (Some(path), Some(report)) = (report_path, run_report(&outcome)) {
        match write_report(path, report) {
            Err(e) if outcome.is_err() => {
                // Keep the run's own error as the one returned.
                warn!(error = %format!("{:#}", e), "Could not write report of the failed run");
            },
            result => result?,
        }
    }

    let report = outcome?;
    info!(run_id = %report.run_id, "Parsing and inserting into DB took {:?}", started.elapsed());
    info!("{}", report);

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(
            failed = report.failed,
            skipped = report.skipped,
            "Import finished with failures"
        );
        Ok(ExitCode::FAILURE)
    }
}

async fn inspect(config: &SourceConfig, sample: usize) -> Result<ExitCode> {
    let source = XmlAccountSource::from_config(config);
    let accounts = source
        .load_accounts()
        .await
        .with_context(|| format!("Failed to decode {}", config.path.display()))?;

    let sub_accounts: usize = accounts.iter().map(|a| a.sub_accounts.items.len()).sum();
    println!("Document:     {}", config.path.display());
    println!("Accounts:     {}", accounts.len());
    println!("Sub-accounts: {}", sub_accounts);

    for account in accounts.into_iter().take(sample) {
        let record = acctload_ingest::AccountRecord::from(account);
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    Ok(ExitCode::SUCCESS)
}

/// The report of a run that dispatched records, including one that stopped early
fn run_report(outcome: &IngestResult<IngestReport>) -> Option<&IngestReport> {
    match outcome {
        Ok(report) => Some(report),
        Err(e) => e.partial_report(),
    }
}

fn write_report(path: &Path, report: &IngestReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write run report to {}", path.display()))?;
    info!(path = %path.display(), "Run report written");
    Ok(())
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} accounts ({eta})",
    )
    .map(|style| style.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use acctload_ingest::pipeline::{GatewayError, RecordFailure};
    use acctload_ingest::IngestError;
    use std::time::Duration;
    use uuid::Uuid;

    fn stopped_report() -> IngestReport {
        IngestReport {
            run_id: Uuid::nil(),
            workers: 2,
            total: 100,
            submitted: 4,
            succeeded: 2,
            failed: 1,
            skipped: 97,
            elapsed: Duration::from_millis(12),
            failures: vec![RecordFailure {
                index: 1,
                code: "X2".to_string(),
                error: "Insert rejected: duplicate code X2".to_string(),
            }],
        }
    }

    #[test]
    fn test_fail_fast_run_still_writes_its_report() {
        let outcome: IngestResult<IngestReport> = Err(IngestError::RecordFailed {
            index: 1,
            code: "X2".to_string(),
            source: GatewayError::Rejected("duplicate code X2".into()),
            report: Box::new(stopped_report()),
        });

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("report.json");
        write_report(&path, run_report(&outcome).expect("partial report")).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["skipped"], 97);
        assert_eq!(json["failures"][0]["code"], "X2");
    }

    #[test]
    fn test_source_failure_has_no_report() {
        let outcome: IngestResult<IngestReport> = Err(IngestError::Source {
            origin: "Accounts100K.xml".to_string(),
            source: acctload_common::AcctloadError::parse("account #3"),
        });
        assert!(run_report(&outcome).is_none());
    }
}
