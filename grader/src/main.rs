use clap::{Parser, Subcommand};
use db::models::final_grading::FinalStatus;
use grader::{BatchDispatcher, ClientConfig, DbStore, DispatchConfig, GradingError, MlClient};
use sea_orm::DbErr;
use serde_json::json;
use services::{FinalGradeInput, GradingService, ServiceError};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_appender::rolling;
use util::config::AppConfig;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("scoring service unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to render output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Batch AI grading for assignment portfolios. Results are printed as JSON.
#[derive(Parser, Debug)]
#[command(name = "grader", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Grade every portfolio of an assignment
    Assignment { assignment_id: i64 },
    /// Grade a single portfolio
    Portfolio { portfolio_id: i64 },
    /// List portfolios with their AI and final grades
    Results { assignment_id: i64 },
    /// Record a final grade
    Final {
        portfolio_id: i64,
        /// 0 to 100
        #[arg(allow_negative_numbers = true)]
        grade: f64,
        /// draft (default) or published
        status: Option<FinalStatus>,
    },
    /// Publish an assignment's final grades
    Publish { assignment_id: i64 },
    /// Probe the scoring service
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };
    let _log_guard = init_logging(&config);

    match run(cli.command, &config).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &AppConfig) -> Result<String, CliError> {
    match command {
        Command::Health => {
            let client = MlClient::new(ClientConfig::from(config))?;
            let ok = client.health().await?;
            Ok(serde_json::to_string_pretty(&json!({
                "ok": ok,
                "ml_service_url": client.config().base_url,
            }))?)
        }
        Command::Assignment { assignment_id } => {
            let db = db::connect(&config.database_path).await?;
            let dispatcher = build_dispatcher(config, db)?;
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, skipping portfolios not yet started");
                    on_interrupt.cancel();
                }
            });
            let report = dispatcher
                .grade_assignment_with_cancel(assignment_id, cancel)
                .await?;
            Ok(serde_json::to_string_pretty(&report)?)
        }
        Command::Portfolio { portfolio_id } => {
            let db = db::connect(&config.database_path).await?;
            let outcome = build_dispatcher(config, db)?.grade_one(portfolio_id).await?;
            Ok(serde_json::to_string_pretty(&outcome)?)
        }
        Command::Results { assignment_id } => {
            let db = db::connect(&config.database_path).await?;
            let rows = GradingService::list_results_by_assignment(&db, assignment_id).await?;
            Ok(serde_json::to_string_pretty(&rows)?)
        }
        Command::Final {
            portfolio_id,
            grade,
            status,
        } => {
            let db = db::connect(&config.database_path).await?;
            let row = GradingService::set_final_grade(
                &db,
                portfolio_id,
                FinalGradeInput {
                    final_grade: grade,
                    status,
                },
            )
            .await?;
            Ok(serde_json::to_string_pretty(&json!({
                "id": row.id,
                "student_no": row.student_no,
                "portfolio_id": row.portfolio_id,
                "status": row.status,
                "final_grade": row.final_grade,
                "updated_at": row.updated_at,
            }))?)
        }
        Command::Publish { assignment_id } => {
            let db = db::connect(&config.database_path).await?;
            let published = GradingService::publish_assignment_grades(&db, assignment_id).await?;
            Ok(serde_json::to_string_pretty(&json!({
                "assignment_id": assignment_id,
                "published": published,
            }))?)
        }
    }
}

fn build_dispatcher(
    config: &AppConfig,
    db: sea_orm::DatabaseConnection,
) -> Result<BatchDispatcher<MlClient, DbStore>, CliError> {
    let client = MlClient::new(ClientConfig::from(config))?;
    Ok(BatchDispatcher::new(
        Arc::new(client),
        Arc::new(DbStore::new(db)),
        DispatchConfig::from(config),
    ))
}

fn init_logging(config: &AppConfig) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", &config.log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true);

    let env_filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("grader=info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if config.log_to_stdout {
        registry.with(stdout_layer).init();
    } else {
        registry.init();
    }

    guard
}
