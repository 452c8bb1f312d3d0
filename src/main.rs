mod clock;
mod composer;
mod config;
mod error;
mod forecast;
mod generation;
mod history;
mod notify;
mod pipeline;
mod secrets;
mod types;

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqliteConnectOptions;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::Result;
use crate::forecast::SmhiForecastClient;
use crate::generation::OpenAiGenerator;
use crate::history::SqliteHistoryStore;
use crate::notify::WebhookNotifier;
use crate::pipeline::{Collaborators, Pipeline, RunOutcome};
use crate::secrets::EnvSecretProvider;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let options = SqliteConnectOptions::new()
        .filename(&cfg.db_path)
        .create_if_missing(true);
    let pool = sqlx::SqlitePool::connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let history = SqliteHistoryStore::new(pool, cfg.mode);
    info!("Database ready at {} (table {})", cfg.db_path, history.table());

    // --- Collaborators ---
    let deps = Collaborators {
        clock: Arc::new(SystemClock),
        secrets: Arc::new(EnvSecretProvider),
        forecast: Arc::new(SmhiForecastClient::new(&cfg)?),
        history: Arc::new(history),
        generator: Arc::new(OpenAiGenerator::new(&cfg)?),
        notifier: Arc::new(WebhookNotifier::new()?),
    };
    let pipeline = Pipeline::new(&cfg, deps);

    match (cfg.target_date, pipeline.days_remaining()) {
        (Some(target), Some(days)) => info!("Target date {target}: {days} days remaining"),
        _ => info!("No target date configured, expiry gate disabled"),
    }

    if cfg.fires_immediately() {
        info!(mode = %cfg.mode, "Firing a single run");
        return invoke(&pipeline).await;
    }

    info!(mode = %cfg.mode, "Scheduling runs every {}s", cfg.run_interval_secs);
    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.run_interval_secs));
    ticker.tick().await; // consume immediate first tick

    loop {
        ticker.tick().await;
        if let Err(e) = invoke(&pipeline).await {
            error!(stage = ?e.stage(), cause = %e.root(), "Scheduled run failed: {e}");
        }
    }
}

/// One invocation. A failed history write is reported as the invocation's
/// error even though the notification went out.
async fn invoke(pipeline: &Pipeline) -> Result<()> {
    match pipeline.run().await? {
        RunOutcome::Skipped { days_remaining } => {
            info!("Run skipped ({days_remaining} days remaining)");
            Ok(())
        }
        RunOutcome::Completed(report) => {
            info!(
                entry_id = report.entry_id,
                history_used = report.history_used,
                "Summary delivered ({} chars)",
                report.summary.chars().count()
            );
            match report.persistence_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }
}
