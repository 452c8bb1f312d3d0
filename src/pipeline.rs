use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{error, info, warn};

use crate::clock::{days_until, Clock};
use crate::composer::{compose, render_instruction};
use crate::config::{Config, Mode, EXPIRY_DAYS, REPORT_HOURS};
use crate::error::{AppError, Result};
use crate::forecast::{normalize, render_forecast, ForecastSource};
use crate::generation::Generator;
use crate::history::HistoryStore;
use crate::notify::{format_notification, Notifier};
use crate::secrets::SecretProvider;
use crate::types::HistoryEntry;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Steps of one invocation, strictly in this order. `Failed` is reachable from
/// any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    FetchingForecast,
    ReadingHistory,
    Composing,
    Generating,
    Persisting,
    Notifying,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineState::Idle => "starting",
            PipelineState::FetchingForecast => "fetching forecast",
            PipelineState::ReadingHistory => "reading history",
            PipelineState::Composing => "composing",
            PipelineState::Generating => "generating",
            PipelineState::Persisting => "persisting",
            PipelineState::Notifying => "notifying",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

struct Progress {
    state: PipelineState,
}

impl Progress {
    fn new() -> Self {
        Self { state: PipelineState::Idle }
    }

    fn enter(&mut self, next: PipelineState) {
        info!(state = %next, "Pipeline transition");
        self.state = next;
    }

    fn fail(&mut self, err: AppError) -> AppError {
        let stage = self.state;
        error!(state = %stage, "Run failed: {err}");
        self.state = PipelineState::Failed;
        AppError::Stage { stage, source: Box::new(err) }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RunOutcome {
    /// The expiry gate was closed. Nothing was fetched, generated or written.
    Skipped { days_remaining: i64 },
    Completed(RunReport),
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: String,
    pub entry_id: i64,
    /// History entries replayed into the prompt.
    pub history_used: usize,
    /// Set when the history write failed; the notification was still sent.
    pub persistence_error: Option<AppError>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// External capabilities the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub secrets: Arc<dyn SecretProvider>,
    pub forecast: Arc<dyn ForecastSource>,
    pub history: Arc<dyn HistoryStore>,
    pub generator: Arc<dyn Generator>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct Pipeline {
    mode: Mode,
    secret_name: String,
    history_window: usize,
    instruction_template: String,
    target_date: Option<NaiveDate>,
    display_tz: Tz,
    deps: Collaborators,
}

impl Pipeline {
    pub fn new(cfg: &Config, deps: Collaborators) -> Self {
        Self {
            mode: cfg.mode,
            secret_name: cfg.secret_name.clone(),
            history_window: cfg.history_window,
            instruction_template: cfg.instruction_template.clone(),
            target_date: cfg.target_date,
            display_tz: cfg.display_tz,
            deps,
        }
    }

    /// Days from today (per the injected clock) to the target date, if one is set.
    pub fn days_remaining(&self) -> Option<i64> {
        let today = self.deps.clock.now().date_naive();
        self.target_date.map(|target| days_until(target, today))
    }

    /// One end-to-end invocation.
    pub async fn run(&self) -> Result<RunOutcome> {
        let days_remaining = self.days_remaining();
        if let Some(days) = days_remaining {
            if days < EXPIRY_DAYS {
                info!(days_remaining = days, "Target date has passed, skipping run");
                return Ok(RunOutcome::Skipped { days_remaining: days });
            }
        }

        let mut progress = Progress::new();
        let report = self.run_steps(&mut progress, days_remaining).await?;
        progress.enter(PipelineState::Done);
        info!(
            mode = %self.mode,
            entry_id = report.entry_id,
            history_used = report.history_used,
            persisted = report.persistence_error.is_none(),
            "Run complete"
        );
        Ok(RunOutcome::Completed(report))
    }

    async fn run_steps(&self, progress: &mut Progress, days_remaining: Option<i64>) -> Result<RunReport> {
        info!(state = %progress.state, secret = %self.secret_name, "Resolving secrets");
        let secrets = match self.deps.secrets.get_secret(&self.secret_name).await {
            Ok(s) => s,
            Err(e) => return Err(progress.fail(e)),
        };
        let destination = secrets.destination(self.mode);

        progress.enter(PipelineState::FetchingForecast);
        let samples = match self.deps.forecast.fetch().await {
            Ok(raw) => match normalize(&raw, REPORT_HOURS) {
                Ok(s) => s,
                Err(e) => return Err(progress.fail(e)),
            },
            Err(e) => return Err(progress.fail(e)),
        };
        info!("Forecast normalized: {} samples", samples.len());

        progress.enter(PipelineState::ReadingHistory);
        let history = match self.deps.history.read_recent(self.history_window).await {
            Ok(h) => h,
            Err(e) => return Err(progress.fail(e)),
        };
        info!("Loaded {} history entries (window {})", history.len(), self.history_window);

        progress.enter(PipelineState::Composing);
        let forecast_text = render_forecast(&samples, self.deps.clock.now(), self.display_tz);
        let instruction = render_instruction(&self.instruction_template, days_remaining);
        let prompt = compose(&instruction, &history, &forecast_text);

        progress.enter(PipelineState::Generating);
        let summary = match self.deps.generator.generate(&secrets.generation_api_key, &prompt).await {
            Ok(s) => s,
            Err(e) => return Err(progress.fail(e)),
        };
        info!("Generated summary:\n{summary}");

        progress.enter(PipelineState::Persisting);
        let entry = HistoryEntry {
            id: self.deps.clock.now().timestamp_millis(),
            input_context: forecast_text,
            generated_output: summary.clone(),
        };
        let persistence_error = match self.deps.history.append(&entry).await {
            Ok(()) => None,
            Err(e) => {
                let e = if matches!(e, AppError::Persistence(_)) {
                    e
                } else {
                    AppError::Persistence(e.to_string())
                };
                warn!(entry_id = entry.id, "History write failed, notifying anyway: {e}");
                Some(e)
            }
        };

        progress.enter(PipelineState::Notifying);
        let content = format_notification(destination.mention_tag, &summary);
        if let Err(e) = self.deps.notifier.notify(destination.webhook_url, &content).await {
            return Err(progress.fail(e));
        }

        Ok(RunReport {
            summary,
            entry_id: entry.id,
            history_used: history.len(),
            persistence_error,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
