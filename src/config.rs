use std::path::PathBuf;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::error::{AppError, Result};

/// SMHI pmp3g point forecast for central Gothenburg.
pub const FORECAST_URL: &str = "https://opendata-download-metfcst.smhi.se/api/category/pmp3g/version/2/geotype/point/lon/11.953125/lat/57.703266/data.json";
pub const GENERATION_BASE_URL: &str = "https://api.openai.com/v1";
pub const GENERATION_MODEL: &str = "gpt-4o";
pub const SECRET_NAME: &str = "will-it-rain";
pub const DISPLAY_TZ: &str = "Europe/Stockholm";

/// Number of hourly forecast samples that make up one report.
pub const REPORT_HOURS: usize = 24;

/// How many past runs are replayed as conversation turns.
pub const HISTORY_WINDOW: usize = 7;

/// Runs are no-ops once the target date is further back than this many days.
pub const EXPIRY_DAYS: i64 = -1;

/// Scheduler interval in prod mode (seconds).
pub const RUN_INTERVAL_SECS: u64 = 86_400;

pub const FORECAST_TIMEOUT_SECS: u64 = 30;
pub const GENERATION_TIMEOUT_SECS: u64 = 120;
pub const NOTIFY_TIMEOUT_SECS: u64 = 30;

/// Substitution token recognized inside the instruction template.
pub const DAYS_REMAINING_TOKEN: &str = "{days_remaining}";

pub const DEFAULT_INSTRUCTION: &str = "Use this data to create a short summary for the weather in swedish for Gothenburg. \
Include a bit of humor and emojis in the summary. Do not repeat yourself, but mention previous days if there are any. \
(Always mention the current day and the temperature in Celsius)";

pub mod tables {
    pub const DEV: &str = "history_dev";
    pub const PROD: &str = "history_prod";
}

/// Deployment mode. Selects secrets, the history table and the trigger style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Dev,
    Prod,
}

impl Mode {
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some(v) if v.trim().eq_ignore_ascii_case("true") => Mode::Dev,
            _ => Mode::Prod,
        }
    }

    pub fn history_table(self) -> &'static str {
        match self {
            Mode::Dev => tables::DEV,
            Mode::Prod => tables::PROD,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Dev => write!(f, "dev"),
            Mode::Prod => write!(f, "prod"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub log_level: String,
    pub db_path: String,
    pub forecast_url: String,
    pub generation_base_url: String,
    pub generation_model: String,
    /// Past runs replayed into the prompt (HISTORY_WINDOW)
    pub history_window: usize,
    /// Name of the secret bundle holding webhooks, mention tags and the API key (SECRET_NAME)
    pub secret_name: String,
    /// Date the "days remaining" counter counts down to (TARGET_DATE, YYYY-MM-DD).
    /// None disables the expiry gate.
    pub target_date: Option<NaiveDate>,
    /// Zone forecast times are rendered in (DISPLAY_TZ, IANA name)
    pub display_tz: Tz,
    /// Instruction text, read once from INSTRUCTION_PATH or the built-in default.
    pub instruction_template: String,
    /// Prod scheduler period (RUN_INTERVAL_SECS)
    pub run_interval_secs: u64,
    /// Fire once immediately and exit, even in prod (RUN_ONCE)
    pub run_once: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. `from_env` passes the process environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let instruction_template = match var("INSTRUCTION_PATH") {
            Some(path) => load_instruction(PathBuf::from(path))?,
            None => DEFAULT_INSTRUCTION.to_string(),
        };

        Ok(Self {
            mode: Mode::from_flag(var("DEV").as_deref()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            db_path: var("DB_PATH").unwrap_or_else(|| "will-it-rain.db".to_string()),
            forecast_url: var("FORECAST_URL").unwrap_or_else(|| FORECAST_URL.to_string()),
            generation_base_url: var("GENERATION_BASE_URL")
                .unwrap_or_else(|| GENERATION_BASE_URL.to_string()),
            generation_model: var("GENERATION_MODEL")
                .unwrap_or_else(|| GENERATION_MODEL.to_string()),
            history_window: var("HISTORY_WINDOW")
                .unwrap_or_else(|| HISTORY_WINDOW.to_string())
                .trim()
                .parse::<usize>()
                .map_err(|_| {
                    AppError::Config("HISTORY_WINDOW must be a non-negative integer".to_string())
                })?,
            secret_name: var("SECRET_NAME").unwrap_or_else(|| SECRET_NAME.to_string()),
            target_date: var("TARGET_DATE")
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_target_date(&s))
                .transpose()?,
            display_tz: var("DISPLAY_TZ")
                .unwrap_or_else(|| DISPLAY_TZ.to_string())
                .trim()
                .parse::<Tz>()
                .map_err(|e| AppError::Config(format!("DISPLAY_TZ: {e}")))?,
            instruction_template,
            run_interval_secs: var("RUN_INTERVAL_SECS")
                .unwrap_or_else(|| RUN_INTERVAL_SECS.to_string())
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|&s| s > 0)
                .ok_or_else(|| {
                    AppError::Config("RUN_INTERVAL_SECS must be a positive integer".to_string())
                })?,
            run_once: var("RUN_ONCE")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    /// Whether the process fires a single run immediately instead of scheduling.
    pub fn fires_immediately(&self) -> bool {
        self.mode == Mode::Dev || self.run_once
    }
}

pub fn parse_target_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Config(format!("TARGET_DATE must be YYYY-MM-DD, got {s:?}")))
}

fn load_instruction(path: PathBuf) -> Result<String> {
    let text = std::fs::read_to_string(&path)?;
    if text.trim().is_empty() {
        return Err(AppError::Config(format!(
            "instruction template {} is empty",
            path.display()
        )));
    }
    Ok(text.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn dev_flag_selects_dev_mode() {
        assert_eq!(Mode::from_flag(Some("true")), Mode::Dev);
        assert_eq!(Mode::from_flag(Some(" TRUE ")), Mode::Dev);
        assert_eq!(Mode::from_flag(Some("false")), Mode::Prod);
        assert_eq!(Mode::from_flag(Some("1")), Mode::Prod);
        assert_eq!(Mode::from_flag(None), Mode::Prod);
    }

    #[test]
    fn each_mode_has_its_own_table() {
        assert_eq!(Mode::Dev.history_table(), "history_dev");
        assert_eq!(Mode::Prod.history_table(), "history_prod");
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.mode, Mode::Prod);
        assert_eq!(cfg.history_window, HISTORY_WINDOW);
        assert_eq!(cfg.run_interval_secs, RUN_INTERVAL_SECS);
        assert_eq!(cfg.display_tz, chrono_tz::Europe::Stockholm);
        assert_eq!(cfg.instruction_template, DEFAULT_INSTRUCTION);
        assert_eq!(cfg.target_date, None);
        assert!(!cfg.run_once);
    }

    #[test]
    fn dev_fires_once_prod_schedules_unless_run_once() {
        let dev = Config::from_lookup(lookup(&[("DEV", "true")])).unwrap();
        assert!(dev.fires_immediately());

        let prod = Config::from_lookup(lookup(&[("DEV", "false")])).unwrap();
        assert!(!prod.fires_immediately());

        let prod_once = Config::from_lookup(lookup(&[("RUN_ONCE", "true")])).unwrap();
        assert_eq!(prod_once.mode, Mode::Prod);
        assert!(prod_once.fires_immediately());
    }

    #[test]
    fn invalid_numbers_are_config_errors() {
        let err = Config::from_lookup(lookup(&[("HISTORY_WINDOW", "seven")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "{err:?}");

        let err = Config::from_lookup(lookup(&[("HISTORY_WINDOW", "-1")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "{err:?}");

        let err = Config::from_lookup(lookup(&[("RUN_INTERVAL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "{err:?}");

        let err = Config::from_lookup(lookup(&[("RUN_INTERVAL_SECS", "daily")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "{err:?}");
    }

    #[test]
    fn unknown_time_zone_is_rejected() {
        let err = Config::from_lookup(lookup(&[("DISPLAY_TZ", "Mars/Olympus")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "{err:?}");

        let utc = Config::from_lookup(lookup(&[("DISPLAY_TZ", "UTC")])).unwrap();
        assert_eq!(utc.display_tz, chrono_tz::UTC);
    }

    #[test]
    fn instruction_file_is_loaded_and_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Summarise the weather. {{days_remaining}} days left.\n\n  ").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cfg = Config::from_lookup(lookup(&[("INSTRUCTION_PATH", path.as_str())])).unwrap();
        assert_eq!(
            cfg.instruction_template,
            "Summarise the weather. {days_remaining} days left."
        );
    }

    #[test]
    fn blank_instruction_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "   \n").unwrap();

        let err = load_instruction(file.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "{err:?}");
    }

    #[test]
    fn missing_instruction_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_instruction(dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)), "{err:?}");
    }

    #[test]
    fn target_date_parses_iso_day() {
        let d = parse_target_date("2025-06-21").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 6, 21).unwrap());
        assert!(parse_target_date("21/06/2025").is_err());
    }
}
