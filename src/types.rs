use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Forecast
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    pub timestamp: DateTime<Utc>,
    /// Rounded to one decimal at normalization; render with `{:.1}`.
    pub temperature_c: f64,
    pub precipitation_mm: Option<f64>,
    pub precipitation_category: Option<PrecipitationCategory>,
    pub cloud_cover_pct: Option<f64>,
    /// m/s
    pub wind_speed: Option<f64>,
    /// Degrees, meteorological convention (direction the wind blows from).
    pub wind_direction: Option<f64>,
}

impl ForecastSample {
    pub fn temperature_text(&self) -> String {
        format!("{:.1}", self.temperature_c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecipitationCategory {
    None,
    Snow,
    SnowAndRain,
    Rain,
    Drizzle,
    FreezingRain,
    FreezingDrizzle,
}

impl PrecipitationCategory {
    /// Fixed lookup for the feed's `pcat` codes 0..=6. Anything else is unknown.
    pub fn from_code(code: f64) -> Option<Self> {
        if code.fract() != 0.0 {
            return None;
        }
        match code as i64 {
            0 => Some(PrecipitationCategory::None),
            1 => Some(PrecipitationCategory::Snow),
            2 => Some(PrecipitationCategory::SnowAndRain),
            3 => Some(PrecipitationCategory::Rain),
            4 => Some(PrecipitationCategory::Drizzle),
            5 => Some(PrecipitationCategory::FreezingRain),
            6 => Some(PrecipitationCategory::FreezingDrizzle),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrecipitationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrecipitationCategory::None => "none",
            PrecipitationCategory::Snow => "snow",
            PrecipitationCategory::SnowAndRain => "snow and rain",
            PrecipitationCategory::Rain => "rain",
            PrecipitationCategory::Drizzle => "drizzle",
            PrecipitationCategory::FreezingRain => "freezing rain",
            PrecipitationCategory::FreezingDrizzle => "freezing drizzle",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One past run. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct HistoryEntry {
    /// Wall-clock milliseconds at write time. Best-effort unique only.
    pub id: i64,
    pub input_context: String,
    pub generated_output: String,
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Ordered messages for one generation call: instruction, history pairs
/// oldest first, then the current forecast. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub messages: Vec<ChatMessage>,
}

impl ComposedPrompt {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// The current-forecast text, i.e. what gets stored as the next run's input.
    #[cfg(test)]
    pub fn current_input(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }
}
