use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::{AppError, Result};
use crate::forecast::fetcher::{RawForecast, RawParameter, RawTimeStep};
use crate::types::{ForecastSample, PrecipitationCategory};

/// Feed parameters the report uses. Everything else in a time step is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForecastParameter {
    Temperature,
    PrecipitationMean,
    PrecipitationCategory,
    CloudCover,
    WindSpeed,
    WindDirection,
}

impl ForecastParameter {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "t" => Some(ForecastParameter::Temperature),
            "pmean" => Some(ForecastParameter::PrecipitationMean),
            "pcat" => Some(ForecastParameter::PrecipitationCategory),
            "tcc_mean" => Some(ForecastParameter::CloudCover),
            "ws" => Some(ForecastParameter::WindSpeed),
            "wd" => Some(ForecastParameter::WindDirection),
            _ => None,
        }
    }
}

/// Typed view of one time step's parameter list, built once per step.
#[derive(Debug, Default)]
pub struct ParameterMap {
    values: HashMap<ForecastParameter, f64>,
}

impl ParameterMap {
    pub fn from_raw(params: &[RawParameter]) -> Self {
        let mut values = HashMap::new();
        for p in params {
            let Some(key) = ForecastParameter::from_name(&p.name) else { continue };
            // First occurrence wins; a parameter with no values is treated as absent.
            if let Some(&v) = p.values.first() {
                values.entry(key).or_insert(v);
            }
        }
        Self { values }
    }

    pub fn get(&self, param: ForecastParameter) -> Option<f64> {
        self.values.get(&param).copied().filter(|v| v.is_finite())
    }
}

/// Turn the raw feed into exactly `hours` samples, in feed order.
///
/// Fails if the feed has fewer than `hours` steps, if timestamps are not
/// strictly increasing, or if any kept step lacks a temperature.
pub fn normalize(raw: &RawForecast, hours: usize) -> Result<Vec<ForecastSample>> {
    if raw.time_series.is_empty() {
        return Err(AppError::UpstreamFetch("forecast contains no time steps".to_string()));
    }
    if raw.time_series.len() < hours {
        return Err(AppError::UpstreamFetch(format!(
            "forecast covers {} time steps, report needs {hours}",
            raw.time_series.len()
        )));
    }

    let mut samples: Vec<ForecastSample> = Vec::with_capacity(hours);
    for step in raw.time_series.iter().take(hours) {
        if let Some(prev) = samples.last() {
            if step.valid_time <= prev.timestamp {
                return Err(AppError::UpstreamFetch(format!(
                    "time step {} does not follow {}",
                    step.valid_time.to_rfc3339(),
                    prev.timestamp.to_rfc3339()
                )));
            }
        }
        samples.push(normalize_step(step)?);
    }
    Ok(samples)
}

fn normalize_step(step: &RawTimeStep) -> Result<ForecastSample> {
    let params = ParameterMap::from_raw(&step.parameters);

    let temperature = params.get(ForecastParameter::Temperature).ok_or_else(|| {
        AppError::UpstreamFetch(format!(
            "temperature missing for {}",
            step.valid_time.to_rfc3339()
        ))
    })?;

    Ok(ForecastSample {
        timestamp: step.valid_time,
        temperature_c: round_one_decimal(temperature),
        // The feed uses negative sentinels for "no data".
        precipitation_mm: params
            .get(ForecastParameter::PrecipitationMean)
            .filter(|&mm| mm >= 0.0),
        precipitation_category: params
            .get(ForecastParameter::PrecipitationCategory)
            .and_then(PrecipitationCategory::from_code),
        // tcc_mean is reported in octas.
        cloud_cover_pct: params
            .get(ForecastParameter::CloudCover)
            .filter(|&o| (0.0..=8.0).contains(&o))
            .map(|octas| octas * 12.5),
        wind_speed: params.get(ForecastParameter::WindSpeed),
        wind_direction: params.get(ForecastParameter::WindDirection),
    })
}

fn round_one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round_two_decimals(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M %Z";

/// Serialize samples plus the trailing as-of annotation into the text handed
/// to generation and stored as the run's input context. Times are shown in `tz`.
pub fn render_forecast(samples: &[ForecastSample], as_of: DateTime<Utc>, tz: Tz) -> String {
    let mut out = String::new();
    for s in samples {
        out.push_str(&render_line(s, tz));
        out.push('\n');
    }
    out.push_str(&format!(
        "It is currently {}.",
        as_of.with_timezone(&tz).format(TIME_FORMAT)
    ));
    out
}

fn render_line(s: &ForecastSample, tz: Tz) -> String {
    let mut line = format!(
        "{} temp: {}°C",
        s.timestamp.with_timezone(&tz).format(TIME_FORMAT),
        s.temperature_text()
    );
    if let Some(mm) = s.precipitation_mm {
        line.push_str(&format!(", rain: {} mm", round_two_decimals(mm)));
    }
    if let Some(cat) = s.precipitation_category {
        line.push_str(&format!(", type: {cat}"));
    }
    if let Some(pct) = s.cloud_cover_pct {
        line.push_str(&format!(", clouds: {pct:.0}%"));
    }
    match (s.wind_speed, s.wind_direction) {
        (Some(ws), Some(wd)) => line.push_str(&format!(", wind: {ws:.1} m/s from {wd:.0}°")),
        (Some(ws), None) => line.push_str(&format!(", wind: {ws:.1} m/s")),
        (None, Some(wd)) => line.push_str(&format!(", wind from {wd:.0}°")),
        (None, None) => {}
    }
    line
}
