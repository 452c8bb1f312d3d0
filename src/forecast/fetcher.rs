use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::config::{Config, FORECAST_TIMEOUT_SECS};
use crate::error::{AppError, Result};

/// Raw point-forecast document as served by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawForecast {
    #[serde(rename = "timeSeries")]
    pub time_series: Vec<RawTimeStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTimeStep {
    #[serde(rename = "validTime")]
    pub valid_time: DateTime<Utc>,
    pub parameters: Vec<RawParameter>,
}

/// One named parameter. The feed also sends level/unit metadata, which is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawParameter {
    pub name: String,
    #[serde(default)]
    pub values: Vec<f64>,
}

#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch(&self) -> Result<RawForecast>;
}

/// HTTP GET against the SMHI open-data forecast endpoint.
pub struct SmhiForecastClient {
    client: reqwest::Client,
    url: String,
}

impl SmhiForecastClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FORECAST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, url: cfg.forecast_url.clone() })
    }
}

#[async_trait]
impl ForecastSource for SmhiForecastClient {
    async fn fetch(&self) -> Result<RawForecast> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::UpstreamFetch(format!("GET {}: {e}", self.url)))?;

        let body = resp
            .text()
            .await
            .map_err(|e| AppError::UpstreamFetch(format!("reading forecast body: {e}")))?;

        let forecast = parse_forecast(&body)?;
        debug!("Forecast feed returned {} time steps", forecast.time_series.len());
        Ok(forecast)
    }
}

pub fn parse_forecast(body: &str) -> Result<RawForecast> {
    serde_json::from_str(body)
        .map_err(|e| AppError::UpstreamFetch(format!("malformed forecast document: {e}")))
}
