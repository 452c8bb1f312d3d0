use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Mode;
use crate::error::{AppError, Result};

/// Everything a run needs from the secret bundle.
#[derive(Clone, Deserialize)]
pub struct Secrets {
    #[serde(rename = "WEBHOOK_DEV")]
    pub webhook_url_dev: String,
    #[serde(rename = "WEBHOOK_PROD")]
    pub webhook_url_prod: String,
    #[serde(rename = "TO_TAG_DEV")]
    pub mention_tag_dev: String,
    #[serde(rename = "TO_TAG_PROD")]
    pub mention_tag_prod: String,
    #[serde(rename = "OPEN_AI_KEY")]
    pub generation_api_key: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("webhook_url_dev", &"[REDACTED]")
            .field("webhook_url_prod", &"[REDACTED]")
            .field("mention_tag_dev", &self.mention_tag_dev)
            .field("mention_tag_prod", &self.mention_tag_prod)
            .field("generation_api_key", &"[REDACTED]")
            .finish()
    }
}

/// Where one mode's notifications go.
#[derive(Debug, Clone, Copy)]
pub struct Destination<'a> {
    pub webhook_url: &'a str,
    pub mention_tag: &'a str,
}

impl Secrets {
    pub fn destination(&self, mode: Mode) -> Destination<'_> {
        match mode {
            Mode::Dev => Destination {
                webhook_url: &self.webhook_url_dev,
                mention_tag: &self.mention_tag_dev,
            },
            Mode::Prod => Destination {
                webhook_url: &self.webhook_url_prod,
                mention_tag: &self.mention_tag_prod,
            },
        }
    }

    pub fn from_json(name: &str, raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Secret(format!("secret {name:?} is not a valid bundle: {e}")))
    }
}

#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<Secrets>;
}

/// Reads the bundle as a JSON document from an environment variable named
/// after the secret (`will-it-rain` → `WILL_IT_RAIN`).
#[derive(Debug, Default)]
pub struct EnvSecretProvider;

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<Secrets> {
        let var = env_var_name(name);
        let raw = std::env::var(&var)
            .map_err(|_| AppError::Secret(format!("secret {name:?} not found (expected env var {var})")))?;
        Secrets::from_json(name, &raw)
    }
}

pub fn env_var_name(secret_name: &str) -> String {
    secret_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}
