use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, GENERATION_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::types::{ChatMessage, ComposedPrompt};

/// One completion for one composed prompt. No retries; failures propagate.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, api_key: &str, prompt: &ComposedPrompt) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GENERATION_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.generation_base_url.trim_end_matches('/').to_string(),
            model: cfg.generation_model.clone(),
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, api_key: &str, prompt: &ComposedPrompt) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = request_body(&self.model, prompt);
        debug!(model = %self.model, messages = prompt.len(), "Requesting completion");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("POST {url}: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AppError::Generation(format!("reading completion body: {e}")))?;
        if !status.is_success() {
            return Err(AppError::Generation(format!("{status}: {text}")));
        }

        extract_completion(&text)
    }
}

fn request_body<'a>(model: &'a str, prompt: &'a ComposedPrompt) -> ChatRequest<'a> {
    ChatRequest { model, messages: &prompt.messages }
}

/// Pull `choices[0].message.content` out of a completion response.
fn extract_completion(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Generation(format!("malformed completion response: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::Generation("completion had no content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::compose;
    use crate::types::HistoryEntry;

    #[test]
    fn request_body_carries_model_and_roles_in_order() {
        let history = vec![HistoryEntry {
            id: 1,
            input_context: "yesterday".to_string(),
            generated_output: "it rained".to_string(),
        }];
        let prompt = compose("instr", &history, "today");
        let body = serde_json::to_value(request_body("gpt-4o", &prompt)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[1]["role"], "user");
        assert_eq!(msgs[1]["content"], "yesterday");
        assert_eq!(msgs[2]["role"], "assistant");
        assert_eq!(msgs[2]["content"], "it rained");
        assert_eq!(msgs[3]["role"], "system");
        assert_eq!(msgs[3]["content"], "today");
    }

    #[test]
    fn extracts_first_choice() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Sol hela dagen ☀️"}}]}"#;
        assert_eq!(extract_completion(body).unwrap(), "Sol hela dagen ☀️");
    }

    #[test]
    fn empty_or_missing_content_is_generation_error() {
        for body in [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
            r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#,
            r#"{}"#,
            "not json",
        ] {
            let err = extract_completion(body).unwrap_err();
            assert!(matches!(err, AppError::Generation(_)), "{body}: {err:?}");
        }
    }
}
