//! Azure OpenAI chat-completions provider.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{AnswerProvider, CompletionRequest};
use crate::error::SearchError;

const SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

/// Blocking chat client for an Azure OpenAI completion deployment.
pub struct AzureOpenAiProvider {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl AzureOpenAiProvider {
    /// Builds a provider against a completion deployment on the given
    /// Azure resource endpoint.
    pub fn new(
        api_key: String,
        endpoint: String,
        deployment: String,
        api_version: String,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Azure OpenAI API key");
        anyhow::ensure!(
            !deployment.trim().is_empty(),
            "missing completion deployment name"
        );
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build Azure OpenAI HTTP client")?;
        let endpoint = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment.trim(),
            api_version.trim()
        );
        Ok(Self {
            api_key,
            endpoint,
            client,
        })
    }

    fn answer_inner(&self, request: &CompletionRequest) -> Result<String> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(self.api_key.trim()).context("invalid Azure OpenAI API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = ChatRequest {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .context("failed to call Azure chat completions")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("Azure returned {}: {}", status, text);
        }
        let parsed: ChatResponse = resp.json().context("failed to parse Azure response")?;
        let answer = parsed
            .choices
            .into_iter()
            .map(|choice| choice.message.content)
            .next()
            .unwrap_or_default();
        if answer.trim().is_empty() {
            bail!("Azure response contained no answer text");
        }
        Ok(answer.trim().to_string())
    }
}

impl AnswerProvider for AzureOpenAiProvider {
    fn answer(&self, request: &CompletionRequest) -> Result<String, SearchError> {
        self.answer_inner(request).map_err(SearchError::Generation)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
