//! Azure OpenAI embedding client.

use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::QueryEmbedder;
use crate::error::SearchError;

/// Blocking embeddings client for an Azure OpenAI deployment.
#[derive(Clone)]
pub struct AzureOpenAiEmbedder {
    client: Client,
    endpoint: String,
    max_retries: usize,
}

impl AzureOpenAiEmbedder {
    /// Builds a new Azure OpenAI embeddings client.
    ///
    /// `endpoint` is the resource base URL (`https://<resource>.openai.azure.com`);
    /// `deployment` names the embedding model deployment.
    pub fn new(
        api_key: String,
        endpoint: String,
        deployment: String,
        api_version: String,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Azure OpenAI API key");
        anyhow::ensure!(!endpoint.trim().is_empty(), "missing Azure OpenAI endpoint");
        anyhow::ensure!(
            !deployment.trim().is_empty(),
            "missing embedding deployment name"
        );
        anyhow::ensure!(!api_version.trim().is_empty(), "missing API version");
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(api_key.trim()).context("invalid Azure OpenAI API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Azure OpenAI HTTP client")?;
        let endpoint = format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment.trim(),
            api_version.trim()
        );
        Ok(Self {
            client,
            endpoint,
            max_retries: max_retries.max(1),
        })
    }

    /// Sends a batch of strings and returns one embedding per input,
    /// in input order.
    pub fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 0usize;
        loop {
            let request = EmbeddingRequest { input: inputs };
            let response = self.client.post(&self.endpoint).json(&request).send();
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse = resp
                            .json()
                            .context("failed to parse Azure embedding response")?;
                        parsed.data.sort_by_key(|entry| entry.index);
                        anyhow::ensure!(
                            parsed.data.len() == inputs.len(),
                            "Azure returned {} embeddings for {} inputs",
                            parsed.data.len(),
                            inputs.len()
                        );
                        return Ok(parsed
                            .data
                            .into_iter()
                            .map(|entry| entry.embedding)
                            .collect());
                    }

                    let body = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    anyhow::bail!("Azure embeddings request failed ({}): {}", status, body);
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

impl QueryEmbedder for AzureOpenAiEmbedder {
    fn embed_query(&self, query: &str) -> Result<Vec<f32>, SearchError> {
        let mut vectors = self
            .embed_batch(&[query])
            .map_err(SearchError::Embedding)?;
        vectors
            .pop()
            .ok_or_else(|| SearchError::Embedding(anyhow!("provider returned no embedding")))
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() || err.is_decode()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
