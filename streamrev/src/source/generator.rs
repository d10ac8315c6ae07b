//! HTTP client for a text-completion endpoint that streams its output.
//!
//! The endpoint receives `{"model", "prompt", "stream": true}`. An SSE
//! response is unwrapped to its completion text by [`super::sse`]; any other
//! body is taken to be the raw completion text and passed through unchanged.

use futures::TryStreamExt;
use serde::Serialize;
use streamrev_core::BoxError;

use super::sse::completion_stream;
use super::{ChunkStream, SourceError};
use crate::config::GeneratorConfig;

const INSTRUCTIONS: &str = "\
You are a code reviewer. Review the unified diff below and reply with a single JSON object \
and nothing else, using exactly these keys:
{
  \"summary\": string,
  \"overallRisk\": \"Low\" | \"Medium\" | \"High\",
  \"issues\": [
    {
      \"severity\": \"Low\" | \"Medium\" | \"High\",
      \"category\": string,
      \"description\": string,
      \"recommendation\": string,
      \"lineNumber\": number | null,
      \"filePath\": string | null
    }
  ],
  \"statistics\": {\"totalIssues\": number, \"highRisk\": number, \"mediumRisk\": number, \"lowRisk\": number}
}
lineNumber is the 1-based line number within the diff text exactly as shown, counting header lines.";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Clone)]
pub struct GeneratorClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_diff_chars: usize,
}

impl GeneratorClient {
    pub fn new(client: reqwest::Client, config: &GeneratorConfig, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            max_diff_chars: config.max_diff_chars,
        }
    }

    /// Builds a client, resolving the bearer token from the environment
    /// variable named by `api_key_env`.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, SourceError> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(
                std::env::var(var).map_err(|_| SourceError::MissingApiKey(var.clone()))?,
            ),
            None => None,
        };
        Ok(Self::new(reqwest::Client::new(), config, api_key))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends the review request. The status is checked before any chunk is
    /// handed out; body errors after that surface as stream items.
    pub async fn open(&self, diff_text: &str) -> Result<ChunkStream, SourceError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(diff_text, self.max_diff_chars),
            stream: true,
        };
        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|source| SourceError::Http {
            url: self.endpoint.clone(),
            source,
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                url: self.endpoint.clone(),
                status,
            });
        }
        tracing::info!(endpoint = %self.endpoint, model = %self.model, "generator stream opened");

        Ok(completion_stream(resp.bytes_stream().map_err(BoxError::from)))
    }
}

/// Instructions followed by the diff, cut to `max_diff_chars` characters.
///
/// Truncation keeps a prefix, so line numbers the generator reports still
/// line up with the full parsed diff.
pub fn build_prompt(diff_text: &str, max_diff_chars: usize) -> String {
    let (diff, truncated) = truncate_chars(diff_text, max_diff_chars);
    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + diff.len() + 64);
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\n```diff\n");
    prompt.push_str(diff);
    if !diff.ends_with('\n') {
        prompt.push('\n');
    }
    prompt.push_str("```\n");
    if truncated {
        prompt.push_str(&format!(
            "\nThe diff was truncated to its first {max_diff_chars} characters.\n"
        ));
    }
    prompt
}

fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}
