//! OpenAI Responses bridge: the production generation collaborator.
//!
//! Uses the Responses API so chaining is server-side: the returned response `id` is the
//! session's continuation handle and goes back out as `previous_response_id`.
//! API key: `OPENAI_API_KEY`. Default model: `gpt-4.1-nano`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::generation::{Generation, GenerationError, GenerationRequest, Generator};
use crate::session::ConversationHandle;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_response_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    id: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct OpenAiResponsesBridge {
    api_key: String,
    api_base: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiResponsesBridge {
    /// Bridge keyed from `OPENAI_API_KEY`; `None` when unset or blank.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("OPENAI_API_KEY").ok()?.trim().to_string();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key))
    }

    pub fn new(api_key: String) -> Self {
        Self {
            api_key: api_key.trim().to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: build_client(DEFAULT_TIMEOUT),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.client = build_client(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The timeout is also set per request, so it holds even on the fallback client.
    fn request(&self, request: &GenerationRequest) -> Result<reqwest::Request, reqwest::Error> {
        self.client
            .post(format!("{}/responses", self.api_base))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&self.body(request))
            .build()
    }

    fn body<'a>(&'a self, request: &'a GenerationRequest) -> ResponsesRequest<'a> {
        ResponsesRequest {
            model: &self.model,
            instructions: Some(request.system_prompt.as_str()).filter(|s| !s.is_empty()),
            input: &request.user_input,
            previous_response_id: request.continuation.as_ref().map(|h| h.as_str()),
        }
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "HTTP client builder failed; using default client");
            reqwest::Client::new()
        }
    }
}

/// Extracts the response id and concatenated `output_text` parts.
fn parse_response(raw: &str) -> Result<Generation, GenerationError> {
    let parsed: ResponsesResponse =
        serde_json::from_str(raw).map_err(|e| GenerationError::Parse(e.to_string()))?;

    let text: String = parsed
        .output
        .iter()
        .filter(|item| item.kind == "message")
        .flat_map(|item| item.content.iter())
        .filter(|c| c.kind == "output_text")
        .filter_map(|c| c.text.as_deref())
        .collect();

    if text.is_empty() {
        return Err(GenerationError::Parse("response contained no output_text".to_string()));
    }

    Ok(Generation {
        text,
        continuation: parsed.id.map(ConversationHandle::new),
    })
}

#[async_trait]
impl Generator for OpenAiResponsesBridge {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, GenerationError> {
        let res = self.client.execute(self.request(&request)?).await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
