use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use anyhow::{Result, anyhow};
use reqwest::Client;
use tracing::debug;
use crate::config::GoogleSettings;
use crate::error::ForgeError;
use crate::llm::LlmClient;

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Debug)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_settings(settings: &GoogleSettings) -> Result<Self> {
        let key = settings.api_key.clone()
            .ok_or_else(|| ForgeError::Config("missing google.api_key".to_string()))?;
        Ok(Self::new(key, settings.model.clone(), settings.endpoint.clone()))
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint.trim_end_matches('/'), self.model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content { parts: vec![RequestPart { text: prompt }] }],
        };

        let response = self.client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini request failed with {}: {}", status, error_message(&body)));
        }

        let parsed: GenerateResponse = response.json().await?;
        debug!(model = %self.model, candidates = parsed.candidates.len(), "Gemini response received");
        response_text(parsed)
    }
}

fn response_text(parsed: GenerateResponse) -> Result<String> {
    let candidate = parsed.candidates.into_iter().next()
        .ok_or_else(|| anyhow!("Gemini returned no candidates"))?;

    let text: String = candidate.content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();
    Ok(text)
}

/// The `error.message` of an API error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
