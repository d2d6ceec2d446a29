//! Gemini `generateContent` client.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use minirag_core::config::{ApiKeys, GenerationSettings, NetworkSettings};
use minirag_core::http::ServiceClient;
use minirag_core::traits::LanguageModel;
use minirag_core::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

pub struct GeminiModel {
    client: ServiceClient,
    api_key: String,
    url: String,
    temperature: f32,
    model_id: String,
}

impl GeminiModel {
    pub fn new(settings: &GenerationSettings, network: &NetworkSettings, keys: &ApiKeys) -> Result<Self> {
        let api_key = ApiKeys::require(&keys.google_api_key, "GOOGLE_API_KEY")?;
        let model = settings.model.trim_start_matches("models/");
        Ok(Self {
            client: ServiceClient::new("gemini", network, Error::Generation)?,
            api_key,
            url: format!("{}/v1beta/models/{}:generateContent", settings.base_url.trim_end_matches('/'), model),
            temperature: settings.temperature,
            model_id: format!("gemini:{model}"),
        })
    }
}

/// Pull the completion text out of a response; blocked or empty completions are errors.
fn completion_text(client: &ServiceClient, resp: GenerateResponse) -> Result<String> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(client.error(format!("prompt blocked: {reason}")));
    }
    let candidate = resp.candidates.into_iter().next().ok_or_else(|| client.error("no candidates returned"))?;
    let text: String = candidate.content.map(|c| c.parts.into_iter().map(|p| p.text).collect()).unwrap_or_default();
    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
        return Err(client.error(format!("empty completion (finish reason {reason})")));
    }
    Ok(text)
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn model_id(&self) -> &str { &self.model_id }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content { role: Some("user".into()), parts: vec![Part { text: prompt.to_string() }] }],
            generation_config: GenerationConfig { temperature: self.temperature },
        };
        let req = self.client.http().post(&self.url).header("x-goog-api-key", &self.api_key).json(&body);
        let resp: GenerateResponse = self.client.send_json(req).await?;
        let text = completion_text(&self.client, resp)?;
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}
