//! Metered cloud text provider backed by the Gemini `generateContent` API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::pricing::{self, PriceTable};
use super::{AiResponse, CapabilitySet, Provider, ProviderError, TaskType, TokenUsage};
use crate::config::ApiKey;

const CAPABILITIES: CapabilitySet = CapabilitySet::of(&[
    TaskType::Generate,
    TaskType::Summarize,
    TaskType::AnalyzeSpeakers,
]);

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    name: String,
    model: String,
    base_url: String,
    api_key: ApiKey,
    prices: PriceTable,
}

impl GeminiProvider {
    pub fn new(
        client: Client,
        name: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: ApiKey,
    ) -> Self {
        let model = model.into();
        Self {
            client,
            name: name.into(),
            prices: pricing::model_price(&model),
            model,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
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
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it has any.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> CapabilitySet {
        CAPABILITIES
    }

    fn price_table(&self) -> PriceTable {
        self.prices
    }

    fn estimate_cost(&self, input: &str, task: TaskType) -> f64 {
        let input_units = pricing::estimate_units(input);
        let output_units = pricing::estimated_output_units(task, input_units);
        self.prices.cost(input_units, output_units)
    }

    async fn generate(
        &self,
        prompt: &str,
        max_output_units: Option<u32>,
        temperature: f32,
    ) -> Result<AiResponse, ProviderError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: max_output_units,
            },
        };

        tracing::debug!(
            provider = %self.name,
            model = %self.model,
            prompt_chars = prompt.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = %self.name,
                status = %status,
                body = %body,
                "Gemini returned error"
            );
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let text = parsed
            .text()
            .ok_or_else(|| ProviderError::Malformed("response contained no text".to_string()))?;

        let reported = parsed.usage_metadata.as_ref();
        let input_units = reported
            .and_then(|u| u.prompt_token_count)
            .unwrap_or_else(|| pricing::estimate_units(prompt));
        let output_units = reported
            .and_then(|u| u.candidates_token_count)
            .unwrap_or_else(|| pricing::estimate_units(&text));

        Ok(AiResponse {
            usage: TokenUsage::new(
                input_units,
                output_units,
                self.prices.cost(input_units, output_units),
            ),
            content: text,
            model: self.model.clone(),
            provider: self.name.clone(),
        })
    }
}
