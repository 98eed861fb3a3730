//! Local speech-to-text provider backed by a Whisper HTTP service.
//!
//! Besides transcription it offers rule-based stand-ins for summarization and
//! speaker analysis; it cannot generate free-form text.

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;

use super::pricing::{self, PriceTable};
use super::{AiResponse, CapabilitySet, Provider, ProviderError, TaskType, TokenUsage};

pub const MODEL_ID: &str = "whisper-local";

const CAPABILITIES: CapabilitySet = CapabilitySet::of(&[
    TaskType::Summarize,
    TaskType::AnalyzeSpeakers,
    TaskType::Transcribe,
]);

/// Leading-sentence length when the caller gives no target.
const DEFAULT_SUMMARY_WORDS: usize = 50;

#[derive(Debug, Clone)]
pub struct WhisperProvider {
    client: Client,
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    text: Option<String>,
}

impl WhisperProvider {
    pub fn new(client: Client, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
            url: url.into(),
        }
    }

    fn response(&self, content: String, input_units: u64, output_units: u64, cost: f64) -> AiResponse {
        AiResponse {
            content,
            usage: TokenUsage::new(input_units, output_units, cost),
            model: MODEL_ID.to_string(),
            provider: self.name.clone(),
        }
    }
}

/// Distinct speaker labels in a `Label: text` transcript, sorted.
///
/// A label is the text before the first `:` of a line, trimmed; empty and
/// purely numeric labels (timestamps like `12:30`) are ignored.
pub fn extract_speakers(transcript: &str) -> BTreeSet<String> {
    transcript
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(label, _)| label.trim())
        .filter(|label| !label.is_empty() && !label.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

fn speaker_report(speakers: &BTreeSet<String>) -> String {
    let names: Vec<&str> = speakers.iter().map(String::as_str).collect();
    format!("Detected {} speakers: {}", names.len(), names.join(", "))
}

/// Statistics-only summary used when no language model is available.
pub fn text_statistics_summary(text: &str, max_length: Option<u32>) -> String {
    let words = text.split_whitespace().count();
    let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    let speakers = extract_speakers(text);

    let limit = max_length.map_or(DEFAULT_SUMMARY_WORDS, |n| n as usize);
    let first_sentence = text.split(['.', '!', '?']).find(|s| !s.trim().is_empty()).unwrap_or("");
    let lead_words: Vec<&str> = first_sentence.split_whitespace().take(limit).collect();

    let mut summary = format!(
        "Text statistics: {} words, {} lines, {} sentences.",
        words, lines, sentences
    );
    if !speakers.is_empty() {
        summary.push(' ');
        summary.push_str(&speaker_report(&speakers));
        summary.push('.');
    }
    if !lead_words.is_empty() {
        summary.push_str(" Opening: ");
        summary.push_str(&lead_words.join(" "));
    }
    summary
}

#[async_trait]
impl Provider for WhisperProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        MODEL_ID
    }

    fn capabilities(&self) -> CapabilitySet {
        CAPABILITIES
    }

    fn price_table(&self) -> PriceTable {
        pricing::LOCAL_PRICE_TABLE
    }

    fn estimate_cost(&self, input: &str, _task: TaskType) -> f64 {
        pricing::local_processing_cost(input.len())
    }

    async fn generate(
        &self,
        _prompt: &str,
        _max_output_units: Option<u32>,
        _temperature: f32,
    ) -> Result<AiResponse, ProviderError> {
        Err(ProviderError::Unsupported(TaskType::Generate))
    }

    async fn summarize(
        &self,
        text: &str,
        max_length: Option<u32>,
    ) -> Result<AiResponse, ProviderError> {
        let summary = text_statistics_summary(text, max_length);
        Ok(self.response(
            summary.clone(),
            pricing::estimate_units(text),
            pricing::estimate_units(&summary),
            pricing::local_processing_cost(text.len()),
        ))
    }

    async fn analyze_speakers(&self, transcript: &str) -> Result<AiResponse, ProviderError> {
        let report = speaker_report(&extract_speakers(transcript));
        Ok(self.response(
            report.clone(),
            pricing::estimate_units(transcript),
            pricing::estimate_units(&report),
            pricing::local_processing_cost(transcript.len()),
        ))
    }

    async fn transcribe_audio(&self, audio: &[u8]) -> Result<AiResponse, ProviderError> {
        let url = format!("{}/transcribe", self.url.trim_end_matches('/'));

        let part = multipart::Part::bytes(audio.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")?;
        let form = multipart::Form::new().part("audio", part);

        tracing::debug!(provider = %self.name, bytes = audio.len(), "Sending audio for transcription");

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = %self.name,
                status = %status,
                "Transcription service returned error"
            );
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let transcript = parsed.text.unwrap_or_default();

        tracing::info!(
            provider = %self.name,
            chars = transcript.len(),
            "Transcription completed"
        );

        let input_units = (audio.len() / 1000) as u64;
        let output_units = pricing::estimate_units(&transcript);
        Ok(self.response(
            transcript,
            input_units,
            output_units,
            pricing::local_processing_cost(audio.len()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> WhisperProvider {
        WhisperProvider::new(Client::new(), "whisper", "http://127.0.0.1:9")
    }

    #[test]
    fn test_extract_speakers_skips_numeric_and_empty_labels() {
        let transcript = "Alice: hello\n12: noise\n: nobody\nBob: hi\nAlice: again\nno colon here";
        let speakers: Vec<String> = extract_speakers(transcript).into_iter().collect();
        assert_eq!(speakers, vec!["Alice".to_string(), "Bob".to_string()]);
    }

    #[test]
    fn test_extract_speakers_uses_first_colon() {
        let speakers = extract_speakers("Dr. Smith: at 10:30 we start");
        assert!(speakers.contains("Dr. Smith"));
        assert_eq!(speakers.len(), 1);
    }

    #[test]
    fn test_analyze_speakers_report() {
        let response =
            tokio_test::block_on(provider().analyze_speakers("Bob: hi\nAlice: hello")).unwrap();
        assert_eq!(response.content, "Detected 2 speakers: Alice, Bob");
        assert_eq!(response.provider, "whisper");
        assert_eq!(response.model, MODEL_ID);
        assert_eq!(
            response.usage.total_units,
            response.usage.input_units + response.usage.output_units
        );
    }

    #[test]
    fn test_generate_is_unsupported() {
        let err = tokio_test::block_on(provider().generate("write a poem", None, 0.7)).unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(TaskType::Generate)));
    }

    #[test]
    fn test_statistics_summary() {
        let text = "Alice: We agreed to ship on Friday.\nBob: Sounds good!\nAlice: Great";
        let summary = text_statistics_summary(text, Some(3));
        assert!(summary.starts_with("Text statistics: 12 words, 3 lines, 3 sentences."));
        assert!(summary.contains("Detected 2 speakers: Alice, Bob"));
        assert!(summary.ends_with("Opening: Alice: We agreed"));
    }

    #[test]
    fn test_statistics_summary_of_empty_text() {
        assert_eq!(
            text_statistics_summary("", None),
            "Text statistics: 0 words, 0 lines, 0 sentences."
        );
    }

    #[test]
    fn test_capabilities_exclude_generation() {
        let caps = provider().capabilities();
        assert!(caps.contains(TaskType::Transcribe));
        assert!(caps.contains(TaskType::AnalyzeSpeakers));
        assert!(!caps.contains(TaskType::Generate));
    }

    #[test]
    fn test_estimate_cost_scales_with_size() {
        let p = provider();
        let small = p.estimate_cost("abc", TaskType::Summarize);
        let large = p.estimate_cost(&"a".repeat(10_000), TaskType::Summarize);
        assert!(large > small);
        assert!((large - 0.001).abs() < 1e-12);
    }
}
