//! Instruction templates for text tasks delegated to `generate`.

pub(crate) const DEFAULT_TEMPERATURE: f32 = 0.7;

const DEFAULT_SUMMARY_UNITS: u32 = 500;
const SPEAKER_ANALYSIS_UNITS: u32 = 800;

/// Build the summary prompt and its output budget.
pub(crate) fn summary(text: &str, max_length: Option<u32>) -> (String, u32) {
    let length = max_length
        .map(|words| format!(" in about {} words", words))
        .unwrap_or_default();

    let prompt = format!(
        "Summarize this meeting transcript{length}. \
         Cover the key points, the decisions taken and any action items.\n\n\
         {text}\n\nSummary:"
    );

    let max_units = max_length
        .map(|words| words.saturating_mul(2).max(1))
        .unwrap_or(DEFAULT_SUMMARY_UNITS);

    (prompt, max_units)
}

/// Build the speaker-analysis prompt and its output budget.
pub(crate) fn speaker_analysis(transcript: &str) -> (String, u32) {
    let prompt = format!(
        "Identify the distinct speakers in this meeting transcript. For each one give:\n\
         1. An identifier (Speaker A, Speaker B, ...)\n\
         2. Their apparent role or area of expertise\n\
         3. The main topics they raised\n\n\
         Transcript:\n{transcript}\n\nAnalysis:"
    );

    (prompt, SPEAKER_ANALYSIS_UNITS)
}
