//! Cost-estimation helpers shared by providers and the routing policy.
//!
//! Unit counts are a character-based approximation (4 chars per unit), not
//! real tokenization. All functions here are pure.

use serde::Serialize;

use super::TaskType;

/// Characters per unit in the approximation.
pub const CHARS_PER_UNIT: usize = 4;

/// Local compute cost in USD per 1000 bytes or characters processed.
pub const LOCAL_COST_PER_THOUSAND: f64 = 0.0001;

/// Notional local price: `LOCAL_COST_PER_THOUSAND` spread over 4-char units.
pub const LOCAL_PRICE_TABLE: PriceTable = PriceTable {
    input_per_million: 0.4,
    output_per_million: 0.4,
};

/// USD prices per million units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceTable {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl PriceTable {
    pub fn cost(&self, input_units: u64, output_units: u64) -> f64 {
        (input_units as f64 / 1_000_000.0) * self.input_per_million
            + (output_units as f64 / 1_000_000.0) * self.output_per_million
    }

    /// Price a ledger total, which does not split input from output.
    /// Units are charged at the input rate.
    pub fn ledger_cost(&self, units: u64) -> f64 {
        (units as f64 / 1_000_000.0) * self.input_per_million
    }
}

/// Price table for a Gemini model. Unknown models are priced as flash.
pub fn model_price(model: &str) -> PriceTable {
    match model {
        "gemini-1.5-pro" => PriceTable {
            input_per_million: 3.50,
            output_per_million: 10.50,
        },
        _ => PriceTable {
            input_per_million: 0.075,
            output_per_million: 0.30,
        },
    }
}

/// Approximate unit count of a text.
pub fn estimate_units(text: &str) -> u64 {
    (text.chars().count() / CHARS_PER_UNIT) as u64
}

/// Expected output size of a cloud call for `task`, given its input size.
pub fn estimated_output_units(task: TaskType, input_units: u64) -> u64 {
    match task {
        TaskType::Summarize => (input_units / 4).min(200),
        TaskType::AnalyzeSpeakers => (input_units / 3).min(300),
        TaskType::Generate => (input_units / 2).min(500),
        TaskType::Transcribe => 200,
    }
}

/// Compute cost of local processing over `size` bytes or characters.
pub fn local_processing_cost(size: usize) -> f64 {
    LOCAL_COST_PER_THOUSAND * (size as f64 / 1000.0)
}
