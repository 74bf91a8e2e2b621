use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Token usage and estimated cost of one assistant reply.
///
/// Serialized as-is into the reply's message metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReplyUsage {
    pub model_id: String,
    pub usage: TokenCounts,
    /// Zero when the model has no known price.
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TokenCounts {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// On-demand price of a model in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
}

impl ModelPricing {
    pub fn cost(&self, tokens: TokenCounts) -> f64 {
        (tokens.input_tokens as f64 * self.input + tokens.output_tokens as f64 * self.output)
            / 1_000_000.0
    }
}

impl ReplyUsage {
    pub fn new(
        model_id: impl Into<String>,
        usage: TokenCounts,
        pricing: Option<&ModelPricing>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            usage,
            cost_usd: pricing.map_or(0.0, |p| p.cost(usage)),
        }
    }

    pub fn to_metadata(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
