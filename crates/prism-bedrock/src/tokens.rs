use prism_core::models::usage::{ModelPricing, TokenCounts};

/// Token counts from a Bedrock usage block. Negative counts read as zero.
pub fn token_counts(usage: &aws_sdk_bedrockruntime::types::TokenUsage) -> TokenCounts {
    TokenCounts {
        input_tokens: usage.input_tokens.max(0) as u64,
        output_tokens: usage.output_tokens.max(0) as u64,
    }
}

/// Approximate on-demand pricing, matched on the model id.
pub fn get_pricing(model_id: &str) -> Option<ModelPricing> {
    let per_million = |input, output| ModelPricing { input, output };

    match model_id {
        id if id.contains("claude-opus-4") => Some(per_million(15.0, 75.0)),
        id if id.contains("claude-sonnet-4") => Some(per_million(3.0, 15.0)),
        id if id.contains("claude-haiku") => Some(per_million(0.80, 4.0)),
        id if id.contains("nova-pro") => Some(per_million(0.80, 3.20)),
        id if id.contains("nova-lite") => Some(per_million(0.06, 0.24)),
        id if id.contains("nova-micro") => Some(per_million(0.035, 0.14)),
        _ => None,
    }
}
