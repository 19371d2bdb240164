//! Token accounting and monetary cost.

use std::collections::BTreeMap;

use nova_config::PricingConfig;
use serde::{Deserialize, Serialize};

const TOKENS_PER_PRICE_UNIT: f64 = 1_000_000.0;

/// Token counts as reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Portion of `input_tokens` served from the provider's prompt cache.
    #[serde(default)]
    pub cached_input_tokens: u64,
    /// Cost in USD when the provider reports it directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_cost: Option<f64>,
}

/// Token counts plus derived cost for one generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub cached_input: u64,
    /// USD, with the cache discount applied. `None` when the model is not priced.
    pub cost: Option<f64>,
    /// USD as if no input tokens had been cached.
    pub cost_without_cache: Option<f64>,
}

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
    /// Discounted input price for cache hits. Unset means cache hits are billed as input.
    pub cached_input_per_mtok: Option<f64>,
}

impl ModelPricing {
    pub fn new(input_per_mtok: f64, output_per_mtok: f64) -> Self {
        Self {
            input_per_mtok,
            output_per_mtok,
            cached_input_per_mtok: None,
        }
    }

    pub fn with_cached_input(mut self, cached_input_per_mtok: f64) -> Self {
        self.cached_input_per_mtok = Some(cached_input_per_mtok);
        self
    }

    /// `(cost, cost_without_cache)` in USD.
    pub fn cost(&self, usage: &Usage) -> (f64, f64) {
        let cached = usage.cached_input_tokens.min(usage.input_tokens) as f64;
        let uncached = usage.input_tokens as f64 - cached;
        let output = usage.output_tokens as f64 * self.output_per_mtok;
        let cached_price = self.cached_input_per_mtok.unwrap_or(self.input_per_mtok);

        let with_cache = uncached * self.input_per_mtok + cached * cached_price + output;
        let without_cache = usage.input_tokens as f64 * self.input_per_mtok + output;
        (
            with_cache / TOKENS_PER_PRICE_UNIT,
            without_cache / TOKENS_PER_PRICE_UNIT,
        )
    }
}

impl From<&PricingConfig> for ModelPricing {
    fn from(config: &PricingConfig) -> Self {
        Self {
            input_per_mtok: config.input,
            output_per_mtok: config.output,
            cached_input_per_mtok: config.cached_input,
        }
    }
}

/// Prices keyed by model id. Lookups are exact first, then case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    prices: BTreeMap<String, ModelPricing>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(pricing: &BTreeMap<String, PricingConfig>) -> Self {
        Self {
            prices: pricing
                .iter()
                .map(|(model, price)| (model.clone(), ModelPricing::from(price)))
                .collect(),
        }
    }

    pub fn insert(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.prices.insert(model.into(), pricing);
    }

    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        self.prices.get(model).or_else(|| {
            self.prices
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(model))
                .map(|(_, pricing)| pricing)
        })
    }

    /// Derive [`TokenUsage`] for `model`. A provider-reported cost overrides the computed one.
    pub fn token_usage(&self, model: &str, usage: &Usage) -> TokenUsage {
        let (cost, cost_without_cache) = match self.get(model) {
            Some(pricing) => {
                let (cost, without) = pricing.cost(usage);
                (Some(cost), Some(without))
            }
            None => (None, None),
        };

        TokenUsage {
            input: usage.input_tokens,
            output: usage.output_tokens,
            cached_input: usage.cached_input_tokens,
            cost: usage.reported_cost.or(cost),
            cost_without_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn cache_discount_applies_to_cached_input_only() {
        let mut table = PriceTable::new();
        table.insert(
            "gpt-4o-mini",
            ModelPricing::new(0.15, 0.60).with_cached_input(0.075),
        );

        let usage = Usage {
            input_tokens: 1_000_000,
            output_tokens: 100_000,
            cached_input_tokens: 400_000,
            reported_cost: None,
        };
        let tokens = table.token_usage("GPT-4o-mini", &usage);
        // 600k * 0.15 + 400k * 0.075 + 100k * 0.60, per million.
        assert_close(tokens.cost.unwrap(), 0.09 + 0.03 + 0.06);
        assert_close(tokens.cost_without_cache.unwrap(), 0.15 + 0.06);
        assert_eq!(tokens.cached_input, 400_000);
    }

    #[test]
    fn unpriced_models_have_no_cost() {
        let usage = Usage {
            input_tokens: 10,
            output_tokens: 5,
            ..Usage::default()
        };
        let tokens = PriceTable::new().token_usage("mystery", &usage);
        assert_eq!(tokens.cost, None);
        assert_eq!(tokens.cost_without_cache, None);
        assert_eq!((tokens.input, tokens.output), (10, 5));
    }

    #[test]
    fn reported_cost_wins_and_cache_overcount_is_clamped() {
        let mut table = PriceTable::new();
        table.insert("m", ModelPricing::new(1.0, 2.0).with_cached_input(0.5));

        let usage = Usage {
            input_tokens: 100,
            output_tokens: 0,
            cached_input_tokens: 500,
            reported_cost: None,
        };
        let tokens = table.token_usage("m", &usage);
        assert_close(tokens.cost.unwrap(), 100.0 * 0.5 / 1_000_000.0);

        let reported = Usage {
            reported_cost: Some(0.25),
            ..usage
        };
        assert_eq!(table.token_usage("m", &reported).cost, Some(0.25));
    }
}
