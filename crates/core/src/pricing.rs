//! Point pricing for generation batches.
//!
//! Two sources, checked in order:
//! 1. A static per-model table of base prices (1K, text-to-image), scaled
//!    by tier and job type.
//! 2. Live tier prices from `system_settings`, with defaults 2/4/6.
//!
//! The batch cost is always `unit_cost * quantity`, so splitting it back
//! across jobs divides exactly.

use serde::Serialize;

use crate::generation::{JobType, ResolutionTier};
use crate::types::Points;

/// No unit is ever priced below this.
pub const MIN_UNIT_COST: Points = 1;

pub const DEFAULT_PRICE_1K: Points = 2;
pub const DEFAULT_PRICE_2K: Points = 4;
pub const DEFAULT_PRICE_4K: Points = 6;

/// Base unit price (1K, text-to-image) for models with fixed pricing.
const MODEL_BASE_PRICES: &[(&str, Points)] = &[
    ("gpt-image-1", 3),
    ("dall-e-3", 3),
    ("flux-kontext-pro", 4),
    ("flux-kontext-max", 6),
    ("midjourney-v7", 5),
];

/// Per-tier unit prices as configured at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPrices {
    pub k1: Points,
    pub k2: Points,
    pub k4: Points,
}

impl Default for TierPrices {
    fn default() -> Self {
        Self {
            k1: DEFAULT_PRICE_1K,
            k2: DEFAULT_PRICE_2K,
            k4: DEFAULT_PRICE_4K,
        }
    }
}

impl TierPrices {
    /// Build from raw setting values. Missing, unparsable or non-positive
    /// values use the default for that tier.
    pub fn from_settings(k1: Option<&str>, k2: Option<&str>, k4: Option<&str>) -> Self {
        fn parse(raw: Option<&str>, default: Points) -> Points {
            raw.and_then(|v| v.trim().parse::<Points>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        }
        Self {
            k1: parse(k1, DEFAULT_PRICE_1K),
            k2: parse(k2, DEFAULT_PRICE_2K),
            k4: parse(k4, DEFAULT_PRICE_4K),
        }
    }

    pub fn for_tier(&self, tier: ResolutionTier) -> Points {
        match tier {
            ResolutionTier::K1 => self.k1,
            ResolutionTier::K2 => self.k2,
            ResolutionTier::K4 => self.k4,
        }
    }
}

/// Result of pricing a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub unit_cost: Points,
    pub quantity: u32,
    pub total_cost: Points,
}

/// Price a batch of `quantity` jobs.
pub fn quote(
    job_type: JobType,
    tier: ResolutionTier,
    quantity: u32,
    model: Option<&str>,
    live: &TierPrices,
) -> PriceQuote {
    let unit = model
        .and_then(model_base_price)
        .map(|base| scaled_model_price(base, job_type, tier))
        .unwrap_or_else(|| live.for_tier(tier))
        .max(MIN_UNIT_COST);

    PriceQuote {
        unit_cost: unit,
        quantity,
        total_cost: unit * Points::from(quantity),
    }
}

/// Look up a model in the static price table.
pub fn model_base_price(model: &str) -> Option<Points> {
    MODEL_BASE_PRICES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(model.trim()))
        .map(|(_, price)| *price)
}

fn scaled_model_price(base: Points, job_type: JobType, tier: ResolutionTier) -> Points {
    let tier_factor = match tier {
        ResolutionTier::K1 => 1,
        ResolutionTier::K2 => 2,
        ResolutionTier::K4 => 3,
    };
    let unit = base * tier_factor;
    match job_type {
        JobType::TextToImage => unit,
        // x1.5, rounded up.
        JobType::ImageToImage => (unit * 3 + 1) / 2,
    }
}
