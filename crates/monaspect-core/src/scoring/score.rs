use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{NormalizedAsset, ValidationError};

/// Analysis timeframe bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    #[default]
    Short,
    Long,
}

impl Horizon {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }

    pub const fn weights(self) -> HorizonWeights {
        match self {
            Self::Short => HorizonWeights {
                trend: 0.5,
                volatility: -0.2,
                sentiment: 0.3,
                global: 0.1,
            },
            Self::Long => HorizonWeights {
                trend: 0.2,
                volatility: -0.5,
                sentiment: 0.1,
                global: 0.3,
            },
        }
    }
}

impl Display for Horizon {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Horizon {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "long" => Ok(Self::Long),
            _ => Err(ValidationError::InvalidHorizon {
                value: value.to_owned(),
            }),
        }
    }
}

/// Factor weights for one horizon.
///
/// `volatility` is reported for display only; favorability applies a flat
/// `VOLATILITY_PENALTY` regardless of horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HorizonWeights {
    pub trend: f64,
    pub volatility: f64,
    pub sentiment: f64,
    pub global: f64,
}

pub const VOLATILITY_PENALTY: f64 = 0.1;

const TREND_SCALE: f64 = 10.0;
const VOLATILITY_SCALE: f64 = 15.0;
const NEGATIVE_SENTIMENT_RISK: f64 = 0.5;
const GLOBAL_FEAR_RISK: f64 = 0.3;
const GLOBAL_FEAR_THRESHOLD: f64 = -0.5;
const OVERSOLD_CHANGE: f64 = -5.0;
const OVERSOLD_BONUS: f64 = 0.8;
const MOMENTUM_CHANGE: f64 = 15.0;
const MOMENTUM_BONUS: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssetScore {
    pub favorability: f64,
    pub risk: f64,
    pub asymmetry: f64,
    /// 24h change used for scoring; zero when the source had none.
    pub raw_change: f64,
    /// Asset sentiment that fed the score.
    pub sentiment: f64,
}

/// An asset with its score and the number of headlines attributed to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredAsset {
    pub asset: NormalizedAsset,
    pub score: AssetScore,
    pub headline_count: usize,
}

pub fn compute_scores(
    asset: &NormalizedAsset,
    asset_sentiment: f64,
    global_sentiment: f64,
    horizon: Horizon,
) -> AssetScore {
    let change = asset.change_24h.unwrap_or(0.0);
    let trend = (change / TREND_SCALE).clamp(-1.0, 1.0);
    let volatility = (change.abs() / VOLATILITY_SCALE).min(1.0);
    let weights = horizon.weights();

    let favorability = trend * weights.trend
        + asset_sentiment * weights.sentiment
        + global_sentiment * weights.global
        - volatility * VOLATILITY_PENALTY;

    let mut risk = volatility;
    if asset_sentiment < 0.0 {
        risk += NEGATIVE_SENTIMENT_RISK;
    }
    if global_sentiment < GLOBAL_FEAR_THRESHOLD {
        risk += GLOBAL_FEAR_RISK;
    }

    let mut asymmetry = 0.0;
    if change < OVERSOLD_CHANGE && asset_sentiment > 0.0 {
        asymmetry += OVERSOLD_BONUS;
    }
    if change > MOMENTUM_CHANGE {
        asymmetry += MOMENTUM_BONUS;
    }

    AssetScore {
        favorability,
        risk,
        asymmetry,
        raw_change: change,
        sentiment: asset_sentiment,
    }
}
