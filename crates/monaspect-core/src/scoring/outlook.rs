//! Per-asset outlook derived from a score.

use serde::Serialize;

use super::score::{Horizon, ScoredAsset};
use crate::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendLabel {
    Bullish,
    Neutral,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    /// Expansion.
    High,
    Stable,
    /// Compression.
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SentimentLabel {
    Positive,
    Muted,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outlook {
    pub symbol: Symbol,
    pub horizon: Horizon,
    pub trend: TrendLabel,
    pub volatility: VolatilityRegime,
    pub sentiment: SentimentLabel,
    pub headline_count: usize,
    pub global_sentiment: f64,
    pub upside: f64,
    pub downside: f64,
    /// Rounded percentage in `50..=100`.
    pub confidence: u8,
    pub momentum_window: &'static str,
}

pub fn outlook(scored: &ScoredAsset, global_sentiment: f64, horizon: Horizon) -> Outlook {
    let score = &scored.score;

    let trend = if score.favorability > 0.2 {
        TrendLabel::Bullish
    } else if score.favorability < -0.2 {
        TrendLabel::Bearish
    } else {
        TrendLabel::Neutral
    };

    let volatility = if score.risk > 0.6 {
        VolatilityRegime::High
    } else if score.risk < 0.3 {
        VolatilityRegime::Low
    } else {
        VolatilityRegime::Stable
    };

    let sentiment = if score.sentiment > 0.0 {
        SentimentLabel::Positive
    } else if score.sentiment < 0.0 {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Muted
    };

    // Daily move in percent, widened by 1.5 for the expected range.
    let daily_deviation = score.raw_change.abs() / 2.0 + 1.0;
    let band = daily_deviation / 100.0 * 1.5;
    let confidence = ((0.5 + score.favorability.abs() / 2.0) * 100.0)
        .round()
        .clamp(0.0, 100.0) as u8;

    Outlook {
        symbol: scored.asset.symbol.clone(),
        horizon,
        trend,
        volatility,
        sentiment,
        headline_count: scored.headline_count,
        global_sentiment,
        upside: scored.asset.price * (1.0 + band),
        downside: scored.asset.price * (1.0 - band),
        confidence,
        momentum_window: match horizon {
            Horizon::Short => "4-8 hours",
            Horizon::Long => "2-5 days",
        },
    }
}
