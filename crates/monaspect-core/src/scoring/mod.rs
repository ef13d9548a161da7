//! Stateless scoring and ranking of a market snapshot against headlines.
//!
//! ```text
//! news ──► global sentiment ─────────────┐
//!   │                                    ▼
//!   └──► news_for_asset ──► asset sentiment ──► compute_scores ──► rank
//! market ──────────────────────────────────────┘
//! ```

mod outlook;
mod rank;
mod score;
mod sentiment;

pub use outlook::{outlook, Outlook, SentimentLabel, TrendLabel, VolatilityRegime};
pub use rank::{rank, AnalysisResult, PICKS_PER_LIST, STABLECOINS, TRUMP_RISK_FLOOR};
pub use score::{
    compute_scores, AssetScore, Horizon, HorizonWeights, ScoredAsset, VOLATILITY_PENALTY,
};
pub use sentiment::{
    compute_asset_sentiment, compute_global_sentiment, news_for_asset, ASSET_NEGATIVE,
    ASSET_POSITIVE, GLOBAL_NEGATIVE, GLOBAL_POSITIVE,
};

use crate::{NewsItem, NormalizedAsset};

/// Scores every asset and ranks the result. An empty market yields an
/// empty result whatever the news.
pub fn analyze(market: &[NormalizedAsset], news: &[NewsItem], horizon: Horizon) -> AnalysisResult {
    let global = compute_global_sentiment(news);
    if market.is_empty() {
        return AnalysisResult::empty(horizon, global);
    }

    let scored = market
        .iter()
        .map(|asset| {
            let matched: Vec<&NewsItem> = news_for_asset(asset, news).collect();
            let asset_sentiment = compute_asset_sentiment(matched.iter().copied());
            ScoredAsset {
                asset: asset.clone(),
                score: compute_scores(asset, asset_sentiment, global, horizon),
                headline_count: matched.len(),
            }
        })
        .collect();

    rank(scored, horizon, global)
}
