//! Keyword-substring headline sentiment.
//!
//! Matching is a plain case-insensitive `contains` on the title. There is no
//! tokenisation, so `"bear"` also matches `"bearing"`; the keyword lists and
//! increments are kept exactly as they are because downstream rankings
//! depend on them.

use crate::{NewsItem, NormalizedAsset};

pub const GLOBAL_POSITIVE: [&str; 9] = [
    "surge", "soar", "bull", "adoption", "record", "gain", "approve", "green", "rally",
];
pub const GLOBAL_NEGATIVE: [&str; 9] = [
    "crash",
    "plunge",
    "bear",
    "ban",
    "hack",
    "fraud",
    "crackdown",
    "slump",
    "drop",
];

// "partership" is matched as spelled; correcting it would change scores.
pub const ASSET_POSITIVE: [&str; 5] = ["launch", "partership", "upgrade", "bullish", "breakout"];
pub const ASSET_NEGATIVE: [&str; 5] = ["delay", "downgrade", "lawsuit", "sell-off", "resistance"];

const GLOBAL_POSITIVE_HIT: f64 = 1.0;
const GLOBAL_NEGATIVE_HIT: f64 = -1.5;
const GLOBAL_SCALE: f64 = 10.0;
const ASSET_HIT: f64 = 2.0;
const ASSET_SCALE: f64 = 5.0;

/// Market-wide mood in `[-1, 1]`. Negative headlines weigh 1.5x.
pub fn compute_global_sentiment(news: &[NewsItem]) -> f64 {
    let raw: f64 = news
        .iter()
        .map(|item| {
            score_title(
                &item.title,
                &GLOBAL_POSITIVE,
                &GLOBAL_NEGATIVE,
                GLOBAL_POSITIVE_HIT,
                GLOBAL_NEGATIVE_HIT,
            )
        })
        .sum();
    (raw / GLOBAL_SCALE).clamp(-1.0, 1.0)
}

/// Mood of the headlines attributed to one asset, in `[-1, 1]`; zero when
/// there are none.
pub fn compute_asset_sentiment<'a, I>(asset_news: I) -> f64
where
    I: IntoIterator<Item = &'a NewsItem>,
{
    let raw: f64 = asset_news
        .into_iter()
        .map(|item| {
            score_title(
                &item.title,
                &ASSET_POSITIVE,
                &ASSET_NEGATIVE,
                ASSET_HIT,
                -ASSET_HIT,
            )
        })
        .sum();
    (raw / ASSET_SCALE).clamp(-1.0, 1.0)
}

/// Headlines whose lowercased title contains the asset's symbol or name.
pub fn news_for_asset<'a>(
    asset: &'a NormalizedAsset,
    news: &'a [NewsItem],
) -> impl Iterator<Item = &'a NewsItem> + 'a {
    let symbol = asset.symbol.to_lowercase();
    let name = asset.name.to_lowercase();
    news.iter().filter(move |item| {
        let title = item.title.to_lowercase();
        title.contains(&symbol) || title.contains(&name)
    })
}

fn score_title(title: &str, positive: &[&str], negative: &[&str], up: f64, down: f64) -> f64 {
    let title = title.to_lowercase();
    let mut score = 0.0;
    if positive.iter().any(|keyword| title.contains(keyword)) {
        score += up;
    }
    if negative.iter().any(|keyword| title.contains(keyword)) {
        score += down;
    }
    score
}
