use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;

use super::score::{Horizon, ScoredAsset};

pub const PICKS_PER_LIST: usize = 3;
pub const TRUMP_RISK_FLOOR: f64 = 0.4;
pub const STABLECOINS: [&str; 4] = ["USDT", "USDC", "DAI", "FDUSD"];

/// Ranked picks for one horizon.
///
/// `best`, `avoid` and `trump` never share an asset id and may each hold
/// fewer than three entries; nothing is back-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub horizon: Horizon,
    pub global_sentiment: f64,
    pub best: Vec<ScoredAsset>,
    pub avoid: Vec<ScoredAsset>,
    pub trump: Vec<ScoredAsset>,
    pub all: Vec<ScoredAsset>,
}

impl AnalysisResult {
    pub fn empty(horizon: Horizon, global_sentiment: f64) -> Self {
        Self {
            horizon,
            global_sentiment,
            best: Vec::new(),
            avoid: Vec::new(),
            trump: Vec::new(),
            all: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Splits scored assets into best, avoid and trump picks. All sorts are
/// stable, so equal scores keep their input order.
pub fn rank(scored: Vec<ScoredAsset>, horizon: Horizon, global_sentiment: f64) -> AnalysisResult {
    let mut all = scored;
    all.sort_by(|a, b| descending(a.score.favorability, b.score.favorability));

    let best: Vec<ScoredAsset> = all.iter().take(PICKS_PER_LIST).cloned().collect();
    let mut taken: HashSet<&str> = best.iter().map(|s| s.asset.id.as_str()).collect();

    let mut avoid_pool: Vec<&ScoredAsset> = all
        .iter()
        .filter(|s| !STABLECOINS.contains(&s.asset.symbol.as_str()))
        .collect();
    avoid_pool.sort_by(|a, b| descending(b.score.favorability, a.score.favorability));
    let avoid: Vec<ScoredAsset> = avoid_pool
        .into_iter()
        .filter(|s| !taken.contains(s.asset.id.as_str()))
        .take(PICKS_PER_LIST)
        .cloned()
        .collect();
    taken.extend(avoid.iter().map(|s| s.asset.id.as_str()));

    let mut trump_pool: Vec<&ScoredAsset> = all
        .iter()
        .filter(|s| s.score.risk > TRUMP_RISK_FLOOR)
        .collect();
    trump_pool.sort_by(|a, b| {
        descending(
            a.score.asymmetry + a.score.risk,
            b.score.asymmetry + b.score.risk,
        )
    });
    let trump: Vec<ScoredAsset> = trump_pool
        .into_iter()
        .filter(|s| !taken.contains(s.asset.id.as_str()))
        .take(PICKS_PER_LIST)
        .cloned()
        .collect();

    AnalysisResult {
        horizon,
        global_sentiment,
        best,
        avoid,
        trump,
        all,
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
