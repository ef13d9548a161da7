use std::str::FromStr;

use monaspect_core::{
    analyze, outlook, AnalysisResult, FailoverCoordinator, FetchError, Horizon, NewsItem,
    NormalizedAsset, Outlook,
};
use serde::Serialize;

use crate::cli::AnalyzeArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
pub(super) struct AnalyzeResponseData {
    #[serde(flatten)]
    analysis: AnalysisResult,
    outlooks: Vec<Outlook>,
}

pub async fn run(
    args: &AnalyzeArgs,
    coordinator: &FailoverCoordinator,
) -> Result<CommandResult, CliError> {
    let horizon = Horizon::from_str(&args.horizon)?;

    let market = match coordinator.fetch_market().await {
        Ok(market) => market,
        Err(FetchError::AllSourcesExhausted { failures, .. }) => {
            let data = serde_json::to_value(AnalyzeResponseData::from_analysis(
                AnalysisResult::empty(horizon, 0.0),
            ))?;
            return Ok(CommandResult::unavailable(data, failures));
        }
        Err(other) => return Err(CliError::Unavailable(other)),
    };
    let news = coordinator.fetch_news().await;

    let data = serde_json::to_value(evaluate(&market.data, &news.data, horizon))?;

    let mut source_chain = market.source_chain.clone();
    source_chain.extend(news.source_chain.iter().cloned());
    let mut result = CommandResult::routed(data, &market)
        .with_source_chain(source_chain)
        .with_latency(market.latency_ms + news.latency_ms);
    for warning in &news.warnings {
        result = result.with_warning(format!("news: {warning}"));
    }
    Ok(result)
}

/// Ranks the market and attaches an outlook for every best pick.
pub(super) fn evaluate(
    market: &[NormalizedAsset],
    news: &[NewsItem],
    horizon: Horizon,
) -> AnalyzeResponseData {
    AnalyzeResponseData::from_analysis(analyze(market, news, horizon))
}

impl AnalyzeResponseData {
    fn from_analysis(analysis: AnalysisResult) -> Self {
        let outlooks = analysis
            .best
            .iter()
            .map(|pick| outlook(pick, analysis.global_sentiment, analysis.horizon))
            .collect();
        Self { analysis, outlooks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monaspect_core::{Symbol, UtcDateTime};

    fn asset(symbol: &str, change: f64) -> NormalizedAsset {
        NormalizedAsset::new(
            symbol.to_lowercase(),
            Symbol::parse(symbol).expect("symbol"),
            symbol,
            100.0,
            Some(change),
            None,
            None,
            Vec::new(),
            "test",
        )
        .expect("asset")
    }

    #[test]
    fn every_best_pick_gets_an_outlook() {
        let market = vec![
            asset("BTC", 4.0),
            asset("ETH", 2.0),
            asset("SOL", -3.0),
            asset("ADA", -9.0),
            asset("DOT", 12.0),
        ];
        let news = vec![NewsItem::new("SOL upgrade ships", UtcDateTime::now(), "https://n.test")
            .expect("headline")];

        let response = evaluate(&market, &news, Horizon::Long);

        assert_eq!(response.outlooks.len(), response.analysis.best.len());
        for (pick, view) in response.analysis.best.iter().zip(&response.outlooks) {
            assert_eq!(pick.asset.symbol, view.symbol);
        }
    }
}
