use std::str::FromStr;

use monaspect_core::{FailoverCoordinator, FetchError, HistoryPoint, Symbol, Timeframe};
use serde::Serialize;
use tracing::debug;

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct HistoryResponseData<'a> {
    symbol: &'a Symbol,
    timeframe: Timeframe,
    points: &'a [HistoryPoint],
}

pub async fn run(
    args: &HistoryArgs,
    coordinator: &FailoverCoordinator,
    offline: bool,
) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let timeframe = Timeframe::from_str(&args.timeframe)?;

    // Chart endpoints key on provider asset ids, which only the market list
    // carries.
    if !offline {
        if let Err(error) = coordinator.fetch_market().await {
            debug!(error = %error, "market list unavailable; charting without asset id");
        }
    }

    match coordinator.fetch_history(&symbol, timeframe).await {
        Ok(history) => {
            let data = serde_json::to_value(HistoryResponseData {
                symbol: &symbol,
                timeframe,
                points: &history.data,
            })?;
            Ok(CommandResult::routed(data, &history))
        }
        Err(FetchError::AllSourcesExhausted { failures, .. }) => {
            let data = serde_json::to_value(HistoryResponseData {
                symbol: &symbol,
                timeframe,
                points: &[],
            })?;
            Ok(CommandResult::unavailable(data, failures))
        }
        Err(other) => Err(CliError::Unavailable(other)),
    }
}
