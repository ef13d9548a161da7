use monaspect_core::{FailoverCoordinator, FetchError, NormalizedAsset};
use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct MarketResponseData<'a> {
    assets: &'a [NormalizedAsset],
}

pub async fn run(coordinator: &FailoverCoordinator) -> Result<CommandResult, CliError> {
    match coordinator.fetch_market().await {
        Ok(market) => {
            let data = serde_json::to_value(MarketResponseData {
                assets: &market.data,
            })?;
            Ok(CommandResult::routed(data, &market))
        }
        Err(FetchError::AllSourcesExhausted { failures, .. }) => {
            let data = serde_json::to_value(MarketResponseData { assets: &[] })?;
            Ok(CommandResult::unavailable(data, failures))
        }
        Err(other) => Err(CliError::Unavailable(other)),
    }
}
