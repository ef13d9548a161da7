use monaspect_core::{FailoverCoordinator, Freshness, NewsItem};
use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct NewsResponseData<'a> {
    headlines: &'a [NewsItem],
}

pub async fn run(coordinator: &FailoverCoordinator) -> Result<CommandResult, CliError> {
    let news = coordinator.fetch_news().await;
    let data = serde_json::to_value(NewsResponseData {
        headlines: &news.data,
    })?;

    if news.freshness == Freshness::Unavailable {
        let mut result = CommandResult::unavailable(data, news.failures.clone())
            .with_latency(news.latency_ms);
        for warning in &news.warnings {
            result = result.with_warning(warning.clone());
        }
        return Ok(result);
    }
    Ok(CommandResult::routed(data, &news))
}
