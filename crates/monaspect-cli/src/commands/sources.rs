use monaspect_core::{FailoverCoordinator, SourceKind, SourceRegistry};
use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SourceStatus {
    name: String,
    kind: SourceKind,
    enabled: bool,
    next_in_rotation: bool,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    market: Vec<SourceStatus>,
    history: Vec<SourceStatus>,
    news: Vec<SourceStatus>,
}

pub fn run(coordinator: &FailoverCoordinator) -> Result<CommandResult, CliError> {
    let cursor = coordinator.market_cursor();
    let data = serde_json::to_value(SourcesResponseData {
        market: statuses(coordinator.market_sources(), Some(cursor)),
        history: statuses(coordinator.history_sources(), None),
        news: statuses(coordinator.news_sources(), None),
    })?;

    Ok(CommandResult::ok(data).with_warning(format!(
        "strategy {}; deadline {} ms",
        coordinator.settings().strategy,
        coordinator.settings().deadline.as_millis()
    )))
}

/// Registry entries in failover order. `cursor` indexes the enabled real
/// sources, the same way the rotation does.
fn statuses<T>(registry: &SourceRegistry<T>, cursor: Option<usize>) -> Vec<SourceStatus> {
    let mut enabled_seen = 0_usize;
    registry
        .descriptors()
        .iter()
        .map(|descriptor| {
            let rotates = descriptor.is_enabled() && !descriptor.is_synthetic();
            let next_in_rotation = rotates && cursor == Some(enabled_seen);
            if rotates {
                enabled_seen += 1;
            }
            SourceStatus {
                name: descriptor.name().to_owned(),
                kind: descriptor.kind(),
                enabled: descriptor.is_enabled(),
                next_in_rotation,
            }
        })
        .collect()
}
