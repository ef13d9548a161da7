use std::str::FromStr;
use std::sync::Arc;

use monaspect_core::{spawn_market_refresh, FailoverCoordinator, FetchError, Horizon, RefreshReport};
use serde_json::json;
use tracing::{info, warn};

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output;

use super::analyze::evaluate;
use super::CommandResult;

pub async fn run(
    args: &WatchArgs,
    coordinator: FailoverCoordinator,
) -> Result<CommandResult, CliError> {
    let horizon = Horizon::from_str(&args.horizon)?;
    let coordinator = Arc::new(coordinator);
    let handle = spawn_market_refresh(Arc::clone(&coordinator));
    let mut reports = handle.subscribe();
    let mut emitted = 0_u64;

    let outcome = loop {
        if args.ticks.is_some_and(|limit| emitted >= limit) {
            break Ok(());
        }

        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(error) = signal {
                    warn!(error = %error, "could not listen for Ctrl-C");
                }
                info!("interrupted");
                break Ok(());
            }
            changed = reports.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let report = reports.borrow_and_update().clone();
                let Some(report) = report else {
                    continue;
                };
                let rendered = match report_tick(&coordinator, report, horizon).await {
                    Ok(tick) => output::render_line(&tick.into_envelope()),
                    Err(error) => Err(error),
                };
                if let Err(error) = rendered {
                    break Err(error);
                }
                emitted += 1;
            }
        }
    };

    handle.shutdown().await;
    outcome?;

    Ok(CommandResult::ok(json!({
        "ticks": emitted,
        "horizon": horizon,
        "interval_secs": coordinator.settings().refresh_interval.as_secs(),
    })))
}

async fn report_tick(
    coordinator: &FailoverCoordinator,
    report: RefreshReport,
    horizon: Horizon,
) -> Result<CommandResult, CliError> {
    match report.outcome {
        Ok(market) => {
            let news = coordinator.fetch_news().await;
            let mut data = serde_json::to_value(evaluate(&market.data, &news.data, horizon))?;
            data["tick"] = json!(report.tick);
            data["completed_at"] = serde_json::to_value(report.completed_at)?;
            Ok(CommandResult::routed(data, &market))
        }
        Err(FetchError::AllSourcesExhausted { failures, .. }) => Ok(CommandResult::unavailable(
            json!({ "tick": report.tick }),
            failures,
        )),
        Err(other) => Err(CliError::Unavailable(other)),
    }
}
