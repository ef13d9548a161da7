mod analyze;
mod history;
mod market;
mod news;
mod sources;
mod watch;

use std::time::Duration;

use monaspect_core::{
    FailoverCoordinator, FetchSettings, FetchStrategy, Freshness, Refreshed, SourceFailure,
    DEFAULT_RACE_WIDTH,
};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command, StrategyArg};
use crate::error::CliError;
use crate::metadata::Metadata;
use crate::output::Envelope;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<SourceFailure>,
    pub latency_ms: u64,
    pub freshness: Option<Freshness>,
    pub source_chain: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            freshness: None,
            source_chain: Vec::new(),
        }
    }

    /// Result carrying the routing metadata of one failover round. Sources
    /// that failed before the winner are reported as warnings.
    pub fn routed<T>(data: Value, refreshed: &Refreshed<T>) -> Self {
        let mut warnings = refreshed.warnings.clone();
        warnings.extend(
            refreshed
                .failures
                .iter()
                .map(|failure| format!("{}: {}", failure.source, failure.message)),
        );
        Self {
            data,
            warnings,
            errors: Vec::new(),
            latency_ms: refreshed.latency_ms,
            freshness: Some(refreshed.freshness),
            source_chain: refreshed.source_chain.clone(),
        }
    }

    /// Result for a round that produced nothing usable.
    pub fn unavailable(data: Value, errors: Vec<SourceFailure>) -> Self {
        let source_chain = errors.iter().map(|failure| failure.source.clone()).collect();
        Self {
            data,
            warnings: Vec::new(),
            errors,
            latency_ms: 0,
            freshness: Some(Freshness::Unavailable),
            source_chain,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_source_chain(mut self, source_chain: Vec<String>) -> Self {
        self.source_chain = source_chain;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn into_envelope(self) -> Envelope {
        let Self {
            data,
            warnings,
            errors,
            latency_ms,
            freshness,
            source_chain,
        } = self;

        let mut metadata = Metadata::new(source_chain, freshness, latency_ms);
        for warning in warnings {
            metadata.push_warning(warning);
        }
        Envelope::new(metadata, data).with_errors(errors)
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let mut settings = resolve_settings(cli)?;
    match &cli.command {
        Command::Market(args) => {
            if let Some(limit) = args.limit {
                settings = settings.with_market_limit(limit as usize);
            }
        }
        Command::Watch(args) => {
            if let Some(secs) = args.interval_secs {
                settings = settings.with_refresh_interval(Duration::from_secs(secs));
            }
        }
        _ => {}
    }

    debug!(
        strategy = %settings.strategy,
        deadline_ms = settings.deadline.as_millis() as u64,
        offline = cli.offline,
        "building coordinator"
    );
    let coordinator = build_coordinator(settings, cli.offline)?;

    let command_result = match &cli.command {
        Command::Market(_) => market::run(&coordinator).await?,
        Command::History(args) => history::run(args, &coordinator, cli.offline).await?,
        Command::News => news::run(&coordinator).await?,
        Command::Analyze(args) => analyze::run(args, &coordinator).await?,
        Command::Sources => sources::run(&coordinator)?,
        Command::Watch(args) => watch::run(args, coordinator).await?,
    };

    Ok(command_result.into_envelope())
}

/// Environment settings with command-line overrides applied on top.
fn resolve_settings(cli: &Cli) -> Result<FetchSettings, CliError> {
    let mut settings = FetchSettings::from_env()?;

    let width = cli.race_width.map(|width| width as usize);
    settings.strategy = match (cli.strategy, settings.strategy) {
        (None, FetchStrategy::Sequential) | (Some(StrategyArg::Sequential), _)
            if width.is_some() =>
        {
            return Err(CliError::Command(String::from(
                "--race-width only applies to the race strategy",
            )));
        }
        (Some(StrategyArg::Sequential), _) => FetchStrategy::Sequential,
        (Some(StrategyArg::Race), FetchStrategy::Race { width: configured }) => FetchStrategy::Race {
            width: width.unwrap_or(configured),
        },
        (Some(StrategyArg::Race), FetchStrategy::Sequential) => FetchStrategy::Race {
            width: width.unwrap_or(DEFAULT_RACE_WIDTH),
        },
        (None, FetchStrategy::Race { width: configured }) => FetchStrategy::Race {
            width: width.unwrap_or(configured),
        },
        (None, FetchStrategy::Sequential) => FetchStrategy::Sequential,
    };

    if let Some(ms) = cli.timeout_ms {
        settings = settings.with_deadline(Duration::from_millis(ms));
    }

    Ok(settings)
}

fn build_coordinator(
    settings: FetchSettings,
    offline: bool,
) -> Result<FailoverCoordinator, CliError> {
    let builder = FailoverCoordinator::builder().with_settings(settings);
    let builder = if offline {
        builder.with_offline_mode()
    } else {
        builder.with_real_client()
    };
    Ok(builder.build()?)
}
