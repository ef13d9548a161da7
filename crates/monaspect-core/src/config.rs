//! Runtime settings for the fetch layer.
//!
//! # Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `MONASPECT_DEADLINE_MS` | `4000` | Per-source request deadline |
//! | `MONASPECT_MARKET_TTL_SECS` | `60` | Market list freshness window |
//! | `MONASPECT_HISTORY_TTL_SECS` | `300` | Chart freshness window |
//! | `MONASPECT_NEWS_TTL_SECS` | `300` | Headline freshness window |
//! | `MONASPECT_STRATEGY` | `sequential` | `sequential` or `race` |
//! | `MONASPECT_RACE_WIDTH` | `3` | Sources launched by a race |
//! | `MONASPECT_MARKET_LIMIT` | `20` | Assets requested per market refresh |
//! | `MONASPECT_REFRESH_INTERVAL_SECS` | `900` | Background refresh period |
//! | `MONASPECT_NEWS_FANOUT` | `5` | Feeds sampled per news round |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::failover::FetchStrategy;
use crate::ValidationError;

pub const DEFAULT_RACE_WIDTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub deadline: Duration,
    pub market_ttl: Duration,
    pub history_ttl: Duration,
    pub news_ttl: Duration,
    pub strategy: FetchStrategy,
    pub market_limit: usize,
    pub refresh_interval: Duration,
    pub news_fanout: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_millis(4_000),
            market_ttl: Duration::from_secs(60),
            history_ttl: Duration::from_secs(300),
            news_ttl: Duration::from_secs(300),
            strategy: FetchStrategy::Sequential,
            market_limit: 20,
            refresh_interval: Duration::from_secs(15 * 60),
            news_fanout: 5,
        }
    }
}

impl FetchSettings {
    /// Defaults overridden by `MONASPECT_*` environment variables.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ValidationError> {
        let mut settings = Self::default();

        if let Some(ms) = read_positive(&lookup, "MONASPECT_DEADLINE_MS")? {
            settings.deadline = Duration::from_millis(ms);
        }
        if let Some(secs) = read_positive(&lookup, "MONASPECT_MARKET_TTL_SECS")? {
            settings.market_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = read_positive(&lookup, "MONASPECT_HISTORY_TTL_SECS")? {
            settings.history_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = read_positive(&lookup, "MONASPECT_NEWS_TTL_SECS")? {
            settings.news_ttl = Duration::from_secs(secs);
        }
        if let Some(limit) = read_positive(&lookup, "MONASPECT_MARKET_LIMIT")? {
            settings.market_limit = limit as usize;
        }
        if let Some(secs) = read_positive(&lookup, "MONASPECT_REFRESH_INTERVAL_SECS")? {
            settings.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(fanout) = read_positive(&lookup, "MONASPECT_NEWS_FANOUT")? {
            settings.news_fanout = fanout as usize;
        }

        let width = read_positive(&lookup, "MONASPECT_RACE_WIDTH")?
            .map_or(DEFAULT_RACE_WIDTH, |width| width as usize);
        if let Some(raw) = lookup("MONASPECT_STRATEGY") {
            settings.strategy = FetchStrategy::from_str(&raw)?;
        }
        if let FetchStrategy::Race { .. } = settings.strategy {
            settings.strategy = FetchStrategy::Race { width };
        }

        Ok(settings)
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_market_limit(mut self, limit: usize) -> Self {
        self.market_limit = limit;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Cache key of the market list for the configured limit.
    pub fn market_key(&self) -> String {
        format!("market:top{}", self.market_limit)
    }
}

fn read_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ValidationError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ValidationError::InvalidSetting {
            key,
            value: raw,
            reason: "must be greater than zero",
        }),
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(ValidationError::InvalidSetting {
            key,
            value: raw,
            reason: "must be a positive integer",
        }),
    }
}
