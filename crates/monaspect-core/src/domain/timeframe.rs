use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Chart window selected by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "LIVE")]
    Live,
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "1Y")]
    OneYear,
}

impl Timeframe {
    pub const ALL: [Self; 5] = [
        Self::Live,
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
        Self::OneYear,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "LIVE",
            Self::OneDay => "1D",
            Self::OneWeek => "1W",
            Self::OneMonth => "1M",
            Self::OneYear => "1Y",
        }
    }

    /// `days` query value for CoinGecko's market_chart endpoint.
    pub const fn coingecko_days(self) -> &'static str {
        match self {
            Self::Live | Self::OneDay => "1",
            Self::OneWeek => "7",
            Self::OneMonth => "30",
            Self::OneYear => "365",
        }
    }

    /// `interval` query value for CoinCap's history endpoint.
    pub const fn coincap_interval(self) -> &'static str {
        match self {
            Self::Live | Self::OneDay => "m15",
            Self::OneWeek => "h1",
            Self::OneMonth => "h12",
            Self::OneYear => "d1",
        }
    }

    /// Kline interval for Binance.
    pub const fn binance_interval(self) -> &'static str {
        match self {
            Self::Live => "1m",
            Self::OneDay => "15m",
            Self::OneWeek => "1h",
            Self::OneMonth => "4h",
            Self::OneYear => "1d",
        }
    }

    /// Total window covered by a chart request.
    pub const fn span(self) -> time::Duration {
        match self {
            Self::Live => time::Duration::hours(1),
            Self::OneDay => time::Duration::days(1),
            Self::OneWeek => time::Duration::days(7),
            Self::OneMonth => time::Duration::days(30),
            Self::OneYear => time::Duration::days(365),
        }
    }

    /// Step count and spacing for generated history.
    pub const fn synthetic_steps(self) -> (usize, time::Duration) {
        match self {
            Self::Live => (60, time::Duration::minutes(1)),
            Self::OneDay => (24, time::Duration::hours(1)),
            Self::OneWeek => (7, time::Duration::days(1)),
            Self::OneMonth | Self::OneYear => (30, time::Duration::days(1)),
        }
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LIVE" => Ok(Self::Live),
            "1D" => Ok(Self::OneDay),
            "1W" => Ok(Self::OneWeek),
            "1M" => Ok(Self::OneMonth),
            "1Y" => Ok(Self::OneYear),
            _ => Err(ValidationError::InvalidTimeframe {
                value: value.to_owned(),
            }),
        }
    }
}
