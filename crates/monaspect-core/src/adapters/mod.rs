//! Provider transforms and the default registries built from them.
//!
//! Every transform is a pure `fn(&str, &FetchParams)`: it deserializes the
//! provider's documented JSON shape into private serde structs, then builds
//! canonical records through the validated constructors. Rows that fail
//! validation are skipped; a body that does not match the shape at all is a
//! [`TransformError`].

pub mod binance;
pub mod coincap;
pub mod coingecko;
pub mod coinpaprika;
pub mod cryptocompare;
pub mod kucoin;
pub mod rss;
pub mod synthetic;

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use crate::fetch_error::TransformError;
use crate::registry::{Endpoint, SourceDescriptor, SourceKind, SourceRegistry};
use crate::{HistoryPoint, NewsItem, NormalizedAsset, ValidationError};

/// Name of the market-lane synthetic source.
pub const SYNTHETIC_MARKET_SOURCE: &str = "Hydra Synthetic Protocol";
/// Name of the history-lane random-walk source.
pub const SYNTHETIC_HISTORY_SOURCE: &str = "Random Walk";

/// Market providers in failover order, ending with the synthetic generator.
pub fn market_registry() -> Result<SourceRegistry<NormalizedAsset>, ValidationError> {
    let mut descriptors = vec![
        SourceDescriptor::remote(
            "CoinGecko",
            SourceKind::Primary,
            Endpoint::Builder(coingecko::markets_url),
            coingecko::transform_markets,
        ),
        SourceDescriptor::remote(
            "CoinCap",
            SourceKind::Primary,
            Endpoint::Builder(coincap::assets_url),
            coincap::transform_assets,
        ),
        SourceDescriptor::remote(
            "CoinPaprika",
            SourceKind::Secondary,
            Endpoint::Builder(coinpaprika::tickers_url),
            coinpaprika::transform_tickers,
        ),
        SourceDescriptor::remote(
            "CryptoCompare",
            SourceKind::Secondary,
            Endpoint::Builder(cryptocompare::top_markets_url),
            cryptocompare::transform_top_markets,
        ),
        SourceDescriptor::remote(
            "Binance",
            SourceKind::Secondary,
            Endpoint::Fixed(String::from(binance::TICKER_URL)),
            binance::transform_tickers,
        ),
        SourceDescriptor::remote(
            "KuCoin",
            SourceKind::Secondary,
            Endpoint::Fixed(String::from(kucoin::ALL_TICKERS_URL)),
            kucoin::transform_all_tickers,
        ),
    ];

    // Listed exchanges without a maintained transform.
    for (name, url) in [
        ("Gate.io", "https://data.gateapi.io/api2/1/marketlist"),
        ("Bybit", "https://api.bybit.com/v5/market/tickers?category=spot"),
        ("Kraken", "https://api.kraken.com/0/public/Ticker"),
        ("Huobi", "https://api.huobi.pro/market/tickers"),
        (
            "Bitfinex",
            "https://api-pub.bitfinex.com/v2/tickers?symbols=tBTCUSD,tETHUSD",
        ),
        ("MEXC", "https://api.mexc.com/api/v3/ticker/24hr"),
        ("OKX", "https://www.okx.com/api/v5/market/tickers?instType=SPOT"),
    ] {
        descriptors.push(SourceDescriptor::disabled(
            name,
            Endpoint::Fixed(String::from(url)),
        ));
    }

    descriptors.push(SourceDescriptor::synthetic(
        SYNTHETIC_MARKET_SOURCE,
        synthetic::generate_market,
    ));

    SourceRegistry::new(descriptors)
}

/// Chart providers, ending with the random-walk generator.
pub fn history_registry() -> Result<SourceRegistry<HistoryPoint>, ValidationError> {
    SourceRegistry::new(vec![
        SourceDescriptor::remote(
            "CoinGecko",
            SourceKind::Primary,
            Endpoint::Builder(coingecko::market_chart_url),
            coingecko::transform_market_chart,
        ),
        SourceDescriptor::remote(
            "CoinCap",
            SourceKind::Secondary,
            Endpoint::Builder(coincap::history_url),
            coincap::transform_history,
        ),
        SourceDescriptor::remote(
            "Binance",
            SourceKind::Secondary,
            Endpoint::Builder(binance::klines_url),
            binance::transform_klines,
        ),
        SourceDescriptor::synthetic(SYNTHETIC_HISTORY_SOURCE, synthetic::generate_history),
    ])
}

/// Headline feeds. There is no synthetic news source; a failed round yields
/// an empty list.
pub fn news_registry() -> Result<SourceRegistry<NewsItem>, ValidationError> {
    let mut descriptors = vec![SourceDescriptor::remote(
        "CryptoCompare News",
        SourceKind::Primary,
        Endpoint::Fixed(String::from(cryptocompare::NEWS_URL)),
        cryptocompare::transform_news,
    )];

    for feed in rss::FEEDS {
        descriptors.push(SourceDescriptor::remote(
            rss::feed_name(feed),
            SourceKind::Secondary,
            Endpoint::Fixed(rss::bridge_url(feed)),
            rss::transform_feed,
        ));
    }

    SourceRegistry::new(descriptors)
}

/// Keeps valid rows in order, stopping at `limit` when it is non-zero.
pub(crate) fn collect_valid<R, T>(
    rows: impl IntoIterator<Item = R>,
    limit: usize,
    mut build: impl FnMut(R) -> Result<T, ValidationError>,
) -> Vec<T> {
    let rows = rows.into_iter().filter_map(|row| build(row).ok());
    if limit == 0 {
        rows.collect()
    } else {
        rows.take(limit).collect()
    }
}

pub(crate) fn parse_json<T: de::DeserializeOwned>(body: &str) -> Result<T, TransformError> {
    serde_json::from_str(body).map_err(TransformError::from)
}

/// Accepts JSON numbers, numeric strings, empty strings and null.
pub(crate) fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => {
            if s.trim().is_empty() {
                Ok(None)
            } else {
                s.trim().parse::<f64>().map(Some).map_err(|_| {
                    de::Error::custom(format!("could not parse f64 from string: {s}"))
                })
            }
        }
        Some(other) => Err(de::Error::custom(format!(
            "expected number or string, got: {other}"
        ))),
    }
}
