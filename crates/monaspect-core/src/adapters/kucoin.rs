use serde::Deserialize;

use super::{collect_valid, de_opt_f64, parse_json};
use crate::fetch_error::TransformError;
use crate::registry::FetchParams;
use crate::{NormalizedAsset, Symbol};

pub const ALL_TICKERS_URL: &str = "https://api.kucoin.com/api/v1/market/allTickers";

/// `-USDT` pairs. KuCoin reports `changeRate` as a fraction.
pub fn transform_all_tickers(
    body: &str,
    params: &FetchParams,
) -> Result<Vec<NormalizedAsset>, TransformError> {
    let payload: KuCoinEnvelope = parse_json(body)?;
    let pairs = payload.data.ticker.into_iter().filter_map(|row| {
        let base = row.symbol.strip_suffix("-USDT")?.to_owned();
        Some((base, row))
    });

    Ok(collect_valid(pairs, params.limit, |(base, row)| {
        NormalizedAsset::new(
            row.symbol.clone(),
            Symbol::parse(&base)?,
            base,
            row.last.unwrap_or(f64::NAN),
            row.change_rate.map(|rate| rate * 100.0),
            row.vol,
            None,
            Vec::new(),
            "KuCoin",
        )
    }))
}

#[derive(Debug, Deserialize)]
struct KuCoinEnvelope {
    data: KuCoinData,
}

#[derive(Debug, Deserialize)]
struct KuCoinData {
    ticker: Vec<KuCoinTicker>,
}

#[derive(Debug, Deserialize)]
struct KuCoinTicker {
    symbol: String,
    #[serde(default, deserialize_with = "de_opt_f64")]
    last: Option<f64>,
    #[serde(rename = "changeRate", default, deserialize_with = "de_opt_f64")]
    change_rate: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    vol: Option<f64>,
}
