use serde::Deserialize;

use super::{collect_valid, de_opt_f64, parse_json};
use crate::fetch_error::TransformError;
use crate::registry::FetchParams;
use crate::{NormalizedAsset, Symbol};

pub fn tickers_url(params: &FetchParams) -> Option<String> {
    Some(format!(
        "https://api.coinpaprika.com/v1/tickers?limit={}",
        params.limit.max(1)
    ))
}

pub fn transform_tickers(
    body: &str,
    params: &FetchParams,
) -> Result<Vec<NormalizedAsset>, TransformError> {
    let rows: Vec<PaprikaTicker> = parse_json(body)?;
    Ok(collect_valid(rows, params.limit, |row| {
        let usd = row.quotes.usd.unwrap_or_default();
        NormalizedAsset::new(
            row.id,
            Symbol::parse(&row.symbol)?,
            row.name.unwrap_or_default(),
            usd.price.unwrap_or(f64::NAN),
            usd.percent_change_24h,
            usd.volume_24h,
            usd.market_cap,
            Vec::new(),
            "CoinPaprika",
        )
    }))
}

#[derive(Debug, Deserialize)]
struct PaprikaTicker {
    id: String,
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    quotes: PaprikaQuotes,
}

#[derive(Debug, Default, Deserialize)]
struct PaprikaQuotes {
    #[serde(rename = "USD", default)]
    usd: Option<PaprikaUsd>,
}

#[derive(Debug, Default, Deserialize)]
struct PaprikaUsd {
    #[serde(default, deserialize_with = "de_opt_f64")]
    price: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    percent_change_24h: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    volume_24h: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    market_cap: Option<f64>,
}
