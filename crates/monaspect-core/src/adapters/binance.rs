use serde::Deserialize;
use serde_json::Value;

use super::{collect_valid, de_opt_f64, parse_json};
use crate::fetch_error::TransformError;
use crate::registry::FetchParams;
use crate::{HistoryPoint, NormalizedAsset, Symbol, UtcDateTime, ValidationError};

pub const TICKER_URL: &str = "https://api.binance.com/api/v3/ticker/24hr";
const KLINE_LIMIT: usize = 100;

pub fn klines_url(params: &FetchParams) -> Option<String> {
    let symbol = params.symbol.as_ref()?;
    Some(format!(
        "https://api.binance.com/api/v3/klines?symbol={}USDT&interval={}&limit={KLINE_LIMIT}",
        symbol.as_str(),
        params.timeframe.binance_interval()
    ))
}

/// USDT pairs from the 24h ticker. Binance has no market cap, so quote
/// volume stands in for it.
pub fn transform_tickers(
    body: &str,
    params: &FetchParams,
) -> Result<Vec<NormalizedAsset>, TransformError> {
    let rows: Vec<BinanceTicker> = parse_json(body)?;
    let usdt_pairs = rows.into_iter().filter_map(|row| {
        let base = row.symbol.strip_suffix("USDT")?.to_owned();
        Some((base, row))
    });

    Ok(collect_valid(usdt_pairs, params.limit, |(base, row)| {
        NormalizedAsset::new(
            row.symbol.clone(),
            Symbol::parse(&base)?,
            base,
            row.last_price.unwrap_or(f64::NAN),
            row.price_change_percent,
            row.volume,
            row.quote_volume,
            Vec::new(),
            "Binance",
        )
    }))
}

/// Klines are positional arrays: `[open_time, open, high, low, close, ...]`.
pub fn transform_klines(
    body: &str,
    _params: &FetchParams,
) -> Result<Vec<HistoryPoint>, TransformError> {
    let rows: Vec<Vec<Value>> = parse_json(body)?;
    Ok(collect_valid(rows, 0, |row| {
        let open_time = row
            .first()
            .and_then(Value::as_i64)
            .ok_or(ValidationError::NonFiniteValue { field: "open_time" })?;
        let close = row.get(4).and_then(value_as_f64).unwrap_or(f64::NAN);
        HistoryPoint::new(UtcDateTime::from_unix_millis(open_time)?, close)
    }))
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct BinanceTicker {
    symbol: String,
    #[serde(rename = "lastPrice", default, deserialize_with = "de_opt_f64")]
    last_price: Option<f64>,
    #[serde(rename = "priceChangePercent", default, deserialize_with = "de_opt_f64")]
    price_change_percent: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    volume: Option<f64>,
    #[serde(rename = "quoteVolume", default, deserialize_with = "de_opt_f64")]
    quote_volume: Option<f64>,
}
