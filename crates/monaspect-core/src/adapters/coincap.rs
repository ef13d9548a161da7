use serde::Deserialize;

use super::{collect_valid, de_opt_f64, parse_json};
use crate::fetch_error::TransformError;
use crate::registry::FetchParams;
use crate::{HistoryPoint, NormalizedAsset, Symbol, UtcDateTime};

const API_BASE: &str = "https://api.coincap.io/v2";

pub fn assets_url(params: &FetchParams) -> Option<String> {
    Some(format!("{API_BASE}/assets?limit={}", params.limit.max(1)))
}

pub fn history_url(params: &FetchParams) -> Option<String> {
    let id = params.asset_id.as_deref()?;
    Some(format!(
        "{API_BASE}/assets/{}/history?interval={}",
        urlencoding::encode(id),
        params.timeframe.coincap_interval()
    ))
}

pub fn transform_assets(
    body: &str,
    params: &FetchParams,
) -> Result<Vec<NormalizedAsset>, TransformError> {
    let payload: CoinCapEnvelope<CoinCapAsset> = parse_json(body)?;
    Ok(collect_valid(payload.data, params.limit, |row| {
        NormalizedAsset::new(
            row.id,
            Symbol::parse(&row.symbol)?,
            row.name.unwrap_or_default(),
            row.price_usd.unwrap_or(f64::NAN),
            row.change_percent_24h,
            row.volume_usd_24h,
            row.market_cap_usd,
            Vec::new(),
            "CoinCap",
        )
    }))
}

pub fn transform_history(
    body: &str,
    _params: &FetchParams,
) -> Result<Vec<HistoryPoint>, TransformError> {
    let payload: CoinCapEnvelope<CoinCapHistoryPoint> = parse_json(body)?;
    Ok(collect_valid(payload.data, 0, |row| {
        HistoryPoint::new(
            UtcDateTime::from_unix_millis(row.time)?,
            row.price_usd.unwrap_or(f64::NAN),
        )
    }))
}

#[derive(Debug, Deserialize)]
struct CoinCapEnvelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CoinCapAsset {
    id: String,
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "priceUsd", default, deserialize_with = "de_opt_f64")]
    price_usd: Option<f64>,
    #[serde(rename = "changePercent24Hr", default, deserialize_with = "de_opt_f64")]
    change_percent_24h: Option<f64>,
    #[serde(rename = "volumeUsd24Hr", default, deserialize_with = "de_opt_f64")]
    volume_usd_24h: Option<f64>,
    #[serde(rename = "marketCapUsd", default, deserialize_with = "de_opt_f64")]
    market_cap_usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoinCapHistoryPoint {
    #[serde(rename = "priceUsd", default, deserialize_with = "de_opt_f64")]
    price_usd: Option<f64>,
    time: i64,
}
