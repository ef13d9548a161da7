use serde::Deserialize;

use super::{collect_valid, de_opt_f64, parse_json};
use crate::fetch_error::TransformError;
use crate::registry::FetchParams;
use crate::{HistoryPoint, NormalizedAsset, Symbol, UtcDateTime};

const API_BASE: &str = "https://api.coingecko.com/api/v3";

pub fn markets_url(params: &FetchParams) -> Option<String> {
    Some(format!(
        "{API_BASE}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page={}&page=1&sparkline=true",
        params.limit.max(1)
    ))
}

pub fn market_chart_url(params: &FetchParams) -> Option<String> {
    let id = params.asset_id.as_deref()?;
    Some(format!(
        "{API_BASE}/coins/{}/market_chart?vs_currency=usd&days={}",
        urlencoding::encode(id),
        params.timeframe.coingecko_days()
    ))
}

pub fn transform_markets(
    body: &str,
    params: &FetchParams,
) -> Result<Vec<NormalizedAsset>, TransformError> {
    let rows: Vec<GeckoMarketRow> = parse_json(body)?;
    Ok(collect_valid(rows, params.limit, |row| {
        let price = row.current_price.unwrap_or(f64::NAN);
        let sparkline = row
            .sparkline_in_7d
            .map(|spark| spark.price.into_iter().flatten().collect())
            .unwrap_or_default();
        NormalizedAsset::new(
            row.id,
            Symbol::parse(&row.symbol)?,
            row.name.unwrap_or_default(),
            price,
            row.price_change_percentage_24h,
            row.total_volume,
            row.market_cap,
            sparkline,
            "CoinGecko",
        )
    }))
}

pub fn transform_market_chart(
    body: &str,
    _params: &FetchParams,
) -> Result<Vec<HistoryPoint>, TransformError> {
    let chart: GeckoMarketChart = parse_json(body)?;
    Ok(collect_valid(chart.prices, 0, |(ts, price)| {
        HistoryPoint::new(UtcDateTime::from_unix_millis(ts as i64)?, price)
    }))
}

#[derive(Debug, Deserialize)]
struct GeckoMarketRow {
    id: String,
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    current_price: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    price_change_percentage_24h: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    total_volume: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    market_cap: Option<f64>,
    #[serde(default)]
    sparkline_in_7d: Option<GeckoSparkline>,
}

#[derive(Debug, Deserialize)]
struct GeckoSparkline {
    #[serde(default)]
    price: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct GeckoMarketChart {
    prices: Vec<(f64, f64)>,
}
