use serde::Deserialize;

use super::{collect_valid, de_opt_f64, parse_json};
use crate::fetch_error::TransformError;
use crate::registry::FetchParams;
use crate::{NewsItem, NormalizedAsset, Symbol, UtcDateTime};

pub const NEWS_URL: &str = "https://min-api.cryptocompare.com/data/v2/news/?lang=EN";

pub fn top_markets_url(params: &FetchParams) -> Option<String> {
    Some(format!(
        "https://min-api.cryptocompare.com/data/top/mktcapfull?limit={}&tsym=USD",
        params.limit.max(1)
    ))
}

pub fn transform_top_markets(
    body: &str,
    params: &FetchParams,
) -> Result<Vec<NormalizedAsset>, TransformError> {
    let payload: CompareEnvelope<CompareTopRow> = parse_json(body)?;
    Ok(collect_valid(payload.data, params.limit, |row| {
        let usd = row.raw.and_then(|raw| raw.usd).unwrap_or_default();
        NormalizedAsset::new(
            row.coin_info.name.to_ascii_lowercase(),
            Symbol::parse(&row.coin_info.name)?,
            row.coin_info.full_name.unwrap_or_default(),
            usd.price.unwrap_or(f64::NAN),
            usd.change_pct_24h,
            usd.volume_24h,
            usd.market_cap,
            Vec::new(),
            "CryptoCompare",
        )
    }))
}

pub fn transform_news(body: &str, _params: &FetchParams) -> Result<Vec<NewsItem>, TransformError> {
    let payload: CompareEnvelope<CompareArticle> = parse_json(body)?;
    Ok(collect_valid(payload.data, 0, |article| {
        let published_at = match article.published_on {
            Some(seconds) => UtcDateTime::from_unix_seconds(seconds)?,
            None => UtcDateTime::now(),
        };
        NewsItem::new(article.title, published_at, article.url.unwrap_or_default())
    }))
}

#[derive(Debug, Deserialize)]
struct CompareEnvelope<T> {
    #[serde(rename = "Data")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CompareTopRow {
    #[serde(rename = "CoinInfo")]
    coin_info: CompareCoinInfo,
    #[serde(rename = "RAW", default)]
    raw: Option<CompareRaw>,
}

#[derive(Debug, Deserialize)]
struct CompareCoinInfo {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "FullName", default)]
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompareRaw {
    #[serde(rename = "USD", default)]
    usd: Option<CompareUsd>,
}

#[derive(Debug, Default, Deserialize)]
struct CompareUsd {
    #[serde(rename = "PRICE", default, deserialize_with = "de_opt_f64")]
    price: Option<f64>,
    #[serde(rename = "CHANGEPCT24HOUR", default, deserialize_with = "de_opt_f64")]
    change_pct_24h: Option<f64>,
    #[serde(rename = "VOLUME24HOUR", default, deserialize_with = "de_opt_f64")]
    volume_24h: Option<f64>,
    #[serde(rename = "MKTCAP", default, deserialize_with = "de_opt_f64")]
    market_cap: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CompareArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_on: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_top_markets() {
        let body = r#"{"Data":[
            {"CoinInfo":{"Name":"BTC","FullName":"Bitcoin"},
             "RAW":{"USD":{"PRICE":65000,"CHANGEPCT24HOUR":-3.2,"MKTCAP":1.2e12,"VOLUME24HOUR":5.0e4}}},
            {"CoinInfo":{"Name":"NEW","FullName":"No Raw Yet"}}
        ]}"#;

        let assets = transform_top_markets(body, &FetchParams::market(20)).expect("must parse");

        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].id, "btc");
        assert_eq!(assets[0].name, "Bitcoin");
        assert_eq!(assets[0].change_24h, Some(-3.2));
    }

    #[test]
    fn transforms_news_and_skips_blank_titles() {
        let body = r#"{"Data":[
            {"title":"ETF approval sparks rally","url":"https://example.test/a","published_on":1704067200},
            {"title":"   ","url":"https://example.test/b","published_on":1704067200}
        ]}"#;

        let items = transform_news(body, &FetchParams::news()).expect("must parse");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].published_at.format_rfc3339(), "2024-01-01T00:00:00Z");
    }
}
