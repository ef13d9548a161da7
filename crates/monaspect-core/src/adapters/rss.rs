use serde::Deserialize;
use time::format_description::BorrowedFormatItem;
use time::PrimitiveDateTime;

use super::{collect_valid, parse_json};
use crate::fetch_error::TransformError;
use crate::registry::FetchParams;
use crate::{NewsItem, UtcDateTime};

/// JSON bridge that converts an RSS feed URL into a JSON item list.
pub const RSS_BRIDGE: &str = "https://api.rss2json.com/v1/api.json?rss_url=";

pub const FEEDS: [&str; 18] = [
    "https://cointelegraph.com/rss",
    "https://www.coindesk.com/arc/outboundfeeds/rss/",
    "https://decrypt.co/feed",
    "https://cryptopotato.com/feed/",
    "https://news.bitcoin.com/feed/",
    "https://theblockcrypto.com/rss",
    "https://cryptoslate.com/feed/",
    "https://beincrypto.com/feed/",
    "https://dailyhodl.com/feed/",
    "https://cryptobriefing.com/feed/",
    "https://u.today/rss",
    "https://crypto.news/feed/",
    "https://blockworks.co/feed",
    "https://protos.com/feed/",
    "https://ambcrypto.com/feed/",
    "https://zycrypto.com/feed/",
    "https://coinspeaker.com/feed/",
    "https://nulltx.com/feed/",
];

/// Host of a feed URL without scheme or `www.`, used as the source name.
pub fn feed_name(feed: &'static str) -> &'static str {
    let without_scheme = feed
        .strip_prefix("https://")
        .or_else(|| feed.strip_prefix("http://"))
        .unwrap_or(feed);
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);
    host.strip_prefix("www.").unwrap_or(host)
}

pub fn bridge_url(feed: &str) -> String {
    format!("{RSS_BRIDGE}{}", urlencoding::encode(feed))
}

pub fn transform_feed(body: &str, _params: &FetchParams) -> Result<Vec<NewsItem>, TransformError> {
    let payload: BridgeResponse = parse_json(body)?;
    if payload.status != "ok" {
        return Err(TransformError::new(format!(
            "rss bridge reported '{}': {}",
            payload.status,
            payload.message.unwrap_or_default()
        )));
    }

    let format = pub_date_format()?;
    Ok(collect_valid(payload.items, 0, |item| {
        let published_at = item
            .pub_date
            .as_deref()
            .and_then(|raw| PrimitiveDateTime::parse(raw, &format).ok())
            .and_then(|parsed| UtcDateTime::from_offset_datetime(parsed.assume_utc()).ok())
            .unwrap_or_else(UtcDateTime::now);
        NewsItem::new(item.title, published_at, item.link.unwrap_or_default())
    }))
}

fn pub_date_format() -> Result<Vec<BorrowedFormatItem<'static>>, TransformError> {
    time::format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")
        .map_err(|e| TransformError::new(format!("invalid date format: {e}")))
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    items: Vec<BridgeItem>,
}

#[derive(Debug, Deserialize)]
struct BridgeItem {
    #[serde(default)]
    title: String,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
    #[serde(default)]
    link: Option<String>,
}
