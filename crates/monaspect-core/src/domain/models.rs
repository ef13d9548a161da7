use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// Record produced by a source transform.
///
/// The gateway only accepts a batch whose first record is viable, which
/// keeps zero-priced or empty placeholder payloads out of the cache.
pub trait Record: Clone + Send + Sync + 'static {
    fn is_viable(&self) -> bool;

    /// Order of records merged from several sources in one round. The
    /// default keeps arrival order.
    fn merge_order(_a: &Self, _b: &Self) -> Ordering {
        Ordering::Equal
    }
}

/// Canonical market row shared by every market source.
///
/// Deserialization goes through [`NormalizedAsset::new`], so a stored row is
/// validated exactly like a freshly transformed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AssetRow")]
pub struct NormalizedAsset {
    pub id: String,
    pub symbol: Symbol,
    pub name: String,
    pub price: f64,
    pub change_24h: Option<f64>,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub sparkline: Vec<f64>,
    pub source_name: String,
}

impl NormalizedAsset {
    /// Validates and builds an asset row.
    ///
    /// A non-finite `change_24h` is treated as unknown. Missing volume and
    /// market cap default to zero. Non-finite sparkline points are dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        symbol: Symbol,
        name: impl Into<String>,
        price: f64,
        change_24h: Option<f64>,
        volume_24h: Option<f64>,
        market_cap: Option<f64>,
        sparkline: Vec<f64>,
        source_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyAssetId);
        }
        validate_non_negative("price", price)?;

        let volume_24h = volume_24h.unwrap_or(0.0);
        validate_non_negative("volume_24h", volume_24h)?;
        let market_cap = market_cap.unwrap_or(0.0);
        validate_non_negative("market_cap", market_cap)?;

        let name = name.into();
        let name = if name.trim().is_empty() {
            symbol.as_str().to_owned()
        } else {
            name
        };

        Ok(Self {
            id,
            symbol,
            name,
            price,
            change_24h: change_24h.filter(|value| value.is_finite()),
            volume_24h,
            market_cap,
            sparkline: sparkline.into_iter().filter(|v| v.is_finite()).collect(),
            source_name: source_name.into(),
        })
    }
}

impl Record for NormalizedAsset {
    fn is_viable(&self) -> bool {
        self.price > 0.0
    }
}

#[derive(Deserialize)]
struct AssetRow {
    id: String,
    symbol: Symbol,
    #[serde(default)]
    name: String,
    price: f64,
    #[serde(default)]
    change_24h: Option<f64>,
    #[serde(default)]
    volume_24h: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    sparkline: Vec<f64>,
    #[serde(default)]
    source_name: String,
}

impl TryFrom<AssetRow> for NormalizedAsset {
    type Error = ValidationError;

    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        Self::new(
            row.id,
            row.symbol,
            row.name,
            row.price,
            row.change_24h,
            row.volume_24h,
            row.market_cap,
            row.sparkline,
            row.source_name,
        )
    }
}

/// One point on a price chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PointRow")]
pub struct HistoryPoint {
    pub ts: UtcDateTime,
    pub price: f64,
}

impl HistoryPoint {
    pub fn new(ts: UtcDateTime, price: f64) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        Ok(Self { ts, price })
    }
}

impl Record for HistoryPoint {
    fn is_viable(&self) -> bool {
        self.price > 0.0
    }
}

#[derive(Deserialize)]
struct PointRow {
    ts: UtcDateTime,
    price: f64,
}

impl TryFrom<PointRow> for HistoryPoint {
    type Error = ValidationError;

    fn try_from(row: PointRow) -> Result<Self, Self::Error> {
        Self::new(row.ts, row.price)
    }
}

/// Headline consumed by the sentiment scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HeadlineRow")]
pub struct NewsItem {
    pub title: String,
    pub published_at: UtcDateTime,
    pub source_url: String,
}

impl NewsItem {
    pub fn new(
        title: impl Into<String>,
        published_at: UtcDateTime,
        source_url: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        Ok(Self {
            title: trimmed.to_owned(),
            published_at,
            source_url: source_url.into(),
        })
    }
}

impl Record for NewsItem {
    fn is_viable(&self) -> bool {
        !self.title.is_empty()
    }

    /// Newest first.
    fn merge_order(a: &Self, b: &Self) -> Ordering {
        b.published_at.cmp(&a.published_at)
    }
}

#[derive(Deserialize)]
struct HeadlineRow {
    title: String,
    published_at: UtcDateTime,
    #[serde(default)]
    source_url: String,
}

impl TryFrom<HeadlineRow> for NewsItem {
    type Error = ValidationError;

    fn try_from(row: HeadlineRow) -> Result<Self, Self::Error> {
        Self::new(row.title, row.published_at, row.source_url)
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc() -> Symbol {
        Symbol::parse("BTC").expect("valid symbol")
    }

    #[test]
    fn rejects_non_finite_price() {
        let err = NormalizedAsset::new(
            "bitcoin",
            btc(),
            "Bitcoin",
            f64::NAN,
            None,
            None,
            None,
            Vec::new(),
            "CoinGecko",
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { field: "price" }));
    }

    #[test]
    fn defaults_missing_volume_and_cap_and_drops_bad_change() {
        let asset = NormalizedAsset::new(
            "bitcoin",
            btc(),
            "",
            65_000.0,
            Some(f64::INFINITY),
            None,
            None,
            vec![1.0, f64::NAN, 2.0],
            "CoinGecko",
        )
        .expect("valid asset");

        assert_eq!(asset.name, "BTC");
        assert_eq!(asset.change_24h, None);
        assert_eq!(asset.volume_24h, 0.0);
        assert_eq!(asset.market_cap, 0.0);
        assert_eq!(asset.sparkline, vec![1.0, 2.0]);
        assert!(asset.is_viable());
    }

    #[test]
    fn zero_price_asset_is_not_viable() {
        let asset = NormalizedAsset::new(
            "dust",
            btc(),
            "Dust",
            0.0,
            None,
            None,
            None,
            Vec::new(),
            "test",
        )
        .expect("zero is a valid price");
        assert!(!asset.is_viable());
    }

    #[test]
    fn deserialization_runs_the_same_validation() {
        let negative = r#"{"id":"bitcoin","symbol":"btc","name":"Bitcoin","price":-1.0}"#;
        assert!(serde_json::from_str::<NormalizedAsset>(negative).is_err());

        let valid = r#"{"id":"bitcoin","symbol":"btc","name":"","price":65000.0,"change_24h":null}"#;
        let asset: NormalizedAsset = serde_json::from_str(valid).expect("valid row");
        assert_eq!(asset.symbol.as_str(), "BTC");
        assert_eq!(asset.name, "BTC");

        let point = r#"{"ts":"2024-01-01T00:00:00Z","price":-3.5}"#;
        assert!(serde_json::from_str::<HistoryPoint>(point).is_err());

        let headline = r#"{"title":"   ","published_at":"2024-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<NewsItem>(headline).is_err());
    }

    #[test]
    fn headlines_merge_newest_first() {
        let older = NewsItem::new(
            "Older",
            UtcDateTime::parse("2024-01-01T00:00:00Z").expect("timestamp"),
            "",
        )
        .expect("valid");
        let newer = NewsItem::new(
            "Newer",
            UtcDateTime::parse("2024-01-02T00:00:00Z").expect("timestamp"),
            "",
        )
        .expect("valid");

        let mut merged = vec![older.clone(), newer.clone()];
        merged.sort_by(NewsItem::merge_order);
        assert_eq!(merged, vec![newer, older]);
    }

    #[test]
    fn news_title_is_trimmed_and_required() {
        let ts = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("timestamp");
        let item = NewsItem::new("  ETF approved  ", ts, "https://example.test").expect("valid");
        assert_eq!(item.title, "ETF approved");
        assert!(matches!(
            NewsItem::new("   ", ts, ""),
            Err(ValidationError::EmptyTitle)
        ));
    }
}
