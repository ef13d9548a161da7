//! # Monaspect Core
//!
//! Multi-source crypto market acquisition and scoring.
//!
//! ## Overview
//!
//! - **Source registries** listing market, chart and headline providers in
//!   failover order, each with a pure transform into canonical records
//! - **Fetch gateway** running one bounded attempt against one source
//! - **Failover coordinator** with sequential rotation, parallel race,
//!   stale-cache and synthetic fallbacks, and single-flight refreshes
//! - **Scoring engine** turning a market snapshot and headlines into
//!   best / avoid / trump picks for a short or long horizon
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider transforms and the default registries |
//! | [`cache`] | Per-key batch cache with an injectable clock |
//! | [`config`] | [`FetchSettings`] and its environment overrides |
//! | [`domain`] | Canonical records (asset, history point, headline) |
//! | [`error`] | Construction and settings validation errors |
//! | [`failover`] | [`FailoverCoordinator`] and its builder |
//! | [`fetch_error`] | Typed per-attempt and per-round failures |
//! | [`gateway`] | [`FetchGateway`] |
//! | [`http_client`] | HTTP transport abstraction (reqwest / offline) |
//! | [`registry`] | Source descriptors and registries |
//! | [`scheduler`] | Periodic background market refresh |
//! | [`scoring`] | Sentiment, scores, ranking and outlook |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use monaspect_core::{analyze, FailoverCoordinator, FetchSettings, Horizon};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = FailoverCoordinator::builder()
//!         .with_settings(FetchSettings::from_env()?)
//!         .build()?;
//!
//!     let market = coordinator.fetch_market().await?;
//!     let news = coordinator.fetch_news().await;
//!     let result = analyze(&market.data, &news.data, Horizon::Short);
//!
//!     for pick in &result.best {
//!         println!("{} {:.3}", pick.asset.symbol, pick.score.favorability);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ FailoverCoordinator  │────▶│ FetchCache       │
//! └──────────┬───────────┘     └──────────────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ FetchGateway         │────▶│ HTTP Client      │
//! │ (deadline, validate) │     │ (reqwest/offline)│
//! └──────────┬───────────┘     └──────────────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ SourceDescriptor     │
//! │ (endpoint, transform)│
//! └──────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Source failures are absorbed by the coordinator. A caller only sees
//! [`FetchError::AllSourcesExhausted`] when no source answered, no stale
//! entry exists and the lane has no synthetic source:
//!
//! ```rust
//! use monaspect_core::FetchError;
//!
//! fn describe(error: &FetchError) -> String {
//!     match error {
//!         FetchError::AllSourcesExhausted { failures, .. } => failures
//!             .iter()
//!             .map(|f| format!("{}: {}", f.source, f.code))
//!             .collect::<Vec<_>>()
//!             .join(", "),
//!         other => other.to_string(),
//!     }
//! }
//! ```

pub mod adapters;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod failover;
pub mod fetch_error;
pub mod gateway;
pub mod http_client;
pub mod registry;
pub mod scheduler;
pub mod scoring;

// Caching
pub use cache::{CachedBatch, Clock, FetchCache, ManualClock, SystemClock};

// Configuration
pub use config::{FetchSettings, DEFAULT_RACE_WIDTH};

// Domain models
pub use domain::{HistoryPoint, NewsItem, NormalizedAsset, Record, Symbol, Timeframe, UtcDateTime};

// Error types
pub use error::ValidationError;
pub use fetch_error::{FetchError, SourceFailure, TransformError};

// Failover
pub use failover::{CoordinatorBuilder, FailoverCoordinator, FetchStrategy, Freshness, Refreshed};
pub use gateway::{FetchGateway, MIN_MARKET_RECORDS, MIN_SERIES_RECORDS};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, OfflineHttpClient, ReqwestHttpClient,
};

// Registries
pub use registry::{Endpoint, FetchParams, SourceDescriptor, SourceKind, SourceRegistry};

// Scheduling
pub use scheduler::{spawn_market_refresh, RefreshHandle, RefreshReport};

// Scoring
pub use scoring::{analyze, outlook, AnalysisResult, AssetScore, Horizon, Outlook, ScoredAsset};
