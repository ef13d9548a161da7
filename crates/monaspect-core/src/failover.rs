//! Source selection, failover and single-flight refresh.
//!
//! The coordinator owns one *lane* per record type (market, history, news).
//! A lane bundles a registry, a rotating cursor, a cache and the table of
//! in-flight refreshes:
//!
//! ```text
//!  refresh(key) ──► fresh cache hit? ──yes──► Cached
//!                        │ no
//!                        ▼
//!             single-flight cell for key ──(waiters share the outcome)
//!                        │
//!                        ▼
//!          Sequential rotation | Race | Fan-out
//!                        │
//!        success ──► store in cache ──► Live
//!        failure ──► stale entry? ──► Stale
//!                        │ no
//!                        ▼
//!                 synthetic source? ──► Synthetic (never cached)
//!                        │ no
//!                        ▼
//!                AllSourcesExhausted
//! ```

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::adapters;
use crate::cache::{CachedBatch, Clock, FetchCache, SystemClock};
use crate::config::{FetchSettings, DEFAULT_RACE_WIDTH};
use crate::fetch_error::{FetchError, SourceFailure};
use crate::gateway::{duration_ms, FetchGateway, MIN_MARKET_RECORDS, MIN_SERIES_RECORDS};
use crate::http_client::{HttpClient, OfflineHttpClient, ReqwestHttpClient};
use crate::registry::{FetchParams, SourceDescriptor, SourceRegistry};
use crate::{
    HistoryPoint, NewsItem, NormalizedAsset, Record, Symbol, Timeframe, ValidationError,
};

/// How real sources are tried during one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// One source at a time, starting at the lane's rotating cursor.
    Sequential,
    /// The first `width` enabled sources at once; first success wins.
    Race { width: usize },
}

impl FetchStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Race { .. } => "race",
        }
    }
}

impl Display for FetchStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Race { width } => write!(f, "race({width})"),
        }
    }
}

impl FromStr for FetchStrategy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" | "rotate" => Ok(Self::Sequential),
            "race" | "parallel" => Ok(Self::Race {
                width: DEFAULT_RACE_WIDTH,
            }),
            _ => Err(ValidationError::InvalidStrategy {
                value: value.to_owned(),
            }),
        }
    }
}

/// Where a refreshed batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Fetched from a real source during this call.
    Live,
    /// Served from a cache entry younger than its TTL.
    Cached,
    /// Served from an expired cache entry after every source failed.
    Stale,
    /// Produced by the synthetic generator.
    Synthetic,
    /// Nothing available; only used by headline rounds.
    Unavailable,
}

impl Freshness {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Cached => "cached",
            Self::Stale => "stale",
            Self::Synthetic => "synthetic",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Outcome of a refresh together with routing metadata.
#[derive(Debug, Clone)]
pub struct Refreshed<T> {
    pub data: Arc<[T]>,
    pub source: String,
    pub freshness: Freshness,
    pub source_chain: Vec<String>,
    pub failures: Vec<SourceFailure>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

impl<T> Refreshed<T> {
    fn from_cache(hit: CachedBatch<T>, freshness: Freshness, started: Instant) -> Self {
        Self {
            data: hit.payload,
            source_chain: vec![hit.source.clone()],
            source: hit.source,
            freshness,
            failures: Vec::new(),
            warnings: Vec::new(),
            latency_ms: elapsed_ms(started),
        }
    }
}

type Outcome<T> = Result<Refreshed<T>, FetchError>;

#[derive(Debug, Clone, Copy)]
enum Plan {
    Sequential,
    Race { width: usize },
    FanOut { sample: usize },
}

impl From<FetchStrategy> for Plan {
    fn from(value: FetchStrategy) -> Self {
        match value {
            FetchStrategy::Sequential => Self::Sequential,
            FetchStrategy::Race { width } => Self::Race { width },
        }
    }
}

struct RoundWinner<T> {
    data: Vec<T>,
    source: String,
}

struct Round<T> {
    winner: Option<RoundWinner<T>>,
    source_chain: Vec<String>,
    failures: Vec<SourceFailure>,
}

impl<T> Round<T> {
    fn new() -> Self {
        Self {
            winner: None,
            source_chain: Vec::new(),
            failures: Vec::new(),
        }
    }
}

struct Lane<T> {
    registry: SourceRegistry<T>,
    cursor: AtomicUsize,
    cache: FetchCache<T>,
    inflight: Mutex<HashMap<String, Arc<OnceCell<Outcome<T>>>>>,
    min_records: usize,
}

impl<T: Record> Lane<T> {
    fn new(registry: SourceRegistry<T>, clock: Arc<dyn Clock>, min_records: usize) -> Self {
        Self {
            registry,
            cursor: AtomicUsize::new(0),
            cache: FetchCache::new(clock),
            inflight: Mutex::new(HashMap::new()),
            min_records,
        }
    }

    fn enabled_real_sources(&self) -> Vec<Arc<SourceDescriptor<T>>> {
        self.registry
            .real_sources()
            .into_iter()
            .filter(|descriptor| descriptor.is_enabled())
            .collect()
    }

    fn flight(&self, key: &str) -> Arc<OnceCell<Outcome<T>>> {
        let mut inflight = self.inflight.lock().expect("in-flight table lock poisoned");
        Arc::clone(inflight.entry(key.to_owned()).or_default())
    }

    fn land(&self, key: &str, cell: &Arc<OnceCell<Outcome<T>>>) {
        let mut inflight = self.inflight.lock().expect("in-flight table lock poisoned");
        if inflight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, cell))
        {
            inflight.remove(key);
        }
    }
}

/// Orchestrates gateway calls across the market, history and news lanes.
pub struct FailoverCoordinator {
    gateway: FetchGateway,
    settings: FetchSettings,
    market: Lane<NormalizedAsset>,
    history: Lane<HistoryPoint>,
    news: Lane<NewsItem>,
}

impl FailoverCoordinator {
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    pub fn market_sources(&self) -> &SourceRegistry<NormalizedAsset> {
        &self.market.registry
    }

    pub fn history_sources(&self) -> &SourceRegistry<HistoryPoint> {
        &self.history.registry
    }

    pub fn news_sources(&self) -> &SourceRegistry<NewsItem> {
        &self.news.registry
    }

    /// Index into the enabled market sources where the next sequential
    /// round starts.
    pub fn market_cursor(&self) -> usize {
        self.market.cursor.load(Ordering::Acquire)
    }

    /// Market list for `cache_key`, honouring the cache and failover rules.
    pub async fn refresh(
        &self,
        cache_key: &str,
        strategy: FetchStrategy,
        ttl: Duration,
    ) -> Result<Refreshed<NormalizedAsset>, FetchError> {
        let params = FetchParams::market(self.settings.market_limit);
        self.refresh_lane(&self.market, cache_key, params, strategy.into(), ttl)
            .await
    }

    /// Market list using the configured key, strategy and TTL.
    pub async fn fetch_market(&self) -> Result<Refreshed<NormalizedAsset>, FetchError> {
        self.refresh(
            &self.settings.market_key(),
            self.settings.strategy,
            self.settings.market_ttl,
        )
        .await
    }

    /// Latest market batch for `cache_key`, fresh or stale, without fetching.
    pub async fn cached_market(&self, cache_key: &str) -> Option<Arc<[NormalizedAsset]>> {
        self.market
            .cache
            .lookup(cache_key)
            .await
            .map(|batch| batch.payload)
    }

    /// Price history for a ticker. Falls back to a random walk, so this only
    /// fails if the history registry has no synthetic source.
    pub async fn fetch_history(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
    ) -> Result<Refreshed<HistoryPoint>, FetchError> {
        let key = format!("history:{}:{}", symbol.as_str(), timeframe.as_str());
        let (asset_id, base_price) = self.history_hint(symbol).await;
        let params = FetchParams::history(symbol.clone(), asset_id, timeframe, base_price);
        self.refresh_lane(
            &self.history,
            &key,
            params,
            self.settings.strategy.into(),
            self.settings.history_ttl,
        )
        .await
    }

    /// Headlines from a random sample of feeds, newest first. Failed feeds
    /// are skipped; a round where every feed fails yields an empty, uncached
    /// list.
    pub async fn fetch_news(&self) -> Refreshed<NewsItem> {
        let started = Instant::now();
        let plan = Plan::FanOut {
            sample: self.settings.news_fanout,
        };
        match self
            .refresh_lane(
                &self.news,
                "news",
                FetchParams::news(),
                plan,
                self.settings.news_ttl,
            )
            .await
        {
            Ok(refreshed) => refreshed,
            Err(error) => {
                let failures = match error {
                    FetchError::AllSourcesExhausted { failures, .. } => failures,
                    other => vec![SourceFailure::new("news", &other)],
                };
                Refreshed {
                    data: Arc::from(Vec::new()),
                    source: String::new(),
                    freshness: Freshness::Unavailable,
                    source_chain: failures.iter().map(|f| f.source.clone()).collect(),
                    failures,
                    warnings: vec![String::from("no headline feed answered")],
                    latency_ms: elapsed_ms(started),
                }
            }
        }
    }

    async fn history_hint(&self, symbol: &Symbol) -> (Option<String>, Option<f64>) {
        let Some(batch) = self.cached_market(&self.settings.market_key()).await else {
            return (None, None);
        };
        let Some(asset) = batch.iter().find(|asset| &asset.symbol == symbol) else {
            return (None, None);
        };

        let id = match asset.source_name.as_str() {
            "CoinGecko" | "CoinCap" | adapters::SYNTHETIC_MARKET_SOURCE => asset.id.clone(),
            _ => asset.name.to_ascii_lowercase().replace(' ', "-"),
        };
        (Some(id), Some(asset.price))
    }

    async fn refresh_lane<T: Record>(
        &self,
        lane: &Lane<T>,
        key: &str,
        params: FetchParams,
        plan: Plan,
        ttl: Duration,
    ) -> Outcome<T> {
        let started = Instant::now();
        if let Some(hit) = lane.cache.fresh(key).await {
            debug!(key, source = %hit.source, "cache hit");
            return Ok(Refreshed::from_cache(hit, Freshness::Cached, started));
        }

        let cell = lane.flight(key);
        let outcome = cell
            .get_or_init(|| self.run_round(lane, key, params, plan, ttl, started))
            .await
            .clone();
        lane.land(key, &cell);
        outcome
    }

    async fn run_round<T: Record>(
        &self,
        lane: &Lane<T>,
        key: &str,
        params: FetchParams,
        plan: Plan,
        ttl: Duration,
        started: Instant,
    ) -> Outcome<T> {
        // A refresh that completed while this caller waited for the cell.
        if let Some(hit) = lane.cache.fresh(key).await {
            return Ok(Refreshed::from_cache(hit, Freshness::Cached, started));
        }

        let round = match plan {
            Plan::Sequential => self.sequential(lane, &params).await,
            Plan::Race { width } => self.race(lane, &params, width).await,
            Plan::FanOut { sample } => self.fan_out(lane, &params, sample).await,
        };
        let Round {
            winner,
            mut source_chain,
            mut failures,
        } = round;

        if let Some(winner) = winner {
            let data: Arc<[T]> = winner.data.into();
            lane.cache
                .store(key, Arc::clone(&data), winner.source.clone(), ttl)
                .await;

            let mut warnings = Vec::new();
            if !failures.is_empty() {
                warnings.push(format!(
                    "source fallback succeeded with '{}' after {} failed attempt(s)",
                    winner.source,
                    failures.len()
                ));
            }
            info!(key, source = %winner.source, records = data.len(), "refresh succeeded");
            return Ok(Refreshed {
                data,
                source: winner.source,
                freshness: Freshness::Live,
                source_chain,
                failures,
                warnings,
                latency_ms: elapsed_ms(started),
            });
        }

        if let Some(stale) = lane.cache.lookup(key).await {
            warn!(key, source = %stale.source, age_secs = stale.age.as_secs(), "serving stale entry");
            let mut refreshed = Refreshed::from_cache(stale, Freshness::Stale, started);
            refreshed.warnings.push(format!(
                "all sources failed; serving stale data from '{}'",
                refreshed.source
            ));
            refreshed.source_chain = source_chain;
            refreshed.failures = failures;
            return Ok(refreshed);
        }

        if let Some(synthetic) = lane.registry.synthetic() {
            source_chain.push(synthetic.name().to_owned());
            match self
                .gateway
                .fetch_one(&synthetic, &params, self.settings.deadline, lane.min_records)
                .await
            {
                Ok(data) => {
                    warn!(key, source = synthetic.name(), "real sources exhausted; using synthetic data");
                    return Ok(Refreshed {
                        data: data.into(),
                        source: synthetic.name().to_owned(),
                        freshness: Freshness::Synthetic,
                        source_chain,
                        failures,
                        warnings: vec![String::from(
                            "all real sources failed; data is synthetic",
                        )],
                        latency_ms: elapsed_ms(started),
                    });
                }
                Err(error) => failures.push(SourceFailure::new(synthetic.name(), &error)),
            }
        }

        warn!(key, attempted = failures.len(), "all sources exhausted");
        Err(FetchError::exhausted(failures))
    }

    async fn sequential<T: Record>(&self, lane: &Lane<T>, params: &FetchParams) -> Round<T> {
        let sources = lane.enabled_real_sources();
        let mut round = Round::new();
        if sources.is_empty() {
            return round;
        }

        let start = lane.cursor.load(Ordering::Acquire) % sources.len();
        for offset in 0..sources.len() {
            let index = (start + offset) % sources.len();
            let descriptor = &sources[index];
            round.source_chain.push(descriptor.name().to_owned());

            match self
                .gateway
                .fetch_one(descriptor.as_ref(), params, self.settings.deadline, lane.min_records)
                .await
            {
                Ok(data) => {
                    lane.cursor.store(index, Ordering::Release);
                    round.winner = Some(RoundWinner {
                        data,
                        source: descriptor.name().to_owned(),
                    });
                    return round;
                }
                Err(error) => {
                    debug!(source = descriptor.name(), error = %error, "source failed; rotating");
                    round
                        .failures
                        .push(SourceFailure::new(descriptor.name(), &error));
                }
            }
        }

        round
    }

    async fn race<T: Record>(&self, lane: &Lane<T>, params: &FetchParams, width: usize) -> Round<T> {
        let mut candidates = lane.enabled_real_sources();
        candidates.truncate(width.max(1));
        let mut round = Round::new();
        let mut tasks = self.spawn_attempts(&candidates, params, lane.min_records);
        round.source_chain = candidates.iter().map(|d| d.name().to_owned()).collect();

        while let Some((name, result)) = next_attempt(&mut tasks).await {
            match result {
                Ok(data) => {
                    // Cancel the attempts still in flight.
                    tasks.abort_all();
                    round.winner = Some(RoundWinner { data, source: name });
                    return round;
                }
                Err(error) => round.failures.push(SourceFailure::new(name, &error)),
            }
        }

        round
    }

    async fn fan_out<T: Record>(&self, lane: &Lane<T>, params: &FetchParams, sample: usize) -> Round<T> {
        let mut candidates = lane.enabled_real_sources();
        fastrand::shuffle(&mut candidates);
        candidates.truncate(sample.max(1));
        let mut round = Round::new();
        let mut tasks = self.spawn_attempts(&candidates, params, MIN_SERIES_RECORDS);
        round.source_chain = candidates.iter().map(|d| d.name().to_owned()).collect();

        let mut merged = Vec::new();
        let mut answered = Vec::new();
        while let Some((name, result)) = next_attempt(&mut tasks).await {
            match result {
                Ok(data) => {
                    merged.extend(data);
                    answered.push(name);
                }
                Err(error) => round.failures.push(SourceFailure::new(name, &error)),
            }
        }

        if !merged.is_empty() {
            merged.sort_by(T::merge_order);
            round.winner = Some(RoundWinner {
                data: merged,
                source: answered.join(","),
            });
        }
        round
    }

    fn spawn_attempts<T: Record>(
        &self,
        candidates: &[Arc<SourceDescriptor<T>>],
        params: &FetchParams,
        min_records: usize,
    ) -> AttemptSet<T> {
        let mut set = JoinSet::new();
        let mut names = HashMap::new();
        for descriptor in candidates {
            let gateway = self.gateway.clone();
            let descriptor = Arc::clone(descriptor);
            let params = params.clone();
            let deadline = self.settings.deadline;
            let name = descriptor.name().to_owned();
            let handle = set.spawn(async move {
                gateway
                    .fetch_one(descriptor.as_ref(), &params, deadline, min_records)
                    .await
            });
            names.insert(handle.id(), name);
        }
        AttemptSet { set, names }
    }
}

struct AttemptSet<T> {
    set: JoinSet<Result<Vec<T>, FetchError>>,
    names: HashMap<tokio::task::Id, String>,
}

impl<T: 'static> AttemptSet<T> {
    fn abort_all(&mut self) {
        self.set.abort_all();
    }
}

async fn next_attempt<T: 'static>(
    tasks: &mut AttemptSet<T>,
) -> Option<(String, Result<Vec<T>, FetchError>)> {
    let joined = tasks.set.join_next_with_id().await?;
    Some(match joined {
        Ok((id, result)) => (tasks.names.remove(&id).unwrap_or_default(), result),
        Err(join_error) => {
            let name = tasks.names.remove(&join_error.id()).unwrap_or_default();
            (
                name,
                Err(FetchError::Transport(format!("attempt task failed: {join_error}"))),
            )
        }
    })
}

/// Assembles a coordinator from settings, registries, transport and clock.
///
/// ```rust,ignore
/// use monaspect_core::{FailoverCoordinator, FetchSettings};
///
/// let coordinator = FailoverCoordinator::builder()
///     .with_settings(FetchSettings::from_env()?)
///     .with_real_client()
///     .build()?;
/// let market = coordinator.fetch_market().await?;
/// ```
pub struct CoordinatorBuilder {
    settings: FetchSettings,
    http: Option<Arc<dyn HttpClient>>,
    clock: Arc<dyn Clock>,
    market: Option<SourceRegistry<NormalizedAsset>>,
    history: Option<SourceRegistry<HistoryPoint>>,
    news: Option<SourceRegistry<NewsItem>>,
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            settings: FetchSettings::default(),
            http: None,
            clock: Arc::new(SystemClock),
            market: None,
            history: None,
            news: None,
        }
    }

    pub fn with_settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Use reqwest for every source.
    pub fn with_real_client(self) -> Self {
        self.with_http_client(Arc::new(ReqwestHttpClient::new()))
    }

    /// No network access; every remote attempt fails, so callers see stale
    /// or synthetic data.
    pub fn with_offline_mode(self) -> Self {
        self.with_http_client(Arc::new(OfflineHttpClient))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_market_registry(mut self, registry: SourceRegistry<NormalizedAsset>) -> Self {
        self.market = Some(registry);
        self
    }

    pub fn with_history_registry(mut self, registry: SourceRegistry<HistoryPoint>) -> Self {
        self.history = Some(registry);
        self
    }

    pub fn with_news_registry(mut self, registry: SourceRegistry<NewsItem>) -> Self {
        self.news = Some(registry);
        self
    }

    pub fn build(self) -> Result<FailoverCoordinator, ValidationError> {
        let market = match self.market {
            Some(registry) => registry,
            None => adapters::market_registry()?,
        };
        let history = match self.history {
            Some(registry) => registry,
            None => adapters::history_registry()?,
        };
        let news = match self.news {
            Some(registry) => registry,
            None => adapters::news_registry()?,
        };
        let http = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));

        Ok(FailoverCoordinator {
            gateway: FetchGateway::new(http),
            settings: self.settings,
            market: Lane::new(market, Arc::clone(&self.clock), MIN_MARKET_RECORDS),
            history: Lane::new(history, Arc::clone(&self.clock), MIN_SERIES_RECORDS),
            news: Lane::new(news, self.clock, MIN_SERIES_RECORDS),
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    duration_ms(started.elapsed())
}
