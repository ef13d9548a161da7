//! Behavior-driven tests for source failover.
//!
//! These tests verify HOW the coordinator chooses sources, shares work
//! between concurrent callers and falls back when upstreams misbehave. All
//! transports are scripted; no test touches the network.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use monaspect_core::adapters::synthetic;
use monaspect_core::{
    Endpoint, FailoverCoordinator, FetchError, FetchParams, FetchSettings, FetchStrategy,
    Freshness, HistoryPoint, HttpClient, HttpError, HttpRequest, HttpResponse, ManualClock,
    NormalizedAsset, Record, SourceDescriptor, SourceKind, SourceRegistry, Symbol, Timeframe,
    TransformError, UtcDateTime,
};
use tokio::task::JoinSet;

// =============================================================================
// Scripted transport
// =============================================================================

#[derive(Clone)]
struct Reply {
    delay: Duration,
    result: Result<HttpResponse, HttpError>,
}

impl Reply {
    fn ok(body: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(HttpResponse::ok_json(body)),
        }
    }

    fn status(code: u16) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(HttpResponse::with_status(code, "")),
        }
    }

    fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Answers each URL from a script; the last reply repeats once the script
/// runs out.
#[derive(Default)]
struct ScriptedHttp {
    routes: HashMap<String, Vec<Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    fn route(mut self, url: &str, replies: Vec<Reply>) -> Self {
        self.routes.insert(url.to_owned(), replies);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|called| *called == url).count()
    }
}

impl HttpClient for ScriptedHttp {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let reply = {
            let mut calls = self.calls.lock().expect("calls lock");
            let seen = calls.iter().filter(|called| **called == request.url).count();
            calls.push(request.url.clone());
            self.routes
                .get(&request.url)
                .and_then(|replies| replies.get(seen.min(replies.len().saturating_sub(1))))
                .cloned()
                .unwrap_or(Reply {
                    delay: Duration::ZERO,
                    result: Err(HttpError::new(format!("no route for {}", request.url))),
                })
        };

        Box::pin(async move {
            tokio::time::sleep(reply.delay).await;
            reply.result
        })
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Body format: `[["SYM", "Name", price], ...]`.
fn mock_assets(body: &str, _: &FetchParams) -> Result<Vec<NormalizedAsset>, TransformError> {
    let rows: Vec<(String, String, f64)> = serde_json::from_str(body)?;
    rows.into_iter()
        .map(|(symbol, name, price)| {
            NormalizedAsset::new(
                symbol.to_lowercase(),
                Symbol::parse(&symbol)?,
                name,
                price,
                Some(1.0),
                None,
                None,
                Vec::new(),
                "mock",
            )
            .map_err(TransformError::from)
        })
        .collect()
}

/// Body format: `[price, ...]`.
fn mock_points(body: &str, _: &FetchParams) -> Result<Vec<HistoryPoint>, TransformError> {
    let prices: Vec<f64> = serde_json::from_str(body)?;
    prices
        .into_iter()
        .enumerate()
        .map(|(i, price)| {
            let ts = UtcDateTime::from_unix_seconds(1_700_000_000 + i as i64 * 60)?;
            HistoryPoint::new(ts, price).map_err(TransformError::from)
        })
        .collect()
}

fn chart_url(params: &FetchParams) -> Option<String> {
    params
        .asset_id
        .as_ref()
        .map(|id| format!("mock://chart/{id}"))
}

fn market_body(tag: &str, count: usize) -> String {
    let rows: Vec<String> = (0..count)
        .map(|i| format!(r#"["{tag}{i}", "{tag} coin {i}", {}]"#, 10.0 + i as f64))
        .collect();
    format!("[{}]", rows.join(","))
}

fn remote(name: &str) -> SourceDescriptor<NormalizedAsset> {
    SourceDescriptor::remote(
        name,
        SourceKind::Primary,
        Endpoint::Fixed(format!("mock://{}", name.to_lowercase())),
        mock_assets,
    )
}

fn market(names: &[&str], with_synthetic: bool) -> SourceRegistry<NormalizedAsset> {
    let mut descriptors: Vec<_> = names.iter().map(|name| remote(name)).collect();
    if with_synthetic {
        descriptors.push(SourceDescriptor::synthetic(
            "Hydra Synthetic Protocol",
            synthetic::generate_market,
        ));
    }
    SourceRegistry::new(descriptors).expect("valid registry")
}

fn coordinator(
    http: Arc<ScriptedHttp>,
    registry: SourceRegistry<NormalizedAsset>,
    settings: FetchSettings,
) -> FailoverCoordinator {
    FailoverCoordinator::builder()
        .with_settings(settings)
        .with_http_client(http)
        .with_market_registry(registry)
        .build()
        .expect("coordinator")
}

const KEY: &str = "market:top20";
const TTL: Duration = Duration::from_secs(60);

// =============================================================================
// Failover: Cache Short-Circuit
// =============================================================================

#[tokio::test]
async fn when_refreshed_twice_within_ttl_system_calls_upstream_once() {
    // Given: A single healthy source
    let http = Arc::new(ScriptedHttp::default().route("mock://a", vec![Reply::ok(market_body("A", 6))]));
    let coordinator = coordinator(Arc::clone(&http), market(&["A"], false), FetchSettings::default());

    // When: The same key is refreshed twice
    let first = coordinator
        .refresh(KEY, FetchStrategy::Sequential, TTL)
        .await
        .expect("first refresh");
    let second = coordinator
        .refresh(KEY, FetchStrategy::Sequential, TTL)
        .await
        .expect("second refresh");

    // Then: The second call is served from cache
    assert_eq!(first.freshness, Freshness::Live);
    assert_eq!(second.freshness, Freshness::Cached);
    assert_eq!(first.data, second.data);
    assert_eq!(http.calls_to("mock://a"), 1);
}

#[tokio::test]
async fn when_ttl_expires_system_fetches_again() {
    // Given: A manual clock and a healthy source
    let clock = Arc::new(ManualClock::new());
    let http = Arc::new(ScriptedHttp::default().route("mock://a", vec![Reply::ok(market_body("A", 6))]));
    let coordinator = FailoverCoordinator::builder()
        .with_http_client(Arc::clone(&http) as Arc<dyn HttpClient>)
        .with_market_registry(market(&["A"], false))
        .with_clock(clock.clone())
        .build()
        .expect("coordinator");

    // When: The entry ages past its TTL
    coordinator
        .refresh(KEY, FetchStrategy::Sequential, TTL)
        .await
        .expect("first refresh");
    clock.advance(TTL);
    let again = coordinator
        .refresh(KEY, FetchStrategy::Sequential, TTL)
        .await
        .expect("second refresh");

    // Then: A new upstream call is made
    assert_eq!(again.freshness, Freshness::Live);
    assert_eq!(http.calls_to("mock://a"), 2);
}

// =============================================================================
// Failover: Sequential Rotation
// =============================================================================

#[tokio::test]
async fn when_first_sources_fail_sequential_rotation_tries_in_order_and_stops() {
    // Given: A(fail) B(fail) C(ok) D(ok)
    let http = Arc::new(
        ScriptedHttp::default()
            .route("mock://a", vec![Reply::status(503)])
            .route("mock://b", vec![Reply::ok("not json")])
            .route("mock://c", vec![Reply::ok(market_body("C", 5))])
            .route("mock://d", vec![Reply::ok(market_body("D", 5))]),
    );
    let coordinator = coordinator(
        Arc::clone(&http),
        market(&["A", "B", "C", "D"], true),
        FetchSettings::default(),
    );

    // When: A sequential refresh runs
    let refreshed = coordinator
        .refresh(KEY, FetchStrategy::Sequential, TTL)
        .await
        .expect("C answers");

    // Then: A, B, C were attempted in order and D never was
    assert_eq!(http.calls(), vec!["mock://a", "mock://b", "mock://c"]);
    assert_eq!(refreshed.source, "C");
    assert_eq!(refreshed.source_chain, vec!["A", "B", "C"]);
    assert_eq!(refreshed.failures.len(), 2);
    assert_eq!(refreshed.failures[0].code, "fetch.bad_status");
    assert_eq!(refreshed.failures[1].code, "fetch.malformed_payload");
    assert_eq!(refreshed.warnings.len(), 1);

    // And: The next round starts at the source that last answered
    assert_eq!(coordinator.market_cursor(), 2);
    coordinator
        .refresh("market:other", FetchStrategy::Sequential, TTL)
        .await
        .expect("C answers again");
    assert_eq!(http.calls_to("mock://c"), 2);
    assert_eq!(http.calls_to("mock://a"), 1);
}

#[tokio::test]
async fn when_source_returns_too_few_rows_system_rotates_past_it() {
    // Given: A returns four rows, under the market minimum of five
    let http = Arc::new(
        ScriptedHttp::default()
            .route("mock://a", vec![Reply::ok(market_body("A", 4))])
            .route("mock://b", vec![Reply::ok(market_body("B", 5))]),
    );
    let coordinator = coordinator(Arc::clone(&http), market(&["A", "B"], false), FetchSettings::default());

    // When: A sequential refresh runs
    let refreshed = coordinator
        .refresh(KEY, FetchStrategy::Sequential, TTL)
        .await
        .expect("B answers");

    // Then: The short batch is rejected as insufficient
    assert_eq!(refreshed.source, "B");
    assert_eq!(refreshed.failures[0].code, "fetch.insufficient_data");
}

#[tokio::test]
async fn when_source_is_disabled_rotation_skips_it_without_a_request() {
    // Given: A disabled placeholder ahead of a working source
    let http = Arc::new(ScriptedHttp::default().route("mock://b", vec![Reply::ok(market_body("B", 5))]));
    let registry = SourceRegistry::new(vec![
        SourceDescriptor::disabled("Placeholder", Endpoint::Fixed(String::from("mock://p"))),
        remote("B"),
    ])
    .expect("registry");
    let coordinator = coordinator(Arc::clone(&http), registry, FetchSettings::default());

    // When: A sequential refresh runs
    let refreshed = coordinator
        .refresh(KEY, FetchStrategy::Sequential, TTL)
        .await
        .expect("B answers");

    // Then: The placeholder was never contacted
    assert_eq!(refreshed.source, "B");
    assert_eq!(http.calls(), vec!["mock://b"]);
}

// =============================================================================
// Failover: Parallel Race
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_racing_system_returns_the_fastest_success() {
    // Given: A answers in 200 ms and B in 50 ms
    let http = Arc::new(
        ScriptedHttp::default()
            .route(
                "mock://a",
                vec![Reply::ok(market_body("A", 5)).after(Duration::from_millis(200))],
            )
            .route(
                "mock://b",
                vec![Reply::ok(market_body("B", 5)).after(Duration::from_millis(50))],
            ),
    );
    let coordinator = coordinator(Arc::clone(&http), market(&["A", "B"], false), FetchSettings::default());

    // When: Both are raced
    let refreshed = coordinator
        .refresh(KEY, FetchStrategy::Race { width: 2 }, TTL)
        .await
        .expect("race winner");

    // Then: B wins and its data is what gets cached
    assert_eq!(refreshed.source, "B");
    assert_eq!(refreshed.data[0].symbol.as_str(), "B0");
    let cached = coordinator.cached_market(KEY).await.expect("cached");
    assert_eq!(cached[0].symbol.as_str(), "B0");

    // And: A's late answer never replaces the cached batch
    tokio::time::sleep(Duration::from_millis(500)).await;
    let cached = coordinator.cached_market(KEY).await.expect("cached");
    assert_eq!(cached[0].symbol.as_str(), "B0");
}

#[tokio::test(start_paused = true)]
async fn when_fast_source_fails_race_waits_for_the_next_success() {
    // Given: A fails fast, B succeeds slowly
    let http = Arc::new(
        ScriptedHttp::default()
            .route("mock://a", vec![Reply::status(500)])
            .route(
                "mock://b",
                vec![Reply::ok(market_body("B", 5)).after(Duration::from_millis(300))],
            ),
    );
    let coordinator = coordinator(Arc::clone(&http), market(&["A", "B"], false), FetchSettings::default());

    // When: Both are raced
    let refreshed = coordinator
        .refresh(KEY, FetchStrategy::Race { width: 3 }, TTL)
        .await
        .expect("B eventually answers");

    // Then: B's success is returned and A's failure is reported
    assert_eq!(refreshed.source, "B");
    assert_eq!(refreshed.failures.len(), 1);
    assert_eq!(refreshed.failures[0].source, "A");
}

/// Sets its flag when the future holding it is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// `mock://a` never answers; every other URL answers at once.
struct HangingHttp {
    hung_attempt_dropped: Arc<AtomicBool>,
}

impl HttpClient for HangingHttp {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        if request.url == "mock://a" {
            let flag = DropFlag(Arc::clone(&self.hung_attempt_dropped));
            Box::pin(async move {
                let _flag = flag;
                std::future::pending::<()>().await;
                Err(HttpError::new("unreachable"))
            })
        } else {
            Box::pin(async { Ok(HttpResponse::ok_json(market_body("B", 5))) })
        }
    }
}

#[tokio::test(start_paused = true)]
async fn when_race_has_a_winner_attempts_still_in_flight_are_cancelled() {
    // Given: A hangs well inside the deadline, B answers immediately
    let dropped = Arc::new(AtomicBool::new(false));
    let http = Arc::new(HangingHttp {
        hung_attempt_dropped: Arc::clone(&dropped),
    });
    let settings = FetchSettings::default().with_deadline(Duration::from_secs(60));
    let coordinator = FailoverCoordinator::builder()
        .with_settings(settings)
        .with_http_client(http)
        .with_market_registry(market(&["A", "B"], false))
        .build()
        .expect("coordinator");

    // When: Both are raced
    let refreshed = coordinator
        .refresh(KEY, FetchStrategy::Race { width: 2 }, TTL)
        .await
        .expect("B wins");

    // Then: A's attempt is dropped long before its deadline
    assert_eq!(refreshed.source, "B");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(dropped.load(Ordering::SeqCst), "losing attempt still running");
}

// =============================================================================
// Failover: Fallbacks
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_every_real_source_fails_synthetic_source_fills_in() {
    // Given: One source errors and one hangs past the deadline
    let http = Arc::new(
        ScriptedHttp::default()
            .route("mock://a", vec![Reply::status(502)])
            .route(
                "mock://b",
                vec![Reply::ok(market_body("B", 5)).after(Duration::from_secs(30))],
            ),
    );
    let settings = FetchSettings::default().with_deadline(Duration::from_millis(500));
    let coordinator = coordinator(Arc::clone(&http), market(&["A", "B"], true), settings);

    for strategy in [FetchStrategy::Sequential, FetchStrategy::Race { width: 2 }] {
        // When: A refresh runs
        let refreshed = coordinator
            .refresh(KEY, strategy, TTL)
            .await
            .expect("synthetic fallback cannot fail");

        // Then: A valid synthetic batch is returned and not cached
        assert_eq!(refreshed.freshness, Freshness::Synthetic);
        assert_eq!(refreshed.source, "Hydra Synthetic Protocol");
        assert!(!refreshed.data.is_empty());
        assert!(refreshed.data.iter().all(Record::is_viable));
        assert!(coordinator.cached_market(KEY).await.is_none());
    }
}

#[tokio::test]
async fn when_sources_fail_after_success_stale_entry_is_served() {
    // Given: A succeeds once, then fails; a synthetic source is also present
    let clock = Arc::new(ManualClock::new());
    let http = Arc::new(ScriptedHttp::default().route(
        "mock://a",
        vec![Reply::ok(market_body("A", 5)), Reply::status(503)],
    ));
    let coordinator = FailoverCoordinator::builder()
        .with_http_client(Arc::clone(&http) as Arc<dyn HttpClient>)
        .with_market_registry(market(&["A"], true))
        .with_clock(clock.clone())
        .build()
        .expect("coordinator");

    let live = coordinator
        .refresh(KEY, FetchStrategy::Sequential, TTL)
        .await
        .expect("live");

    // When: The entry expires and the source starts failing
    clock.advance(Duration::from_secs(120));
    let stale = coordinator
        .refresh(KEY, FetchStrategy::Sequential, TTL)
        .await
        .expect("stale fallback");

    // Then: The old batch is served, flagged stale, ahead of synthetic data
    assert_eq!(stale.freshness, Freshness::Stale);
    assert_eq!(stale.source, "A");
    assert_eq!(stale.data, live.data);
    assert_eq!(stale.failures.len(), 1);
    assert!(!stale.warnings.is_empty());
}

#[tokio::test]
async fn when_nothing_is_available_system_reports_exhaustion() {
    // Given: Two failing sources, no synthetic source, no cache
    let http = Arc::new(
        ScriptedHttp::default()
            .route("mock://a", vec![Reply::status(404)])
            .route("mock://b", vec![Reply::status(429)]),
    );
    let coordinator = coordinator(Arc::clone(&http), market(&["A", "B"], false), FetchSettings::default());

    // When: A refresh runs
    let error = coordinator
        .refresh(KEY, FetchStrategy::Sequential, TTL)
        .await
        .expect_err("nothing to serve");

    // Then: Every failure is carried in the error
    match error {
        FetchError::AllSourcesExhausted {
            attempted,
            failures,
        } => {
            assert_eq!(attempted, 2);
            assert!(!failures[0].retryable);
            assert!(failures[1].retryable);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// =============================================================================
// Failover: Deadlines and Single-Flight
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_source_is_slow_timeout_is_reported_and_late_data_never_cached() {
    // Given: A source that answers long after the deadline
    let http = Arc::new(ScriptedHttp::default().route(
        "mock://a",
        vec![Reply::ok(market_body("A", 5)).after(Duration::from_secs(10))],
    ));
    let settings = FetchSettings::default().with_deadline(Duration::from_millis(250));
    let coordinator = coordinator(Arc::clone(&http), market(&["A"], false), settings);

    // When: A refresh runs
    let started = tokio::time::Instant::now();
    let error = coordinator
        .refresh(KEY, FetchStrategy::Sequential, TTL)
        .await
        .expect_err("timed out");

    // Then: The timeout surfaces at the deadline
    assert!(started.elapsed() < Duration::from_secs(1));
    match error {
        FetchError::AllSourcesExhausted { failures, .. } => {
            assert_eq!(failures[0].code, "fetch.timeout");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // And: Nothing reaches the cache once the late answer would have arrived
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(coordinator.cached_market(KEY).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn when_callers_refresh_concurrently_they_share_one_upstream_call() {
    // Given: A slow but healthy source
    let http = Arc::new(ScriptedHttp::default().route(
        "mock://a",
        vec![Reply::ok(market_body("A", 5)).after(Duration::from_millis(100))],
    ));
    let coordinator = Arc::new(coordinator(
        Arc::clone(&http),
        market(&["A"], false),
        FetchSettings::default(),
    ));

    // When: Five callers refresh the same key at once
    let mut callers = JoinSet::new();
    for _ in 0..5 {
        let coordinator = Arc::clone(&coordinator);
        callers.spawn(async move {
            coordinator
                .refresh(KEY, FetchStrategy::Sequential, TTL)
                .await
        });
    }
    let mut outcomes = Vec::new();
    while let Some(joined) = callers.join_next().await {
        outcomes.push(joined.expect("caller task").expect("refresh"));
    }

    // Then: One request was made and every caller got the same batch
    assert_eq!(http.calls_to("mock://a"), 1);
    assert_eq!(outcomes.len(), 5);
    assert!(outcomes.iter().all(|o| o.data == outcomes[0].data));
}

// =============================================================================
// Failover: History
// =============================================================================

fn history_registry() -> SourceRegistry<HistoryPoint> {
    SourceRegistry::new(vec![
        SourceDescriptor::remote(
            "Chart",
            SourceKind::Primary,
            Endpoint::Builder(chart_url),
            mock_points,
        ),
        SourceDescriptor::synthetic("Random Walk", synthetic::generate_history),
    ])
    .expect("registry")
}

#[tokio::test]
async fn when_market_is_cached_history_resolves_the_asset_id_from_it() {
    // Given: A cached market list and a chart source keyed by asset id
    let http = Arc::new(
        ScriptedHttp::default()
            .route(
                "mock://a",
                vec![Reply::ok(
                    r#"[["BTC","Bitcoin",65000],["BCH","Bitcoin Cash",400],["ETH","Ethereum",3500],["SOL","Solana",150],["ADA","Cardano",0.5]]"#,
                )],
            )
            .route("mock://chart/bitcoin-cash", vec![Reply::ok("[401.0, 402.5, 399.0]")]),
    );
    let coordinator = FailoverCoordinator::builder()
        .with_http_client(Arc::clone(&http) as Arc<dyn HttpClient>)
        .with_market_registry(market(&["A"], false))
        .with_history_registry(history_registry())
        .build()
        .expect("coordinator");
    coordinator.fetch_market().await.expect("market");

    // When: History for BCH is requested twice
    let symbol = Symbol::parse("BCH").expect("symbol");
    let first = coordinator
        .fetch_history(&symbol, Timeframe::OneDay)
        .await
        .expect("history");
    let second = coordinator
        .fetch_history(&symbol, Timeframe::OneDay)
        .await
        .expect("history");

    // Then: The slug of the asset name addressed the chart source once
    assert_eq!(first.freshness, Freshness::Live);
    assert_eq!(first.data.len(), 3);
    assert_eq!(second.freshness, Freshness::Cached);
    assert_eq!(http.calls_to("mock://chart/bitcoin-cash"), 1);
}

#[tokio::test]
async fn when_no_chart_source_answers_history_falls_back_to_random_walk() {
    // Given: No market cache, so the chart source cannot build a URL
    let http = Arc::new(ScriptedHttp::default());
    let coordinator = FailoverCoordinator::builder()
        .with_http_client(Arc::clone(&http) as Arc<dyn HttpClient>)
        .with_history_registry(history_registry())
        .build()
        .expect("coordinator");
    let symbol = Symbol::parse("ETH").expect("symbol");

    // When: History is requested twice
    let first = coordinator
        .fetch_history(&symbol, Timeframe::Live)
        .await
        .expect("random walk");
    let second = coordinator
        .fetch_history(&symbol, Timeframe::Live)
        .await
        .expect("random walk");

    // Then: Both are synthetic, 61 points each, and nothing was cached
    assert_eq!(first.freshness, Freshness::Synthetic);
    assert_eq!(second.freshness, Freshness::Synthetic);
    assert_eq!(first.data.len(), 61);
    assert!(first.data.windows(2).all(|pair| pair[0].ts < pair[1].ts));
    assert!(http.calls().is_empty());
}
