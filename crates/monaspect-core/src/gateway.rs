use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::fetch_error::FetchError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::registry::{FetchParams, SourceDescriptor, Target};
use crate::Record;

/// Minimum viable batch size for market lists.
pub const MIN_MARKET_RECORDS: usize = 5;
/// Minimum viable batch size for charts and headline feeds.
pub const MIN_SERIES_RECORDS: usize = 1;

/// Executes one bounded attempt against one source.
///
/// The gateway has no cache and no memory between calls; it only turns a
/// descriptor plus parameters into validated records or a typed failure.
#[derive(Clone)]
pub struct FetchGateway {
    http: Arc<dyn HttpClient>,
}

impl FetchGateway {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Fetches, transforms and validates one source.
    ///
    /// The request future is dropped when `deadline` elapses, so no late
    /// response can be observed by the caller.
    pub async fn fetch_one<T: Record>(
        &self,
        descriptor: &SourceDescriptor<T>,
        params: &FetchParams,
        deadline: Duration,
        min_records: usize,
    ) -> Result<Vec<T>, FetchError> {
        let records = match descriptor.target() {
            Target::Synthetic(generator) => generator(params)?,
            Target::Remote {
                transform: None, ..
            } => {
                return Err(FetchError::Disabled {
                    source_name: descriptor.name().to_owned(),
                    reason: String::from("no transform registered"),
                });
            }
            Target::Remote {
                endpoint,
                transform: Some(transform),
            } => {
                let Some(url) = endpoint.url_for(params) else {
                    return Err(FetchError::Disabled {
                        source_name: descriptor.name().to_owned(),
                        reason: String::from("source cannot serve this request"),
                    });
                };

                let body = self.get(descriptor.name(), url, deadline).await?;
                transform(&body, params)?
            }
        };

        validate_batch(&records, min_records)?;
        debug!(source = descriptor.name(), records = records.len(), "source attempt succeeded");
        Ok(records)
    }

    async fn get(&self, source: &str, url: String, deadline: Duration) -> Result<String, FetchError> {
        let deadline_ms = duration_ms(deadline);
        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_timeout_ms(deadline_ms);

        debug!(source, url = %request.url, deadline_ms, "requesting source");
        let response = match tokio::time::timeout(deadline, self.http.execute(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) if error.timed_out() => {
                warn!(source, error = %error, "transport timed out");
                return Err(FetchError::Timeout { deadline_ms });
            }
            Ok(Err(error)) => {
                warn!(source, error = %error, "transport failed");
                return Err(FetchError::Transport(error.message().to_owned()));
            }
            Err(_) => {
                warn!(source, deadline_ms, "deadline elapsed before response");
                return Err(FetchError::Timeout { deadline_ms });
            }
        };

        if !response.is_success() {
            warn!(source, status = response.status, "non-success status");
            return Err(FetchError::BadStatus(response.status));
        }

        Ok(response.body)
    }
}

fn validate_batch<T: Record>(records: &[T], min_records: usize) -> Result<(), FetchError> {
    let first_viable = records.first().is_some_and(|record| record.is_viable());
    if records.len() < min_records || !first_viable {
        let got = if first_viable { records.len() } else { 0 };
        return Err(FetchError::InsufficientData {
            got,
            need: min_records.max(1),
        });
    }
    Ok(())
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use super::*;
    use crate::fetch_error::TransformError;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::registry::{Endpoint, SourceKind};
    use crate::NewsItem;

    struct ScriptedHttpClient {
        delay: Duration,
        response: Result<HttpResponse, HttpError>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedHttpClient {
        fn new(delay: Duration, response: Result<HttpResponse, HttpError>) -> Self {
            Self {
                delay,
                response,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().expect("lock").len()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.calls.lock().expect("lock").push(request.url);
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                self.response.clone()
            })
        }
    }

    fn titles(body: &str, _: &FetchParams) -> Result<Vec<NewsItem>, TransformError> {
        let titles: Vec<String> = serde_json::from_str(body)?;
        Ok(titles
            .into_iter()
            .filter_map(|title| NewsItem::new(title, crate::UtcDateTime::now(), "").ok())
            .collect())
    }

    fn remote() -> SourceDescriptor<NewsItem> {
        SourceDescriptor::remote(
            "Scripted",
            SourceKind::Primary,
            Endpoint::Fixed(String::from("mock://scripted")),
            titles,
        )
    }

    async fn run(
        client: Arc<ScriptedHttpClient>,
        descriptor: &SourceDescriptor<NewsItem>,
        min_records: usize,
    ) -> Result<Vec<NewsItem>, FetchError> {
        FetchGateway::new(client)
            .fetch_one(
                descriptor,
                &FetchParams::news(),
                Duration::from_millis(100),
                min_records,
            )
            .await
    }

    #[tokio::test]
    async fn returns_transformed_records() {
        let client = Arc::new(ScriptedHttpClient::new(
            Duration::ZERO,
            Ok(HttpResponse::ok_json(r#"["a","b"]"#)),
        ));
        let records = run(client, &remote(), 1).await.expect("success");
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn slow_source_times_out_within_deadline() {
        let client = Arc::new(ScriptedHttpClient::new(
            Duration::from_secs(5),
            Ok(HttpResponse::ok_json(r#"["late"]"#)),
        ));
        let started = std::time::Instant::now();
        let err = run(client, &remote(), 1).await.expect_err("must time out");
        assert_eq!(err, FetchError::Timeout { deadline_ms: 100 });
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn maps_status_transport_and_payload_failures() {
        let status = Arc::new(ScriptedHttpClient::new(
            Duration::ZERO,
            Ok(HttpResponse::with_status(503, "")),
        ));
        assert_eq!(
            run(status, &remote(), 1).await.expect_err("status"),
            FetchError::BadStatus(503)
        );

        let transport = Arc::new(ScriptedHttpClient::new(
            Duration::ZERO,
            Err(HttpError::new("connection reset")),
        ));
        assert!(matches!(
            run(transport, &remote(), 1).await.expect_err("transport"),
            FetchError::Transport(_)
        ));

        let malformed = Arc::new(ScriptedHttpClient::new(
            Duration::ZERO,
            Ok(HttpResponse::ok_json("<html>")),
        ));
        assert!(matches!(
            run(malformed, &remote(), 1).await.expect_err("payload"),
            FetchError::MalformedPayload(_)
        ));
    }

    #[tokio::test]
    async fn short_batches_are_insufficient() {
        let client = Arc::new(ScriptedHttpClient::new(
            Duration::ZERO,
            Ok(HttpResponse::ok_json(r#"["a","b"]"#)),
        ));
        let err = run(client, &remote(), MIN_MARKET_RECORDS)
            .await
            .expect_err("too few");
        assert_eq!(err, FetchError::InsufficientData { got: 2, need: 5 });

        let empty = Arc::new(ScriptedHttpClient::new(
            Duration::ZERO,
            Ok(HttpResponse::ok_json("[]")),
        ));
        assert!(matches!(
            run(empty, &remote(), 1).await.expect_err("empty"),
            FetchError::InsufficientData { got: 0, .. }
        ));
    }

    #[tokio::test]
    async fn disabled_source_never_touches_network() {
        let client = Arc::new(ScriptedHttpClient::new(
            Duration::ZERO,
            Ok(HttpResponse::ok_json("[]")),
        ));
        let disabled: SourceDescriptor<NewsItem> =
            SourceDescriptor::disabled("Placeholder", Endpoint::Fixed(String::from("mock://x")));

        let err = run(Arc::clone(&client), &disabled, 1)
            .await
            .expect_err("disabled");

        assert!(matches!(err, FetchError::Disabled { .. }));
        assert_eq!(client.call_count(), 0);
    }
}
