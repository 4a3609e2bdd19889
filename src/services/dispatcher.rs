// src/services/dispatcher.rs

//! Concurrent dispatcher.
//!
//! Drives a [`Fetcher`] over a set of targets under one of two disciplines:
//! - [`Dispatcher::dispatch_all`]: one concurrent fetch per target, no throttling.
//!   Only meant for small target sets (genre pages, feeds).
//! - [`Dispatcher::dispatch_throttled`]: a single worker fed by a bounded queue,
//!   gated by a periodic tick. Retries wait for a tick like any other request.
//!
//! Both return only once every target produced exactly one result.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, Result};
use crate::models::{CrawlerConfig, FetchResult, FetchTarget, ResultSet};
use crate::services::fetcher::{Decoder, Fetcher};
use crate::services::progress::{NoProgress, Progress};

/// Retry policy applied around each fetch.
///
/// Only transport errors are retried; HTTP status errors never are.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    pub transport_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            transport_retries: config.transport_retries,
            backoff: config.retry_backoff(),
        }
    }
}

/// Runs fetches over target sets and collects their results.
#[derive(Clone)]
pub struct Dispatcher {
    fetcher: Fetcher,
    retry: RetryPolicy,
    progress: Arc<dyn Progress>,
}

impl Dispatcher {
    /// Create a dispatcher without retries or progress output.
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            retry: RetryPolicy::none(),
            progress: Arc::new(NoProgress),
        }
    }

    /// Create a dispatcher with client and retry policy taken from `config`.
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::new(Fetcher::from_config(config)?).with_retry(RetryPolicy::from_config(config)))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    /// Fetch every target concurrently, without throttling.
    pub async fn dispatch_all<D>(&self, targets: &[FetchTarget], decoder: &D) -> ResultSet<D::Entity>
    where
        D: Decoder,
    {
        let total = targets.len();
        self.progress.started(total);

        let mut in_flight = stream::iter(targets)
            .map(|target| self.fetch_with_retry(&target.url, decoder))
            .buffer_unordered(total.max(1));

        let mut results = Vec::with_capacity(total);
        while let Some(result) = in_flight.next().await {
            self.progress
                .completed(results.len() + 1, total, &result.url, result.error());
            results.push(result);
        }

        results
    }

    /// Fetch targets one at a time, at least `interval` apart.
    ///
    /// Once `cancel` fires, every target still queued yields
    /// [`FetchError::Cancelled`] and the partial results are returned.
    pub async fn dispatch_throttled<D>(
        &self,
        targets: &[FetchTarget],
        decoder: &D,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> ResultSet<D::Entity>
    where
        D: Decoder,
    {
        let total = targets.len();
        self.progress.started(total);
        if total == 0 {
            return Vec::new();
        }

        let (queue_tx, mut queue_rx) = mpsc::channel::<&FetchTarget>(total);
        for target in targets {
            // Capacity equals the target count, so this never waits.
            if queue_tx.send(target).await.is_err() {
                break;
            }
        }
        drop(queue_tx);

        let (result_tx, mut result_rx) = mpsc::channel::<FetchResult<D::Entity>>(total);

        let worker = async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while let Some(target) = queue_rx.recv().await {
                let result = self.fetch_gated(target, decoder, &mut ticker, cancel).await;

                if result_tx.send(result).await.is_err() {
                    break;
                }
            }
            // Dropping the sender closes the result stream.
        };

        let collector = async {
            let mut results = Vec::with_capacity(total);
            while let Some(result) = result_rx.recv().await {
                self.progress
                    .completed(results.len() + 1, total, &result.url, result.error());
                results.push(result);
            }
            results
        };

        let ((), results) = tokio::join!(worker, collector);
        results
    }

    /// One target in rate-limited mode. Every attempt, retries included,
    /// waits for a tick, and the backoff is only a lower bound on top of it.
    ///
    /// Cancellation before a retry keeps the last transport error.
    async fn fetch_gated<D>(
        &self,
        target: &FetchTarget,
        decoder: &D,
        ticker: &mut Interval,
        cancel: &CancellationToken,
    ) -> FetchResult<D::Entity>
    where
        D: Decoder,
    {
        let mut attempt = 0;
        let mut last = None;
        loop {
            let open = if cancel.is_cancelled() {
                false
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => false,
                    _ = ticker.tick() => true,
                }
            };
            if !open {
                return last.unwrap_or_else(|| Self::cancelled(target));
            }

            let result = self.fetcher.fetch(&target.url, decoder).await;
            if !self.should_retry(&result, attempt) {
                return result;
            }

            attempt += 1;
            log::debug!(
                "Transport error for {}, retry {}/{} on a later tick",
                target.url,
                attempt,
                self.retry.transport_retries
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return result,
                _ = time::sleep(self.retry.backoff) => {}
            }
            last = Some(result);
        }
    }

    fn should_retry<T>(&self, result: &FetchResult<T>, attempt: u32) -> bool {
        result.error().is_some_and(FetchError::is_transport) && attempt < self.retry.transport_retries
    }

    async fn fetch_with_retry<D>(&self, url: &str, decoder: &D) -> FetchResult<D::Entity>
    where
        D: Decoder,
    {
        let mut attempt = 0;
        loop {
            let result = self.fetcher.fetch(url, decoder).await;
            if !self.should_retry(&result, attempt) {
                return result;
            }

            attempt += 1;
            log::debug!(
                "Transport error for {}, retry {}/{} in {:?}",
                url,
                attempt,
                self.retry.transport_retries,
                self.retry.backoff
            );
            time::sleep(self.retry.backoff).await;
        }
    }

    fn cancelled<T>(target: &FetchTarget) -> FetchResult<T> {
        FetchResult::failure(
            target.url.as_str(),
            FetchError::Cancelled {
                url: target.url.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use super::*;
    use crate::services::test_server::TestServer;

    fn body_len(_url: &str, body: &[u8]) -> std::result::Result<usize, FetchError> {
        Ok(body.len())
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::from_config(&CrawlerConfig::default()).unwrap()
    }

    fn targets(server: &TestServer, paths: &[&str]) -> Vec<FetchTarget> {
        paths
            .iter()
            .enumerate()
            .map(|(i, path)| FetchTarget::new(i as u64, server.url(path)))
            .collect()
    }

    /// Cancels the token after a number of completions.
    struct CancelAfter {
        after: usize,
        token: CancellationToken,
        seen: AtomicUsize,
    }

    impl Progress for CancelAfter {
        fn started(&self, _total: usize) {}

        fn completed(&self, _done: usize, _total: usize, _url: &str, _error: Option<&FetchError>) {
            if self.seen.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
                self.token.cancel();
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        total: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl Progress for Recorder {
        fn started(&self, total: usize) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn completed(&self, _done: usize, _total: usize, url: &str, _error: Option<&FetchError>) {
            self.urls.lock().unwrap().push(url.to_string());
        }
    }

    #[tokio::test]
    async fn test_dispatch_all_one_404_among_three() {
        let server = TestServer::start().await;
        let targets = targets(&server, &["/test/1", "/404", "/test/2"]);

        let results = dispatcher().dispatch_all(&targets, &body_len).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
        let failures: Vec<_> = results.iter().filter_map(|r| r.error()).collect();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            FetchError::UnreachableUrl { url, status: 404 } if url == &server.url("/404")
        ));
    }

    #[tokio::test]
    async fn test_dispatch_all_yields_one_result_per_target() {
        let server = TestServer::start().await;
        let targets = targets(&server, &["/test/1", "/test/2", "/test/3", "/404", "/invalid"]);

        let results = dispatcher().dispatch_all(&targets, &body_len).await;

        let urls: HashSet<_> = results.iter().map(|r| r.url.clone()).collect();
        let expected: HashSet<_> = targets.iter().map(|t| t.url.clone()).collect();
        assert_eq!(results.len(), targets.len());
        assert_eq!(urls, expected);
    }

    #[tokio::test]
    async fn test_dispatch_all_empty() {
        let results = dispatcher().dispatch_all(&[], &body_len).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_all_reports_progress() {
        let server = TestServer::start().await;
        let targets = targets(&server, &["/test/1", "/test/2"]);
        let recorder = Arc::new(Recorder::default());

        let results = dispatcher()
            .with_progress(recorder.clone())
            .dispatch_all(&targets, &body_len)
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(recorder.total.load(Ordering::SeqCst), 2);
        assert_eq!(recorder.urls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_throttled_respects_interval() {
        let server = TestServer::start().await;
        let targets = targets(&server, &["/test/1", "/test/2", "/test/3"]);
        let interval = Duration::from_millis(100);

        let started = Instant::now();
        let results = dispatcher()
            .dispatch_throttled(&targets, &body_len, interval, &CancellationToken::new())
            .await;

        assert!(started.elapsed() >= interval * 2);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn test_dispatch_throttled_keeps_errors() {
        let server = TestServer::start().await;
        let targets = targets(&server, &["/test/1", "/404"]);

        let results = dispatcher()
            .dispatch_throttled(
                &targets,
                &body_len,
                Duration::from_millis(10),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.error().is_some()).count(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_throttled_cancelled_before_start() {
        let server = TestServer::start().await;
        let targets = targets(&server, &["/test/1", "/test/2"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = dispatcher()
            .dispatch_throttled(&targets, &body_len, Duration::from_millis(10), &cancel)
            .await;

        assert_eq!(results.len(), 2);
        assert!(
            results
                .iter()
                .all(|r| matches!(r.error(), Some(FetchError::Cancelled { .. })))
        );
        assert_eq!(server.hits(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_throttled_cancelled_mid_run() {
        let server = TestServer::start().await;
        let targets = targets(&server, &["/test/1", "/test/2", "/test/3"]);
        let cancel = CancellationToken::new();
        let progress = Arc::new(CancelAfter {
            after: 1,
            token: cancel.clone(),
            seen: AtomicUsize::new(0),
        });

        let results = dispatcher()
            .with_progress(progress)
            .dispatch_throttled(&targets, &body_len, Duration::from_millis(500), &cancel)
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(
            results[1..]
                .iter()
                .all(|r| matches!(r.error(), Some(FetchError::Cancelled { .. })))
        );
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        let url = TestServer::closed_url().await;
        let targets = vec![FetchTarget::new(1, url)];
        let dispatcher = dispatcher().with_retry(RetryPolicy {
            transport_retries: 2,
            backoff: Duration::from_millis(50),
        });

        let started = Instant::now();
        let results = dispatcher.dispatch_all(&targets, &body_len).await;

        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(results[0].error().is_some_and(FetchError::is_transport));
    }

    /// Accepts connections and closes them at once, recording when each came in.
    async fn dropping_listener() -> (String, Arc<Mutex<Vec<Instant>>>, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let accepted = Arc::new(Mutex::new(Vec::new()));

        let seen = accepted.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                seen.lock().unwrap().push(Instant::now());
                drop(stream);
            }
        });

        (base, accepted, task)
    }

    #[tokio::test]
    async fn test_throttled_retries_wait_for_the_interval() {
        let (base, accepted, task) = dropping_listener().await;
        let targets = vec![
            FetchTarget::new(1, format!("{base}/lookup?id=1")),
            FetchTarget::new(2, format!("{base}/lookup?id=2")),
        ];
        let interval = Duration::from_millis(300);
        let dispatcher = dispatcher().with_retry(RetryPolicy {
            transport_retries: 1,
            backoff: Duration::from_millis(20),
        });

        let results = dispatcher
            .dispatch_throttled(&targets, &body_len, interval, &CancellationToken::new())
            .await;
        task.abort();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.error().is_some_and(FetchError::is_transport)));

        let accepted = accepted.lock().unwrap().clone();
        assert_eq!(accepted.len(), 4);
        for pair in accepted.windows(2) {
            let gap = pair[1] - pair[0];
            // Small slack for connect latency around each tick.
            assert!(
                gap + Duration::from_millis(10) >= interval,
                "requests {gap:?} apart with a {interval:?} interval"
            );
        }
    }

    #[tokio::test]
    async fn test_throttled_retry_stops_when_cancelled() {
        let (base, accepted, task) = dropping_listener().await;
        let targets = vec![
            FetchTarget::new(1, format!("{base}/lookup?id=1")),
            FetchTarget::new(2, format!("{base}/lookup?id=2")),
        ];
        let cancel = CancellationToken::new();
        let dispatcher = dispatcher().with_retry(RetryPolicy {
            transport_retries: 3,
            backoff: Duration::from_millis(20),
        });

        let stopper = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(100)).await;
            stopper.cancel();
        });

        let results = dispatcher
            .dispatch_throttled(&targets, &body_len, Duration::from_millis(500), &cancel)
            .await;
        task.abort();

        // The first attempt runs at once; the retry tick is cancelled.
        assert_eq!(accepted.lock().unwrap().len(), 1);
        assert!(results[0].error().is_some_and(FetchError::is_transport));
        assert!(matches!(results[1].error(), Some(FetchError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_status_errors_are_not_retried() {
        let server = TestServer::start().await;
        let targets = targets(&server, &["/404"]);
        let dispatcher = dispatcher().with_retry(RetryPolicy {
            transport_retries: 3,
            backoff: Duration::from_millis(10),
        });

        let results = dispatcher.dispatch_all(&targets, &body_len).await;

        assert_eq!(results.len(), 1);
        assert_eq!(server.hits(), 1);
    }
}
