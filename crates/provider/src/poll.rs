//! Polling downloader for server-side prepared bags
//!
//! Hosts prepare the zip of a resource asynchronously. Until it is ready the
//! bag endpoint answers with a non-zip response; the downloader re-requests
//! it on a bounded schedule and hands the archive body on once ready.

use async_trait::async_trait;
use hydrofetch_config::PollingConfig;
use hydrofetch_errors::{Error, NetworkError, ProviderError};
use hydrofetch_events::{EventEmitter, FetchEvent};
use hydrofetch_net::{ArchiveStream, NetClient};
use hydrofetch_types::ResourceHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Content type announcing a finished bag
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// One answer of the bag endpoint
#[derive(Debug)]
pub struct BundleResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: ArchiveStream,
}

impl BundleResponse {
    /// Whether the response carries the finished archive
    ///
    /// Only the media type essence is compared; parameters and case are
    /// ignored.
    #[must_use]
    pub fn is_archive(&self) -> bool {
        self.content_type.as_deref().is_some_and(|value| {
            value
                .split(';')
                .next()
                .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(ARCHIVE_CONTENT_TYPE))
        })
    }
}

/// Issues bag requests
#[async_trait]
pub trait BundleTransport: Send + Sync {
    /// GET `url`, returning any HTTP status as a response
    ///
    /// # Errors
    ///
    /// Returns an error only for transport failures.
    async fn request(&self, url: &str) -> Result<BundleResponse, Error>;
}

#[async_trait]
impl BundleTransport for NetClient {
    async fn request(&self, url: &str) -> Result<BundleResponse, Error> {
        let response = self.get(url).await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(BundleResponse {
            status,
            content_type,
            body: ArchiveStream::from_response(response),
        })
    }
}

/// Schedule and bounds of the readiness loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// First wait between polls
    pub interval: Duration,
    /// Pause between the ready answer and the download request
    pub settle_delay: Duration,
    /// Growth factor of the wait; 1.0 keeps it fixed
    pub backoff_multiplier: f64,
    /// Upper bound of a single wait
    pub max_interval: Duration,
    /// Number of "still preparing" answers waited out; the next one gives up
    pub max_attempts: Option<u32>,
    /// Total time spent waiting before giving up
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            settle_delay: config.settle(),
            backoff_multiplier: config.backoff_multiplier,
            max_interval: config.max_interval(),
            max_attempts: config.max_attempts,
            max_wait: config.max_wait(),
        }
    }
}

impl PollPolicy {
    /// The wait following `current`
    #[must_use]
    pub fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_multiplier <= 1.0 {
            return current;
        }
        let cap = self.max_interval.max(self.interval);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .map_or(cap, |next| next.min(cap))
    }

    /// Whether another wait of `next_wait` would leave the budget
    fn exhausted(&self, preparing: u32, waited: Duration, next_wait: Duration) -> bool {
        self.max_attempts.is_some_and(|max| preparing > max)
            || self
                .max_wait
                .is_some_and(|max| waited.saturating_add(next_wait) > max)
    }
}

/// Downloads bags, waiting out their preparation
#[derive(Clone)]
pub struct BundleDownloader {
    transport: Arc<dyn BundleTransport>,
    policy: PollPolicy,
}

impl BundleDownloader {
    #[must_use]
    pub fn new(transport: Arc<dyn BundleTransport>, policy: PollPolicy) -> Self {
        Self { transport, policy }
    }

    /// Download the bag of `handle`
    ///
    /// Polls the bag endpoint while it answers 200 with a non-zip body. Once
    /// the zip is announced, waits the settle delay and requests it again,
    /// returning that response's body.
    ///
    /// # Errors
    ///
    /// - `ProviderError::PreparationFailed` if a preparing answer is not 200
    /// - `ProviderError::PreparationTimedOut` if the poll budget runs out
    /// - `NetworkError::HttpError` if the final request is not successful
    /// - `Error::Cancelled` if `cancel` fires during a request or a wait
    /// - transport errors unchanged
    pub async fn download(
        &self,
        handle: &ResourceHandle,
        cancel: &CancellationToken,
        tx: &impl EventEmitter,
    ) -> Result<ArchiveStream, Error> {
        let url = handle.bag_url();
        tx.emit_debug(format!("Requesting bag {url}"));

        let mut response = self.request(&url, cancel).await?;
        let mut polls = 1u32;
        let mut preparing = 0u32;
        let mut waited = Duration::ZERO;
        let mut wait = self.policy.interval;

        while !response.is_archive() {
            if response.status != 200 {
                tx.emit_fetch(FetchEvent::BagFailed {
                    url: url.clone(),
                    status: response.status,
                });
                return Err(ProviderError::PreparationFailed {
                    status: response.status,
                }
                .into());
            }

            preparing += 1;
            if self.policy.exhausted(preparing, waited, wait) {
                tx.emit_fetch(FetchEvent::BagTimedOut {
                    url: url.clone(),
                    attempts: preparing,
                    waited_secs: waited.as_secs(),
                });
                return Err(ProviderError::PreparationTimedOut {
                    attempts: preparing,
                    waited_secs: waited.as_secs(),
                }
                .into());
            }

            tx.emit_fetch(FetchEvent::BagPreparing {
                url: url.clone(),
                attempt: preparing,
                wait_secs: wait.as_secs(),
            });
            drop(response);

            pause(wait, cancel).await?;
            waited += wait;
            wait = self.policy.next_interval(wait);

            response = self.request(&url, cancel).await?;
            polls += 1;
        }
        drop(response);

        tx.emit_fetch(FetchEvent::BagReady {
            url: url.clone(),
            polls,
        });

        pause(self.policy.settle_delay, cancel).await?;
        let response = self.request(&url, cancel).await?;
        if !(200..300).contains(&response.status) {
            return Err(NetworkError::HttpError {
                status: response.status,
                message: format!("bag download from {url} failed"),
            }
            .into());
        }

        Ok(response.body)
    }

    async fn request(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<BundleResponse, Error> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = self.transport.request(url) => result,
        }
    }
}

async fn pause(wait: Duration, cancel: &CancellationToken) -> Result<(), Error> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        () = tokio::time::sleep(wait) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrofetch_events::{channel, drain_progress_lines};
    use hydrofetch_types::default_hosts;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Answers from a fixed script, repeating the last entry when exhausted
    struct ScriptedTransport {
        script: Mutex<VecDeque<(u16, Option<&'static str>, &'static [u8])>>,
        requests: AtomicUsize,
        sent_at: Mutex<Vec<Instant>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<(u16, Option<&'static str>, &'static [u8])>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: AtomicUsize::new(0),
                sent_at: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }

        /// Time between consecutive requests
        fn gaps(&self) -> Vec<Duration> {
            let sent_at = self.sent_at.lock().unwrap();
            sent_at.windows(2).map(|pair| pair[1] - pair[0]).collect()
        }
    }

    #[async_trait]
    impl BundleTransport for ScriptedTransport {
        async fn request(&self, url: &str) -> Result<BundleResponse, Error> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.sent_at.lock().unwrap().push(Instant::now());
            let mut script = self.script.lock().unwrap();
            let (status, content_type, body) = if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                *script.front().unwrap()
            };
            Ok(BundleResponse {
                status,
                content_type: content_type.map(str::to_string),
                body: ArchiveStream::from_bytes(url, body.to_vec()),
            })
        }
    }

    const EMPTY: &[u8] = b"";
    const PREPARING: (u16, Option<&str>, &[u8]) = (200, Some("text/html; charset=utf-8"), EMPTY);
    const READY: (u16, Option<&str>, &[u8]) = (200, Some("application/zip"), b"PK");

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(5),
            settle_delay: Duration::from_millis(1),
            backoff_multiplier: 1.0,
            max_interval: Duration::from_millis(50),
            max_attempts: None,
            max_wait: None,
        }
    }

    fn handle() -> ResourceHandle {
        ResourceHandle {
            resource_id: "abc123".to_string(),
            host: default_hosts()[0].clone(),
        }
    }

    #[tokio::test]
    async fn test_ready_immediately_settles_then_refetches() {
        let transport = ScriptedTransport::new(vec![READY]);
        let downloader = BundleDownloader::new(transport.clone(), fast_policy());
        let (tx, mut rx) = channel();

        let body = downloader
            .download(&handle(), &CancellationToken::new(), &tx)
            .await
            .unwrap();

        assert_eq!(body.content_length(), Some(2));
        assert_eq!(transport.requests(), 2);
        assert!(drain_progress_lines(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_preparing_answers_produce_progress_lines() {
        let transport = ScriptedTransport::new(vec![PREPARING, PREPARING, PREPARING, READY]);
        let policy = PollPolicy {
            interval: Duration::from_secs(0),
            ..fast_policy()
        };
        let downloader = BundleDownloader::new(transport.clone(), policy);
        let (tx, mut rx) = channel();

        downloader
            .download(&handle(), &CancellationToken::new(), &tx)
            .await
            .unwrap();

        // three preparing polls, the ready poll and the download itself
        assert_eq!(transport.requests(), 5);
        let lines = drain_progress_lines(&mut rx);
        assert_eq!(
            lines,
            vec!["Bag is being prepared, requesting again in 0 seconds."; 3]
        );
    }

    #[tokio::test]
    async fn test_non_ok_status_fails_preparation() {
        let transport = ScriptedTransport::new(vec![(503, Some("text/html"), EMPTY)]);
        let downloader = BundleDownloader::new(transport.clone(), fast_policy());
        let (tx, mut rx) = channel();

        let err = downloader
            .download(&handle(), &CancellationToken::new(), &tx)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Provider(ProviderError::PreparationFailed { status: 503 })
        ));
        assert_eq!(err.to_string(), "provider error: failed to download bag, status code 503");
        assert_eq!(transport.requests(), 1);
        assert_eq!(
            drain_progress_lines(&mut rx),
            vec!["Failed to download bag. status code 503."]
        );
    }

    #[tokio::test]
    async fn test_zip_with_error_status_is_still_ready() {
        // Readiness is decided by content type alone
        let transport = ScriptedTransport::new(vec![(404, Some("application/zip"), EMPTY), READY]);
        let downloader = BundleDownloader::new(transport.clone(), fast_policy());
        let (tx, _rx) = channel();

        assert!(downloader
            .download(&handle(), &CancellationToken::new(), &tx)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_failed_final_request_is_http_error() {
        let transport = ScriptedTransport::new(vec![READY, (500, None, EMPTY)]);
        let downloader = BundleDownloader::new(transport, fast_policy());
        let (tx, _rx) = channel();

        let err = downloader
            .download(&handle(), &CancellationToken::new(), &tx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::HttpError { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_attempt_budget_bounds_the_loop() {
        let transport = ScriptedTransport::new(vec![PREPARING]);
        let policy = PollPolicy {
            interval: Duration::from_secs(0),
            max_attempts: Some(3),
            ..fast_policy()
        };
        let downloader = BundleDownloader::new(transport.clone(), policy);
        let (tx, mut rx) = channel();

        let err = downloader
            .download(&handle(), &CancellationToken::new(), &tx)
            .await
            .unwrap_err();

        // three answers are waited out, the fourth gives up
        assert!(matches!(
            err,
            Error::Provider(ProviderError::PreparationTimedOut { attempts: 4, .. })
        ));
        assert_eq!(transport.requests(), 4);
        let lines = drain_progress_lines(&mut rx);
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[3],
            "Bag was not ready after 4 attempts and 0 seconds, giving up."
        );
    }

    #[tokio::test]
    async fn test_single_attempt_budget_waits_once() {
        let transport = ScriptedTransport::new(vec![PREPARING, READY]);
        let policy = PollPolicy {
            interval: Duration::from_secs(0),
            max_attempts: Some(1),
            ..fast_policy()
        };
        let downloader = BundleDownloader::new(transport.clone(), policy);
        let (tx, mut rx) = channel();

        let body = downloader
            .download(&handle(), &CancellationToken::new(), &tx)
            .await
            .unwrap();

        assert_eq!(body.content_length(), Some(2));
        assert_eq!(transport.requests(), 3);
        assert_eq!(
            drain_progress_lines(&mut rx),
            vec!["Bag is being prepared, requesting again in 0 seconds."]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_polls_and_settles_before_download() {
        let transport = ScriptedTransport::new(vec![PREPARING, PREPARING, READY]);
        let policy = PollPolicy {
            interval: Duration::from_secs(10),
            settle_delay: Duration::from_secs(1),
            backoff_multiplier: 1.0,
            max_interval: Duration::from_secs(60),
            max_attempts: None,
            max_wait: None,
        };
        let downloader = BundleDownloader::new(transport.clone(), policy);
        let (tx, _rx) = channel();

        downloader
            .download(&handle(), &CancellationToken::new(), &tx)
            .await
            .unwrap();

        // two polling sleeps, then the settle pause before the final request
        assert_eq!(
            transport.gaps(),
            vec![
                Duration::from_secs(10),
                Duration::from_secs(10),
                Duration::from_secs(1),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_stretches_the_sleeps() {
        let transport = ScriptedTransport::new(vec![PREPARING, PREPARING, PREPARING, READY]);
        let policy = PollPolicy {
            interval: Duration::from_secs(10),
            settle_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_secs(30),
            max_attempts: None,
            max_wait: None,
        };
        let downloader = BundleDownloader::new(transport.clone(), policy);
        let (tx, _rx) = channel();

        downloader
            .download(&handle(), &CancellationToken::new(), &tx)
            .await
            .unwrap();

        assert_eq!(
            transport.gaps(),
            vec![
                Duration::from_secs(10),
                Duration::from_secs(20),
                Duration::from_secs(30),
                Duration::from_secs(1),
            ]
        );
    }

    #[tokio::test]
    async fn test_wait_budget_bounds_the_loop() {
        let transport = ScriptedTransport::new(vec![PREPARING]);
        let policy = PollPolicy {
            interval: Duration::from_millis(10),
            max_wait: Some(Duration::from_millis(25)),
            ..fast_policy()
        };
        let downloader = BundleDownloader::new(transport.clone(), policy);
        let (tx, mut rx) = channel();

        let err = downloader
            .download(&handle(), &CancellationToken::new(), &tx)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Provider(ProviderError::PreparationTimedOut { attempts: 3, .. })
        ));
        assert_eq!(transport.requests(), 3);
        assert_eq!(
            drain_progress_lines(&mut rx).last().map(String::as_str),
            Some("Bag was not ready after 3 attempts and 0 seconds, giving up.")
        );
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_the_wait() {
        let transport = ScriptedTransport::new(vec![PREPARING]);
        let policy = PollPolicy {
            interval: Duration::from_secs(3600),
            ..fast_policy()
        };
        let downloader = BundleDownloader::new(transport.clone(), policy);
        let (tx, _rx) = channel();
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = downloader
            .download(&handle(), &cancel, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(transport.requests(), 1);
    }

    #[test]
    fn test_backoff_grows_to_cap() {
        let policy = PollPolicy {
            interval: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_secs(30),
            ..PollPolicy::default()
        };
        let second = policy.next_interval(policy.interval);
        let third = policy.next_interval(second);
        assert_eq!(second, Duration::from_secs(20));
        assert_eq!(third, Duration::from_secs(30));
        assert_eq!(policy.next_interval(third), Duration::from_secs(30));
    }

    #[test]
    fn test_default_policy_keeps_fixed_interval() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(10));
        assert_eq!(policy.settle_delay, Duration::from_secs(1));
        assert_eq!(policy.next_interval(policy.interval), policy.interval);
        assert_eq!(policy.max_wait, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_content_type_essence() {
        let response = |content_type: Option<&str>| BundleResponse {
            status: 200,
            content_type: content_type.map(str::to_string),
            body: ArchiveStream::from_bytes("memory://", Vec::new()),
        };
        assert!(response(Some("application/zip")).is_archive());
        assert!(response(Some("Application/ZIP; name=bag.zip")).is_archive());
        assert!(!response(Some("application/zipper")).is_archive());
        assert!(!response(Some("text/html")).is_archive());
        assert!(!response(None).is_archive());
    }
}
