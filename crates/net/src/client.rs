//! HTTP client with connection pooling and retry logic

use hydrofetch_config::NetworkConfig;
use hydrofetch_errors::{Error, NetworkError};
use reqwest::{redirect, Client, Response};
use std::time::Duration;

/// Maximum number of redirects followed when resolving identifiers
const MAX_REDIRECTS: usize = 10;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600), // 10 minutes for large bags
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 4,
            retry_count: 0,
            retry_delay: Duration::from_secs(1),
            user_agent: format!("hydrofetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&NetworkConfig> for NetConfig {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout),
            connect_timeout: Duration::from_secs(config.connect_timeout),
            retry_count: config.retries,
            retry_delay: Duration::from_secs(config.retry_delay),
            ..Self::default()
        }
    }
}

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created due to invalid configuration
    /// or if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::ConnectionRefused(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(NetConfig::default())
    }

    /// Execute a GET request, following redirects
    ///
    /// Any HTTP status is returned as a response; only transport failures
    /// are errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after all retry attempts, including
    /// network timeouts and connection failures.
    pub async fn get(&self, url: &str) -> Result<Response, Error> {
        self.retry_request(|| self.client.get(url).send()).await
    }

    /// Execute a request with retries
    async fn retry_request<F, Fut>(&self, mut f: F) -> Result<Response, Error>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_delay * attempt).await;
            }

            match f().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let retry = Self::should_retry(&e);
                    last_error = Some(e);

                    // Don't retry on certain errors
                    if !retry {
                        break;
                    }
                }
            }
        }

        // Convert the last error
        match last_error {
            Some(e) => Err(Self::classify(&e).into()),
            None => Err(NetworkError::DownloadFailed("Unknown error".to_string()).into()),
        }
    }

    /// Map a transport error onto the network error taxonomy
    fn classify(error: &reqwest::Error) -> NetworkError {
        if error.is_timeout() {
            NetworkError::Timeout {
                url: error
                    .url()
                    .map(std::string::ToString::to_string)
                    .unwrap_or_default(),
            }
        } else if error.is_connect() {
            NetworkError::ConnectionRefused(error.to_string())
        } else if error.is_builder() {
            NetworkError::InvalidUrl(error.to_string())
        } else {
            NetworkError::DownloadFailed(error.to_string())
        }
    }

    /// Determine if an error should be retried
    fn should_retry(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect()
    }
}
