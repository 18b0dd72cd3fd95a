//! Network-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("rate limited: retry after {seconds} seconds")]
    RateLimited { seconds: u64 },
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) => {
                Some("Check your network connection and retry.")
            }
            Self::InvalidUrl(_) | Self::UnsupportedProtocol { .. } => {
                Some("Pass a DOI or an http(s) URL of a supported host.")
            }
            Self::RateLimited { .. } => Some("Wait for the rate limit to expire, then retry."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::DownloadFailed(_)
            | Self::ConnectionRefused(_)
            | Self::RateLimited { .. } => true,
            Self::HttpError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "network.timeout",
            Self::DownloadFailed(_) => "network.download_failed",
            Self::ConnectionRefused(_) => "network.connection_refused",
            Self::InvalidUrl(_) => "network.invalid_url",
            Self::UnsupportedProtocol { .. } => "network.unsupported_protocol",
            Self::HttpError { .. } => "network.http_error",
            Self::RateLimited { .. } => "network.rate_limited",
        };
        Some(code)
    }
}
