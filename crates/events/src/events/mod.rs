use serde::{Deserialize, Serialize};

use hydrofetch_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, when the error carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(str::to_string),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(str::to_string),
            retryable: error.is_retryable(),
        }
    }
}

pub mod fetch;
pub mod general;

pub use fetch::*;
pub use general::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Diagnostics outside the fetch flow
    General(GeneralEvent),

    /// Resolution, bag polling and extraction events
    Fetch(FetchEvent),
}

impl AppEvent {
    /// The line shown to the user for this event, if it has one
    #[must_use]
    pub fn progress_line(&self) -> Option<String> {
        match self {
            Self::Fetch(event) => event.progress_line(),
            Self::General(_) => None,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::Fetch(
                FetchEvent::BagFailed { .. }
                | FetchEvent::BagTimedOut { .. }
                | FetchEvent::Failed { .. },
            ) => Level::ERROR,

            // Warning-level events
            Self::Fetch(
                FetchEvent::ResolutionFallback { .. } | FetchEvent::CleanupFailed { .. },
            ) => Level::WARN,

            // Debug-level events
            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Fetch(
                FetchEvent::EntryRelocated { .. } | FetchEvent::ResolutionStarted { .. },
            ) => Level::DEBUG,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }
}
