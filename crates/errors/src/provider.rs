//! Content provider error types (bag preparation and archive layout)

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("no content provider applies to {identifier}")]
    NotApplicable { identifier: String },

    #[error("failed to download bag, status code {status}")]
    PreparationFailed { status: u16 },

    #[error("bag still not ready after {attempts} polls ({waited_secs}s)")]
    PreparationTimedOut { attempts: u32, waited_secs: u64 },

    #[error("invalid archive: {message}")]
    ArchiveFormat { message: String },

    #[error("archive layout mismatch: expected {expected}")]
    LayoutMismatch { expected: String },
}

impl UserFacingError for ProviderError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotApplicable { .. } => {
                Some("Run `hydrofetch hosts` to list the supported hosting services.")
            }
            Self::PreparationTimedOut { .. } => {
                Some("Raise polling.max_wait in the configuration for very large resources.")
            }
            Self::LayoutMismatch { .. } => {
                Some("The resource bag does not follow the data/contents convention.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PreparationFailed { .. } | Self::PreparationTimedOut { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotApplicable { .. } => "provider.not_applicable",
            Self::PreparationFailed { .. } => "provider.preparation_failed",
            Self::PreparationTimedOut { .. } => "provider.preparation_timed_out",
            Self::ArchiveFormat { .. } => "provider.archive_format",
            Self::LayoutMismatch { .. } => "provider.layout_mismatch",
        };
        Some(code)
    }
}
