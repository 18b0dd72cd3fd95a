use serde::{Deserialize, Serialize};

/// Events of a single fetch: identifier resolution, bag polling, download
/// and selective extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FetchEvent {
    /// Identifier looks like a DOI and is being resolved
    ResolutionStarted { identifier: String },

    /// Identifier resolved to a concrete URL
    IdentifierResolved { identifier: String, url: String },

    /// Resolution failed; the identifier is used as a literal URL
    ResolutionFallback { identifier: String, reason: String },

    /// A provider applies to the resolved URL
    ResourceDetected { resource_id: String, host: String },

    /// Fetch of a matched resource started
    FetchStarted { resource_id: String, host: String },

    /// The bag is still being prepared server side
    BagPreparing {
        url: String,
        attempt: u32,
        wait_secs: u64,
    },

    /// Bag preparation returned a non-success status
    BagFailed { url: String, status: u16 },

    /// The poll budget ran out while the bag was still being prepared
    BagTimedOut {
        url: String,
        attempts: u32,
        waited_secs: u64,
    },

    /// The bag is ready for download
    BagReady { url: String, polls: u32 },

    /// The bag was downloaded to the scratch directory
    Downloaded { resource_id: String, bytes: u64 },

    /// One entry of the content subtree was moved into the output directory
    EntryRelocated { name: String },

    /// All content was relocated
    Finished {
        resource_id: String,
        entries: usize,
    },

    /// The scratch directory could not be removed
    CleanupFailed { path: String, error: String },

    /// The fetch failed
    Failed {
        resource_id: String,
        failure: super::FailureContext,
    },
}

impl FetchEvent {
    /// The progress line shown to the user, if this event produces one
    #[must_use]
    pub fn progress_line(&self) -> Option<String> {
        match self {
            Self::FetchStarted { resource_id, host } => {
                Some(format!("Fetching {host} Resource {resource_id}."))
            }
            Self::BagPreparing { wait_secs, .. } => Some(format!(
                "Bag is being prepared, requesting again in {wait_secs} seconds."
            )),
            Self::BagFailed { status, .. } => {
                Some(format!("Failed to download bag. status code {status}."))
            }
            Self::BagTimedOut {
                attempts,
                waited_secs,
                ..
            } => Some(format!(
                "Bag was not ready after {attempts} attempts and {waited_secs} seconds, giving up."
            )),
            Self::Downloaded { .. } => Some("Downloaded, unpacking contents.".to_string()),
            Self::Finished { .. } => Some("Finished, cleaning up.".to_string()),
            _ => None,
        }
    }
}
