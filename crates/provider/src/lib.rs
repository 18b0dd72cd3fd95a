#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Content providers for hydrofetch
//!
//! A content provider recognises identifiers it can serve (`detect`) and
//! materialises the resource behind them into a directory (`fetch`). The
//! HydroShare provider resolves DOIs, matches the resulting URL against the
//! host table, waits for the host to prepare the resource bag and extracts
//! its `data/contents` subtree.

pub mod extract;
pub mod hosts;
pub mod hydroshare;
pub mod poll;

pub use extract::{contents_path, extract_bundle, ExtractOptions, ExtractReport};
pub use hosts::match_resource;
pub use hydroshare::Hydroshare;
pub use poll::{BundleDownloader, BundleResponse, BundleTransport, PollPolicy};

use async_trait::async_trait;
use hydrofetch_errors::Error;
use hydrofetch_events::EventSender;
use hydrofetch_types::{HostDescriptor, ResourceHandle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// What `detect` hands back to the caller and `fetch` takes in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Resource id on the host
    pub resource: String,
    pub host: HostDescriptor,
}

impl ProviderSpec {
    /// Identifier of the fetched content, for caching and labelling
    #[must_use]
    pub fn content_id(&self) -> &str {
        &self.resource
    }
}

impl From<ResourceHandle> for ProviderSpec {
    fn from(handle: ResourceHandle) -> Self {
        Self {
            resource: handle.resource_id,
            host: handle.host,
        }
    }
}

impl From<ProviderSpec> for ResourceHandle {
    fn from(spec: ProviderSpec) -> Self {
        Self {
            resource_id: spec.resource,
            host: spec.host,
        }
    }
}

/// Summary of a completed fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    pub resource_id: String,
    pub host: String,
    pub output_dir: PathBuf,
    /// Entries placed directly under `output_dir`
    pub entries: Vec<String>,
    /// Size of the downloaded archive in bytes
    pub bytes: u64,
}

/// A source of fetchable content
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Short provider name
    fn name(&self) -> &str;

    /// Check whether this provider serves `identifier`.
    ///
    /// `None` means "not applicable" and lets the caller try the next
    /// provider. Apart from resolving the identifier this has no side
    /// effects.
    async fn detect(
        &self,
        identifier: &str,
        reference: Option<&str>,
        extra_args: &HashMap<String, String>,
    ) -> Option<ProviderSpec>;

    /// Materialise the detected content into `output_dir`
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be downloaded or extracted.
    /// Progress is reported on `tx` throughout.
    async fn fetch(
        &self,
        spec: &ProviderSpec,
        output_dir: &Path,
        tx: &EventSender,
    ) -> Result<FetchReport, Error>;

    /// Identifier of the content described by `spec`
    fn content_id<'a>(&self, spec: &'a ProviderSpec) -> &'a str {
        spec.content_id()
    }
}

/// Ask each provider in turn, returning the first that applies
pub async fn detect_provider<'p>(
    providers: &'p [Box<dyn ContentProvider>],
    identifier: &str,
    reference: Option<&str>,
    extra_args: &HashMap<String, String>,
) -> Option<(&'p dyn ContentProvider, ProviderSpec)> {
    for provider in providers {
        if let Some(spec) = provider.detect(identifier, reference, extra_args).await {
            return Some((provider.as_ref(), spec));
        }
    }
    None
}
