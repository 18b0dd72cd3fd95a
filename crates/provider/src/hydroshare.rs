//! HydroShare content provider

use crate::extract::{extract_bundle, ExtractOptions};
use crate::hosts::match_resource;
use crate::poll::{BundleDownloader, BundleTransport, PollPolicy};
use crate::{ContentProvider, FetchReport, ProviderSpec};
use async_trait::async_trait;
use hydrofetch_config::Config;
use hydrofetch_errors::Error;
use hydrofetch_events::{EventEmitter, EventSender, FailureContext, FetchEvent};
use hydrofetch_net::{validate_url, NetClient, NetConfig, Resolver};
use hydrofetch_types::{HostDescriptor, ResourceHandle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Fetches HydroShare resources by DOI or resource URL.
///
/// Holds no per-resource state: the resource id travels in the
/// [`ProviderSpec`] returned by `detect`, so one instance can serve any
/// number of detections and fetches.
pub struct Hydroshare {
    resolver: Resolver,
    hosts: Vec<HostDescriptor>,
    downloader: BundleDownloader,
    extract: ExtractOptions,
    cancel: CancellationToken,
    event_tx: Option<EventSender>,
}

impl Hydroshare {
    #[must_use]
    pub fn new(
        transport: Arc<dyn BundleTransport>,
        resolver: Resolver,
        hosts: Vec<HostDescriptor>,
        policy: PollPolicy,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            resolver,
            hosts,
            downloader: BundleDownloader::new(transport, policy),
            extract: ExtractOptions { scratch_root },
            cancel: CancellationToken::new(),
            event_tx: None,
        }
    }

    /// Build a provider from loaded configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the resolver endpoint or a bag endpoint is not an
    /// http(s) URL, or if the HTTP client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        validate_url(&config.resolver.endpoint)?;
        let hosts = config.hosts();
        for host in &hosts {
            validate_url(&host.bag_endpoint)?;
        }

        let client = NetClient::new(NetConfig::from(&config.network))?;
        let resolver = Resolver::new(client.clone(), config.resolver.endpoint.clone());

        Ok(Self::new(
            Arc::new(client),
            resolver,
            hosts,
            PollPolicy::from(&config.polling),
            config.scratch_root(),
        ))
    }

    /// Report resolution and detection events on `tx`
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Abort running fetches when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn hosts(&self) -> &[HostDescriptor] {
        &self.hosts
    }

    async fn download_and_extract(
        &self,
        handle: &ResourceHandle,
        output_dir: &Path,
        tx: &EventSender,
    ) -> Result<FetchReport, Error> {
        let cancel = self.cancel.child_token();
        let stream = self.downloader.download(handle, &cancel, tx).await?;
        let report =
            extract_bundle(stream, &handle.resource_id, output_dir, &self.extract, tx).await?;

        Ok(FetchReport {
            resource_id: report.resource_id,
            host: handle.host.name.clone(),
            output_dir: report.output_dir,
            entries: report.entries,
            bytes: report.bytes,
        })
    }
}

#[async_trait]
impl ContentProvider for Hydroshare {
    fn name(&self) -> &str {
        "hydroshare"
    }

    async fn detect(
        &self,
        identifier: &str,
        _reference: Option<&str>,
        _extra_args: &HashMap<String, String>,
    ) -> Option<ProviderSpec> {
        let url = self.resolver.resolve(identifier, &self.event_tx).await;
        let handle = match_resource(&url, &self.hosts)?;

        self.event_tx.emit_fetch(FetchEvent::ResourceDetected {
            resource_id: handle.resource_id.clone(),
            host: handle.host.name.clone(),
        });
        Some(handle.into())
    }

    async fn fetch(
        &self,
        spec: &ProviderSpec,
        output_dir: &Path,
        tx: &EventSender,
    ) -> Result<FetchReport, Error> {
        let handle = ResourceHandle::from(spec.clone());
        tx.emit_fetch(FetchEvent::FetchStarted {
            resource_id: handle.resource_id.clone(),
            host: handle.host.name.clone(),
        });

        match self.download_and_extract(&handle, output_dir, tx).await {
            Ok(report) => Ok(report),
            Err(e) => {
                tx.emit_fetch(FetchEvent::Failed {
                    resource_id: handle.resource_id,
                    failure: FailureContext::from_error(&e),
                });
                Err(e)
            }
        }
    }
}
