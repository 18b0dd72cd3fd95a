//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so the
//! JSON debug log carries the same information the progress display shows.

use hydrofetch_events::{AppEvent, FetchEvent, GeneralEvent};
use tracing::{debug, error, info, warn};

/// Log an `AppEvent` at its level with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    match event {
        AppEvent::Fetch(fetch_event) => log_fetch_event(fetch_event),
        AppEvent::General(general_event) => log_general_event(general_event),
    }
}

fn log_fetch_event(event: &FetchEvent) {
    match event {
        FetchEvent::ResolutionStarted { identifier } => {
            debug!(
                target: "hydrofetch::events::fetch",
                identifier = %identifier,
                "Resolving identifier"
            );
        }
        FetchEvent::IdentifierResolved { identifier, url } => {
            info!(
                target: "hydrofetch::events::fetch",
                identifier = %identifier,
                url = %url,
                "Identifier resolved"
            );
        }
        FetchEvent::ResolutionFallback { identifier, reason } => {
            warn!(
                target: "hydrofetch::events::fetch",
                identifier = %identifier,
                reason = %reason,
                "Identifier did not resolve, using it as a URL"
            );
        }
        FetchEvent::ResourceDetected { resource_id, host } => {
            info!(
                target: "hydrofetch::events::fetch",
                resource_id = %resource_id,
                host = %host,
                "Resource detected"
            );
        }
        FetchEvent::FetchStarted { resource_id, host } => {
            info!(
                target: "hydrofetch::events::fetch",
                resource_id = %resource_id,
                host = %host,
                "Fetch started"
            );
        }
        FetchEvent::BagPreparing {
            url,
            attempt,
            wait_secs,
        } => {
            info!(
                target: "hydrofetch::events::fetch",
                url = %url,
                attempt = attempt,
                wait_secs = wait_secs,
                "Bag is being prepared"
            );
        }
        FetchEvent::BagFailed { url, status } => {
            error!(
                target: "hydrofetch::events::fetch",
                url = %url,
                status = status,
                "Bag preparation failed"
            );
        }
        FetchEvent::BagTimedOut {
            url,
            attempts,
            waited_secs,
        } => {
            error!(
                target: "hydrofetch::events::fetch",
                url = %url,
                attempts = attempts,
                waited_secs = waited_secs,
                "Gave up waiting for bag"
            );
        }
        FetchEvent::BagReady { url, polls } => {
            info!(
                target: "hydrofetch::events::fetch",
                url = %url,
                polls = polls,
                "Bag ready"
            );
        }
        FetchEvent::Downloaded { resource_id, bytes } => {
            info!(
                target: "hydrofetch::events::fetch",
                resource_id = %resource_id,
                bytes = bytes,
                "Bag downloaded"
            );
        }
        FetchEvent::EntryRelocated { name } => {
            debug!(
                target: "hydrofetch::events::fetch",
                name = %name,
                "Entry relocated"
            );
        }
        FetchEvent::Finished {
            resource_id,
            entries,
        } => {
            info!(
                target: "hydrofetch::events::fetch",
                resource_id = %resource_id,
                entries = entries,
                "Fetch finished"
            );
        }
        FetchEvent::CleanupFailed { path, error } => {
            warn!(
                target: "hydrofetch::events::fetch",
                path = %path,
                error = %error,
                "Scratch directory cleanup failed"
            );
        }
        FetchEvent::Failed {
            resource_id,
            failure,
        } => {
            error!(
                target: "hydrofetch::events::fetch",
                resource_id = %resource_id,
                retryable = failure.retryable,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Fetch failed"
            );
        }
    }
}

fn log_general_event(event: &GeneralEvent) {
    match event {
        GeneralEvent::DebugLog { message, context } => {
            debug!(
                target: "hydrofetch::events::general",
                context = ?context,
                "{message}"
            );
        }
    }
}
