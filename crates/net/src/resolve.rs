//! Persistent identifier (DOI) detection and resolution

use crate::client::NetClient;
use hydrofetch_events::{EventEmitter, FetchEvent};
use regex::Regex;
use std::sync::LazyLock;

static DOI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^((https?://)?(dx\.)?doi\.org/|doi:\s*)?(10\.\d+(\.\d+)*/.+)$")
        .expect("DOI pattern is valid")
});

/// Check whether `value` is a DOI, bare or in one of its URL/`doi:` forms
#[must_use]
pub fn is_doi(value: &str) -> bool {
    DOI_REGEX.is_match(value.trim())
}

/// Strip resolver URLs and `doi:` prefixes, leaving the bare `10.x/...` DOI
#[must_use]
pub fn normalize_doi(value: &str) -> Option<String> {
    DOI_REGEX
        .captures(value.trim())
        .and_then(|caps| caps.get(4))
        .map(|m| m.as_str().to_string())
}

/// Resolves DOIs to the URL they currently redirect to.
#[derive(Clone)]
pub struct Resolver {
    client: NetClient,
    endpoint: String,
}

impl Resolver {
    /// Create a resolver querying `endpoint` (e.g. `https://doi.org/`)
    #[must_use]
    pub fn new(client: NetClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// URL queried for a normalized DOI
    #[must_use]
    pub fn doi_url(&self, doi: &str) -> String {
        format!("{}/{doi}", self.endpoint.trim_end_matches('/'))
    }

    /// Resolve `identifier` to a URL.
    ///
    /// DOIs are looked up at the resolver and the final redirect target is
    /// returned. Anything else is taken as a literal URL. A DOI that does not
    /// resolve, whether through an HTTP error or a transport failure, falls
    /// back to `identifier` exactly as given; this never fails.
    pub async fn resolve(&self, identifier: &str, tx: &impl EventEmitter) -> String {
        let Some(doi) = normalize_doi(identifier) else {
            return identifier.to_string();
        };

        tx.emit_fetch(FetchEvent::ResolutionStarted {
            identifier: identifier.to_string(),
        });

        let reason = match self.client.get(&self.doi_url(&doi)).await {
            Ok(response) if response.status().is_success() => {
                let url = response.url().to_string();
                tx.emit_fetch(FetchEvent::IdentifierResolved {
                    identifier: identifier.to_string(),
                    url: url.clone(),
                });
                return url;
            }
            Ok(response) => format!("resolver answered {}", response.status()),
            Err(e) => e.to_string(),
        };

        tx.emit_fetch(FetchEvent::ResolutionFallback {
            identifier: identifier.to_string(),
            reason,
        });
        identifier.to_string()
    }
}
