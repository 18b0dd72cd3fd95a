#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for hydrofetch
//!
//! This crate handles all HTTP operations: the pooled client, DOI
//! resolution through redirect following, and the archive byte stream
//! handed from the bag downloader to the extractor.

mod client;
mod resolve;
mod stream;

pub use client::{NetClient, NetConfig};
pub use resolve::{is_doi, normalize_doi, Resolver};
pub use stream::ArchiveStream;

use hydrofetch_errors::{Error, NetworkError};
use url::Url;

/// Check that `url` is an absolute http(s) URL
///
/// # Errors
///
/// Returns `NetworkError::InvalidUrl` if the URL is malformed and
/// `NetworkError::UnsupportedProtocol` if it is not http(s).
pub fn validate_url(url: &str) -> Result<Url, Error> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(NetworkError::UnsupportedProtocol {
            protocol: scheme.to_string(),
        }
        .into()),
    }
}
