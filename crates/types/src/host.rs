//! Hosting services and matched resources

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A hosting service that serves resources as downloadable bags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDescriptor {
    /// Human readable service name
    pub name: String,
    /// URL prefixes under which the service publishes resource pages
    pub hostnames: Vec<String>,
    /// Endpoint the resource id is appended to when requesting a bag
    pub bag_endpoint: String,
}

impl HostDescriptor {
    /// Check whether `url` lives under one of this host's prefixes
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.hostnames.iter().any(|prefix| url.starts_with(prefix))
    }

    /// Build the bag download URL for a resource
    #[must_use]
    pub fn bag_url(&self, resource_id: &str) -> String {
        format!("{}{resource_id}", self.bag_endpoint)
    }
}

static DEFAULT_HOSTS: LazyLock<Vec<HostDescriptor>> = LazyLock::new(|| {
    vec![HostDescriptor {
        name: "HydroShare".to_string(),
        hostnames: vec![
            "https://www.hydroshare.org/resource/".to_string(),
            "http://www.hydroshare.org/resource/".to_string(),
        ],
        bag_endpoint: "https://www.hydroshare.org/django_irods/download/bags/".to_string(),
    }]
});

/// The built-in table of known hosting services
#[must_use]
pub fn default_hosts() -> &'static [HostDescriptor] {
    &DEFAULT_HOSTS
}

/// A resource matched against a known host.
///
/// `resource_id` is never empty; it is the last path segment of the matched
/// URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub resource_id: String,
    pub host: HostDescriptor,
}

impl ResourceHandle {
    /// The bag download URL for this resource
    #[must_use]
    pub fn bag_url(&self) -> String {
        self.host.bag_url(&self.resource_id)
    }
}
