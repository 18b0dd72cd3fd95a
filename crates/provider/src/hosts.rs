//! Matching resolved URLs against known hosting services

use hydrofetch_types::{HostDescriptor, ResourceHandle};

/// Match `url` against `hosts`, returning the first host that serves it.
///
/// The resource id is the last path segment of `url` once trailing slashes
/// are stripped. A URL that names no resource on a host (a bare prefix) is
/// offered to the next host; matching no host at all is `None`.
#[must_use]
pub fn match_resource(url: &str, hosts: &[HostDescriptor]) -> Option<ResourceHandle> {
    hosts.iter().find_map(|host| resource_on(url, host))
}

fn resource_on(url: &str, host: &HostDescriptor) -> Option<ResourceHandle> {
    if !host.matches(url) {
        return None;
    }

    // The prefix alone names no resource
    let past_prefix = host
        .hostnames
        .iter()
        .filter_map(|prefix| url.strip_prefix(prefix.as_str()))
        .any(|rest| !rest.trim_matches('/').is_empty());
    if !past_prefix {
        return None;
    }

    let resource_id = url.trim_end_matches('/').rsplit('/').next()?;
    if resource_id.is_empty() {
        return None;
    }

    Some(ResourceHandle {
        resource_id: resource_id.to_string(),
        host: host.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrofetch_types::default_hosts;

    #[test]
    fn test_match_hydroshare_resource() {
        let handle = match_resource(
            "https://www.hydroshare.org/resource/b8f6eae9d89241cf8b5904033460af61/",
            default_hosts(),
        )
        .unwrap();

        assert_eq!(handle.resource_id, "b8f6eae9d89241cf8b5904033460af61");
        assert_eq!(handle.host.name, "HydroShare");
    }

    #[test]
    fn test_trailing_slashes_are_ignored() {
        let with = match_resource("http://www.hydroshare.org/resource/abc//", default_hosts());
        let without = match_resource("http://www.hydroshare.org/resource/abc", default_hosts());
        assert_eq!(with, without);
        assert_eq!(with.unwrap().resource_id, "abc");
    }

    #[test]
    fn test_unknown_host_is_not_applicable() {
        assert!(match_resource("https://zenodo.org/record/3242074", default_hosts()).is_none());
        assert!(match_resource("10.4211/hs.abc", default_hosts()).is_none());
    }

    #[test]
    fn test_bare_prefix_has_no_resource() {
        assert!(match_resource("https://www.hydroshare.org/resource/", default_hosts()).is_none());
        assert!(match_resource("https://www.hydroshare.org/resource//", default_hosts()).is_none());
    }

    #[test]
    fn test_first_matching_host_wins() {
        let hosts = vec![
            HostDescriptor {
                name: "Mirror".to_string(),
                hostnames: vec!["https://mirror.example/resource/".to_string()],
                bag_endpoint: "https://mirror.example/bags/".to_string(),
            },
            HostDescriptor {
                name: "Catch-all".to_string(),
                hostnames: vec!["https://".to_string()],
                bag_endpoint: "https://elsewhere.example/bags/".to_string(),
            },
        ];

        let handle = match_resource("https://mirror.example/resource/xyz", &hosts).unwrap();
        assert_eq!(handle.host.name, "Mirror");
        assert_eq!(handle.bag_url(), "https://mirror.example/bags/xyz");
    }

    #[test]
    fn test_bare_prefix_falls_through_to_next_host() {
        let hosts = vec![
            HostDescriptor {
                name: "Resources".to_string(),
                hostnames: vec!["https://data.example.org/resource/".to_string()],
                bag_endpoint: "https://data.example.org/bags/".to_string(),
            },
            HostDescriptor {
                name: "Site".to_string(),
                hostnames: vec!["https://data.example.org/".to_string()],
                bag_endpoint: "https://data.example.org/site/bags/".to_string(),
            },
        ];

        let handle = match_resource("https://data.example.org/resource/abc", &hosts).unwrap();
        assert_eq!(handle.host.name, "Resources");
        assert_eq!(handle.resource_id, "abc");

        // bare on the first host, a resource on the second
        let handle = match_resource("https://data.example.org/resource/", &hosts).unwrap();
        assert_eq!(handle.host.name, "Site");
        assert_eq!(handle.resource_id, "resource");

        assert!(match_resource("https://data.example.org/", &hosts).is_none());
    }
}
