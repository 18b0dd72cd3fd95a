//! Built-in defaults shared by the configuration and the CLI

/// Directory name used under the platform config and data directories
pub const APP_DIR: &str = "hydrofetch";

/// Configuration file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Canonical DOI resolver
pub const DEFAULT_RESOLVER: &str = "https://doi.org/";

/// Seconds between two bag readiness polls
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Seconds to wait after the bag reports ready, before the final request
pub const DEFAULT_SETTLE_SECS: u64 = 1;

/// Upper bound on the total time spent waiting for a bag
pub const DEFAULT_MAX_WAIT_SECS: u64 = 3600;
