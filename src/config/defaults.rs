//! Configuration default values
//!
//! Central place for every default used when the config file or a CLI flag
//! leaves a setting unspecified.
use std::time::Duration;

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(1500);

// Cache defaults
pub const DEFAULT_CACHE_URI: &str = "mem://";
pub const DEFAULT_CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_BADGE_TTL: Duration = Duration::from_secs(60 * 60);

// Upstream client defaults
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_USER_AGENT: &str = concat!("badge-gen/", env!("CARGO_PKG_VERSION"));

// Badge defaults
pub const DEFAULT_BADGE_COLOR: &str = "4c1";
