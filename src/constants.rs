//! # System Constants
//!
//! Counter names and component identifiers shared by the monitor, the
//! policies and the cache facade.

/// Counter names recorded in the metrics registry
pub mod metrics {
    pub const CACHE_ACCESS: &str = "cache.access";
    pub const CACHE_UPDATE: &str = "cache.update";
    pub const CACHE_HIT: &str = "cache.hit";
    pub const CACHE_MISS: &str = "cache.miss";

    /// Every counter the monitor feeds
    pub const ALL_COUNTERS: &[&str] = &[CACHE_ACCESS, CACHE_UPDATE, CACHE_HIT, CACHE_MISS];
}

/// Component names used for circuit breakers and log fields
pub mod components {
    pub const CACHE_BACKEND: &str = "cache_backend";
    pub const ADAPTIVE_CONTROLLER: &str = "adaptive_controller";
}
