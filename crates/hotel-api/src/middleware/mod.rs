//! HTTP middleware applied to the whole router

pub mod cache;
pub mod metrics;
pub mod security_headers;

pub use cache::cache_control_middleware;
pub use metrics::metrics_middleware;
pub use security_headers::security_headers_middleware;
