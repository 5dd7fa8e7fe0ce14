//! HTTP middleware shared by every route
//!
//! Authentication lives in `crate::auth::guard`; this module holds the
//! cross-cutting layers.
//!
//! Author: hephaex@gmail.com

pub mod metrics;
pub mod security_headers;

pub use metrics::metrics_middleware;
pub use security_headers::security_headers_middleware;
