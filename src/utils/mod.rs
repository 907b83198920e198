//! Shared utilities for service handlers

pub mod http_client;
pub mod human_format;

pub use http_client::UpstreamClient;
pub use human_format::format_metric;
