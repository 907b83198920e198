//! Centralized error handling for the badge service
//!
//! Errors are grouped by the layer that raises them:
//!
//! - **Application Errors**: startup, configuration and asset failures
//! - **Handler Errors**: parameter validation and upstream failures inside a service handler
//! - **Upstream Errors**: outbound HTTP calls against third-party APIs
//! - **Dispatch Errors**: registry lookups and handler execution as seen by the HTTP layer
//! - **Cache Errors**: result cache backends
//!
//! # Usage
//!
//! ```rust
//! use badge_gen::errors::{HandlerError, HandlerResult};
//!
//! fn check(params: &[String]) -> HandlerResult<()> {
//!     if params.len() < 2 {
//!         return Err(HandlerError::invalid_parameters("You need to provide title and text"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for service handler Results
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Convenience type alias for upstream API Results
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Convenience type alias for cache Results
pub type CacheResult<T> = Result<T, CacheError>;
