//! Badge service handlers
//!
//! Each handler is registered under the first path segment it serves:
//!
//! - `static`: badge content taken verbatim from the path
//! - `github`: license, latest tag/release and download counts
//! - `travis`: branch build state
//! - `aur`: Arch User Repository package metadata
//! - `liberapay`: donation amounts
//! - `twitch`: channel view counts (requires API credentials)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::cache::{Cache, SharedCache};
use crate::config::ConfigStore;
use crate::errors::{AppResult, HandlerResult};
use crate::utils::UpstreamClient;

pub mod aur;
pub mod github;
pub mod liberapay;
pub mod registry;
pub mod static_badge;
pub mod traits;
pub mod travis;
pub mod twitch;

pub use registry::ServiceRegistry;
pub use traits::{HandlerContext, ServiceDocumentation, ServiceHandler};

/// Collaborators shared by the built-in handlers
#[derive(Clone)]
pub struct HandlerDependencies {
    pub cache: SharedCache,
    pub http: UpstreamClient,
    pub config: Arc<ConfigStore>,
}

/// Register every built-in handler
pub fn register_builtin_handlers(
    registry: &mut ServiceRegistry,
    deps: &HandlerDependencies,
) -> AppResult<()> {
    registry.register("static", Arc::new(static_badge::StaticHandler))?;
    registry.register("github", Arc::new(github::GithubHandler::new(deps)?))?;
    registry.register("travis", Arc::new(travis::TravisHandler::new(deps)))?;
    registry.register("aur", Arc::new(aur::AurHandler::new(deps)))?;
    registry.register("liberapay", Arc::new(liberapay::LiberapayHandler::new(deps)))?;
    registry.register("twitch", Arc::new(twitch::TwitchHandler::new(deps)))?;
    Ok(())
}

/// Return the cached value for `namespace`/`key`, or run `fetch` and cache
/// its result for `ttl`
///
/// Failed fetches are never cached. Cache errors are logged and otherwise
/// ignored: a broken cache degrades to always fetching.
pub async fn cached_fetch<F, Fut>(
    cache: &dyn Cache,
    namespace: &str,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> HandlerResult<String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = HandlerResult<String>>,
{
    match cache.get(namespace, key) {
        Ok(Some(value)) => return Ok(value),
        Ok(None) => {}
        Err(e) => warn!(namespace, key, "Cache read failed: {}", e),
    }

    let value = fetch().await?;

    if let Err(e) = cache.set(namespace, key, &value, ttl) {
        warn!(namespace, key, "Cache write failed: {}", e);
    }
    Ok(value)
}

/// Percent-encode a user supplied value for use as a single URL path segment
pub(crate) fn path_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Base URL for an upstream API, overridable through the config store
pub(crate) fn api_base(config: &ConfigStore, key: &str, default: &str) -> String {
    config.str_or(key, default).trim_end_matches('/').to_string()
}
