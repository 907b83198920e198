use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{HandlerContext, ServiceDocumentation, ServiceHandler};
use super::{HandlerDependencies, api_base, cached_fetch, path_segment};
use crate::badge::Badge;
use crate::cache::SharedCache;
use crate::config::ConfigStore;
use crate::errors::{HandlerError, HandlerResult, UpstreamContext, UpstreamError, UpstreamResult};
use crate::utils::UpstreamClient;

const DEFAULT_API_URL: &str = "https://liberapay.com";
const LIBERAPAY_COLOR: &str = "ffee16";
const PROFILE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Deserialize)]
struct PublicProfile {
    #[serde(default)]
    giving: Option<Amount>,
    #[serde(default)]
    receiving: Option<Amount>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    amount: AmountValue,
    currency: String,
}

/// Liberapay encodes amounts as decimal strings; plain numbers are accepted too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AmountValue {
    Text(String),
    Number(f64),
}

impl Amount {
    fn format(&self) -> UpstreamResult<String> {
        let value = match &self.amount {
            AmountValue::Number(value) => *value,
            AmountValue::Text(text) => text.trim().parse::<f64>().map_err(|e| {
                UpstreamError::decode("liberapay profile", format!("invalid amount '{text}': {e}"))
            })?,
        };
        Ok(format!("{:.2} {}", value, self.currency))
    }
}

/// Liberapay donations: `/liberapay/<user>/<receiving|giving>`
pub struct LiberapayHandler {
    http: UpstreamClient,
    cache: SharedCache,
    config: Arc<ConfigStore>,
}

impl LiberapayHandler {
    pub fn new(deps: &HandlerDependencies) -> Self {
        Self {
            http: deps.http.clone(),
            cache: deps.cache.clone(),
            config: deps.config.clone(),
        }
    }
}

#[async_trait]
impl ServiceHandler for LiberapayHandler {
    fn documentation(&self) -> Vec<ServiceDocumentation> {
        vec![
            ServiceDocumentation::new(
                "LiberaPay Amount Receiving",
                "/liberapay/liberapay/receiving",
                &["<user>", "receiving"],
            ),
            ServiceDocumentation::new(
                "LiberaPay Amount Giving",
                "/liberapay/Nutomic/giving",
                &["<user>", "giving"],
            ),
        ]
    }

    async fn handle(&self, ctx: &HandlerContext, params: &[String]) -> HandlerResult<Badge> {
        let [user, direction, ..] = params else {
            return Err(HandlerError::invalid_parameters(
                "You need to provide user and payment direction",
            ));
        };
        let receiving = match direction.as_str() {
            "receiving" => true,
            "giving" => false,
            other => {
                return Err(HandlerError::invalid_parameters(format!(
                    "{other:?} is an invalid payment direction"
                )));
            }
        };

        let cache_key = format!("{user}:{direction}");
        let text = cached_fetch(self.cache.as_ref(), "liberapay", &cache_key, PROFILE_TTL, || async {
            let url = format!(
                "{}/{}/public.json",
                api_base(&self.config, "liberapay.api_url", DEFAULT_API_URL),
                path_segment(user)
            );
            let profile: PublicProfile = self
                .http
                .fetch_json(ctx, self.http.get(&url))
                .await
                .context("fetching Liberapay profile")?;

            let amount = if receiving { profile.receiving } else { profile.giving };
            match amount {
                Some(amount) => amount.format().context("reading Liberapay amount"),
                None => Ok("hidden".to_string()),
            }
        })
        .await?;

        Ok(Badge::new(direction.as_str(), text, LIBERAPAY_COLOR))
    }
}
