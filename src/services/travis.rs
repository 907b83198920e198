use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{HandlerContext, ServiceDocumentation, ServiceHandler};
use super::{HandlerDependencies, api_base, cached_fetch, path_segment};
use crate::badge::Badge;
use crate::cache::SharedCache;
use crate::config::ConfigStore;
use crate::errors::{HandlerError, HandlerResult, UpstreamContext};
use crate::utils::UpstreamClient;

const DEFAULT_API_URL: &str = "https://api.travis-ci.org";
const DEFAULT_BRANCH: &str = "master";
const STATE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize)]
struct BranchResponse {
    #[serde(default)]
    branch: Option<BranchState>,
}

#[derive(Debug, Deserialize)]
struct BranchState {
    #[serde(default)]
    state: String,
}

/// Travis CI build state: `/travis/<user>/<repo>[/<branch>]`
pub struct TravisHandler {
    http: UpstreamClient,
    cache: SharedCache,
    config: Arc<ConfigStore>,
}

impl TravisHandler {
    pub fn new(deps: &HandlerDependencies) -> Self {
        Self {
            http: deps.http.clone(),
            cache: deps.cache.clone(),
            config: deps.config.clone(),
        }
    }
}

fn state_color(state: &str) -> &'static str {
    match state {
        "passed" => "4c1",
        "failed" => "e05d44",
        "unknown" | "canceled" => "9f9f9f",
        _ => "lightgrey",
    }
}

#[async_trait]
impl ServiceHandler for TravisHandler {
    fn documentation(&self) -> Vec<ServiceDocumentation> {
        vec![ServiceDocumentation::new(
            "Travis-CI",
            "/travis/Luzifer/password",
            &["<user>", "<repo>", "[branch]"],
        )]
    }

    async fn handle(&self, ctx: &HandlerContext, params: &[String]) -> HandlerResult<Badge> {
        let [user, repo, rest @ ..] = params else {
            return Err(HandlerError::invalid_parameters(
                "You need to provide user and repo",
            ));
        };
        let branch = rest
            .first()
            .map(String::as_str)
            .filter(|branch| !branch.is_empty())
            .unwrap_or(DEFAULT_BRANCH);

        let path = format!(
            "repos/{}/{}/branches/{}",
            path_segment(user),
            path_segment(repo),
            path_segment(branch)
        );

        let state = cached_fetch(self.cache.as_ref(), "travis", &path, STATE_TTL, || async {
            let url = format!(
                "{}/{}",
                api_base(&self.config, "travis.api_url", DEFAULT_API_URL),
                path
            );
            let response: BranchResponse = self
                .http
                .fetch_json(ctx, self.http.get(&url))
                .await
                .context("fetching Travis branch state")?;

            Ok(response
                .branch
                .map(|b| b.state)
                .filter(|state| !state.is_empty())
                .unwrap_or_else(|| "unknown".to_string()))
        })
        .await?;

        let color = state_color(&state);
        Ok(Badge::new("travis", state, color))
    }
}
