//! GitHub repository badges
//!
//! Commands:
//!
//! - `license/<user>/<repo>`
//! - `latest-tag/<user>/<repo>`
//! - `latest-release/<user>/<repo>`
//! - `downloads/<user>/<repo>[/<tag or "latest">[/<asset>]]`
//!
//! Requests are authenticated with basic auth when `github.personal_token`
//! is configured, which raises the API rate limit considerably.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::traits::{HandlerContext, ServiceDocumentation, ServiceHandler};
use super::{HandlerDependencies, api_base, cached_fetch, path_segment};
use crate::badge::Badge;
use crate::cache::SharedCache;
use crate::config::ConfigStore;
use crate::errors::{AppError, AppResult, HandlerError, HandlerResult, UpstreamContext, UpstreamResult};
use crate::utils::http_client::read_json;
use crate::utils::{UpstreamClient, format_metric};

const DEFAULT_API_URL: &str = "https://api.github.com";
const GITHUB_JSON: &str = "application/vnd.github+json";

const LICENSE_TTL: Duration = Duration::from_secs(60 * 60);
const VOLATILE_TTL: Duration = Duration::from_secs(10 * 60);

/// Releases fetched per page when summing repository downloads
const RELEASES_PER_PAGE: usize = 100;
const MAX_RELEASE_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    download_count: i64,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct LicenseResponse {
    license: Option<LicenseInfo>,
}

#[derive(Debug, Deserialize)]
struct LicenseInfo {
    #[serde(default)]
    name: String,
}

pub struct GithubHandler {
    http: UpstreamClient,
    cache: SharedCache,
    config: Arc<ConfigStore>,
    pre_release: Regex,
}

impl GithubHandler {
    pub fn new(deps: &HandlerDependencies) -> AppResult<Self> {
        let pre_release = Regex::new(r"^v?0\.")
            .map_err(|e| AppError::configuration(format!("Invalid version pattern: {e}")))?;

        Ok(Self {
            http: deps.http.clone(),
            cache: deps.cache.clone(),
            config: deps.config.clone(),
            pre_release,
        })
    }

    fn version_color(&self, version: &str) -> &'static str {
        if self.pre_release.is_match(version) {
            "orange"
        } else {
            "blue"
        }
    }

    async fn fetch_api<T: DeserializeOwned>(
        &self,
        ctx: &HandlerContext,
        path: &str,
    ) -> UpstreamResult<T> {
        let url = format!(
            "{}/{}",
            api_base(&self.config, "github.api_url", DEFAULT_API_URL),
            path
        );

        let mut request = self.http.get(&url).header(ACCEPT, GITHUB_JSON);
        let token = self.config.str("github.personal_token");
        if !token.is_empty() {
            request = request.basic_auth(self.config.str("github.username"), Some(token));
        }

        let response = self.http.send(ctx, request).await?;
        if let Some(remaining) = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|value| value.to_str().ok())
        {
            debug!(remaining, "GitHub rate limit remaining");
        }

        read_json(ctx, response).await
    }

    async fn license(&self, ctx: &HandlerContext, user: &str, repo: &str) -> HandlerResult<Badge> {
        let path = repo_path(user, repo, "license");

        let text = cached_fetch(self.cache.as_ref(), "github_license", &path, LICENSE_TTL, || async {
            let response: LicenseResponse = self
                .fetch_api(ctx, &path)
                .await
                .context("fetching GitHub license")?;
            Ok(response.license.map(|l| l.name).unwrap_or_default())
        })
        .await?;

        Ok(Badge::new("license", none_if_empty(text), "blue"))
    }

    async fn latest_tag(&self, ctx: &HandlerContext, user: &str, repo: &str) -> HandlerResult<Badge> {
        let path = repo_path(user, repo, "tags");

        let text = cached_fetch(self.cache.as_ref(), "github_latest_tag", &path, VOLATILE_TTL, || async {
            let tags: Vec<Tag> = self
                .fetch_api(ctx, &path)
                .await
                .context("fetching GitHub tags")?;
            Ok(tags.into_iter().next().map(|t| t.name).unwrap_or_default())
        })
        .await?;

        let text = none_if_empty(text);
        let color = self.version_color(&text);
        Ok(Badge::new("tag", text, color))
    }

    async fn latest_release(&self, ctx: &HandlerContext, user: &str, repo: &str) -> HandlerResult<Badge> {
        let path = repo_path(user, repo, "releases/latest");

        let text = cached_fetch(self.cache.as_ref(), "github_latest_release", &path, VOLATILE_TTL, || async {
            let release: Release = self
                .fetch_api(ctx, &path)
                .await
                .context("fetching GitHub latest release")?;
            Ok(release.tag_name)
        })
        .await?;

        let text = none_if_empty(text);
        let color = self.version_color(&text);
        Ok(Badge::new("release", text, color))
    }

    async fn repo_downloads(&self, ctx: &HandlerContext, user: &str, repo: &str) -> HandlerResult<Badge> {
        let path = repo_path(user, repo, "releases");

        let text = cached_fetch(self.cache.as_ref(), "github_repo_downloads", &path, VOLATILE_TTL, || async {
            let mut total = 0;
            for page in 1..=MAX_RELEASE_PAGES {
                let releases: Vec<Release> = self
                    .fetch_api(ctx, &format!("{path}?per_page={RELEASES_PER_PAGE}&page={page}"))
                    .await
                    .context("fetching GitHub releases")?;

                total += releases
                    .iter()
                    .flat_map(|release| &release.assets)
                    .map(|asset| asset.download_count)
                    .sum::<i64>();

                if releases.len() < RELEASES_PER_PAGE {
                    break;
                }
            }
            Ok(format_metric(total))
        })
        .await?;

        Ok(Badge::new("downloads", text, "brightgreen"))
    }

    async fn release_downloads(
        &self,
        ctx: &HandlerContext,
        user: &str,
        repo: &str,
        tag: &str,
        asset: Option<&str>,
    ) -> HandlerResult<Badge> {
        let release_path = if tag == "latest" {
            repo_path(user, repo, "releases/latest")
        } else {
            repo_path(user, repo, &format!("releases/tags/{}", path_segment(tag)))
        };
        let cache_key = format!("{release_path}#{}", asset.unwrap_or("total"));

        let text = cached_fetch(self.cache.as_ref(), "github_release_downloads", &cache_key, VOLATILE_TTL, || async {
            let release: Release = self
                .fetch_api(ctx, &release_path)
                .await
                .context("fetching GitHub release")?;

            let total: i64 = release
                .assets
                .iter()
                .filter(|a| asset.is_none_or(|name| a.name == name))
                .map(|a| a.download_count)
                .sum();
            Ok(format_metric(total))
        })
        .await?;

        Ok(Badge::new("downloads", text, "brightgreen"))
    }
}

fn repo_path(user: &str, repo: &str, suffix: &str) -> String {
    format!("repos/{}/{}/{}", path_segment(user), path_segment(repo), suffix)
}

fn none_if_empty(text: String) -> String {
    if text.is_empty() { "None".to_string() } else { text }
}

fn user_and_repo(args: &[String]) -> HandlerResult<(&str, &str)> {
    match args {
        [user, repo, ..] => Ok((user.as_str(), repo.as_str())),
        _ => Err(HandlerError::invalid_parameters(
            "You need to provide user and repo",
        )),
    }
}

#[async_trait]
impl ServiceHandler for GithubHandler {
    fn documentation(&self) -> Vec<ServiceDocumentation> {
        vec![
            ServiceDocumentation::new(
                "GitHub repo license",
                "/github/license/Luzifer/badge-gen",
                &["license", "<user>", "<repo>"],
            ),
            ServiceDocumentation::new(
                "GitHub latest tag",
                "/github/latest-tag/Luzifer/badge-gen",
                &["latest-tag", "<user>", "<repo>"],
            ),
            ServiceDocumentation::new(
                "GitHub latest release",
                "/github/latest-release/lastpass/lastpass-cli",
                &["latest-release", "<user>", "<repo>"],
            ),
            ServiceDocumentation::new(
                "GitHub downloads by repo",
                "/github/downloads/atom/atom",
                &["downloads", "<user>", "<repo>"],
            ),
            ServiceDocumentation::new(
                "GitHub downloads by release",
                "/github/downloads/atom/atom/latest",
                &["downloads", "<user>", "<repo>", "<tag or \"latest\">"],
            ),
            ServiceDocumentation::new(
                "GitHub downloads by release and asset",
                "/github/downloads/atom/atom/v1.8.0/atom-amd64.deb",
                &["downloads", "<user>", "<repo>", "<tag or \"latest\">", "<asset>"],
            ),
        ]
    }

    async fn handle(&self, ctx: &HandlerContext, params: &[String]) -> HandlerResult<Badge> {
        let [command, args @ ..] = params else {
            return Err(HandlerError::invalid_parameters(
                "No service-command / parameters were given",
            ));
        };
        if args.is_empty() {
            return Err(HandlerError::invalid_parameters(
                "No service-command / parameters were given",
            ));
        }

        match command.as_str() {
            "license" => {
                let (user, repo) = user_and_repo(args)?;
                self.license(ctx, user, repo).await
            }
            "latest-tag" => {
                let (user, repo) = user_and_repo(args)?;
                self.latest_tag(ctx, user, repo).await
            }
            "latest-release" => {
                let (user, repo) = user_and_repo(args)?;
                self.latest_release(ctx, user, repo).await
            }
            "downloads" => match args {
                [user, repo] => self.repo_downloads(ctx, user, repo).await,
                [user, repo, tag] => self.release_downloads(ctx, user, repo, tag, None).await,
                [user, repo, tag, asset] => {
                    self.release_downloads(ctx, user, repo, tag, Some(asset.as_str()))
                        .await
                }
                _ => Err(HandlerError::invalid_parameters(
                    "Unsupported number of arguments",
                )),
            },
            other => Err(HandlerError::unknown_command(other)),
        }
    }
}
