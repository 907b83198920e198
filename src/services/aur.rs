//! Arch User Repository package badges
//!
//! All four commands share one RPC call (`/rpc/?v=5&type=info&arg=<pkg>`)
//! but are cached separately, so a warm `version` badge does not keep a
//! stale `votes` badge alive.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use super::traits::{HandlerContext, ServiceDocumentation, ServiceHandler};
use super::{HandlerDependencies, api_base, cached_fetch};
use crate::badge::Badge;
use crate::cache::SharedCache;
use crate::config::ConfigStore;
use crate::errors::{HandlerError, HandlerResult, UpstreamContext, UpstreamError, UpstreamResult};
use crate::utils::UpstreamClient;

const DEFAULT_API_URL: &str = "https://aur.archlinux.org";
const AUR_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    resultcount: u64,
    #[serde(default)]
    results: Vec<Package>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Package {
    #[serde(default)]
    version: String,
    #[serde(default)]
    num_votes: i64,
    #[serde(default)]
    license: Vec<String>,
    #[serde(default)]
    last_modified: i64,
    #[serde(default)]
    out_of_date: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Version,
    Votes,
    License,
    Updated,
}

impl Command {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "version" => Some(Self::Version),
            "votes" => Some(Self::Votes),
            "license" => Some(Self::License),
            "updated" => Some(Self::Updated),
            _ => None,
        }
    }

    fn namespace(self) -> &'static str {
        match self {
            Self::Version => "aur_version",
            Self::Votes => "aur_votes",
            Self::License => "aur_license",
            Self::Updated => "aur_updated",
        }
    }

    fn text(self, package: &Package) -> UpstreamResult<String> {
        Ok(match self {
            Self::Version => package.version.clone(),
            Self::Votes => format!("{} votes", package.num_votes),
            Self::License => package.license.join(", "),
            Self::Updated => {
                let updated = DateTime::from_timestamp(package.last_modified, 0).ok_or_else(|| {
                    UpstreamError::empty(format!("Invalid LastModified timestamp {}", package.last_modified))
                })?;
                let mut text = updated.format("%Y-%m-%d %H:%M:%S").to_string();
                if package.out_of_date.unwrap_or(0) > 0 {
                    text.push_str(" (outdated)");
                }
                text
            }
        })
    }

    fn badge(self, package_name: &str, text: String) -> Badge {
        match self {
            Self::Version => Badge::new(package_name, text, "blue"),
            Self::Votes => Badge::new(package_name, text, "brightgreen"),
            Self::License => Badge::new("license", text, "blue"),
            Self::Updated => {
                let color = if text.contains("outdated") { "red" } else { "blue" };
                Badge::new("last updated", text, color)
            }
        }
    }
}

pub struct AurHandler {
    http: UpstreamClient,
    cache: SharedCache,
    config: Arc<ConfigStore>,
}

impl AurHandler {
    pub fn new(deps: &HandlerDependencies) -> Self {
        Self {
            http: deps.http.clone(),
            cache: deps.cache.clone(),
            config: deps.config.clone(),
        }
    }

    async fn fetch_info(&self, ctx: &HandlerContext, package: &str) -> UpstreamResult<Package> {
        let url = format!(
            "{}/rpc/",
            api_base(&self.config, "aur.api_url", DEFAULT_API_URL)
        );
        let request = self
            .http
            .get(&url)
            .query(&[("v", "5"), ("type", "info"), ("arg", package)]);

        let info: InfoResponse = self.http.fetch_json(ctx, request).await?;
        if info.resultcount == 0 {
            return Err(UpstreamError::empty("No package was found"));
        }

        info.results
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::empty("No package was found"))
    }
}

#[async_trait]
impl ServiceHandler for AurHandler {
    fn documentation(&self) -> Vec<ServiceDocumentation> {
        vec![
            ServiceDocumentation::new(
                "AUR package version",
                "/aur/version/yay",
                &["version", "<package name>"],
            ),
            ServiceDocumentation::new(
                "AUR package votes",
                "/aur/votes/yay",
                &["votes", "<package name>"],
            ),
            ServiceDocumentation::new(
                "AUR package license",
                "/aur/license/yay",
                &["license", "<package name>"],
            ),
            ServiceDocumentation::new(
                "AUR package last update",
                "/aur/updated/yay",
                &["updated", "<package name>"],
            ),
        ]
    }

    async fn handle(&self, ctx: &HandlerContext, params: &[String]) -> HandlerResult<Badge> {
        let [command, package, ..] = params else {
            return Err(HandlerError::invalid_parameters(
                "No service-command / parameters were given",
            ));
        };
        let command = Command::parse(command).ok_or_else(|| HandlerError::unknown_command(command.as_str()))?;

        let text = cached_fetch(self.cache.as_ref(), command.namespace(), package, AUR_TTL, || async {
            let info = self
                .fetch_info(ctx, package)
                .await
                .context("fetching AUR info")?;
            command.text(&info).context("formatting AUR info")
        })
        .await?;

        Ok(command.badge(package, text))
    }
}
