//! Twitch channel badges
//!
//! Uses the Helix API with an app access token obtained through the OAuth
//! client-credentials flow. The token is held by the handler and refreshed
//! only once it has expired. Without `twitch.client_id` and
//! `twitch.client_secret` configured the handler stays disabled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::traits::{HandlerContext, ServiceDocumentation, ServiceHandler};
use super::{HandlerDependencies, api_base};
use crate::badge::Badge;
use crate::config::ConfigStore;
use crate::errors::{HandlerError, HandlerResult, UpstreamContext, UpstreamError, UpstreamResult};
use crate::utils::UpstreamClient;

const DEFAULT_API_URL: &str = "https://api.twitch.tv";
const DEFAULT_AUTH_URL: &str = "https://id.twitch.tv";
const CLIENT_ID_KEY: &str = "twitch.client_id";
const CLIENT_SECRET_KEY: &str = "twitch.client_secret";
const TWITCH_COLOR: &str = "9146FF";
/// Upper bound on how long a token is trusted, whatever the endpoint claims
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 24 * 60 * 60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    data: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    #[serde(default)]
    view_count: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_valid(&self) -> bool {
        !self.value.is_empty() && Instant::now() < self.expires_at
    }
}

pub struct TwitchHandler {
    http: UpstreamClient,
    config: Arc<ConfigStore>,
    token: RwLock<Option<AccessToken>>,
}

impl TwitchHandler {
    pub fn new(deps: &HandlerDependencies) -> Self {
        Self {
            http: deps.http.clone(),
            config: deps.config.clone(),
            token: RwLock::new(None),
        }
    }

    async fn access_token(&self, ctx: &HandlerContext) -> UpstreamResult<String> {
        if let Some(token) = self.token.read().await.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.value.clone());
        }

        let mut guard = self.token.write().await;
        // another request may have refreshed while we waited for the lock
        if let Some(token) = guard.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.value.clone());
        }

        let url = format!(
            "{}/oauth2/token",
            api_base(&self.config, "twitch.auth_url", DEFAULT_AUTH_URL)
        );
        let request = self.http.post(&url).query(&[
            ("client_id", self.config.str(CLIENT_ID_KEY)),
            ("client_secret", self.config.str(CLIENT_SECRET_KEY)),
            ("grant_type", "client_credentials"),
        ]);

        let response: TokenResponse = self.http.fetch_json(ctx, request).await?;
        debug!(expires_in = response.expires_in, "Obtained Twitch access token");

        let lifetime = Duration::from_secs(response.expires_in).min(MAX_TOKEN_LIFETIME);
        let token = AccessToken {
            value: response.access_token,
            expires_at: Instant::now() + lifetime,
        };
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn views(&self, ctx: &HandlerContext, user: &str) -> HandlerResult<Badge> {
        let token = self
            .access_token(ctx)
            .await
            .context("getting Twitch access token")?;

        let field = if user.parse::<i64>().is_ok() { "id" } else { "login" };
        let url = format!(
            "{}/helix/users",
            api_base(&self.config, "twitch.api_url", DEFAULT_API_URL)
        );
        let request = self
            .http
            .get(&url)
            .query(&[(field, user)])
            .header("Client-Id", self.config.str(CLIENT_ID_KEY))
            .bearer_auth(token);

        let response: UsersResponse = self
            .http
            .fetch_json(ctx, request)
            .await
            .context("requesting Twitch user list")?;

        let [user] = response.data.as_slice() else {
            return Err(HandlerError::upstream(
                "requesting Twitch user list",
                UpstreamError::empty("unexpected number of users returned"),
            ));
        };

        Ok(Badge::new("views", user.view_count.to_string(), TWITCH_COLOR))
    }
}

#[async_trait]
impl ServiceHandler for TwitchHandler {
    fn documentation(&self) -> Vec<ServiceDocumentation> {
        vec![ServiceDocumentation::new(
            "Twitch views",
            "/twitch/views/luziferus",
            &["views", "<user login/id>"],
        )]
    }

    fn is_enabled(&self) -> bool {
        !self.config.str(CLIENT_ID_KEY).is_empty() && !self.config.str(CLIENT_SECRET_KEY).is_empty()
    }

    async fn handle(&self, ctx: &HandlerContext, params: &[String]) -> HandlerResult<Badge> {
        let [command, user, ..] = params else {
            return Err(HandlerError::invalid_parameters(
                "No service-command / parameters were given",
            ));
        };

        match command.as_str() {
            "views" => self.views(ctx, user).await,
            other => Err(HandlerError::unknown_command(other)),
        }
    }
}
