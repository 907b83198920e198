use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::errors::{AppResult, UpstreamError, UpstreamResult};
use crate::services::HandlerContext;

/// Shared outbound HTTP client for service handlers
///
/// Every call is bounded by the request deadline carried in the
/// [`HandlerContext`]; when it expires the in-flight request is dropped and
/// the call fails with [`UpstreamError::DeadlineExceeded`].
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a request and map non-success statuses to errors
    pub async fn send(
        &self,
        ctx: &HandlerContext,
        request: RequestBuilder,
    ) -> UpstreamResult<Response> {
        if ctx.is_expired() {
            return Err(UpstreamError::DeadlineExceeded);
        }

        let request = request
            .timeout(ctx.remaining())
            .build()
            .map_err(|source| UpstreamError::Request {
                url: String::new(),
                source,
            })?;
        let url = request.url().to_string();

        debug!(method = %request.method(), url = %url, "Upstream request");

        let response = tokio::time::timeout_at(ctx.deadline(), self.client.execute(request))
            .await
            .map_err(|_| UpstreamError::DeadlineExceeded)?
            .map_err(|source| {
                if source.is_timeout() {
                    UpstreamError::DeadlineExceeded
                } else {
                    UpstreamError::Request {
                        url: url.clone(),
                        source,
                    }
                }
            })?;

        check_status(&url, &response)?;
        Ok(response)
    }

    /// Send a request and decode a JSON body
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        ctx: &HandlerContext,
        request: RequestBuilder,
    ) -> UpstreamResult<T> {
        let response = self.send(ctx, request).await?;
        read_json(ctx, response).await
    }
}

/// Read and decode a JSON body within the request deadline
pub async fn read_json<T: DeserializeOwned>(
    ctx: &HandlerContext,
    response: Response,
) -> UpstreamResult<T> {
    let url = response.url().to_string();

    let body = tokio::time::timeout_at(ctx.deadline(), response.bytes())
        .await
        .map_err(|_| UpstreamError::DeadlineExceeded)?
        .map_err(|source| UpstreamError::Request {
            url: url.clone(),
            source,
        })?;

    serde_json::from_slice(&body).map_err(|e| UpstreamError::decode(url, e))
}

fn check_status(url: &str, response: &Response) -> UpstreamResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let limit_exhausted = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "0");

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && limit_exhausted)
    {
        return Err(UpstreamError::RateLimited {
            url: url.to_string(),
        });
    }

    Err(UpstreamError::Status {
        url: url.to_string(),
        status: status.as_u16(),
    })
}
