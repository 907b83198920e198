//! Service handler trait definitions
//!
//! A service handler turns the path parameters of a badge request into a
//! [`Badge`], usually by querying a third-party API. Handlers are registered
//! once at startup under a unique name and invoked concurrently.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::badge::Badge;
use crate::errors::{HandlerError, HandlerResult};

/// Example usage of a handler, listed on the service index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDocumentation {
    /// Human readable name, e.g. "GitHub latest tag"
    pub service_name: String,
    /// Working example path
    pub demo_path: String,
    /// Path arguments after the service name
    pub arguments: Vec<String>,
    /// Name the handler is registered under; filled in by the registry
    #[serde(default)]
    pub register: String,
}

impl ServiceDocumentation {
    pub fn new<N: Into<String>, D: Into<String>>(
        service_name: N,
        demo_path: D,
        arguments: &[&str],
    ) -> Self {
        Self {
            service_name: service_name.into(),
            demo_path: demo_path.into(),
            arguments: arguments.iter().map(|arg| arg.to_string()).collect(),
            register: String::new(),
        }
    }

    /// Path template, e.g. `/github/license/<user>/<repo>`
    pub fn doc_format(&self) -> String {
        format!("/{}/{}", self.register, self.arguments.join("/"))
    }
}

/// Per-request execution context
///
/// Carries the absolute deadline every upstream call made on behalf of the
/// request must respect.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext {
    deadline: Instant,
}

impl HandlerContext {
    pub fn new(deadline: Instant) -> Self {
        Self { deadline }
    }

    /// Deadline `timeout` from now; an unrepresentable timeout is capped at
    /// a day
    pub fn with_timeout(timeout: Duration) -> Self {
        let now = Instant::now();
        Self::new(
            now.checked_add(timeout)
                .unwrap_or(now + Duration::from_secs(24 * 60 * 60)),
        )
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left until the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Run `future` to completion or fail once the deadline passes
    pub async fn run<F, T>(&self, future: F) -> HandlerResult<T>
    where
        F: Future<Output = HandlerResult<T>>,
    {
        tokio::time::timeout_at(self.deadline, future)
            .await
            .unwrap_or(Err(HandlerError::DeadlineExceeded))
    }
}

/// Badge source bound to a path segment
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    /// Example usages for the service index
    fn documentation(&self) -> Vec<ServiceDocumentation>;

    /// Disabled handlers are treated as if they were never registered
    fn is_enabled(&self) -> bool {
        true
    }

    /// Produce badge content from the path parameters following the
    /// service name
    async fn handle(&self, ctx: &HandlerContext, params: &[String]) -> HandlerResult<Badge>;
}
