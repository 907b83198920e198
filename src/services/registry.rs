//! Service handler registry
//!
//! Maps the first path segment of a badge URL to the handler serving it.
//! Built once at startup and shared read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::traits::{HandlerContext, ServiceDocumentation, ServiceHandler};
use crate::badge::Badge;
use crate::errors::{DispatchError, RegistryError};

#[derive(Default, Clone)]
pub struct ServiceRegistry {
    handlers: HashMap<String, Arc<dyn ServiceHandler>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`; a name can only be taken once
    pub fn register<S: Into<String>>(
        &mut self,
        name: S,
        handler: Arc<dyn ServiceHandler>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }

        info!(
            service = %name,
            enabled = handler.is_enabled(),
            "Registered service handler"
        );
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// Enabled handler registered under `name`
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ServiceHandler>> {
        self.handlers
            .get(name)
            .filter(|handler| handler.is_enabled())
    }

    /// Run the handler for `name` with the request deadline in `ctx`
    pub async fn dispatch(
        &self,
        name: &str,
        params: &[String],
        ctx: &HandlerContext,
    ) -> Result<Badge, DispatchError> {
        let handler = self.get(name).ok_or_else(|| DispatchError::NotFound {
            name: name.to_string(),
        })?;

        debug!(service = %name, params = ?params, "Dispatching service handler");

        ctx.run(handler.handle(ctx, params))
            .await
            .map_err(|source| DispatchError::Failed {
                service: name.to_string(),
                source,
            })
    }

    /// Documentation of all enabled handlers, sorted by service name
    pub fn documentation(&self) -> Vec<ServiceDocumentation> {
        let mut docs: Vec<ServiceDocumentation> = self
            .handlers
            .iter()
            .filter(|(_, handler)| handler.is_enabled())
            .flat_map(|(register, handler)| {
                handler.documentation().into_iter().map(|mut doc| {
                    doc.register = register.clone();
                    doc
                })
            })
            .collect();

        docs.sort_by(|a, b| {
            a.service_name
                .to_lowercase()
                .cmp(&b.service_name.to_lowercase())
                .then_with(|| a.demo_path.cmp(&b.demo_path))
        });
        docs
    }

    /// Names of all registered handlers, enabled or not
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Number of handlers currently serving requests
    pub fn enabled_len(&self) -> usize {
        self.handlers
            .values()
            .filter(|handler| handler.is_enabled())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
