//! Service index handler
//!
//! Lists every enabled handler with a working example path, so a front page
//! can be generated from it.

use axum::{extract::State, response::IntoResponse};
use serde::Serialize;

use crate::services::ServiceDocumentation;
use crate::web::{AppState, responses::ok};

/// One entry of `/v1/services`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceListing {
    #[serde(flatten)]
    pub documentation: ServiceDocumentation,
    /// Path template, e.g. `/github/license/<user>/<repo>`
    pub doc_format: String,
}

impl From<ServiceDocumentation> for ServiceListing {
    fn from(documentation: ServiceDocumentation) -> Self {
        Self {
            doc_format: documentation.doc_format(),
            documentation,
        }
    }
}

pub async fn list_services(State(state): State<AppState>) -> impl IntoResponse {
    let listings: Vec<ServiceListing> = state
        .registry
        .documentation()
        .into_iter()
        .map(ServiceListing::from)
        .collect();
    ok(listings)
}
