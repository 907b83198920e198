//! Badge HTTP handlers
//!
//! `GET /{service}/{params...}` dispatches to a service handler and renders
//! the result; `GET /v1/badge` redirects query-string badges to the static
//! service.
//!
//! Rendered badges are remembered in two cache namespaces:
//!
//! - `badge_etag`: digest of the `(title, text, color)` triple → fingerprint
//! - `badge_svg`: fingerprint → minified SVG
//!
//! so a conditional GET for an unchanged badge is answered with 304 without
//! rendering anything.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::badge::Badge;
use crate::cache::Cache;
use crate::config::defaults::DEFAULT_BADGE_COLOR;
use crate::errors::DispatchError;
use crate::services::HandlerContext;
use crate::web::AppState;
use crate::web::responses::{not_modified, svg_badge, text_error};

const BADGE_ETAG_NAMESPACE: &str = "badge_etag";
const BADGE_SVG_NAMESPACE: &str = "badge_svg";

/// Query parameters for `/v1/badge`
#[derive(Debug, Deserialize)]
pub struct BadgeQuery {
    pub title: Option<String>,
    pub text: Option<String>,
    pub color: Option<String>,
}

/// Render the badge for `/{service}/{params...}`
pub async fn service_badge(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let (service, params) = match split_badge_path(uri.path()) {
        Ok(parts) => parts,
        Err(message) => return text_error(StatusCode::BAD_REQUEST, message),
    };

    let ctx = HandlerContext::with_timeout(state.config.web.request_timeout);
    let badge = match state.registry.dispatch(&service, &params, &ctx).await {
        Ok(badge) => badge,
        Err(e @ DispatchError::NotFound { .. }) => {
            return text_error(StatusCode::NOT_FOUND, e.to_string());
        }
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            warn!(service = %service, "Service handler failed: {}", e);
            return text_error(status, format!("Error while executing service: {e}"));
        }
    };

    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());
    render_badge_response(&state, &badge, if_none_match)
}

/// Redirect `/v1/badge?title=&text=&color=` to the static service
pub async fn badge_redirect(Query(query): Query<BadgeQuery>) -> Response {
    let (Some(title), Some(text)) = (
        query.title.filter(|t| !t.is_empty()),
        query.text.filter(|t| !t.is_empty()),
    ) else {
        return text_error(
            StatusCode::BAD_REQUEST,
            "You must specify parameters 'title' and 'text'.",
        );
    };
    let color = query
        .color
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_BADGE_COLOR.to_string());

    let location = format!(
        "/static/{}/{}/{}",
        urlencoding::encode(&title),
        urlencoding::encode(&text),
        urlencoding::encode(&color)
    );

    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, location)],
    )
        .into_response()
}

/// Serve `badge`, reusing a cached rendering when the triple was seen before
pub fn render_badge_response(
    state: &AppState,
    badge: &Badge,
    if_none_match: Option<&str>,
) -> Response {
    let cache = state.cache.as_ref();
    let key = badge_cache_key(badge);

    if let Some(fingerprint) = cache_lookup(cache, BADGE_ETAG_NAMESPACE, &key) {
        if etag_matches(if_none_match, &fingerprint) {
            debug!(etag = %fingerprint, "Badge not modified");
            return not_modified(fingerprint);
        }
        if let Some(svg) = cache_lookup(cache, BADGE_SVG_NAMESPACE, &fingerprint) {
            return svg_badge(fingerprint, svg);
        }
    }

    let rendered = state.renderer.render(badge);
    let ttl = state.config.cache.badge_ttl;
    for (namespace, key, value) in [
        (BADGE_ETAG_NAMESPACE, key.as_str(), rendered.fingerprint.as_str()),
        (BADGE_SVG_NAMESPACE, rendered.fingerprint.as_str(), rendered.svg.as_str()),
    ] {
        if let Err(e) = cache.set(namespace, key, value, ttl) {
            warn!(namespace, "Failed to cache rendered badge: {}", e);
        }
    }

    if etag_matches(if_none_match, &rendered.fingerprint) {
        return not_modified(rendered.fingerprint);
    }
    svg_badge(rendered.fingerprint, rendered.svg)
}

fn cache_lookup(cache: &dyn Cache, namespace: &str, key: &str) -> Option<String> {
    cache.get(namespace, key).unwrap_or_else(|e| {
        warn!(namespace, "Badge cache read failed: {}", e);
        None
    })
}

/// Split a request path into the service name and its decoded parameters
///
/// Each segment is decoded on its own, so an encoded `/` (`%2F`) stays
/// inside its parameter.
pub fn split_badge_path(path: &str) -> Result<(String, Vec<String>), String> {
    let mut segments = path.trim_start_matches('/').split('/').map(|segment| {
        if !has_valid_escapes(segment) {
            return Err(format!("Invalid path encoding in '{segment}': malformed escape"));
        }
        urlencoding::decode(segment)
            .map(|decoded| decoded.into_owned())
            .map_err(|e| format!("Invalid path encoding in '{segment}': {e}"))
    });

    let service = segments.next().transpose()?.unwrap_or_default();
    let params = segments.collect::<Result<Vec<_>, _>>()?;
    Ok((service, params))
}

/// Every `%` must be followed by two hex digits
fn has_valid_escapes(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

/// Digest identifying a `(title, text, color)` triple
///
/// Parts are length-prefixed so that e.g. `("a/b", "c")` and `("a", "b/c")`
/// never collide.
pub fn badge_cache_key(badge: &Badge) -> String {
    let mut hasher = Sha256::new();
    for part in [&badge.title, &badge.text, &badge.color] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Whether an `If-None-Match` header matches the fingerprint
///
/// Accepts quoted or bare tags, weak validators, lists and `*`.
pub fn etag_matches(if_none_match: Option<&str>, fingerprint: &str) -> bool {
    let Some(header) = if_none_match else {
        return false;
    };

    header.split(',').map(str::trim).any(|tag| {
        if tag == "*" {
            return true;
        }
        let tag = tag.strip_prefix("W/").unwrap_or(tag);
        let tag = tag
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(tag);
        tag == fingerprint
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_split_badge_path() {
        let (service, params) = split_badge_path("/static/API/Documentation/4c1").unwrap();
        assert_eq!(service, "static");
        assert_eq!(params, vec!["API", "Documentation", "4c1"]);
    }

    #[test]
    fn test_split_decodes_each_segment() {
        let (service, params) =
            split_badge_path("/static/hello%20world/a%2Fb/%23fff").unwrap();
        assert_eq!(service, "static");
        assert_eq!(params, vec!["hello world", "a/b", "#fff"]);
    }

    #[test]
    fn test_split_keeps_empty_segments() {
        let (_, params) = split_badge_path("/static/API/Documentation/").unwrap();
        assert_eq!(params, vec!["API", "Documentation", ""]);

        let (service, params) = split_badge_path("/static").unwrap();
        assert_eq!(service, "static");
        assert!(params.is_empty());
    }

    #[test]
    fn test_split_rejects_invalid_utf8() {
        assert!(split_badge_path("/static/%ff%fe/x").is_err());
    }

    #[rstest]
    #[case("/static/100%zz/b")]
    #[case("/static/100%/b")]
    #[case("/static/a/%4")]
    #[case("/static/%g0/b")]
    #[case("/st%atic/a/b")]
    fn test_split_rejects_malformed_escapes(#[case] path: &str) {
        let err = split_badge_path(path).unwrap_err();
        assert!(err.contains("malformed escape"));
    }

    #[test]
    fn test_split_accepts_percent_literal_escape() {
        let (_, params) = split_badge_path("/static/100%25/b").unwrap();
        assert_eq!(params, vec!["100%", "b"]);
    }

    #[test]
    fn test_cache_key_separates_parts() {
        let a = badge_cache_key(&Badge::new("a/b", "c", "4c1"));
        let b = badge_cache_key(&Badge::new("a", "b/c", "4c1"));
        assert_ne!(a, b);
        assert_eq!(a, badge_cache_key(&Badge::new("a/b", "c", "4c1")));
        assert_eq!(a.len(), 64);
    }

    #[rstest]
    #[case(Some("abc"), true)]
    #[case(Some("\"abc\""), true)]
    #[case(Some("W/\"abc\""), true)]
    #[case(Some("\"xyz\", \"abc\""), true)]
    #[case(Some("*"), true)]
    #[case(Some("abcd"), false)]
    #[case(Some(""), false)]
    #[case(None, false)]
    fn test_etag_matches(#[case] header: Option<&str>, #[case] expected: bool) {
        assert_eq!(etag_matches(header, "abc"), expected);
    }
}
