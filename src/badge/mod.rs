//! Badge synthesis
//!
//! A badge is two horizontally adjacent segments: a grey title on the left
//! and a colored value on the right. Segment widths come from measuring the
//! text against the embedded font, so the same input always produces the
//! same SVG and the same fingerprint.

use std::borrow::Cow;

use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::assets::BadgeAssets;
use crate::errors::AppResult;

pub mod color;
pub mod font;
pub mod minify;

pub use color::resolve_color;
pub use font::FontMetrics;
pub use minify::minify_svg;

/// Horizontal padding around each text segment
pub const X_SPACING: u32 = 8;

/// Content of a badge as produced by a service handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub title: String,
    pub text: String,
    /// Palette name or literal hex value without `#`
    pub color: String,
}

impl Badge {
    pub fn new<T: Into<String>, X: Into<String>, C: Into<String>>(
        title: T,
        text: X,
        color: C,
    ) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            color: color.into(),
        }
    }
}

/// Final SVG plus the fingerprint used as ETag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBadge {
    pub svg: String,
    /// Lowercase hex SHA-256 of the unminified SVG
    pub fingerprint: String,
}

/// Pixel geometry of a badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeLayout {
    pub width: u32,
    pub title_width: u32,
    pub text_width: u32,
    pub title_anchor: u32,
    pub text_anchor: u32,
}

impl BadgeLayout {
    /// Lay out two segments whose text measures `title` and `text` pixels
    pub fn new(title: u32, text: u32) -> Self {
        let width = title + text + 4 * X_SPACING;
        let title_width = title + 2 * X_SPACING;
        Self {
            width,
            title_width,
            text_width: width - title_width,
            title_anchor: title / 2 + X_SPACING,
            text_anchor: title + text / 2 + 3 * X_SPACING,
        }
    }
}

pub struct BadgeRenderer {
    font: FontMetrics,
    template: String,
}

impl BadgeRenderer {
    /// Build a renderer from the embedded font and template
    pub fn new() -> AppResult<Self> {
        Ok(Self::with_parts(
            FontMetrics::load()?,
            BadgeAssets::badge_template()?,
        ))
    }

    pub fn with_parts(font: FontMetrics, template: String) -> Self {
        Self { font, template }
    }

    pub fn font(&self) -> &FontMetrics {
        &self.font
    }

    pub fn layout(&self, title: &str, text: &str) -> BadgeLayout {
        BadgeLayout::new(self.font.measure(title), self.font.measure(text))
    }

    /// Fill the template without minifying
    pub fn render_unminified(&self, badge: &Badge) -> String {
        let layout = self.layout(&badge.title, &badge.text);

        let values: [(&str, Cow<'_, str>); 8] = [
            ("width", layout.width.to_string().into()),
            ("title_width", layout.title_width.to_string().into()),
            ("text_width", layout.text_width.to_string().into()),
            ("title_anchor", layout.title_anchor.to_string().into()),
            ("text_anchor", layout.text_anchor.to_string().into()),
            ("color", escape(resolve_color(&badge.color))),
            ("title", escape(badge.title.as_str())),
            ("text", escape(badge.text.as_str())),
        ];

        fill_template(&self.template, &values)
    }

    /// Render a badge to minified SVG and compute its fingerprint
    pub fn render(&self, badge: &Badge) -> RenderedBadge {
        let unminified = self.render_unminified(badge);
        let fingerprint = fingerprint(&unminified);

        let svg = match minify_svg(&unminified) {
            Ok(minified) => minified,
            Err(e) => {
                warn!(
                    fingerprint = %fingerprint,
                    "SVG minification failed, serving unminified badge: {}", e
                );
                unminified
            }
        };

        RenderedBadge { svg, fingerprint }
    }
}

/// Lowercase hex SHA-256 of the given SVG
pub fn fingerprint(svg: &str) -> String {
    let hash = Sha256::digest(svg.as_bytes());
    format!("{hash:x}")
}

/// Replace `{name}` placeholders in a single left-to-right pass
///
/// Substituted values are never rescanned, so a title containing `{text}`
/// stays literal. Unknown placeholders are copied through unchanged.
fn fill_template(template: &str, values: &[(&str, Cow<'_, str>)]) -> String {
    let mut out = String::with_capacity(template.len() + 128);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let replacement = after.find('}').and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (end, value))
        });

        match replacement {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
