use std::borrow::Cow;
use std::sync::OnceLock;

use rust_embed::RustEmbed;

use crate::errors::{AppError, AppResult};

pub const FONT_PATH: &str = "assets/DejaVuSans.ttf";
pub const BADGE_TEMPLATE_PATH: &str = "assets/badge.svg";

/// Embedded badge assets (font and SVG template)
#[derive(RustEmbed)]
#[folder = "assets/"]
#[prefix = "assets/"]
pub struct BadgeAssets;

static FONT_DATA: OnceLock<&'static [u8]> = OnceLock::new();

impl BadgeAssets {
    /// Get an embedded asset by logical path
    pub fn get_asset(path: &str) -> Option<rust_embed::EmbeddedFile> {
        Self::get(path)
    }

    /// Raw bytes of the embedded font, valid for the lifetime of the process
    pub fn font_data() -> AppResult<&'static [u8]> {
        if let Some(data) = FONT_DATA.get() {
            return Ok(data);
        }

        let file = Self::get(FONT_PATH)
            .ok_or_else(|| AppError::asset(FONT_PATH, "asset is not embedded"))?;
        let data: &'static [u8] = match file.data {
            Cow::Borrowed(data) => data,
            Cow::Owned(data) => Box::leak(data.into_boxed_slice()),
        };

        Ok(FONT_DATA.get_or_init(|| data))
    }

    /// The SVG badge template
    pub fn badge_template() -> AppResult<String> {
        let file = Self::get(BADGE_TEMPLATE_PATH)
            .ok_or_else(|| AppError::asset(BADGE_TEMPLATE_PATH, "asset is not embedded"))?;
        String::from_utf8(file.data.into_owned())
            .map_err(|e| AppError::asset(BADGE_TEMPLATE_PATH, e.to_string()))
    }

    /// Hex SHA-256 of an embedded asset
    pub fn sha256(path: &str) -> Option<String> {
        Self::get(path).map(|file| {
            file.metadata
                .sha256_hash()
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect()
        })
    }
}
