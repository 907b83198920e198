//! Text width measurement against the embedded font.
//!
//! Only horizontal advances and pairwise `kern` table adjustments are used;
//! there is no shaping, so the result is accurate for Latin text and an
//! approximation for everything else.

use ttf_parser::{Face, GlyphId};

use crate::assets::BadgeAssets;
use crate::errors::{AppResult, FontError};

/// Font size the badge template renders text at
pub const FONT_SIZE: f64 = 11.0;

pub struct FontMetrics {
    face: Face<'static>,
    units_per_em: u16,
}

impl FontMetrics {
    /// Parse the embedded font
    pub fn load() -> AppResult<Self> {
        let data = BadgeAssets::font_data()?;
        Ok(Self::from_bytes(data)?)
    }

    pub fn from_bytes(data: &'static [u8]) -> Result<Self, FontError> {
        let face = Face::parse(data, 0)?;
        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err(FontError::InvalidUnitsPerEm);
        }

        Ok(Self { face, units_per_em })
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Width of `text` in whole pixels at [`FONT_SIZE`]
    ///
    /// Characters without a glyph fall back to glyph 0 and contribute its
    /// advance.
    pub fn measure(&self, text: &str) -> u32 {
        let mut total: i64 = 0;
        let mut previous: Option<GlyphId> = None;

        for ch in text.chars() {
            let glyph = self.face.glyph_index(ch).unwrap_or(GlyphId(0));

            if let Some(prev) = previous {
                total += i64::from(self.kerning(prev, glyph));
            }
            total += i64::from(self.face.glyph_hor_advance(glyph).unwrap_or(0));

            previous = Some(glyph);
        }

        scale_to_pixels(total, self.units_per_em)
    }

    fn kerning(&self, left: GlyphId, right: GlyphId) -> i16 {
        let Some(kern) = self.face.tables().kern else {
            return 0;
        };

        kern.subtables
            .into_iter()
            .filter(|st| st.horizontal && !st.variable && !st.has_cross_stream)
            .find_map(|st| st.glyphs_kerning(left, right))
            .unwrap_or(0)
    }
}

/// Convert a width in font units to whole pixels at [`FONT_SIZE`]
///
/// The factor `FONT_SIZE / units_per_em` is applied as a unit. Truncates
/// toward zero; `as` saturates negative totals to 0.
fn scale_to_pixels(total: i64, units_per_em: u16) -> u32 {
    (total as f64 * (FONT_SIZE / f64::from(units_per_em))) as u32
}
