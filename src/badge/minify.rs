//! Streaming SVG minifier built on quick-xml.
//!
//! Drops comments and whitespace-only text between tags. Everything else is
//! written back event by event, so attribute values and text content are
//! preserved exactly.

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinifyError {
    #[error("malformed SVG: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("failed to write SVG: {0}")]
    Write(#[from] std::io::Error),

    #[error("minified SVG is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn is_blank(text: &BytesText<'_>) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

pub fn minify_svg(svg: &str) -> Result<String, MinifyError> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::with_capacity(svg.len()));

    // whitespace directly next to an entity reference is content, not
    // indentation, so it is held back until the following event is known
    let mut pending_blank: Option<Event<'_>> = None;
    let mut after_ref = false;

    loop {
        let event = reader.read_event()?;
        let blank = matches!(&event, Event::Text(text) if is_blank(text));
        match event {
            Event::Eof => break,
            Event::Comment(_) => continue,
            Event::Text(_) if blank && !after_ref => {
                pending_blank = Some(event);
                continue;
            }
            Event::GeneralRef(_) => {
                if let Some(blank) = pending_blank.take() {
                    writer.write_event(blank)?;
                }
                after_ref = true;
            }
            _ => {
                pending_blank = None;
                after_ref = false;
            }
        }
        writer.write_event(event)?;
    }

    Ok(String::from_utf8(writer.into_inner())?)
}
