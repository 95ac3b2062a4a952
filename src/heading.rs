use serde::Deserialize;

/// A heading of the reading surface, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub id: String,
    /// 1 to 6.
    pub level: u8,
    /// Pixels from the top of the document.
    pub top: f64,
    /// Rendered height in pixels; zero when the host never reported one.
    pub height: f64,
}

impl Heading {
    pub fn new(id: impl Into<String>, level: u8, top: f64) -> Self {
        Self {
            id: id.into(),
            level: level.clamp(1, 6),
            top,
            height: 0.0,
        }
    }

    /// Position relative to the top edge of the viewport.
    pub fn viewport_top(&self, scroll_offset: f64) -> f64 {
        self.top - scroll_offset
    }
}

/// Layout geometry for one heading, as measured by the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeadingBox {
    pub id: String,
    pub top: f64,
    #[serde(default)]
    pub height: f64,
}

/// Parses `h1`..`h6` into a level.
pub fn heading_level(tag: &str) -> Option<u8> {
    let digit = tag.strip_prefix('h').or_else(|| tag.strip_prefix('H'))?;
    match digit.parse::<u8>() {
        Ok(level @ 1..=6) => Some(level),
        _ => None,
    }
}
