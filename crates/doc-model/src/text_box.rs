use crate::color::Rgb;
use crate::coords::EditRect;
use serde::{Deserialize, Serialize};

/// Text and style of a text box: everything the edit panel can change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextContent {
    pub text: String,
    pub font_family: String,
    pub font_size_pt: f32,
    pub color: Rgb,
}

impl Default for TextContent {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: "Arial".to_owned(),
            font_size_pt: 16.0,
            color: Rgb::BLACK,
        }
    }
}

impl TextContent {
    pub fn is_valid_font_size(size_pt: f32) -> bool {
        size_pt.is_finite() && size_pt > 0.0
    }

    /// Replaces a zero, negative or non-finite font size with `fallback_pt`.
    pub fn with_font_size_or(mut self, fallback_pt: f32) -> Self {
        if !Self::is_valid_font_size(self.font_size_pt) {
            self.font_size_pt = fallback_pt;
        }
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// A captured text box.
///
/// `rect` is in edit space at the zoom the owning page entry was captured at;
/// it is only converted to document space during export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBoxRecord {
    #[serde(flatten)]
    pub content: TextContent,
    #[serde(flatten)]
    pub rect: EditRect,
}

impl TextBoxRecord {
    pub fn new(content: TextContent, rect: EditRect) -> Self {
        Self { content, rect }
    }
}
