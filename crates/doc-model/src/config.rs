use crate::color::Rgb;
use crate::coords::EditRect;
use crate::page::ZoomFactor;
use crate::text_box::TextContent;
use serde::{Deserialize, Serialize};

/// Editor preferences. Holds defaults only; no annotation state ever lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub default_zoom: ZoomFactor,
    pub min_zoom: ZoomFactor,
    pub max_zoom: ZoomFactor,
    pub text_box_defaults: TextBoxDefaults,
    pub text_defaults: TextContent,
    pub pen: PenConfig,
    /// Side of the square resize handle at a text box's bottom-right corner, in pixels.
    pub resize_handle_px: f32,
    pub export_file_name: String,
    pub export_mime_type: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_zoom: ZoomFactor::ONE,
            min_zoom: ZoomFactor::new_unchecked(0.25),
            max_zoom: ZoomFactor::new_unchecked(4.0),
            text_box_defaults: TextBoxDefaults::default(),
            text_defaults: TextContent::default(),
            pen: PenConfig::default(),
            resize_handle_px: 10.0,
            export_file_name: "edited.pdf".to_owned(),
            export_mime_type: "application/pdf".to_owned(),
        }
    }
}

impl EditorConfig {
    pub fn clamp_zoom(&self, zoom: ZoomFactor) -> ZoomFactor {
        let (min, max) = if self.min_zoom <= self.max_zoom {
            (self.min_zoom, self.max_zoom)
        } else {
            (self.max_zoom, self.min_zoom)
        };
        zoom.clamp(min, max)
    }
}

/// Geometry of a freshly placed text box, in edit-space pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBoxDefaults {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Default for TextBoxDefaults {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0, w: 100.0, h: 30.0 }
    }
}

impl TextBoxDefaults {
    pub fn rect(self) -> EditRect {
        EditRect::new(self.x, self.y, self.w, self.h)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenConfig {
    pub color: Rgb,
    /// Stroke width in document points; multiplied by zoom on the surface.
    pub width_pt: f32,
}

impl Default for PenConfig {
    fn default() -> Self {
        Self { color: Rgb::RED, width_pt: 2.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{ "pen": { "width_pt": 4.0 }, "export_file_name": "out.pdf" }"#)
                .expect("config should parse");

        assert_eq!(config.pen.width_pt, 4.0);
        assert_eq!(config.pen.color, Rgb::RED);
        assert_eq!(config.export_file_name, "out.pdf");
        assert_eq!(config.text_box_defaults.rect(), EditRect::new(50.0, 50.0, 100.0, 30.0));
        assert_eq!(config.text_defaults.font_family, "Arial");
    }

    #[test]
    fn zoom_is_clamped_even_with_swapped_bounds() {
        let config = EditorConfig {
            min_zoom: ZoomFactor::new(3.0).expect("valid"),
            max_zoom: ZoomFactor::new(0.5).expect("valid"),
            ..EditorConfig::default()
        };

        let high = ZoomFactor::new(10.0).expect("valid");
        assert_eq!(config.clamp_zoom(high).get(), 3.0);
        let low = ZoomFactor::new(0.1).expect("valid");
        assert_eq!(config.clamp_zoom(low).get(), 0.5);
    }
}
