//! Conversions between edit space and document space.
//!
//! Edit space is the pixel grid of the editing surface at the current zoom:
//! origin top-left, Y down. Document space is the page's native point grid:
//! origin bottom-left, Y up. The renderer scales pages linearly by zoom, so the
//! mapping is a divide plus one vertical flip.

use crate::page::{PageSize, ZoomFactor};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in edit space: top-left offset plus extent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EditRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl EditRect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Inclusive hit test. Degenerate rectangles never contain a point.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self { x: self.x * factor, y: self.y * factor, w: self.w * factor, h: self.h * factor }
    }
}

/// Point in document space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocPoint {
    pub x: f32,
    pub y: f32,
}

/// Maps the bottom-left corner of an edit-space element into document space.
///
/// `edit_y` is the element's top edge and `element_height` its edit-space
/// height; the result is where the element's bottom edge lands after the flip.
pub fn to_document_space(
    edit_x: f32,
    edit_y: f32,
    element_height: f32,
    zoom: ZoomFactor,
    page: PageSize,
) -> DocPoint {
    let z = zoom.get();
    DocPoint { x: edit_x / z, y: page.height_pt - edit_y / z - element_height / z }
}

/// Re-expresses an edit-space rectangle captured at `from` in the edit space of `to`.
pub fn rescale(rect: EditRect, from: ZoomFactor, to: ZoomFactor) -> EditRect {
    if from == to {
        return rect;
    }
    rect.scaled(from.ratio_to(to))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zoom(value: f32) -> ZoomFactor {
        ZoomFactor::new(value).expect("valid zoom")
    }

    #[test]
    fn flips_vertical_axis_at_unit_zoom() {
        let page = PageSize::new(612.0, 792.0);
        let point = to_document_space(50.0, 50.0, 30.0, ZoomFactor::ONE, page);

        assert_eq!(point, DocPoint { x: 50.0, y: 792.0 - 50.0 - 30.0 });
    }

    #[test]
    fn divides_by_zoom_before_flipping() {
        let page = PageSize::new(612.0, 792.0);
        let point = to_document_space(100.0, 100.0, 60.0, zoom(2.0), page);

        assert_eq!(point, DocPoint { x: 50.0, y: 792.0 - 50.0 - 30.0 });
    }

    #[test]
    fn rescale_between_zooms_preserves_document_position() {
        let page = PageSize::new(600.0, 800.0);
        let captured = EditRect::new(50.0, 50.0, 100.0, 30.0);
        let moved = rescale(captured, ZoomFactor::ONE, zoom(1.5));

        assert_eq!(moved, EditRect::new(75.0, 75.0, 150.0, 45.0));
        assert_eq!(
            to_document_space(moved.x, moved.y, moved.h, zoom(1.5), page),
            to_document_space(captured.x, captured.y, captured.h, ZoomFactor::ONE, page),
        );
    }

    #[test]
    fn degenerate_rect_contains_nothing_off_its_edge() {
        let rect = EditRect::new(10.0, 10.0, -5.0, 0.0);
        assert!(!rect.contains(7.0, 10.0));
        assert!(!rect.contains(12.0, 10.0));
    }
}
