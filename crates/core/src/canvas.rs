use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use pagemark_model::{PenConfig, Rgb, ZoomFactor};

/// Pen as applied to the raster: color plus a width in edit-space pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pen {
    pub color: Rgb,
    pub width_px: f32,
}

impl Pen {
    /// Scales the configured width so a stroke keeps its thickness relative to the page.
    pub fn from_config(config: &PenConfig, zoom: ZoomFactor) -> Self {
        Self { color: config.color, width_px: config.width_pt * zoom.get() }
    }

    fn pixel(self) -> Rgba<u8> {
        Rgba([self.color.r, self.color.g, self.color.b, 255])
    }
}

/// Persistent freehand raster for one page visit. Strokes only ever add pixels.
#[derive(Debug, Clone)]
pub struct FreehandCanvas {
    raster: RgbaImage,
    pen: Pen,
    last_point: Option<(f32, f32)>,
    dirty: bool,
}

impl FreehandCanvas {
    /// Fully transparent canvas.
    pub fn new(width: u32, height: u32, pen: Pen) -> Self {
        Self::from_raster(RgbaImage::new(width.max(1), height.max(1)), pen)
    }

    /// Canvas seeded with previously captured pixels. Not dirty until drawn on.
    pub fn from_raster(raster: RgbaImage, pen: Pen) -> Self {
        Self { raster, pen, last_point: None, dirty: false }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        let (width, height) = self.dimensions();
        x >= 0.0 && y >= 0.0 && x < width as f32 && y < height as f32
    }

    pub fn pen(&self) -> Pen {
        self.pen
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// Whether any stroke was drawn since the canvas was created.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Starts a stroke with a single dab, so a tap leaves a dot.
    pub fn begin_stroke(&mut self, x: f32, y: f32) {
        self.draw_segment((x, y), (x, y));
        self.last_point = Some((x, y));
        self.dirty = true;
    }

    pub fn extend_stroke(&mut self, x: f32, y: f32) {
        let Some(from) = self.last_point else {
            return;
        };
        self.draw_segment(from, (x, y));
        self.last_point = Some((x, y));
        self.dirty = true;
    }

    pub fn end_stroke(&mut self) {
        self.last_point = None;
    }

    fn draw_segment(&mut self, from: (f32, f32), to: (f32, f32)) {
        let color = self.pen.pixel();
        let radius = self.pen.width_px / 2.0;

        if radius < 1.0 {
            draw_line_segment_mut(&mut self.raster, from, to, color);
            return;
        }

        // Thick strokes are stamped as round dabs along the segment.
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let spacing = (radius / 2.0).max(0.5);
        let steps = ((dx * dx + dy * dy).sqrt() / spacing).ceil().max(1.0) as u32;
        let radius = radius.round() as i32;

        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let center = ((from.0 + dx * t).round() as i32, (from.1 + dy * t).round() as i32);
            draw_filled_circle_mut(&mut self.raster, center, radius, color);
        }
    }
}
