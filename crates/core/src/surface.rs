//! Editing state of the page currently on screen.
//!
//! A surface lives for exactly one (page, zoom) visit. It owns the freehand
//! canvas and the interactive text boxes, and turns pointer events into
//! drawing, dragging and resizing through a small state machine.

use crate::canvas::{FreehandCanvas, Pen};
use image::imageops::{self, FilterType};
use pagemark_model::{
    rescale, EditRect, EditorConfig, FreehandLayer, PageAnnotationEntry, PageIndex, PageSize,
    PenConfig, TextBoxRecord, TextContent, ZoomFactor,
};
use serde::{Deserialize, Serialize};

/// Edit-space pointer input: pixels at the current zoom, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
}

/// Identifies a text box within one surface. Not stable across page visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextBoxId(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceState {
    Idle,
    Drawing,
    Dragging { id: TextBoxId, origin: EditRect, start: (f32, f32) },
    Resizing { id: TextBoxId, origin: EditRect, start: (f32, f32) },
    Editing { id: TextBoxId, draft: TextContent },
}

#[derive(Debug, Clone)]
pub struct LiveAnnotationSurface {
    page: PageIndex,
    zoom: ZoomFactor,
    page_size: PageSize,
    canvas: FreehandCanvas,
    /// Layer restored from the store, reused as-is unless new strokes arrive.
    carried: Option<FreehandLayer>,
    boxes: Vec<(TextBoxId, TextBoxRecord)>,
    next_id: u64,
    state: SurfaceState,
    box_defaults: EditRect,
    resize_handle_px: f32,
}

impl LiveAnnotationSurface {
    pub fn new(
        page: PageIndex,
        zoom: ZoomFactor,
        page_size: PageSize,
        config: &EditorConfig,
    ) -> Self {
        let (width, height) = page_size.pixels_at(zoom);
        let pen = Pen::from_config(&config.pen, zoom);

        Self {
            page,
            zoom,
            page_size,
            canvas: FreehandCanvas::new(width, height, pen),
            carried: None,
            boxes: Vec::new(),
            next_id: 0,
            state: SurfaceState::Idle,
            box_defaults: config.text_box_defaults.rect(),
            resize_handle_px: config.resize_handle_px,
        }
    }

    /// Rebuilds the surface from a stored entry, moving its geometry into the
    /// edit space of `zoom`.
    pub fn rehydrate(
        page: PageIndex,
        zoom: ZoomFactor,
        page_size: PageSize,
        entry: &PageAnnotationEntry,
        config: &EditorConfig,
    ) -> Self {
        let mut surface = Self::new(page, zoom, page_size, config);

        for record in &entry.text_boxes {
            let mut record = record.clone();
            record.rect = rescale(record.rect, entry.capture_zoom, zoom);
            surface.push_box(record);
        }

        if let Some(layer) = &entry.freehand {
            surface.restore_layer(layer, &config.pen);
        }

        surface
    }

    fn restore_layer(&mut self, layer: &FreehandLayer, pen: &PenConfig) {
        self.carried = Some(layer.clone());

        let raster = match layer.decode() {
            Ok(raster) => raster,
            Err(err) => {
                log::warn!("page {}: stored freehand layer not restored: {err}", self.page);
                return;
            }
        };

        let (width, height) = self.canvas.dimensions();
        let raster = if raster.dimensions() == (width, height) {
            raster
        } else {
            imageops::resize(&raster, width, height, FilterType::Triangle)
        };
        self.canvas = FreehandCanvas::from_raster(raster, Pen::from_config(pen, self.zoom));
    }

    fn push_box(&mut self, record: TextBoxRecord) -> TextBoxId {
        let id = TextBoxId(self.next_id);
        self.next_id += 1;
        self.boxes.push((id, record));
        id
    }

    pub fn page(&self) -> PageIndex {
        self.page
    }

    pub fn zoom(&self) -> ZoomFactor {
        self.zoom
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn state(&self) -> &SurfaceState {
        &self.state
    }

    pub fn canvas(&self) -> &FreehandCanvas {
        &self.canvas
    }

    /// Text boxes in creation order, bottom-most first.
    pub fn text_boxes(&self) -> impl Iterator<Item = (TextBoxId, &TextBoxRecord)> + '_ {
        self.boxes.iter().map(|(id, record)| (*id, record))
    }

    pub fn text_box(&self, id: TextBoxId) -> Option<&TextBoxRecord> {
        self.boxes.iter().find(|(candidate, _)| *candidate == id).map(|(_, record)| record)
    }

    /// Id of the `index`-th box in creation order.
    pub fn text_box_id(&self, index: usize) -> Option<TextBoxId> {
        self.boxes.get(index).map(|(id, _)| *id)
    }

    fn text_box_mut(&mut self, id: TextBoxId) -> Option<&mut TextBoxRecord> {
        self.boxes.iter_mut().find(|(candidate, _)| *candidate == id).map(|(_, record)| record)
    }

    /// Adds a box with the default geometry on top of the others.
    /// Adds a box at the default geometry. An unusable font size falls back
    /// to the default one.
    pub fn place_text_box(&mut self, content: TextContent) -> TextBoxId {
        let rect = self.box_defaults;
        let content = content.with_font_size_or(TextContent::default().font_size_pt);
        self.push_box(TextBoxRecord::new(content, rect))
    }

    /// Opens the modal editor on a box. Ignored unless the surface is idle.
    pub fn begin_edit(&mut self, id: TextBoxId) -> bool {
        if self.state != SurfaceState::Idle {
            return false;
        }
        let Some(record) = self.text_box(id) else {
            return false;
        };

        self.state = SurfaceState::Editing { id, draft: record.content.clone() };
        true
    }

    pub fn draft(&self) -> Option<&TextContent> {
        match &self.state {
            SurfaceState::Editing { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut TextContent> {
        match &mut self.state {
            SurfaceState::Editing { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Replaces the edited box's content and closes the editor.
    pub fn commit_edit(&mut self, content: TextContent) -> bool {
        let SurfaceState::Editing { id, .. } = self.state else {
            return false;
        };
        self.state = SurfaceState::Idle;

        match self.text_box_mut(id) {
            Some(record) => {
                if !TextContent::is_valid_font_size(content.font_size_pt) {
                    log::debug!(
                        "keeping font size {} over {}",
                        record.content.font_size_pt,
                        content.font_size_pt
                    );
                }
                record.content = content.with_font_size_or(record.content.font_size_pt);
                true
            }
            None => false,
        }
    }

    /// Commits whatever is in the draft.
    pub fn commit_draft(&mut self) -> bool {
        match self.draft().cloned() {
            Some(draft) => self.commit_edit(draft),
            None => false,
        }
    }

    pub fn cancel_edit(&mut self) {
        if matches!(self.state, SurfaceState::Editing { .. }) {
            self.state = SurfaceState::Idle;
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match (self.state.clone(), event) {
            (SurfaceState::Editing { .. }, _) => {}
            (SurfaceState::Idle, PointerEvent::Down { x, y }) => self.pointer_down(x, y),
            (SurfaceState::Idle, _) => {}
            (_, PointerEvent::Down { .. }) => {}
            (SurfaceState::Drawing, PointerEvent::Move { x, y }) => self.canvas.extend_stroke(x, y),
            (SurfaceState::Drawing, PointerEvent::Up { .. }) => {
                self.canvas.end_stroke();
                self.state = SurfaceState::Idle;
            }
            (SurfaceState::Dragging { id, origin, start }, PointerEvent::Move { x, y }) => {
                if let Some(record) = self.text_box_mut(id) {
                    record.rect.x = origin.x + (x - start.0);
                    record.rect.y = origin.y + (y - start.1);
                }
            }
            (SurfaceState::Resizing { id, origin, start }, PointerEvent::Move { x, y }) => {
                if let Some(record) = self.text_box_mut(id) {
                    record.rect.w = origin.w + (x - start.0);
                    record.rect.h = origin.h + (y - start.1);
                }
            }
            (SurfaceState::Dragging { .. }, PointerEvent::Up { .. })
            | (SurfaceState::Resizing { .. }, PointerEvent::Up { .. }) => {
                self.state = SurfaceState::Idle;
            }
        }
    }

    fn pointer_down(&mut self, x: f32, y: f32) {
        if !self.canvas.contains(x, y) {
            return;
        }

        let handle = self.resize_handle_px;
        let hit = self.boxes.iter().rev().find_map(|(id, record)| {
            let rect = record.rect;
            let on_handle = x >= rect.x + rect.w - handle
                && x <= rect.x + rect.w
                && y >= rect.y + rect.h - handle
                && y <= rect.y + rect.h;

            if on_handle {
                Some(SurfaceState::Resizing { id: *id, origin: rect, start: (x, y) })
            } else if rect.contains(x, y) {
                Some(SurfaceState::Dragging { id: *id, origin: rect, start: (x, y) })
            } else {
                None
            }
        });

        self.state = match hit {
            Some(state) => state,
            None => {
                self.canvas.begin_stroke(x, y);
                SurfaceState::Drawing
            }
        };
    }

    /// Captures the surface for the store: the freehand layer, if any pixels
    /// were ever drawn, and the text boxes in creation order.
    pub fn snapshot(&self) -> (Option<FreehandLayer>, Vec<TextBoxRecord>) {
        let records = self.boxes.iter().map(|(_, record)| record.clone()).collect();

        if !self.canvas.is_dirty() {
            return (self.carried.clone(), records);
        }

        match FreehandLayer::encode(self.canvas.raster()) {
            Ok(layer) => (Some(layer), records),
            Err(err) => {
                log::warn!("page {}: freehand layer could not be encoded: {err}", self.page);
                (self.carried.clone(), records)
            }
        }
    }
}
