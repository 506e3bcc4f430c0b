//! One open document plus its annotation state.
//!
//! The session owns the store and the single live surface. Every page move and
//! zoom change flushes the surface first, then rebuilds it for the new view.

use crate::error::SessionError;
use crate::export::{ExportJob, ExportedDocument};
use crate::render_gate::{RenderGate, RenderTicket};
use crate::surface::{LiveAnnotationSurface, PointerEvent};
use image::RgbaImage;
use pagemark_model::{
    AnnotationStore, EditorConfig, PageIndex, PageSize, Rgb, TextContent, ZoomFactor,
};
use pdf_engine::{
    DocumentHandle, LopdfEngine, OpenSource, PdfEngine, PdfEngineError, RenderRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub struct Session<E: PdfEngine = LopdfEngine> {
    engine: E,
    handle: DocumentHandle,
    original: Arc<[u8]>,
    page_sizes: Vec<PageSize>,
    config: EditorConfig,
    store: AnnotationStore,
    surface: LiveAnnotationSurface,
    render_gate: RenderGate,
    page_raster: Option<RgbaImage>,
}

impl Session<LopdfEngine> {
    pub fn open(source: impl Into<OpenSource>, config: EditorConfig) -> Result<Self, SessionError> {
        Self::with_engine(LopdfEngine::new(), source, config)
    }
}

impl<E: PdfEngine> Session<E> {
    pub fn with_engine(
        mut engine: E,
        source: impl Into<OpenSource>,
        config: EditorConfig,
    ) -> Result<Self, SessionError> {
        let handle = engine.open(source.into()).map_err(SessionError::Load)?;
        let page_count = engine.page_count(handle).map_err(SessionError::Load)?;
        let page_sizes = (0..page_count)
            .map(|index| engine.page_size(handle, index))
            .collect::<Result<Vec<_>, _>>()
            .map_err(SessionError::Load)?;
        let first_size = page_sizes.first().copied().ok_or_else(|| {
            SessionError::Load(PdfEngineError::Backend("document has no pages".to_owned()))
        })?;
        let original = engine.original_bytes(handle).map_err(SessionError::Load)?;

        let zoom = config.clamp_zoom(config.default_zoom);
        let surface = LiveAnnotationSurface::new(PageIndex::FIRST, zoom, first_size, &config);
        log::info!("session opened: {page_count} pages, zoom {}", zoom.get());

        Ok(Self {
            engine,
            handle,
            original,
            page_sizes,
            config,
            store: AnnotationStore::new(),
            surface,
            render_gate: RenderGate::new(),
            page_raster: None,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    pub fn current_page(&self) -> PageIndex {
        self.surface.page()
    }

    pub fn zoom(&self) -> ZoomFactor {
        self.surface.zoom()
    }

    pub fn page_size(&self, page: PageIndex) -> PageSize {
        self.page_sizes.get(page.zero_based() as usize).copied().unwrap_or_default()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn surface(&self) -> &LiveAnnotationSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut LiveAnnotationSurface {
        &mut self.surface
    }

    pub fn original_bytes(&self) -> &Arc<[u8]> {
        &self.original
    }

    /// Raster of the current page, once a render for the current view was committed.
    pub fn page_raster(&self) -> Option<&RgbaImage> {
        self.page_raster.as_ref()
    }

    /// Writes the live surface into the store, replacing the page's previous entry.
    pub fn flush(&mut self) {
        let (freehand, text_boxes) = self.surface.snapshot();
        let page = self.surface.page();
        log::debug!(
            "flushing page {page}: {} text boxes, freehand layer: {}",
            text_boxes.len(),
            freehand.is_some()
        );
        self.store.flush(page, freehand, text_boxes, self.surface.zoom());
    }

    fn switch_view(&mut self, page: PageIndex, zoom: ZoomFactor) {
        self.flush();

        let size = self.page_size(page);
        self.surface =
            LiveAnnotationSurface::rehydrate(page, zoom, size, self.store.get(page), &self.config);
        self.page_raster = None;
        self.render_gate.begin_generation();
    }

    /// Moves to `page`, clamped into the document. Returns the page now shown.
    pub fn go_to_page(&mut self, page: u32) -> PageIndex {
        let target = PageIndex::clamped(page, self.page_count());
        if target != self.current_page() {
            self.switch_view(target, self.zoom());
        }
        target
    }

    pub fn next_page(&mut self) -> PageIndex {
        self.go_to_page(self.current_page().get().saturating_add(1))
    }

    pub fn previous_page(&mut self) -> PageIndex {
        self.go_to_page(self.current_page().get().saturating_sub(1))
    }

    /// Changes the shared zoom, clamped to the configured range.
    pub fn set_zoom(&mut self, zoom: ZoomFactor) -> ZoomFactor {
        let target = self.config.clamp_zoom(zoom);
        if target != self.zoom() {
            self.switch_view(self.current_page(), target);
        }
        target
    }

    pub fn begin_render(&self) -> RenderTicket {
        self.render_gate.issue(self.current_page(), self.zoom())
    }

    pub fn render(&self, ticket: &RenderTicket) -> Result<RgbaImage, SessionError> {
        let request = RenderRequest { page_index: ticket.page.zero_based(), zoom: ticket.zoom };
        self.engine.render_page(self.handle, request).map_err(SessionError::Render)
    }

    /// Installs `raster` if `ticket` still describes the current view.
    pub fn commit_render(&mut self, ticket: RenderTicket, raster: RgbaImage) -> bool {
        if !self.render_gate.accepts(&ticket, self.current_page(), self.zoom()) {
            log::debug!(
                "discarding stale render of page {} (generation {}, current {})",
                ticket.page,
                ticket.generation,
                self.render_gate.generation()
            );
            return false;
        }

        log::debug!("committed render of page {} at zoom {}", ticket.page, ticket.zoom.get());
        self.page_raster = Some(raster);
        true
    }

    /// Renders and commits the current view in one step.
    pub fn render_current(&mut self) -> Result<bool, SessionError> {
        let ticket = self.begin_render();
        let raster = self.render(&ticket)?;
        Ok(self.commit_render(ticket, raster))
    }

    /// Flushes, then detaches everything export needs.
    pub fn prepare_export(&mut self) -> ExportJob {
        self.flush();
        ExportJob {
            original: Arc::clone(&self.original),
            store: self.store.clone(),
            total_pages: self.page_count(),
            file_name: self.config.export_file_name.clone(),
            mime_type: self.config.export_mime_type.clone(),
        }
    }

    pub fn export(&mut self) -> Result<ExportedDocument, SessionError> {
        Ok(self.prepare_export().run()?)
    }
}

impl<E: PdfEngine> Drop for Session<E> {
    fn drop(&mut self) {
        if let Err(err) = self.engine.close(self.handle) {
            log::debug!("closing document failed: {err}");
        }
    }
}

/// Partial text styling; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextPatch {
    pub text: Option<String>,
    pub font_family: Option<String>,
    pub font_size_pt: Option<f32>,
    pub color: Option<Rgb>,
}

impl TextPatch {
    pub fn apply_to(&self, content: &mut TextContent) {
        if let Some(text) = &self.text {
            content.text = text.clone();
        }
        if let Some(family) = &self.font_family {
            content.font_family = family.clone();
        }
        match self.font_size_pt {
            Some(size) if TextContent::is_valid_font_size(size) => content.font_size_pt = size,
            Some(size) => log::debug!("ignoring invalid font size {size}"),
            None => {}
        }
        if let Some(color) = self.color {
            content.color = color;
        }
    }
}

/// Scriptable user input, replayed against a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionAction {
    GoToPage { page: u32 },
    NextPage,
    PreviousPage,
    SetZoom { zoom: ZoomFactor },
    Pointer { event: PointerEvent },
    /// Shorthand for a pointer-down, moves through every point, and pointer-up.
    Stroke { points: Vec<[f32; 2]> },
    PlaceTextBox {
        #[serde(flatten)]
        style: TextPatch,
    },
    /// Edits the `index`-th text box of the current page, in creation order.
    EditTextBox {
        index: usize,
        #[serde(flatten)]
        style: TextPatch,
    },
    Flush,
}

pub fn apply_session_action<E: PdfEngine>(session: &mut Session<E>, action: SessionAction) {
    match action {
        SessionAction::GoToPage { page } => {
            session.go_to_page(page);
        }
        SessionAction::NextPage => {
            session.next_page();
        }
        SessionAction::PreviousPage => {
            session.previous_page();
        }
        SessionAction::SetZoom { zoom } => {
            session.set_zoom(zoom);
        }
        SessionAction::Pointer { event } => session.surface_mut().handle_pointer(event),
        SessionAction::Stroke { points } => {
            let Some(([first_x, first_y], rest)) = points.split_first() else {
                return;
            };
            let surface = session.surface_mut();
            surface.handle_pointer(PointerEvent::Down { x: *first_x, y: *first_y });
            for [x, y] in rest {
                surface.handle_pointer(PointerEvent::Move { x: *x, y: *y });
            }
            let [last_x, last_y] = rest.last().copied().unwrap_or([*first_x, *first_y]);
            surface.handle_pointer(PointerEvent::Up { x: last_x, y: last_y });
        }
        SessionAction::PlaceTextBox { style } => {
            let mut content = session.config().text_defaults.clone();
            style.apply_to(&mut content);
            session.surface_mut().place_text_box(content);
        }
        SessionAction::EditTextBox { index, style } => {
            let surface = session.surface_mut();
            let Some(id) = surface.text_box_id(index) else {
                log::debug!("no text box {index} on page {}", surface.page());
                return;
            };
            if !surface.begin_edit(id) {
                return;
            }
            if let Some(draft) = surface.draft_mut() {
                style.apply_to(draft);
            }
            surface.commit_draft();
        }
        SessionAction::Flush => session.flush(),
    }
}
