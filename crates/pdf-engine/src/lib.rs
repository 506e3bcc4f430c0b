//! Document renderer and document mutator backends.
//!
//! [`PdfEngine`] turns a page number plus zoom into a raster. [`DocumentMutator`]
//! loads a fresh, mutable copy of a document, draws images and text onto its
//! pages and serializes the result. Both are implemented on top of lopdf.

use image::{ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use pagemark_model::{PageSize, ZoomFactor};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod builder;
pub mod fonts;
pub mod mutator;

pub use builder::build_numbered_pages;
pub use fonts::StandardFont;
pub use mutator::{DocRect, DocumentMutator, LopdfMutator, TextRun};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Parent chains deeper than this are treated as malformed.
const MAX_PAGE_TREE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// Zero-based page index.
    pub page_index: u32,
    pub zoom: ZoomFactor,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, zoom: ZoomFactor::ONE }
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("malformed page {page}: {reason}")]
    MalformedPage { page: u32, reason: String },
    #[error("backend error: {0}")]
    Backend(String),
}

/// Page rasterizer over opened documents.
pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;
    /// Raster of exactly `page_size.pixels_at(request.zoom)` pixels.
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError>;
    /// The untouched bytes the document was opened from.
    fn original_bytes(&self, handle: DocumentHandle) -> Result<Arc<[u8]>, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    bytes: Arc<[u8]>,
    page_sizes: Vec<PageSize>,
}

/// Default engine. lopdf cannot rasterize page content, so rendered pages are
/// blank sheets of the correct size; annotation overlays are unaffected.
#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PdfEngineError> {
        reject_encrypted(bytes)?;

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (number, object_id) in pages {
            sizes.push(page_box(&doc, object_id, number)?.size);
        }

        if sizes.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        Ok(sizes)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let page_sizes = Self::parse_sizes(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        log::debug!("opened document {} with {} pages", handle.raw(), page_sizes.len());
        self.docs.insert(handle, DocumentRecord { bytes: bytes.into(), page_sizes });

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_sizes.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: record.page_sizes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        let page_size = self.page_size(handle, request.page_index)?;
        let (width, height) = page_size.pixels_at(request.zoom);

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(image)
    }

    fn original_bytes(&self, handle: DocumentHandle) -> Result<Arc<[u8]>, PdfEngineError> {
        Ok(Arc::clone(&self.record(handle)?.bytes))
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

/// Page geometry as stored in the file: media box origin plus size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PageBox {
    pub origin_x: f32,
    pub origin_y: f32,
    pub size: PageSize,
}

impl Default for PageBox {
    fn default() -> Self {
        Self { origin_x: 0.0, origin_y: 0.0, size: PageSize::default() }
    }
}

pub(crate) fn reject_encrypted(bytes: &[u8]) -> Result<(), PdfEngineError> {
    if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
        return Err(PdfEngineError::EncryptedUnsupported);
    }
    Ok(())
}

/// Resolves the page's MediaBox, following `/Parent` for inherited boxes.
/// Pages without any box fall back to US Letter.
pub(crate) fn page_box(
    doc: &Document,
    page_id: ObjectId,
    page_number: u32,
) -> Result<PageBox, PdfEngineError> {
    let mut current = Some(page_id);
    let mut depth = 0;

    while let Some(id) = current {
        if depth > MAX_PAGE_TREE_DEPTH {
            return Err(PdfEngineError::MalformedPage {
                page: page_number,
                reason: "page tree is too deep or cyclic".to_owned(),
            });
        }
        depth += 1;

        let dict = doc.get_dictionary(id)?;
        if let Some(found) = media_box(doc, dict) {
            return Ok(found);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(PageBox::default())
}

fn media_box(doc: &Document, dict: &Dictionary) -> Option<PageBox> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let array = resolved.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }

    let x0 = array[0].as_float().ok()?;
    let y0 = array[1].as_float().ok()?;
    let x1 = array[2].as_float().ok()?;
    let y1 = array[3].as_float().ok()?;

    Some(PageBox {
        origin_x: x0.min(x1),
        origin_y: y0.min(y1),
        size: PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() },
    })
}

#[cfg(feature = "pdfium")]
pub mod pdfium_backend {
    //! Renders real page content through a system Pdfium library. Page sizes
    //! and original bytes still come from the lopdf engine so both backends
    //! agree on geometry.

    use super::*;
    use pdfium_render::prelude::*;

    pub struct PdfiumEngine {
        pdfium: Pdfium,
        inner: LopdfEngine,
    }

    impl PdfiumEngine {
        pub fn from_system_library() -> Result<Self, PdfEngineError> {
            let bindings = Pdfium::bind_to_system_library().map_err(|err| {
                PdfEngineError::Backend(format!("failed to bind pdfium system library: {err}"))
            })?;

            Ok(Self { pdfium: Pdfium::new(bindings), inner: LopdfEngine::default() })
        }
    }

    impl PdfEngine for PdfiumEngine {
        fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
            self.inner.open(source)
        }

        fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
            self.inner.page_count(handle)
        }

        fn page_size(
            &self,
            handle: DocumentHandle,
            page_index: u32,
        ) -> Result<PageSize, PdfEngineError> {
            self.inner.page_size(handle, page_index)
        }

        fn render_page(
            &self,
            handle: DocumentHandle,
            request: RenderRequest,
        ) -> Result<RgbaImage, PdfEngineError> {
            let page_size = self.inner.page_size(handle, request.page_index)?;
            let (width, height) = page_size.pixels_at(request.zoom);
            let bytes = self.inner.original_bytes(handle)?;

            let backend = |err: PdfiumError| PdfEngineError::Backend(err.to_string());
            let document = self.pdfium.load_pdf_from_byte_slice(&bytes, None).map_err(backend)?;
            let page = document.pages().get(request.page_index as u16).map_err(backend)?;
            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new()
                        .set_target_width(width as i32)
                        .set_target_height(height as i32),
                )
                .map_err(backend)?;

            let mut image = bitmap.as_image().into_rgba8();
            if image.dimensions() != (width, height) {
                image = image::imageops::resize(
                    &image,
                    width,
                    height,
                    image::imageops::FilterType::Triangle,
                );
            }

            Ok(image)
        }

        fn original_bytes(&self, handle: DocumentHandle) -> Result<Arc<[u8]>, PdfEngineError> {
            self.inner.original_bytes(handle)
        }

        fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
            self.inner.close(handle)
        }
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}
