//! Bakes stored annotations into a fresh copy of the original document.

use pagemark_model::{to_document_space, AnnotationStore, ModelError, PageIndex};
use pdf_engine::{DocRect, DocumentMutator, LopdfMutator, PdfEngineError, TextRun};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("original document could not be re-parsed: {0}")]
    Parse(#[source] PdfEngineError),
    #[error("document has {actual} pages but {expected} were expected")]
    PageCountMismatch { expected: u32, actual: u32 },
    #[error("freehand layer of page {page} could not be decoded: {source}")]
    Decode {
        page: PageIndex,
        #[source]
        source: ModelError,
    },
    #[error("failed to write annotations: {0}")]
    Mutation(#[from] PdfEngineError),
}

/// Final export result handed to whoever saves or downloads it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

/// Everything an export needs, detached from the session so it can run on
/// another thread while the user keeps editing.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub original: Arc<[u8]>,
    pub store: AnnotationStore,
    pub total_pages: u32,
    pub file_name: String,
    pub mime_type: String,
}

impl ExportJob {
    pub fn run(&self) -> Result<ExportedDocument, ExportError> {
        let bytes = export(&self.original, &self.store, self.total_pages)?;
        Ok(ExportedDocument {
            bytes,
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
        })
    }
}

pub fn export(
    original: &[u8],
    store: &AnnotationStore,
    total_pages: u32,
) -> Result<Vec<u8>, ExportError> {
    export_with::<LopdfMutator>(original, store, total_pages)
}

pub fn export_with<M: DocumentMutator>(
    original: &[u8],
    store: &AnnotationStore,
    total_pages: u32,
) -> Result<Vec<u8>, ExportError> {
    let mut mutator = M::load(original).map_err(ExportError::Parse)?;
    composite(&mut mutator, store, total_pages)?;
    let bytes = mutator.finalize()?;

    log::info!(
        "exported {} pages ({} annotated), {} bytes",
        total_pages,
        store.annotated_pages().count(),
        bytes.len()
    );
    Ok(bytes)
}

/// Draws every stored page entry onto `mutator`, in page order. Pages
/// without annotations are left alone.
pub fn composite<M: DocumentMutator>(
    mutator: &mut M,
    store: &AnnotationStore,
    total_pages: u32,
) -> Result<(), ExportError> {
    let actual = mutator.page_count();
    if actual != total_pages {
        return Err(ExportError::PageCountMismatch { expected: total_pages, actual });
    }

    for page_index in 0..total_pages {
        let page = PageIndex::from_zero_based(page_index);
        let entry = store.get(page);
        if entry.is_empty() {
            continue;
        }

        let size = mutator.page_size(page_index)?;

        if let Some(layer) = &entry.freehand {
            let raster = layer.decode().map_err(|source| ExportError::Decode { page, source })?;
            mutator.draw_image(page_index, &raster, DocRect::covering(size))?;
        }

        for record in &entry.text_boxes {
            let rect = record.rect;
            let origin = to_document_space(rect.x, rect.y, rect.h, entry.capture_zoom, size);
            let run = TextRun {
                text: &record.content.text,
                font_family: &record.content.font_family,
                size_pt: record.content.font_size_pt,
                color: record.content.color,
                x: origin.x,
                y: origin.y,
            };
            mutator.draw_text(page_index, &run)?;
        }
    }

    Ok(())
}
