use crate::export::ExportError;
use pdf_engine::PdfEngineError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to load document: {0}")]
    Load(#[source] PdfEngineError),
    #[error("failed to render page: {0}")]
    Render(#[source] PdfEngineError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
