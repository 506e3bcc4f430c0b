//! Per-page annotation state model.
//!
//! Everything here is plain data: page and zoom newtypes, text-box records,
//! freehand raster snapshots and the store that owns them between page visits.

pub mod color;
pub mod config;
pub mod coords;
pub mod freehand;
pub mod page;
pub mod store;
pub mod text_box;

pub use color::Rgb;
pub use config::{EditorConfig, PenConfig, TextBoxDefaults};
pub use coords::{rescale, to_document_space, DocPoint, EditRect};
pub use freehand::FreehandLayer;
pub use page::{PageIndex, PageSize, ZoomFactor};
pub use store::{AnnotationStore, PageAnnotationEntry};
pub use text_box::{TextBoxRecord, TextContent};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("page index is 1-based, got {0}")]
    InvalidPage(u32),
    #[error("zoom factor must be finite and positive, got {0}")]
    InvalidZoom(f32),
    #[error("invalid color {0:?}")]
    InvalidColor(String),
    #[error("failed to encode freehand layer: {0}")]
    Encode(#[source] image::ImageError),
    #[error("failed to decode freehand layer: {0}")]
    Decode(#[source] image::ImageError),
    #[error(
        "freehand layer decoded to {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    LayerSizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}
