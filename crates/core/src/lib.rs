//! Annotation editing and export.
//!
//! [`Session`] ties a loaded document to the annotation store and the live
//! editing surface; [`export`] bakes the stored annotations into new bytes.

pub mod canvas;
pub mod error;
pub mod export;
pub mod render_gate;
pub mod session;
pub mod surface;

pub use canvas::{FreehandCanvas, Pen};
pub use error::SessionError;
pub use export::{composite, export, export_with, ExportError, ExportJob, ExportedDocument};
pub use render_gate::{RenderGate, RenderTicket};
pub use session::{apply_session_action, Session, SessionAction, TextPatch};
pub use surface::{LiveAnnotationSurface, PointerEvent, SurfaceState, TextBoxId};
