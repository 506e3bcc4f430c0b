use crate::ModelError;
use serde::{Deserialize, Serialize};

/// 1-based page number, valid in `[1, page_count]` of the loaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageIndex(u32);

impl PageIndex {
    pub const FIRST: PageIndex = PageIndex(1);

    pub fn new(page: u32) -> Option<Self> {
        (page >= 1).then_some(Self(page))
    }

    /// Clamps any requested page into `[1, page_count]`.
    pub fn clamped(page: u32, page_count: u32) -> Self {
        Self(page.max(1).min(page_count.max(1)))
    }

    pub fn from_zero_based(index: u32) -> Self {
        Self(index.saturating_add(1))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn zero_based(self) -> u32 {
        self.0 - 1
    }
}

impl TryFrom<u32> for PageIndex {
    type Error = ModelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ModelError::InvalidPage(value))
    }
}

impl From<PageIndex> for u32 {
    fn from(value: PageIndex) -> Self {
        value.0
    }
}

impl std::fmt::Display for PageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Linear scale between document points and edit-space pixels.
///
/// Shared by every page of a session; always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct ZoomFactor(f32);

impl ZoomFactor {
    pub const ONE: ZoomFactor = ZoomFactor(1.0);

    pub fn new(value: f32) -> Result<Self, ModelError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(ModelError::InvalidZoom(value))
        }
    }

    pub(crate) const fn new_unchecked(value: f32) -> Self {
        Self(value)
    }

    pub fn get(self) -> f32 {
        self.0
    }

    pub fn clamp(self, min: ZoomFactor, max: ZoomFactor) -> Self {
        Self(self.0.max(min.0).min(max.0))
    }

    /// Factor that converts edit-space lengths at `self` into lengths at `target`.
    pub fn ratio_to(self, target: ZoomFactor) -> f32 {
        target.0 / self.0
    }
}

impl Default for ZoomFactor {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<f32> for ZoomFactor {
    type Error = ModelError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ZoomFactor> for f32 {
    fn from(value: ZoomFactor) -> Self {
        value.0
    }
}

/// Native page size in document points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl Default for PageSize {
    fn default() -> Self {
        Self { width_pt: 612.0, height_pt: 792.0 }
    }
}

impl PageSize {
    pub fn new(width_pt: f32, height_pt: f32) -> Self {
        Self { width_pt, height_pt }
    }

    /// Pixel dimensions of the page rendered at `zoom`; never smaller than 1x1.
    pub fn pixels_at(self, zoom: ZoomFactor) -> (u32, u32) {
        let width = (self.width_pt * zoom.get()).round().max(1.0) as u32;
        let height = (self.height_pt * zoom.get()).round().max(1.0) as u32;
        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_index_rejects_zero() {
        assert!(PageIndex::new(0).is_none());
        assert!(matches!(PageIndex::try_from(0), Err(ModelError::InvalidPage(0))));
        assert_eq!(PageIndex::new(3).map(PageIndex::zero_based), Some(2));
    }

    #[test]
    fn page_index_clamps_to_document_bounds() {
        assert_eq!(PageIndex::clamped(0, 3).get(), 1);
        assert_eq!(PageIndex::clamped(9, 3).get(), 3);
        assert_eq!(PageIndex::clamped(2, 3).get(), 2);
    }

    #[test]
    fn zoom_must_be_finite_and_positive() {
        assert!(ZoomFactor::new(0.0).is_err());
        assert!(ZoomFactor::new(-1.5).is_err());
        assert!(ZoomFactor::new(f32::NAN).is_err());
        assert!(ZoomFactor::new(f32::INFINITY).is_err());
        assert_eq!(ZoomFactor::new(1.5).map(ZoomFactor::get).ok(), Some(1.5));
    }

    #[test]
    fn zoom_deserialization_is_validated() {
        let parsed: Result<ZoomFactor, _> = serde_json::from_str("-2.0");
        assert!(parsed.is_err());

        let parsed: ZoomFactor = serde_json::from_str("2.0").expect("zoom should parse");
        assert_eq!(parsed.get(), 2.0);
    }

    #[test]
    fn pixels_scale_linearly_with_zoom() {
        let size = PageSize::new(612.0, 792.0);
        assert_eq!(size.pixels_at(ZoomFactor::ONE), (612, 792));
        assert_eq!(size.pixels_at(ZoomFactor::new(2.0).expect("valid zoom")), (1224, 1584));
        assert_eq!(size.pixels_at(ZoomFactor::new(0.0001).expect("valid zoom")), (1, 1));
    }
}
