use crate::ModelError;
use image::{ImageFormat, RgbaImage};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

/// PNG snapshot of a page's freehand drawing surface.
///
/// The pixel size is whatever the surface was at capture time (page size times
/// the zoom of that visit). Export stretches it over the whole page, so the
/// resolution affects fidelity but never placement.
#[derive(Clone, PartialEq, Eq)]
pub struct FreehandLayer {
    png: Arc<[u8]>,
    width_px: u32,
    height_px: u32,
}

impl FreehandLayer {
    pub fn encode(raster: &RgbaImage) -> Result<Self, ModelError> {
        let mut bytes = Vec::new();
        raster
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(ModelError::Encode)?;

        Ok(Self { png: bytes.into(), width_px: raster.width(), height_px: raster.height() })
    }

    /// Wraps already-encoded PNG bytes. Nothing is validated until [`Self::decode`].
    pub fn from_png(png: impl Into<Arc<[u8]>>, width_px: u32, height_px: u32) -> Self {
        Self { png: png.into(), width_px, height_px }
    }

    pub fn decode(&self) -> Result<RgbaImage, ModelError> {
        let raster = image::load_from_memory_with_format(&self.png, ImageFormat::Png)
            .map_err(ModelError::Decode)?
            .into_rgba8();

        if raster.dimensions() != (self.width_px, self.height_px) {
            return Err(ModelError::LayerSizeMismatch {
                expected_width: self.width_px,
                expected_height: self.height_px,
                actual_width: raster.width(),
                actual_height: raster.height(),
            });
        }

        Ok(raster)
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }
}

impl fmt::Debug for FreehandLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreehandLayer")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("png_len", &self.png.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn encode_then_decode_preserves_pixels() {
        let mut raster = RgbaImage::new(8, 4);
        raster.put_pixel(3, 2, Rgba([255, 0, 0, 255]));

        let layer = FreehandLayer::encode(&raster).expect("encode should succeed");
        assert_eq!(layer.dimensions(), (8, 4));

        let decoded = layer.decode().expect("decode should succeed");
        assert_eq!(decoded.get_pixel(3, 2), &Rgba([255, 0, 0, 255]));
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let layer = FreehandLayer::from_png(b"not a png".to_vec(), 4, 4);
        assert!(matches!(layer.decode(), Err(ModelError::Decode(_))));
    }

    #[test]
    fn mismatched_dimensions_are_reported() {
        let raster = RgbaImage::new(2, 2);
        let encoded = FreehandLayer::encode(&raster).expect("encode should succeed");
        let layer = FreehandLayer::from_png(encoded.png_bytes().to_vec(), 3, 3);

        assert!(matches!(layer.decode(), Err(ModelError::LayerSizeMismatch { .. })));
    }
}
