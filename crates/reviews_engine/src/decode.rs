use crate::DecodedImage;

pub trait ImageDecoder: Send + Sync {
    /// `None` for unsupported or corrupt data.
    fn decode(&self, bytes: &[u8]) -> Option<DecodedImage>;
}

/// Decodes any raster format the `image` crate was built with into RGBA8.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterImageDecoder;

impl ImageDecoder for RasterImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Option<DecodedImage> {
        let rgba = image::load_from_memory(bytes).ok()?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Some(DecodedImage::new(width, height, rgba.into_raw()))
    }
}
