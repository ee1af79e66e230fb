//! Image decoding from the filesystem into a pixel buffer.

use crate::error::ImageLoadError;

/// Interleaved 8-bit pixels in BGR order, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Loads an image file. Blocking; the gateway calls it off the async runtime.
pub trait ImageLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<PixelBuffer, ImageLoadError>;
}

/// [`ImageLoader`] backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageLoader;

impl ImageLoader for FileImageLoader {
    fn load(&self, path: &str) -> Result<PixelBuffer, ImageLoadError> {
        let decoded = image::open(path).map_err(|e| ImageLoadError::Unreadable {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageLoadError::Empty(path.to_string()));
        }

        let mut data = rgb.into_raw();
        for pixel in data.chunks_exact_mut(3) {
            pixel.swap(0, 2);
        }

        Ok(PixelBuffer {
            width,
            height,
            data,
        })
    }
}
