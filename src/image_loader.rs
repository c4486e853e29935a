// Image loading module
// Reads the source image once at startup and keeps it decoded for the process lifetime

use crate::error::StartupError;
use image::{Rgb, RgbImage, RgbaImage};
use log::debug;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Decoded source image, never mutated after load
#[derive(Debug, Clone)]
pub struct SourceImage {
    // Premultiplied onto the black background, so transparent pixels carry no colour
    over_black: RgbImage,
}

impl SourceImage {
    /// Composite a decoded RGBA buffer over black
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        let over_black = RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
            let [r, g, b, a] = pixels.get_pixel(x, y).0;
            let alpha = a as u16;
            let blend = |c: u8| ((c as u16 * alpha + 127) / 255) as u8;
            Rgb([blend(r), blend(g), blend(b)])
        });
        Self { over_black }
    }

    /// Image width in pixels
    pub fn width(&self) -> u32 {
        self.over_black.width()
    }

    /// Image height in pixels
    pub fn height(&self) -> u32 {
        self.over_black.height()
    }

    /// The image composited over black, fully opaque
    pub fn over_black(&self) -> &RgbImage {
        &self.over_black
    }
}

/// Load and decode the image at `path`, as located by `resource::resolve`
pub fn load_image(path: &Path) -> Result<SourceImage, StartupError> {
    let data = fs::read(path).map_err(|source| StartupError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {}", data.len(), path.display());

    load_from_bytes(&data).map_err(|source| StartupError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode an image from raw bytes, auto-detecting the format
fn load_from_bytes(data: &[u8]) -> Result<SourceImage, image::ImageError> {
    let format = image::guess_format(data)?;
    let img = image::load(Cursor::new(data), format)?;

    Ok(SourceImage::from_rgba(img.to_rgba8()))
}
