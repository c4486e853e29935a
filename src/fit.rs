// Window fitting
// Resamples the source image to the exact window size and prepares it for shm presentation

use crate::image_loader::SourceImage;
use image::imageops::{self, FilterType};

/// Resampling filter used for every fit, both up and down
pub const FIT_FILTER: FilterType = FilterType::Lanczos3;

/// A frame resampled to the window's content area.
///
/// Pixels are stored in Wayland `Argb8888` little-endian byte order
/// (B, G, R, A), already composited over black and fully opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    width: u32,
    height: u32,
    bgra: Vec<u8>,
}

impl RenderedImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row stride in bytes
    pub fn stride(&self) -> u32 {
        self.width * 4
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bgra
    }

    /// Pixel at (x, y) as (R, G, B)
    #[cfg(test)]
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        Some([self.bgra[idx + 2], self.bgra[idx + 1], self.bgra[idx]])
    }
}

/// Stretch `source` to exactly `width` x `height`.
///
/// Aspect ratio is not preserved. Zero dimensions are clamped to 1.
pub fn fit_to_window(source: &SourceImage, width: u32, height: u32) -> RenderedImage {
    let width = width.max(1);
    let height = height.max(1);

    // Resample the premultiplied copy so invisible pixels cannot bleed into visible ones
    let resized = imageops::resize(source.over_black(), width, height, FIT_FILTER);

    let mut bgra = Vec::with_capacity(width as usize * height as usize * 4);
    for pixel in resized.pixels() {
        let [r, g, b] = pixel.0;
        bgra.extend_from_slice(&[b, g, r, 0xff]);
    }

    RenderedImage { width, height, bgra }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use proptest::prelude::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> SourceImage {
        SourceImage::from_rgba(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    fn halves(width: u32, height: u32) -> SourceImage {
        SourceImage::from_rgba(RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        }))
    }

    #[test]
    fn stretches_to_larger_display() {
        let source = halves(1920, 1080);
        let rendered = fit_to_window(&source, 2560, 1440);

        assert_eq!((rendered.width(), rendered.height()), (2560, 1440));
        assert_eq!(rendered.as_bytes().len(), 2560 * 1440 * 4);

        // Stretched, not letterboxed: the corners carry image content rather than black
        assert_eq!(rendered.rgb_at(0, 0), Some([255, 0, 0]));
        assert_eq!(rendered.rgb_at(2559, 1439), Some([0, 0, 255]));
    }

    #[test]
    fn refit_to_smaller_window() {
        let rendered = fit_to_window(&halves(1920, 1080), 800, 600);

        assert_eq!((rendered.width(), rendered.height()), (800, 600));
        assert_eq!(rendered.stride(), 3200);
    }

    #[test]
    fn zero_area_window_yields_single_pixel() {
        let source = solid(4, 4, [9, 9, 9, 255]);

        let rendered = fit_to_window(&source, 0, 0);
        assert_eq!((rendered.width(), rendered.height()), (1, 1));

        let rendered = fit_to_window(&source, 0, 5);
        assert_eq!((rendered.width(), rendered.height()), (1, 5));
    }

    #[test]
    fn output_is_bgra_and_opaque() {
        let rendered = fit_to_window(&solid(2, 2, [10, 20, 30, 255]), 3, 3);

        for pixel in rendered.as_bytes().chunks_exact(4) {
            assert_eq!(pixel, &[30u8, 20, 10, 255]);
        }
    }

    #[test]
    fn transparency_shows_black_background() {
        let rendered = fit_to_window(&solid(2, 2, [200, 100, 50, 0]), 4, 4);
        assert!(rendered.as_bytes().chunks_exact(4).all(|p| p == [0u8, 0, 0, 255]));

        let rendered = fit_to_window(&solid(2, 2, [200, 100, 50, 128]), 2, 2);
        assert_eq!(rendered.rgb_at(1, 1), Some([100, 50, 25]));
    }

    #[test]
    fn transparent_neighbours_do_not_tint_edges() {
        let mut pixels = RgbaImage::new(2, 1);
        pixels.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        pixels.put_pixel(1, 0, Rgba([255, 255, 255, 0]));
        let source = SourceImage::from_rgba(pixels);

        let shrunk = fit_to_window(&source, 1, 1);
        let [r, g, b] = shrunk.rgb_at(0, 0).unwrap();
        assert!(r > 0);
        assert_eq!((g, b), (0, 0));

        let stretched = fit_to_window(&source, 8, 1);
        for x in 0..8 {
            let [_, g, b] = stretched.rgb_at(x, 0).unwrap();
            assert_eq!((g, b), (0, 0), "tinted pixel at x={x}");
        }
    }

    #[test]
    fn repeated_fit_is_byte_identical() {
        let source = halves(37, 23);
        let first = fit_to_window(&source, 101, 59);
        let second = fit_to_window(&source, 101, 59);
        assert_eq!(first, second);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn fit_matches_window_size(
            src_w in 1u32..48,
            src_h in 1u32..48,
            win_w in 1u32..160,
            win_h in 1u32..160,
            seed in any::<u8>(),
        ) {
            let source = SourceImage::from_rgba(RgbaImage::from_fn(src_w, src_h, |x, y| {
                let v = (x as u8).wrapping_mul(31) ^ (y as u8).wrapping_mul(17) ^ seed;
                Rgba([v, v.wrapping_add(80), v.wrapping_mul(3), 255])
            }));

            let rendered = fit_to_window(&source, win_w, win_h);
            prop_assert_eq!(rendered.width(), win_w);
            prop_assert_eq!(rendered.height(), win_h);
            prop_assert_eq!(rendered.as_bytes().len(), (win_w * win_h * 4) as usize);

            let again = fit_to_window(&source, win_w, win_h);
            prop_assert_eq!(rendered, again);
        }
    }
}
