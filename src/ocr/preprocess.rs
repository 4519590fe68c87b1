use image::{GrayImage, Luma, RgbaImage};
use imageproc::contrast::otsu_level;

use crate::config::PixelRect;

/// Crops a sub-region from a frame using pixel coordinates.
///
/// The rect is clamped to the frame bounds, so a region running past the
/// edge is silently truncated and one that starts outside yields an empty image.
pub fn crop_region(img: &RgbaImage, rect: &PixelRect) -> RgbaImage {
    let (w, h) = img.dimensions();

    let x0 = rect.x.min(w);
    let y0 = rect.y.min(h);
    let rw = rect.width.min(w - x0);
    let rh = rect.height.min(h - y0);

    image::imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Converts to 8-bit luma.
pub fn to_grayscale(img: &RgbaImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Binarizes with an automatically chosen (Otsu) level.
///
/// Pixels brighter than the level become white (255), the rest black (0).
/// Dark text on a light background stays dark.
pub fn threshold_otsu(gray: &GrayImage) -> GrayImage {
    if gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }
    let level = otsu_level(gray);
    binarize(gray, |v| if v > level { 255 } else { 0 })
}

/// Inverse binarization at a fixed cutoff.
///
/// Pixels brighter than `cutoff` become black (0), the rest white (255), which
/// turns light text on a dark background into dark text on white.
pub fn threshold_inverse(gray: &GrayImage, cutoff: u8) -> GrayImage {
    binarize(gray, |v| if v > cutoff { 0 } else { 255 })
}

fn binarize(gray: &GrayImage, f: impl Fn(u8) -> u8) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in gray.enumerate_pixels() {
        output.put_pixel(x, y, Luma([f(pixel[0])]));
    }

    output
}
