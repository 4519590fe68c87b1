pub mod clean;
pub mod engine;
pub mod preprocess;
pub mod setup;

pub use clean::{clean_lines, strip_thousands};
pub use engine::{OcrOptions, TesseractCli, TextRecognizer, PSM_SINGLE_BLOCK};
pub use preprocess::crop_region;

use anyhow::Result;
use image::RgbaImage;

use crate::config::{RegionConfig, TextStyle};
use preprocess::{threshold_inverse, threshold_otsu, to_grayscale};

/// Dark text on a light background → cleaned tokens.
///
/// Grayscale, Otsu binarization, then OCR as one uniform block of stacked lines.
pub fn extract_dark_text(
    recognizer: &dyn TextRecognizer,
    crop: &RgbaImage,
    exclude_digits: bool,
) -> Result<Vec<String>> {
    let binary = threshold_otsu(&to_grayscale(crop));
    let options = OcrOptions {
        page_seg_mode: Some(PSM_SINGLE_BLOCK),
        exclude_digits,
    };
    let lines = recognizer.recognize(&binary, &options)?;
    Ok(clean_lines(&lines))
}

/// Light text on a dark background → cleaned tokens.
///
/// Grayscale, inverse binarization at `cutoff`, then OCR with engine defaults.
pub fn extract_light_text(
    recognizer: &dyn TextRecognizer,
    crop: &RgbaImage,
    cutoff: u8,
    exclude_digits: bool,
) -> Result<Vec<String>> {
    let binary = threshold_inverse(&to_grayscale(crop), cutoff);
    let options = OcrOptions {
        page_seg_mode: None,
        exclude_digits,
    };
    let lines = recognizer.recognize(&binary, &options)?;
    Ok(clean_lines(&lines))
}

/// Runs the variant matching the region's text style.
pub fn extract_region(
    recognizer: &dyn TextRecognizer,
    crop: &RgbaImage,
    region: &RegionConfig,
) -> Result<Vec<String>> {
    match region.style {
        TextStyle::DarkOnLight => extract_dark_text(recognizer, crop, region.exclude_digits),
        TextStyle::LightOnDark { cutoff } => {
            extract_light_text(recognizer, crop, cutoff, region.exclude_digits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PixelRect;
    use image::{GrayImage, Rgba};
    use std::cell::RefCell;

    /// Records what it was asked to read and answers with canned lines.
    struct Recording {
        seen: RefCell<Vec<(GrayImage, OcrOptions)>>,
        reply: Vec<String>,
    }

    impl Recording {
        fn new(reply: &[&str]) -> Self {
            Self {
                seen: RefCell::new(Vec::new()),
                reply: reply.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl TextRecognizer for Recording {
        fn recognize(&self, image: &GrayImage, options: &OcrOptions) -> Result<Vec<String>> {
            self.seen.borrow_mut().push((image.clone(), *options));
            Ok(self.reply.clone())
        }
    }

    fn two_tone(dark: u8, light: u8) -> RgbaImage {
        RgbaImage::from_fn(10, 2, |x, _| {
            let v = if x < 5 { dark } else { light };
            Rgba([v, v, v, 255])
        })
    }

    #[test]
    fn test_dark_variant_uses_block_mode_and_cleans() {
        let recognizer = Recording::new(&["1,250.50,", "", "1,250.45", "  "]);
        let tokens = extract_dark_text(&recognizer, &two_tone(20, 235), true).unwrap();

        assert_eq!(tokens, vec!["1,250.50", "1,250.45"]);
        let seen = recognizer.seen.borrow();
        let (image, options) = &seen[0];
        assert_eq!(options.page_seg_mode, Some(PSM_SINGLE_BLOCK));
        assert!(options.exclude_digits);
        // Dark text stays dark after Otsu
        assert_eq!(image.get_pixel(0, 0)[0], 0);
        assert_eq!(image.get_pixel(9, 0)[0], 255);
    }

    #[test]
    fn test_light_variant_inverts_and_uses_defaults() {
        let recognizer = Recording::new(&["2450.00", "2,48,113,"]);
        let tokens = extract_light_text(&recognizer, &two_tone(30, 200), 100, false).unwrap();

        assert_eq!(tokens, vec!["2450.00", "2,48,113"]);
        let seen = recognizer.seen.borrow();
        let (image, options) = &seen[0];
        assert_eq!(*options, OcrOptions::default());
        // Dark background → white, light text → black
        assert_eq!(image.get_pixel(0, 0)[0], 255);
        assert_eq!(image.get_pixel(9, 0)[0], 0);
    }

    #[test]
    fn test_extract_region_dispatches_on_style() {
        let recognizer = Recording::new(&["x"]);
        let crop = two_tone(30, 200);
        let region = RegionConfig {
            rect: PixelRect::new(0, 0, 10, 2),
            style: TextStyle::LightOnDark { cutoff: 100 },
            exclude_digits: false,
        };
        extract_region(&recognizer, &crop, &region).unwrap();
        assert_eq!(recognizer.seen.borrow()[0].1.page_seg_mode, None);

        let region = RegionConfig {
            style: TextStyle::DarkOnLight,
            ..region
        };
        extract_region(&recognizer, &crop, &region).unwrap();
        assert_eq!(
            recognizer.seen.borrow()[1].1.page_seg_mode,
            Some(PSM_SINGLE_BLOCK)
        );
    }
}
