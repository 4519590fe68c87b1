//! Extractor configuration.
//!
//! Loads the screen layout and OCR settings from config.json. The region
//! coordinates are tied to one recording resolution, so they live here
//! instead of in the extraction code.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExtractionError;

/// A rectangle in source-frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    /// X position of the top-left corner
    pub x: u32,
    /// Y position of the top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rejects empty rectangles. Bounds against the frame are not checked here;
    /// cropping clamps to whatever the frame provides.
    pub fn validate(&self, name: &str) -> Result<(), ExtractionError> {
        if self.width == 0 || self.height == 0 {
            return Err(ExtractionError::Config(format!(
                "region '{}' has empty size {}x{}",
                name, self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Colour scheme of the text inside a region. Selects the preprocessing path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextStyle {
    /// Dark text on a light background: Otsu binarization, single-block OCR.
    DarkOnLight,
    /// Light text on a dark background: inverse binarization at a fixed cutoff.
    LightOnDark {
        #[serde(default = "default_light_cutoff")]
        cutoff: u8,
    },
}

fn default_light_cutoff() -> u8 {
    100
}

/// One configured region of interest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub rect: PixelRect,
    pub style: TextStyle,
    /// Blacklist 0-9 during recognition
    #[serde(default)]
    pub exclude_digits: bool,
}

impl RegionConfig {
    fn order_book_column(x: u32, width: u32) -> Self {
        Self {
            rect: PixelRect::new(x, 170, width, 490),
            style: TextStyle::DarkOnLight,
            exclude_digits: false,
        }
    }
}

/// One value per named region of the market-depth screen: the six
/// order-book columns plus the summary block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSet<T> {
    pub bid_price: T,
    pub bid_orders: T,
    pub bid_qty: T,
    pub offer_price: T,
    pub offer_orders: T,
    pub offer_qty: T,
    /// Open/high/low/volume/circuit block below the book
    pub summary: T,
}

impl<T> RegionSet<T> {
    /// All values with their slot names, book columns first.
    pub fn named(&self) -> [(&'static str, &T); 7] {
        [
            ("bid_price", &self.bid_price),
            ("bid_orders", &self.bid_orders),
            ("bid_qty", &self.bid_qty),
            ("offer_price", &self.offer_price),
            ("offer_orders", &self.offer_orders),
            ("offer_qty", &self.offer_qty),
            ("summary", &self.summary),
        ]
    }

    /// Applies `f` to every slot in `named()` order, stopping at the first error.
    pub fn try_map<U, E>(
        &self,
        mut f: impl FnMut(&'static str, &T) -> Result<U, E>,
    ) -> Result<RegionSet<U>, E> {
        Ok(RegionSet {
            bid_price: f("bid_price", &self.bid_price)?,
            bid_orders: f("bid_orders", &self.bid_orders)?,
            bid_qty: f("bid_qty", &self.bid_qty)?,
            offer_price: f("offer_price", &self.offer_price)?,
            offer_orders: f("offer_orders", &self.offer_orders)?,
            offer_qty: f("offer_qty", &self.offer_qty)?,
            summary: f("summary", &self.summary)?,
        })
    }

    /// Pairs each slot with the same slot of `other`.
    pub fn zip<'a, U>(&'a self, other: &'a RegionSet<U>) -> RegionSet<(&'a T, &'a U)> {
        RegionSet {
            bid_price: (&self.bid_price, &other.bid_price),
            bid_orders: (&self.bid_orders, &other.bid_orders),
            bid_qty: (&self.bid_qty, &other.bid_qty),
            offer_price: (&self.offer_price, &other.offer_price),
            offer_orders: (&self.offer_orders, &other.offer_orders),
            offer_qty: (&self.offer_qty, &other.offer_qty),
            summary: (&self.summary, &other.summary),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&'static str, &T) -> U) -> RegionSet<U> {
        let mapped: Result<RegionSet<U>, std::convert::Infallible> =
            self.try_map(|name, value| Ok(f(name, value)));
        match mapped {
            Ok(set) => set,
            Err(never) => match never {},
        }
    }
}

/// Where each region sits on screen and how its text is read.
pub type ScreenLayout = RegionSet<RegionConfig>;

impl Default for ScreenLayout {
    fn default() -> Self {
        Self {
            bid_price: RegionConfig::order_book_column(0, 80),
            bid_orders: RegionConfig::order_book_column(80, 43),
            bid_qty: RegionConfig::order_book_column(123, 52),
            offer_price: RegionConfig::order_book_column(175, 60),
            offer_orders: RegionConfig::order_book_column(235, 55),
            offer_qty: RegionConfig::order_book_column(290, 60),
            summary: RegionConfig {
                rect: PixelRect::new(0, 750, 400, 500),
                style: TextStyle::LightOnDark {
                    cutoff: default_light_cutoff(),
                },
                exclude_digits: false,
            },
        }
    }
}

impl ScreenLayout {
    pub fn validate(&self) -> Result<(), ExtractionError> {
        for (name, region) in self.named() {
            region.rect.validate(name)?;
        }
        Ok(())
    }
}

/// Locating and configuring the Tesseract executable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Explicit path to the tesseract executable. Searched for when absent.
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory. Tesseract's built-in default when absent.
    pub tessdata_dir: Option<PathBuf>,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            tessdata_dir: None,
            language: "eng".to_string(),
        }
    }
}

/// What to do with a sampled frame whose OCR output is too short.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Drop the whole frame, log a warning and keep going.
    #[default]
    SkipFrame,
    /// Stop the run with the shortfall error.
    Abort,
}

/// Complete extractor configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub layout: ScreenLayout,
    pub ocr: OcrConfig,
    pub shortfall_policy: ShortfallPolicy,
    /// When set, the bid-price crop of every sampled frame is saved here.
    pub debug_crop_dir: Option<PathBuf>,
}

/// Loads configuration from `path`, or returns defaults if the file is
/// missing or unreadable.
pub fn load_config(path: &Path) -> ExtractorConfig {
    crate::log(&format!("Looking for config at: {}", path.display()));

    if path.exists() {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::warn(&format!(
                        "Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    ));
                }
            },
            Err(e) => {
                crate::warn(&format!(
                    "Failed to read {}: {}. Using defaults.",
                    path.display(),
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    ExtractorConfig::default()
}
