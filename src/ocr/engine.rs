use anyhow::{Context, Result};
use image::GrayImage;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::{find_tessdata_dir, find_tesseract_executable};
use crate::config::OcrConfig;
use crate::error::ExtractionError;

/// Tesseract page segmentation mode: a single uniform block of text.
pub const PSM_SINGLE_BLOCK: u8 = 6;

const DIGITS: &str = "0123456789";

/// Per-call recognition settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OcrOptions {
    /// `--psm` value; engine default when `None`
    pub page_seg_mode: Option<u8>,
    pub exclude_digits: bool,
}

/// Anything that turns a preprocessed image into raw text lines.
///
/// Lines come back as the engine printed them, blanks included; cleaning
/// happens in the caller.
pub trait TextRecognizer {
    fn recognize(&self, image: &GrayImage, options: &OcrOptions) -> Result<Vec<String>>;
}

/// Runs the `tesseract` command-line program.
pub struct TesseractCli {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    language: String,
}

impl TesseractCli {
    /// Resolves the executable and tessdata directory once up front.
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let executable = find_tesseract_executable(config)?;
        let tessdata = find_tessdata_dir(config)?;
        crate::log(&format!("Using tesseract: {}", executable.display()));
        if let Some(dir) = &tessdata {
            crate::log(&format!("Using tessdata: {}", dir.display()));
        }
        Ok(Self {
            executable,
            tessdata,
            language: config.language.clone(),
        })
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, image: &GrayImage, options: &OcrOptions) -> Result<Vec<String>> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image
            .save(temp_input.path())
            .context("Failed to write OCR input image")?;

        let args = tesseract_args(
            temp_input.path(),
            self.tessdata.as_deref(),
            &self.language,
            options,
        );
        let output = Command::new(&self.executable)
            .args(&args)
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Ocr(format!("Tesseract failed: {}", stderr.trim())).into());
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .split('\n')
            .map(str::to_string)
            .collect())
    }
}

/// Builds the argument list for one tesseract invocation writing to stdout.
pub fn tesseract_args(
    input: &Path,
    tessdata: Option<&Path>,
    language: &str,
    options: &OcrOptions,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![input.into(), "stdout".into()];

    if let Some(dir) = tessdata {
        args.push("--tessdata-dir".into());
        args.push(dir.into());
    }

    args.push("-l".into());
    args.push(language.into());

    if let Some(psm) = options.page_seg_mode {
        args.push("--psm".into());
        args.push(psm.to_string().into());
    }

    if options.exclude_digits {
        args.push("-c".into());
        args.push(format!("tessedit_char_blacklist={}", DIGITS).into());
    }

    args
}
