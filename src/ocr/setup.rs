use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::OcrConfig;

#[cfg(windows)]
const EXE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXE_NAME: &str = "tesseract";

#[cfg(windows)]
const COMMON_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];
#[cfg(not(windows))]
const COMMON_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

/// Returns the per-user directory for a private Tesseract install
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("depth-ocr")
        .join("tesseract")
}

/// Finds the Tesseract executable: configured path first, then PATH, then
/// common install locations, then the per-user directory.
pub fn find_tesseract_executable(config: &OcrConfig) -> Result<PathBuf> {
    if let Some(path) = &config.tesseract_path {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(anyhow!(
            "Configured tesseract_path does not exist: {}",
            path.display()
        ));
    }

    if responds_to_version(Path::new(EXE_NAME)) {
        return Ok(PathBuf::from(EXE_NAME));
    }

    for path in COMMON_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    let local_exe = get_tesseract_dir().join(EXE_NAME);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    Err(anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds the tessdata directory holding `<language>.traineddata`.
///
/// Returns `Ok(None)` when nothing is configured and there is no private
/// install, leaving Tesseract to use its compiled-in default.
pub fn find_tessdata_dir(config: &OcrConfig) -> Result<Option<PathBuf>> {
    let traineddata = format!("{}.traineddata", config.language);

    if let Some(dir) = &config.tessdata_dir {
        if dir.join(&traineddata).exists() {
            return Ok(Some(dir.clone()));
        }
        return Err(anyhow!(
            "{} not found in configured tessdata_dir {}",
            traineddata,
            dir.display()
        ));
    }

    let local_tessdata = get_tesseract_dir().join("tessdata");
    if local_tessdata.join(&traineddata).exists() {
        return Ok(Some(local_tessdata));
    }

    Ok(None)
}

fn responds_to_version(exe: &Path) -> bool {
    Command::new(exe)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
