//! Market-depth video OCR
//!
//! Samples one frame per second from a screen recording of a trading
//! terminal's market-depth view, reads the order book and summary block with
//! Tesseract, and prepends the rows to a spreadsheet.
//!
//! Usage: `depth-ocr [VIDEO] [OUTPUT] [CONFIG]`

mod book;
mod config;
mod error;
mod ocr;
mod paths;
mod pipeline;
mod sink;
mod video;

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use ocr::TesseractCli;
use video::FfmpegSource;

const DEFAULT_VIDEO: &str = "resource.mp4";
const DEFAULT_OUTPUT: &str = "output.xlsx";
const LOG_FILE: &str = "depth_ocr.log";

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join(LOG_FILE);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

/// Logs a recoverable problem.
pub fn warn(msg: &str) {
    log(&format!("Warning: {}", msg));
}

/// Positional command-line arguments.
#[derive(Debug, PartialEq, Eq)]
struct Args {
    video: PathBuf,
    output: PathBuf,
    config: PathBuf,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Self {
        let video = args.next().unwrap_or_else(|| DEFAULT_VIDEO.to_string());
        let output = args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
        let config = args
            .next()
            .map(PathBuf::from)
            .unwrap_or_else(paths::get_default_config_path);
        Self {
            video: PathBuf::from(video),
            output: PathBuf::from(output),
            config,
        }
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        let log_path = paths::get_logs_dir().join(LOG_FILE);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));
}

fn run(args: &Args) -> Result<()> {
    let config = config::load_config(&args.config);
    config.layout.validate()?;

    let recognizer = TesseractCli::new(&config.ocr).context("Tesseract is not available")?;

    let source = FfmpegSource::open(&args.video)
        .with_context(|| format!("Failed to open video {}", args.video.display()))?;
    let info = source.info();
    log(&format!(
        "Video {}: {}x{}, {} fps",
        args.video.display(),
        info.width,
        info.height,
        info.fps
            .map(|fps| format!("{:.3}", fps))
            .unwrap_or_else(|| "unknown".to_string())
    ));

    let (records, _summary) = pipeline::process_video(source, &config, &recognizer)?;

    let total = sink::update_spreadsheet(&args.output, &records)
        .with_context(|| format!("Failed to update {}", args.output.display()))?;
    log(&format!(
        "Wrote {} new rows to {} ({} rows total)",
        records.len(),
        args.output.display(),
        total
    ));

    Ok(())
}

fn main() -> Result<()> {
    install_panic_hook();

    // Ensure output directories exist
    paths::ensure_directories()?;

    let args = Args::parse(std::env::args().skip(1));
    log(&format!("Starting depth-ocr with {:?}", args));

    if let Err(e) = run(&args) {
        log(&format!("Error: {:#}", e));
        return Err(e);
    }

    log("Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Args {
        Args::parse(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_args_default() {
        let parsed = args(&[]);
        assert_eq!(parsed.video, PathBuf::from("resource.mp4"));
        assert_eq!(parsed.output, PathBuf::from("output.xlsx"));
        assert_eq!(parsed.config, paths::get_default_config_path());
    }

    #[test]
    fn test_args_positional() {
        let parsed = args(&["day.mp4", "book.csv", "alt.json"]);
        assert_eq!(parsed.video, PathBuf::from("day.mp4"));
        assert_eq!(parsed.output, PathBuf::from("book.csv"));
        assert_eq!(parsed.config, PathBuf::from("alt.json"));
    }

    #[test]
    fn test_args_partial() {
        let parsed = args(&["day.mp4"]);
        assert_eq!(parsed.video, PathBuf::from("day.mp4"));
        assert_eq!(parsed.output, PathBuf::from("output.xlsx"));
    }
}
