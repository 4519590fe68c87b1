//! Frame sources.
//!
//! Decoding is delegated to the `ffmpeg`/`ffprobe` programs: metadata is
//! probed once as JSON, then raw RGBA frames are streamed from a child
//! process's stdout.

use anyhow::{Context, Result};
use image::RgbaImage;
use serde::Deserialize;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::error::ExtractionError;

/// A sequential, finite stream of decoded frames.
pub trait FrameSource {
    /// Frames per second as reported by the container, if known.
    fn fps(&self) -> Option<f64>;

    /// Decodes the next frame. `Ok(None)` once the stream is exhausted.
    fn read_frame(&mut self) -> Result<Option<RgbaImage>>;

    /// Advances past the next frame without building an image.
    /// Returns false once the stream is exhausted.
    fn skip_frame(&mut self) -> Result<bool> {
        Ok(self.read_frame()?.is_some())
    }

    /// Releases the underlying decoder. Safe to call more than once.
    fn close(&mut self) {}
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Video metadata needed before streaming.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
}

/// Parses an ffprobe rational such as `30000/1001` or `25/1`.
/// Zero or malformed rates yield `None`.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (num, den) = match rate.split_once('/') {
        Some((num, den)) => (num.trim().parse::<f64>().ok()?, den.trim().parse::<f64>().ok()?),
        None => (rate.trim().parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 {
        return None;
    }
    let fps = num / den;
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn parse_probe(json: &str) -> Result<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(json).context("Invalid ffprobe output")?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| ExtractionError::Config("video has no video stream".to_string()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(
                ExtractionError::Config("video stream reports no frame size".to_string()).into(),
            )
        }
    };

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_frame_rate));

    Ok(VideoInfo { width, height, fps })
}

/// Reads width, height and frame rate of the first video stream.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0", "-show_entries"])
        .arg("stream=width,height,r_frame_rate,avg_frame_rate")
        .args(["-of", "json"])
        .arg(path)
        .output()
        .context("Failed to run ffprobe")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::Config(format!(
            "cannot read video {}: {}",
            path.display(),
            stderr.trim()
        ))
        .into());
    }

    parse_probe(&String::from_utf8_lossy(&output.stdout))
}

/// Streams frames from an `ffmpeg` child process.
///
/// The child is killed and reaped by `close()` or on drop, whichever comes first.
pub struct FfmpegSource {
    info: VideoInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    buffer: Vec<u8>,
}

impl FfmpegSource {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ExtractionError::Config(format!(
                "video file not found: {}",
                path.display()
            ))
            .into());
        }

        let info = probe_video(path)?;

        let mut command = Command::new("ffmpeg");
        command
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-"]);
        Self::spawn(info, command)
    }

    /// Starts `command`, which must write raw RGBA frames of `info`'s size
    /// to stdout.
    fn spawn(info: VideoInfo, mut command: Command) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .context("Failed to start ffmpeg")?;

        let stdout = child.stdout.take();
        let frame_len = info.width as usize * info.height as usize * 4;

        Ok(Self {
            info,
            child: Some(child),
            stdout,
            buffer: vec![0u8; frame_len],
        })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    /// Fills the frame buffer. Returns false at end of stream.
    ///
    /// End of output is only a clean end of stream if the decoder exited
    /// successfully.
    fn fill_buffer(&mut self) -> Result<bool> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(false);
        };

        let mut filled = 0;
        while filled < self.buffer.len() {
            match stdout.read(&mut self.buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ExtractionError::Decode(e.to_string()).into()),
            }
        }
        if filled == self.buffer.len() {
            return Ok(true);
        }

        if filled > 0 {
            crate::warn(&format!(
                "Discarding partial trailing frame ({} of {} bytes)",
                filled,
                self.buffer.len()
            ));
        }
        self.finish_stream()?;
        Ok(false)
    }

    /// Reaps the decoder after its output ended and checks how it exited.
    fn finish_stream(&mut self) -> Result<()> {
        self.stdout = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().context("Failed to wait for ffmpeg")?;
        if !status.success() {
            return Err(ExtractionError::Decode(format!("ffmpeg exited with {}", status)).into());
        }
        Ok(())
    }
}

impl FrameSource for FfmpegSource {
    fn fps(&self) -> Option<f64> {
        self.info.fps
    }

    fn read_frame(&mut self) -> Result<Option<RgbaImage>> {
        if !self.fill_buffer()? {
            return Ok(None);
        }
        let frame = RgbaImage::from_raw(self.info.width, self.info.height, self.buffer.clone())
            .ok_or_else(|| ExtractionError::Decode("frame buffer size mismatch".to_string()))?;
        Ok(Some(frame))
    }

    fn skip_frame(&mut self) -> Result<bool> {
        self.fill_buffer()
    }

    fn close(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            // Already exited is fine
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Frames held in memory.
#[cfg(test)]
pub struct MemorySource {
    fps: Option<f64>,
    frames: std::collections::VecDeque<RgbaImage>,
    pub closed: bool,
}

#[cfg(test)]
impl MemorySource {
    pub fn new(fps: Option<f64>, frames: Vec<RgbaImage>) -> Self {
        Self {
            fps,
            frames: frames.into(),
            closed: false,
        }
    }
}

#[cfg(test)]
impl FrameSource for MemorySource {
    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn read_frame(&mut self) -> Result<Option<RgbaImage>> {
        Ok(self.frames.pop_front())
    }

    fn close(&mut self) {
        self.frames.clear();
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("0/1"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_parse_probe() {
        let json = r#"{
            "programs": [],
            "streams": [
                { "width": 400, "height": 1280, "r_frame_rate": "30/1", "avg_frame_rate": "30/1" }
            ]
        }"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(
            info,
            VideoInfo {
                width: 400,
                height: 1280,
                fps: Some(30.0)
            }
        );
    }

    #[test]
    fn test_parse_probe_falls_back_to_average_rate() {
        let json = r#"{"streams":[{"width":10,"height":10,"r_frame_rate":"0/0","avg_frame_rate":"24/1"}]}"#;
        assert_eq!(parse_probe(json).unwrap().fps, Some(24.0));

        let json = r#"{"streams":[{"width":10,"height":10}]}"#;
        assert_eq!(parse_probe(json).unwrap().fps, None);
    }

    #[test]
    fn test_parse_probe_without_stream_is_config_error() {
        let err = parse_probe(r#"{"streams":[]}"#).unwrap_err();
        let err = err.downcast_ref::<ExtractionError>().unwrap();
        assert!(matches!(err, ExtractionError::Config(_)));
    }

    #[test]
    fn test_open_missing_file_is_config_error() {
        let err = FfmpegSource::open(Path::new("/no/such/video.mp4"))
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<ExtractionError>(),
            Some(ExtractionError::Config(_))
        ));
    }

    #[cfg(unix)]
    fn scripted_decoder(script: &str) -> FfmpegSource {
        let mut command = Command::new("sh");
        command.args(["-c", script]);
        let info = VideoInfo {
            width: 1,
            height: 1,
            fps: Some(1.0),
        };
        FfmpegSource::spawn(info, command).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_decoder_frames_then_clean_end() {
        let mut source = scripted_decoder("printf 'abcdefgh'");

        let first = source.read_frame().unwrap().unwrap();
        assert_eq!(first.get_pixel(0, 0).0, *b"abcd");
        assert!(source.skip_frame().unwrap());
        assert!(source.read_frame().unwrap().is_none());
        // Stays exhausted
        assert!(source.read_frame().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_decoder_failure_is_decode_error() {
        let mut source = scripted_decoder("printf 'abcd'; exit 1");

        assert!(source.read_frame().unwrap().is_some());
        let err = source.read_frame().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractionError>(),
            Some(ExtractionError::Decode(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_decoder_failure_without_output_is_decode_error() {
        let mut source = scripted_decoder("exit 3");
        let err = source.skip_frame().unwrap_err();
        assert!(err.to_string().contains("ffmpeg exited"));
    }

    #[cfg(unix)]
    #[test]
    fn test_partial_trailing_frame_dropped() {
        let mut source = scripted_decoder("printf 'abcdef'");

        assert!(source.read_frame().unwrap().is_some());
        assert!(source.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_memory_source_drains_in_order() {
        let frames = (0..3u8)
            .map(|i| RgbaImage::from_pixel(1, 1, image::Rgba([i, 0, 0, 255])))
            .collect();
        let mut source = MemorySource::new(Some(30.0), frames);

        assert!(source.skip_frame().unwrap());
        assert_eq!(source.read_frame().unwrap().unwrap().get_pixel(0, 0)[0], 1);
        source.close();
        assert!(source.closed);
        assert!(source.read_frame().unwrap().is_none());
    }
}
