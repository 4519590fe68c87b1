//! One-frame-per-second sampling over a frame source.

use anyhow::Result;
use image::RgbaImage;

use super::source::FrameSource;
use crate::config::{RegionSet, ScreenLayout};
use crate::error::ExtractionError;
use crate::ocr::crop_region;

/// Frames between samples: the frame rate rounded to the nearest integer.
///
/// A missing, zero or sub-0.5 frame rate has no meaningful interval and is
/// reported as a configuration error.
pub fn sampling_interval(fps: Option<f64>) -> Result<u64, ExtractionError> {
    let fps = fps.ok_or_else(|| {
        ExtractionError::Config("video does not report a frame rate".to_string())
    })?;
    let interval = fps.round();
    if !interval.is_finite() || interval < 1.0 {
        return Err(ExtractionError::Config(format!(
            "frame rate {} gives no usable sampling interval",
            fps
        )));
    }
    Ok(interval as u64)
}

/// A frame picked for extraction.
#[derive(Debug)]
pub struct SampledFrame {
    /// 1-based frame number: the count of frames read up to and including
    /// this one
    pub position: u64,
    /// Seconds from the start of the video
    pub seconds: f64,
    pub image: RgbaImage,
}

impl SampledFrame {
    /// Crops every configured region out of this frame.
    pub fn crop_regions(&self, layout: &ScreenLayout) -> RegionSet<RgbaImage> {
        layout.map(|_, region| crop_region(&self.image, &region.rect))
    }
}

/// Counters for the end-of-run summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub frames_read: u64,
    pub frames_sampled: u64,
}

/// Pulls frames from a source and yields frames number F, 2F, 3F, ...
/// (1-based) where F is the sampling interval, so a stream of N frames gives
/// exactly `N / F` samples and a trailing partial second gives none. Other
/// frames are skipped undecoded.
///
/// The source is closed when the stream ends, on `close()`, or when the
/// sampler is dropped.
pub struct FrameSampler<S: FrameSource> {
    source: S,
    fps: f64,
    interval: u64,
    position: u64,
    stats: SamplerStats,
    exhausted: bool,
}

impl<S: FrameSource> FrameSampler<S> {
    pub fn new(mut source: S) -> Result<Self, ExtractionError> {
        let interval = match sampling_interval(source.fps()) {
            Ok(interval) => interval,
            Err(e) => {
                source.close();
                return Err(e);
            }
        };
        let fps = source.fps().unwrap_or(interval as f64);
        Ok(Self {
            source,
            fps,
            interval,
            position: 0,
            stats: SamplerStats::default(),
            exhausted: false,
        })
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    /// Returns the next sampled frame, or `None` once the stream is exhausted.
    pub fn next_sample(&mut self) -> Result<Option<SampledFrame>> {
        while !self.exhausted {
            let position = self.position + 1;

            if position % self.interval == 0 {
                let Some(image) = self.source.read_frame()? else {
                    self.finish();
                    break;
                };
                self.position = position;
                self.stats.frames_read += 1;
                self.stats.frames_sampled += 1;
                return Ok(Some(SampledFrame {
                    position,
                    seconds: position as f64 / self.fps,
                    image,
                }));
            }

            if !self.source.skip_frame()? {
                self.finish();
                break;
            }
            self.position = position;
            self.stats.frames_read += 1;
        }
        Ok(None)
    }

    /// Releases the source early. Later calls to `next_sample` return `None`.
    pub fn close(&mut self) {
        self.finish();
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    fn finish(&mut self) {
        self.exhausted = true;
        self.source.close();
    }
}

impl<S: FrameSource> Drop for FrameSampler<S> {
    fn drop(&mut self) {
        self.source.close();
    }
}
