//! Whole-video extraction: sample → crop → OCR → assemble → accumulate.

use anyhow::{Context, Result};
use std::path::Path;

use crate::book::{assemble_frame, OrderBookRecord, ResultSequence};
use crate::config::{ExtractorConfig, RegionSet, ShortfallPolicy};
use crate::ocr::{extract_region, TextRecognizer};
use crate::video::{FrameSampler, FrameSource, SampledFrame};

/// Counters reported at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_read: u64,
    pub frames_sampled: u64,
    pub frames_assembled: u64,
    pub frames_skipped: u64,
    pub records: usize,
}

/// OCRs every region of one sampled frame.
fn read_regions(
    recognizer: &dyn TextRecognizer,
    config: &ExtractorConfig,
    sample: &SampledFrame,
) -> Result<RegionSet<Vec<String>>> {
    let crops = sample.crop_regions(&config.layout);

    if let Some(dir) = &config.debug_crop_dir {
        save_debug_crop(dir, sample, &crops.bid_price);
    }

    config.layout.zip(&crops).try_map(|name, (region, crop)| {
        extract_region(recognizer, crop, region)
            .with_context(|| format!("OCR of {} at frame {}", name, sample.position))
    })
}

fn save_debug_crop(dir: &Path, sample: &SampledFrame, crop: &image::RgbaImage) {
    if crop.width() == 0 || crop.height() == 0 {
        return;
    }
    let path = dir.join(format!("bid_price_{}.png", sample.position));
    if let Err(e) = crop.save(&path) {
        crate::warn(&format!("Failed to save debug crop {}: {}", path.display(), e));
    }
}

/// Runs the extraction over every sampled frame of `source`.
///
/// Returns all records newest-sampled frame first. The source is released on
/// every exit path, including errors.
pub fn process_video<S: FrameSource>(
    source: S,
    config: &ExtractorConfig,
    recognizer: &dyn TextRecognizer,
) -> Result<(Vec<OrderBookRecord>, RunSummary)> {
    config.layout.validate()?;

    let mut sampler = FrameSampler::new(source)?;
    crate::log(&format!(
        "Sampling one frame every {} frames",
        sampler.interval()
    ));

    if let Some(dir) = &config.debug_crop_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create debug crop dir {}", dir.display()))?;
    }

    let mut results = ResultSequence::new();
    let mut summary = RunSummary::default();

    while let Some(sample) = sampler.next_sample()? {
        crate::log(&format!(
            "Frame {} ({:.1}s): reading regions",
            sample.position, sample.seconds
        ));

        let tokens = read_regions(recognizer, config, &sample)?;

        match assemble_frame(&tokens) {
            Ok(records) => results.push_frame(records),
            Err(e)
                if e.is_shortfall() && config.shortfall_policy == ShortfallPolicy::SkipFrame =>
            {
                crate::warn(&format!("Skipping frame {}: {}", sample.position, e));
                summary.frames_skipped += 1;
            }
            Err(e) => {
                sampler.close();
                return Err(e).with_context(|| format!("Frame {}", sample.position));
            }
        }
    }

    let stats = sampler.stats();
    summary.frames_read = stats.frames_read;
    summary.frames_sampled = stats.frames_sampled;
    summary.frames_assembled = results.frame_count() as u64;
    summary.records = results.record_count();

    crate::log(&format!(
        "Video done: {} frames read, {} sampled, {} assembled, {} skipped, {} records",
        summary.frames_read,
        summary.frames_sampled,
        summary.frames_assembled,
        summary.frames_skipped,
        summary.records
    ));

    Ok((results.into_newest_first(), summary))
}
