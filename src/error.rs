//! Error kinds surfaced by the extraction pipeline.
//!
//! Plumbing code returns `anyhow::Result`; these variants exist for the
//! failures callers need to tell apart (mostly shortfall vs. everything else).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A token list had fewer entries than the slot mapping needs.
    #[error("OCR shortfall in {slot}: expected at least {expected} tokens, found {found}")]
    Shortfall {
        slot: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ExtractionError {
    pub fn is_shortfall(&self) -> bool {
        matches!(self, ExtractionError::Shortfall { .. })
    }
}
