use super::record::OrderBookRecord;

/// Collects per-frame results for a whole run.
///
/// Frames are pushed in the order they were sampled and reversed once at the
/// end, giving newest-sampled frame first while each frame keeps its rows
/// top to bottom.
#[derive(Debug, Default)]
pub struct ResultSequence {
    frames: Vec<Vec<OrderBookRecord>>,
}

impl ResultSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the records of the most recently sampled frame.
    pub fn push_frame(&mut self, records: Vec<OrderBookRecord>) {
        self.frames.push(records);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn record_count(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }

    /// All records, newest-sampled frame first.
    pub fn into_newest_first(self) -> Vec<OrderBookRecord> {
        self.frames.into_iter().rev().flatten().collect()
    }
}
