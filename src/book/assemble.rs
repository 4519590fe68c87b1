//! Maps per-region token lists onto order-book records.
//!
//! Token lists are positional: entry `i` of a book column is row `i` of the
//! depth table, top first. Every slot is checked for presence before any
//! record is built, so a short OCR read fails the frame as a whole instead of
//! producing a half-filled table.

use super::record::{OrderBookRecord, Summary};
use crate::config::RegionSet;
use crate::error::ExtractionError;
use crate::ocr::strip_thousands;

/// Rows in the depth-of-market table.
pub const BOOK_DEPTH: usize = 20;

/// Positions in the summary region, in the order OCR reads them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummarySlot {
    Open,
    Low,
    Volume,
    Ltq,
    LowerCircuit,
    High,
    PrevClose,
    AvgPrice,
    Ltt,
    UpperCircuit,
}

impl SummarySlot {
    pub const ALL: [SummarySlot; 10] = [
        SummarySlot::Open,
        SummarySlot::Low,
        SummarySlot::Volume,
        SummarySlot::Ltq,
        SummarySlot::LowerCircuit,
        SummarySlot::High,
        SummarySlot::PrevClose,
        SummarySlot::AvgPrice,
        SummarySlot::Ltt,
        SummarySlot::UpperCircuit,
    ];

    /// Index into the summary token list.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Slot name used in shortfall errors.
    pub fn key(self) -> &'static str {
        match self {
            SummarySlot::Open => "summary.open",
            SummarySlot::Low => "summary.low",
            SummarySlot::Volume => "summary.volume",
            SummarySlot::Ltq => "summary.ltq",
            SummarySlot::LowerCircuit => "summary.lower_circuit",
            SummarySlot::High => "summary.high",
            SummarySlot::PrevClose => "summary.prev_close",
            SummarySlot::AvgPrice => "summary.avg_price",
            SummarySlot::Ltt => "summary.ltt",
            SummarySlot::UpperCircuit => "summary.upper_circuit",
        }
    }
}

/// Checks that a book column has a token for every row.
fn require_rows<'a>(
    slot: &'static str,
    tokens: &'a [String],
) -> Result<&'a [String], ExtractionError> {
    if tokens.len() < BOOK_DEPTH {
        return Err(ExtractionError::Shortfall {
            slot,
            expected: BOOK_DEPTH,
            found: tokens.len(),
        });
    }
    Ok(&tokens[..BOOK_DEPTH])
}

/// Reads the summary block, naming the first missing slot on shortfall.
pub fn assemble_summary(tokens: &[String]) -> Result<Summary, ExtractionError> {
    if let Some(missing) = SummarySlot::ALL.get(tokens.len()) {
        return Err(ExtractionError::Shortfall {
            slot: missing.key(),
            expected: SummarySlot::ALL.len(),
            found: tokens.len(),
        });
    }

    let get = |slot: SummarySlot| tokens[slot.index()].clone();

    Ok(Summary {
        open: get(SummarySlot::Open),
        low: get(SummarySlot::Low),
        volume: strip_thousands(&tokens[SummarySlot::Volume.index()]),
        ltq: get(SummarySlot::Ltq),
        lower_circuit: get(SummarySlot::LowerCircuit),
        high: get(SummarySlot::High),
        prev_close: get(SummarySlot::PrevClose),
        avg_price: get(SummarySlot::AvgPrice),
        ltt: get(SummarySlot::Ltt),
        upper_circuit: get(SummarySlot::UpperCircuit),
    })
}

/// Builds the `BOOK_DEPTH` records of one sampled frame.
///
/// Extra tokens beyond the required count are ignored. The summary is attached
/// to the first row only.
pub fn assemble_frame(
    tokens: &RegionSet<Vec<String>>,
) -> Result<Vec<OrderBookRecord>, ExtractionError> {
    let bid_price = require_rows("bid_price", &tokens.bid_price)?;
    let bid_orders = require_rows("bid_orders", &tokens.bid_orders)?;
    let bid_qty = require_rows("bid_qty", &tokens.bid_qty)?;
    let offer_price = require_rows("offer_price", &tokens.offer_price)?;
    let offer_orders = require_rows("offer_orders", &tokens.offer_orders)?;
    let offer_qty = require_rows("offer_qty", &tokens.offer_qty)?;
    let summary = assemble_summary(&tokens.summary)?;

    let mut records: Vec<OrderBookRecord> = (0..BOOK_DEPTH)
        .map(|row| OrderBookRecord {
            bid_price: strip_thousands(&bid_price[row]),
            orders: bid_orders[row].clone(),
            qty: bid_qty[row].clone(),
            offer: offer_price[row].clone(),
            orders1: offer_orders[row].clone(),
            qty1: offer_qty[row].clone(),
            summary: None,
        })
        .collect();
    records[0].summary = Some(summary);

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::record::Column;

    fn column(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    fn summary_tokens() -> Vec<String> {
        [
            "2,431.00", "2,425.10", "1,23,456", "15", "2,190.00", "2,462.95", "2,433.40",
            "2,447.31", "15:29:59", "2,676.70",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn full_tokens() -> RegionSet<Vec<String>> {
        RegionSet {
            bid_price: (0..BOOK_DEPTH).map(|i| format!("2,45{}.00", i % 10)).collect(),
            bid_orders: column("bo", BOOK_DEPTH),
            bid_qty: column("bq", BOOK_DEPTH),
            offer_price: column("op", BOOK_DEPTH),
            offer_orders: column("oo", BOOK_DEPTH),
            offer_qty: column("oq", BOOK_DEPTH),
            summary: summary_tokens(),
        }
    }

    #[test]
    fn test_builds_twenty_rows() {
        let records = assemble_frame(&full_tokens()).unwrap();

        assert_eq!(records.len(), BOOK_DEPTH);
        assert_eq!(records[0].field_count(), 16);
        for record in &records[1..] {
            assert_eq!(record.field_count(), 6);
            assert!(record.summary.is_none());
        }
    }

    #[test]
    fn test_rows_map_by_position() {
        let records = assemble_frame(&full_tokens()).unwrap();

        assert_eq!(records[3].bid_price, "2453.00");
        assert_eq!(records[3].orders, "bo3");
        assert_eq!(records[3].qty, "bq3");
        assert_eq!(records[3].offer, "op3");
        assert_eq!(records[3].orders1, "oo3");
        assert_eq!(records[19].qty1, "oq19");
    }

    #[test]
    fn test_summary_slots() {
        let records = assemble_frame(&full_tokens()).unwrap();
        let first = &records[0];

        assert_eq!(first.get(Column::Open), Some("2,431.00"));
        assert_eq!(first.get(Column::Low), Some("2,425.10"));
        assert_eq!(first.get(Column::Volume), Some("123456"));
        assert_eq!(first.get(Column::Ltq), Some("15"));
        assert_eq!(first.get(Column::LowerCircuit), Some("2,190.00"));
        assert_eq!(first.get(Column::High), Some("2,462.95"));
        assert_eq!(first.get(Column::PrevClose), Some("2,433.40"));
        assert_eq!(first.get(Column::AvgPrice), Some("2,447.31"));
        assert_eq!(first.get(Column::Ltt), Some("15:29:59"));
        assert_eq!(first.get(Column::UpperCircuit), Some("2,676.70"));
    }

    #[test]
    fn test_only_bid_price_and_volume_lose_separators() {
        let mut tokens = full_tokens();
        tokens.bid_qty[0] = "1,500".to_string();
        tokens.bid_price[0] = "987".to_string();

        let records = assemble_frame(&tokens).unwrap();
        assert_eq!(records[0].bid_price, "987");
        assert_eq!(records[0].qty, "1,500");
    }

    #[test]
    fn test_extra_tokens_ignored() {
        let mut tokens = full_tokens();
        tokens.offer_qty.push("trailing".to_string());
        tokens.summary.push("noise".to_string());

        let records = assemble_frame(&tokens).unwrap();
        assert_eq!(records.len(), BOOK_DEPTH);
        assert_eq!(records[19].qty1, "oq19");
    }

    #[test]
    fn test_short_book_column_names_slot() {
        let mut tokens = full_tokens();
        tokens.offer_orders.truncate(17);

        let err = assemble_frame(&tokens).unwrap_err();
        match err {
            ExtractionError::Shortfall {
                slot,
                expected,
                found,
            } => {
                assert_eq!(slot, "offer_orders");
                assert_eq!(expected, 20);
                assert_eq!(found, 17);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_short_summary_names_first_missing_slot() {
        let mut tokens = full_tokens();
        tokens.summary.truncate(8);

        let err = assemble_frame(&tokens).unwrap_err();
        assert!(err.is_shortfall());
        assert!(err.to_string().contains("summary.ltt"));
        assert!(err.to_string().contains("found 8"));
    }

    #[test]
    fn test_empty_summary() {
        let err = assemble_summary(&[]).unwrap_err();
        assert!(err.to_string().contains("summary.open"));
    }

    #[test]
    fn test_slot_indices_follow_screen_order() {
        for (i, slot) in SummarySlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }
}
