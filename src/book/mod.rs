//! Order-book records: the model, assembly from OCR tokens, and run-wide
//! accumulation.

pub mod accumulate;
pub mod assemble;
pub mod record;

pub use accumulate::ResultSequence;
pub use assemble::{assemble_frame, BOOK_DEPTH};
pub use record::{Column, ColumnKind, OrderBookRecord};
