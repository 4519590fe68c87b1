//! Persisting records to the output spreadsheet.

pub mod spreadsheet;

pub use spreadsheet::update_spreadsheet;
