//! Spreadsheet output.
//!
//! The sheet has one header row followed by data rows, newest first. Each run
//! puts its records above whatever the file already holds, then coerces every
//! cell to its column's semantic type. `.xlsx` files get typed cells and fixed
//! column widths; `.csv` files get plain text.

use anyhow::{Context, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::book::{Column, ColumnKind, OrderBookRecord};

/// Output format for date columns.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Excel number format matching `DATE_FORMAT`.
const EXCEL_DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

const SHEET_NAME: &str = "Sheet1";

/// Accepted input formats for date columns, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    DATE_FORMAT,
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
];

/// Time-only formats; the date part is filled with the run date.
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Plain decimal number after separators are removed
const NUMBER_PATTERN: &str = r"^[+-]?(\d+(\.\d*)?|\.\d+)$";

type Row = Vec<String>;

/// File format of the sheet, picked from the path's extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    Csv,
}

impl SheetFormat {
    /// `.csv` (any case) is CSV; everything else is written as xlsx.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => SheetFormat::Csv,
            _ => SheetFormat::Xlsx,
        }
    }
}

/// Column width in Excel character units.
pub fn column_width(column: Column) -> f64 {
    match column {
        Column::BidPrice
        | Column::Orders
        | Column::Qty
        | Column::Offer
        | Column::Orders1
        | Column::Qty1 => 12.0,
        Column::Low | Column::Ltq | Column::Ltt => 20.0,
        Column::Open
        | Column::High
        | Column::PrevClose
        | Column::Volume
        | Column::AvgPrice
        | Column::LowerCircuit
        | Column::UpperCircuit => 17.0,
    }
}

/// Converts raw cell text to the canonical form for a column kind.
struct Coercer {
    number: Regex,
    today: NaiveDate,
}

impl Coercer {
    fn new(today: NaiveDate) -> Result<Self> {
        Ok(Self {
            number: Regex::new(NUMBER_PATTERN)?,
            today,
        })
    }

    /// Unparsable numbers and dates become empty cells.
    fn coerce(&self, kind: ColumnKind, value: &str) -> String {
        match kind {
            ColumnKind::Numeric => self.numeric(value).unwrap_or_default(),
            ColumnKind::Date => self.date(value).unwrap_or_default(),
            ColumnKind::Text => value.to_string(),
        }
    }

    fn numeric(&self, value: &str) -> Option<String> {
        let compact: String = value
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();
        if !self.number.is_match(&compact) {
            return None;
        }
        let number: f64 = compact.parse().ok()?;
        if number.fract() == 0.0 && number.abs() < 1e15 {
            Some(format!("{}", number as i64))
        } else {
            Some(number.to_string())
        }
    }

    fn date(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
                return Some(dt.format(DATE_FORMAT).to_string());
            }
        }
        for format in TIME_FORMATS {
            if let Ok(time) = NaiveTime::parse_from_str(value, format) {
                return Some(self.today.and_time(time).format(DATE_FORMAT).to_string());
            }
        }
        None
    }
}

/// Lays header-ordered cells out in `Column::ALL` order.
///
/// Cells under unknown headers are dropped; columns the sheet lacks stay empty.
fn place_cells(columns: &[Option<Column>], cells: impl Iterator<Item = String>) -> Row {
    let mut row = vec![String::new(); Column::ALL.len()];
    for (column, value) in columns.iter().zip(cells) {
        if let Some(column) = column {
            row[column.index()] = value;
        }
    }
    row
}

/// Reads all data rows, re-ordered into `Column::ALL` order.
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    match SheetFormat::from_path(path) {
        SheetFormat::Xlsx => read_xlsx_rows(path),
        SheetFormat::Csv => read_csv_rows(path),
    }
}

fn read_csv_rows(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open spreadsheet: {}", path.display()))?;

    let columns: Vec<Option<Column>> = reader
        .headers()
        .context("Failed to read spreadsheet header")?
        .iter()
        .map(Column::from_name)
        .collect();

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("Malformed spreadsheet row {}", line + 2))?;
        rows.push(place_cells(&columns, record.iter().map(str::to_string)));
    }
    Ok(rows)
}

/// Text form of a cell, in the same shape the coercer produces.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|dt| dt.format(DATE_FORMAT).to_string())
            .unwrap_or_default(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

fn read_xlsx_rows(path: &Path) -> Result<Vec<Row>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open spreadsheet: {}", path.display()))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.context("Failed to read first worksheet")?,
        None => return Ok(Vec::new()),
    };

    let mut cells = range.rows();
    let Some(header) = cells.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<Option<Column>> = header
        .iter()
        .map(|cell| Column::from_name(&cell_text(cell)))
        .collect();

    Ok(cells
        .map(|row| place_cells(&columns, row.iter().map(cell_text)))
        .collect())
}

fn record_to_row(record: &OrderBookRecord) -> Row {
    record
        .fields()
        .map(|(_, value)| value.unwrap_or_default().to_string())
        .collect()
}

/// Writes `records` above the existing rows of the sheet at `path`, creating
/// the file if needed.
///
/// A sheet that can't be read is logged and treated as empty, so its old
/// rows are replaced. Returns the number of data rows now in the sheet.
pub fn update_spreadsheet(path: &Path, records: &[OrderBookRecord]) -> Result<usize> {
    let existing = if path.exists() {
        match read_rows(path) {
            Ok(rows) => rows,
            Err(e) => {
                crate::warn(&format!(
                    "Error reading spreadsheet {}: {:#}. Existing rows will be discarded.",
                    path.display(),
                    e
                ));
                Vec::new()
            }
        }
    } else {
        crate::log(&format!("Creating new spreadsheet {}", path.display()));
        Vec::new()
    };
    crate::log(&format!(
        "Merging {} new rows above {} existing rows",
        records.len(),
        existing.len()
    ));

    let coercer = Coercer::new(Local::now().date_naive())?;
    let rows: Vec<Row> = records
        .iter()
        .map(record_to_row)
        .chain(existing)
        .map(|row| {
            Column::ALL
                .iter()
                .zip(row.iter())
                .map(|(column, value)| coercer.coerce(column.kind(), value))
                .collect()
        })
        .collect();

    let temp = temp_file_beside(path)?;
    match SheetFormat::from_path(path) {
        SheetFormat::Xlsx => write_xlsx(temp.path(), &rows)?,
        SheetFormat::Csv => write_csv(&temp, &rows)?,
    }
    temp.persist(path)
        .with_context(|| format!("Failed to replace spreadsheet {}", path.display()))?;

    Ok(rows.len())
}

/// Temp file in the sheet's directory, so the final rename stays on one
/// filesystem.
fn temp_file_beside(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir).context("Failed to create temporary spreadsheet")
}

fn write_csv(temp: &NamedTempFile, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(temp.as_file());
    writer.write_record(Column::ALL.iter().map(|c| c.name()))?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush().context("Failed to write spreadsheet rows")?;
    Ok(())
}

fn excel_datetime(dt: &NaiveDateTime) -> Result<ExcelDateTime> {
    let date = ExcelDateTime::from_ymd(dt.year() as u16, dt.month() as u8, dt.day() as u8)?;
    Ok(date.and_hms(dt.hour() as u16, dt.minute() as u8, dt.second())?)
}

/// Writes coerced rows as typed cells. Empty strings leave the cell blank.
fn write_xlsx(path: &Path, rows: &[Row]) -> Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(EXCEL_DATE_FORMAT);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, column) in Column::ALL.iter().enumerate() {
        let col = col as u16;
        worksheet.set_column_width(col, column_width(*column))?;
        worksheet.write_string_with_format(0, col, column.name(), &header_format)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        for (col, (column, value)) in Column::ALL.iter().zip(row).enumerate() {
            if value.is_empty() {
                continue;
            }
            let col = col as u16;
            match column.kind() {
                ColumnKind::Numeric => {
                    let number: f64 = value
                        .parse()
                        .with_context(|| format!("{} is not a number: {}", column.name(), value))?;
                    worksheet.write_number(r, col, number)?;
                }
                ColumnKind::Date => {
                    let dt = NaiveDateTime::parse_from_str(value, DATE_FORMAT)
                        .with_context(|| format!("{} is not a date: {}", column.name(), value))?;
                    worksheet.write_datetime_with_format(r, col, &excel_datetime(&dt)?, &date_format)?;
                }
                ColumnKind::Text => {
                    worksheet.write_string(r, col, value)?;
                }
            }
        }
    }

    workbook
        .save(path)
        .context("Failed to write spreadsheet workbook")?;
    Ok(())
}
