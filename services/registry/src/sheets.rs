//! Tabular sources: workbook/CSV reading and sheet selection
//!
//! calamine handles xls, xlsx, xlsb and ods; CSV exports go through the csv
//! crate. Either way the result is a list of [`Sheet`]s whose first row is
//! the header row.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::error::{Dataset, IngestError};
use crate::headers::{satisfies, Role};

/// A single cell value, reduced to what the loaders care about
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl Cell {
    /// Render as trimmed text. Integral numbers lose their ".0".
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Date(dt) => dt.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(naive) => Cell::Date(naive),
                None => Cell::Number(dt.as_f64()),
            },
        }
    }
}

/// One sheet: header names plus data rows (header row excluded)
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Build from raw rows where the first row is the header
    pub fn from_rows(name: impl Into<String>, mut rows: Vec<Vec<Cell>>) -> Self {
        let headers = if rows.is_empty() {
            Vec::new()
        } else {
            rows.remove(0).iter().map(Cell::text).collect()
        };
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Data rows that are not entirely empty
    pub fn data_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows
            .iter()
            .map(Vec::as_slice)
            .filter(|row| !row.iter().all(Cell::is_empty))
    }
}

/// Text of `row[col]`, empty when the column is missing or the row is short
pub fn cell_text(row: &[Cell], col: Option<usize>) -> String {
    col.and_then(|c| row.get(c)).map(Cell::text).unwrap_or_default()
}

/// Read every sheet of a workbook or the single table of a CSV file
pub fn read_sheets(path: &Path, dataset: Dataset) -> Result<Vec<Sheet>, IngestError> {
    if !path.exists() {
        return Err(IngestError::SourceMissing {
            dataset,
            path: path.to_path_buf(),
        });
    }

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let sheets = if is_csv {
        let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("csv")
            .to_string();
        vec![parse_csv(&name, &bytes).map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?]
    } else {
        read_workbook(path)?
    };

    if sheets.is_empty() {
        return Err(IngestError::NoSheets {
            dataset,
            path: path.to_path_buf(),
        });
    }

    info!(
        path = %path.display(),
        sheets = sheets.len(),
        "{} source read",
        dataset
    );
    Ok(sheets)
}

fn read_workbook(path: &Path) -> Result<Vec<Sheet>, IngestError> {
    let workbook_err = |source: calamine::Error| IngestError::Workbook {
        path: path.to_path_buf(),
        source,
    };

    // calamine auto-detects the format: xls, xlsx, xlsb, ods
    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    let names = workbook.sheet_names().to_vec();

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook.worksheet_range(&name).map_err(workbook_err)?;
        let (rows, cols) = range.get_size();
        debug!(sheet = %name, rows, cols, "worksheet read");

        let rows = range
            .rows()
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();
        sheets.push(Sheet::from_rows(name, rows));
    }
    Ok(sheets)
}

/// Parse CSV bytes: UTF-8 (BOM stripped) or Windows-1252, `,` or `;` delimited
pub fn parse_csv(name: &str, bytes: &[u8]) -> Result<Sheet, csv::Error> {
    let content = decode(bytes);
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(Sheet::from_rows(name, rows))
}

fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or("");
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// Outcome of sheet selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    /// false when no sheet satisfied the required roles and the first was taken
    pub verified: bool,
}

/// Pick the sheet to load: pinned name, else first satisfying `required`,
/// else the first sheet (unverified). `None` only when there are no sheets.
pub fn select_sheet(sheets: &[Sheet], pinned: Option<&str>, required: &[Role]) -> Option<Selection> {
    if sheets.is_empty() {
        return None;
    }

    if let Some(name) = pinned {
        if let Some(index) = sheets.iter().position(|s| s.name == name) {
            debug!(sheet = name, "using pinned sheet");
            return Some(Selection {
                index,
                verified: true,
            });
        }
        warn!(sheet = name, "pinned sheet not found, detecting by headers");
    }

    if let Some(index) = sheets.iter().position(|s| satisfies(&s.headers, required)) {
        return Some(Selection {
            index,
            verified: true,
        });
    }

    warn!(
        sheet = %sheets[0].name,
        "no sheet exposes the required columns, falling back to the first sheet"
    );
    Some(Selection {
        index: 0,
        verified: false,
    })
}
