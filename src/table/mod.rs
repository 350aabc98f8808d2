// src/table/mod.rs
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::{fs, io::Read, path::Path};
use tracing::{debug, warn};

/// Read-only access to anything shaped like a table of string cells.
///
/// Both the raw form exports and the normalized table implement this, so the
/// menu aggregator can run on either.
pub trait TableView {
    /// Column labels, in source order.
    fn columns(&self) -> Vec<&str>;
    /// Number of data rows.
    fn row_count(&self) -> usize;
    /// Cell at (`row`, `col`); `None` when the row is shorter than the header.
    fn cell(&self, row: usize, col: usize) -> Option<&str>;

    fn is_empty(&self) -> bool {
        self.row_count() == 0 || self.columns().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Column labels exactly as the form export wrote them.
    pub headers: Vec<String>,
    /// Data rows, one String per field. Rows may be shorter than `headers`.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from string literals; handy for callers assembling rows by hand.
    pub fn from_rows<H, R, C>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Parse CSV with a header row. Ragged rows are accepted as-is.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .context("reading CSV header row")?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
            if record.len() != headers.len() {
                debug!(
                    record = idx,
                    fields = record.len(),
                    headers = headers.len(),
                    "ragged CSV record"
                );
            }
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn from_csv_str(text: &str) -> Result<Self> {
        let text = text.trim_start_matches('\u{feff}');
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Self::from_csv_reader(text.as_bytes())
    }

    /// Load a cached CSV export. A missing file yields an empty table.
    pub fn read_csv_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "CSV cache not found; using empty table");
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_csv_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Index of the column whose label is exactly `name` (surrounding whitespace ignored).
    pub fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }
}

impl TableView for RawTable {
    fn columns(&self) -> Vec<&str> {
        self.headers.iter().map(String::as_str).collect()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

/// True when a cell carries no usable text: empty, whitespace, or the
/// literal `nan` left behind by spreadsheet exports.
pub fn is_blank(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("nan")
}
