//! Header-driven parsing of comma-separated reference tables
//!
//! Columns are located by header name, so column order in the file does not
//! matter and unknown columns are ignored. Blank lines and `#` comments are
//! skipped. Every row must have exactly as many cells as the header.

use std::collections::BTreeMap;

use csv::{Position, ReaderBuilder, StringRecord, Trim};

use crate::error::{ImpactError, Result};

/// A parsed table
#[derive(Debug)]
pub(crate) struct Table {
    name: &'static str,
    header: StringRecord,
    rows: Vec<Row>,
}

/// One data row with its 1-based line number in the source file
#[derive(Debug)]
pub(crate) struct Row {
    pub line: usize,
    cells: StringRecord,
}

/// Source line of the record starting at `position`
///
/// The reader reports where it began reading, which is before any blank or
/// comment lines it skipped to reach the record.
fn record_line(content: &str, position: &Position) -> usize {
    let skipped = content
        .get(position.byte() as usize..)
        .unwrap_or_default()
        .lines()
        .take_while(|line| line.is_empty() || line.starts_with('#'))
        .count();
    position.line() as usize + skipped
}

fn load_error(name: &'static str, content: &str, err: &csv::Error) -> ImpactError {
    let line = err
        .position()
        .map(|pos| record_line(content, pos))
        .unwrap_or(0);
    let reason = match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {} columns, found {}", expected_len, len),
        _ => err.to_string(),
    };
    ImpactError::load(name, line, reason)
}

impl Table {
    pub fn parse(name: &'static str, content: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .from_reader(content.as_bytes());

        let header = reader
            .headers()
            .map_err(|err| load_error(name, content, &err))?
            .clone();
        if header.iter().all(str::is_empty) {
            return Err(ImpactError::load(name, 0, "table is empty, expected a header row"));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let cells = record.map_err(|err| load_error(name, content, &err))?;
            let line = cells
                .position()
                .map(|pos| record_line(content, pos))
                .unwrap_or(0);
            rows.push(Row { line, cells });
        }

        Ok(Self { name, header, rows })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Index of a required column
    pub fn column(&self, column: &str) -> Result<usize> {
        self.optional_column(column).ok_or_else(|| {
            ImpactError::load(
                self.name,
                1,
                format!("missing required column '{}'", column),
            )
        })
    }

    pub fn optional_column(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|h| h.eq_ignore_ascii_case(column))
    }

    fn header_name(&self, col: usize) -> &str {
        self.header.get(col).unwrap_or_default()
    }

    /// Text of a required cell; the key column must also be non-empty
    pub fn text<'r>(&self, row: &'r Row, col: usize) -> Result<&'r str> {
        match row.cells.get(col) {
            Some(cell) if !cell.is_empty() => Ok(cell),
            _ => Err(ImpactError::load(
                self.name,
                row.line,
                format!("empty value in column '{}'", self.header_name(col)),
            )),
        }
    }

    pub fn optional_text<'r>(&self, row: &'r Row, col: Option<usize>) -> Option<&'r str> {
        col.and_then(|c| row.cells.get(c))
            .filter(|cell| !cell.is_empty())
    }

    /// A required numeric cell; must parse as a finite number
    pub fn number(&self, row: &Row, col: usize) -> Result<f64> {
        let raw = self.text(row, col)?;
        self.parse_number(row, col, raw)
    }

    pub fn optional_number(&self, row: &Row, col: Option<usize>) -> Result<Option<f64>> {
        match (col, self.optional_text(row, col)) {
            (Some(c), Some(raw)) => self.parse_number(row, c, raw).map(Some),
            _ => Ok(None),
        }
    }

    fn parse_number(&self, row: &Row, col: usize, raw: &str) -> Result<f64> {
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(ImpactError::load(
                self.name,
                row.line,
                format!("non-numeric value '{}' in column '{}'", raw, self.header_name(col)),
            )),
        }
    }

    /// Insert a keyed row, rejecting duplicates
    pub fn insert_unique<V>(
        &self,
        index: &mut BTreeMap<String, V>,
        row: &Row,
        key: &str,
        value: V,
    ) -> Result<()> {
        if index.contains_key(key) {
            return Err(ImpactError::load(
                self.name,
                row.line,
                format!("duplicate entry for '{}'", key),
            ));
        }
        index.insert(key.to_string(), value);
        Ok(())
    }
}
