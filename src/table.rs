use std::io::Cursor;
use std::path::Path;

use csv::{ReaderBuilder, Writer};

use crate::error::EtlError;

/// A fully materialized table: header names plus string cells.
///
/// Cells are carried exactly as read from the source, never re-parsed and
/// re-formatted, so repeated runs over the same input write byte-identical
/// files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Decode `bytes` as UTF-8 CSV with a header row.
    ///
    /// Undecodable bytes and inconsistent column counts are both parse
    /// errors; the reader is deliberately non-flexible so a ragged file
    /// cannot slip through.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, EtlError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| EtlError::Parse(format!("source is not valid UTF-8: {e}")))?;

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(Cursor::new(text.as_bytes()));

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| EtlError::Parse(format!("missing header row: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record =
                record.map_err(|e| EtlError::Parse(format!("CSV record {}: {e}", idx + 1)))?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Index of a named column, or a parse error naming what is missing.
    pub fn column(&self, name: &str) -> Result<usize, EtlError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| EtlError::Parse(format!("required column `{name}` not found")))
    }

    /// Rename headers via `(from, to)` pairs; names without a pair are
    /// left untouched.
    pub fn rename(&mut self, mapping: &[(&str, &str)]) {
        for header in &mut self.headers {
            if let Some((_, to)) = mapping.iter().find(|(from, _)| *from == header.as_str()) {
                *header = to.to_string();
            }
        }
    }

    /// Write the table as CSV, header row first, to `path`.
    pub fn write_csv(&self, path: &Path) -> Result<(), EtlError> {
        let mut wtr = Writer::from_path(path).map_err(csv_io)?;
        wtr.write_record(&self.headers).map_err(csv_io)?;
        for row in &self.rows {
            wtr.write_record(row).map_err(csv_io)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn csv_io(err: csv::Error) -> EtlError {
    EtlError::Io(std::io::Error::other(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_header_and_rows() {
        let table = Table::from_csv_bytes(b"a,b\n1,2\n3,4\n").unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn ragged_rows_are_parse_errors() {
        let err = Table::from_csv_bytes(b"a,b\n1,2\n3\n").unwrap_err();
        assert!(matches!(err, EtlError::Parse(_)), "got: {err:?}");
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = Table::from_csv_bytes(&[0x61, 0x2c, 0x62, 0x0a, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, EtlError::Parse(_)), "got: {err:?}");
    }

    #[test]
    fn missing_column_is_named_in_the_error() {
        let table = Table::from_csv_bytes(b"a,b\n1,2\n").unwrap();
        let err = table.column("Branch").unwrap_err();
        assert!(err.to_string().contains("Branch"), "got: {err}");
    }

    #[test]
    fn rename_leaves_unmapped_headers_alone() {
        let mut table = Table::from_csv_bytes(b"City,Branch,branch_id\n").unwrap();
        table.rename(&[("City", "city"), ("Branch", "branch")]);
        assert_eq!(table.headers, vec!["city", "branch", "branch_id"]);
    }

    #[test]
    fn write_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");

        let table = Table::from_csv_bytes(b"a,b\nx,y\n").unwrap();
        table.write_csv(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let again = Table::from_csv_bytes(&bytes).unwrap();
        assert_eq!(table, again);
    }
}
