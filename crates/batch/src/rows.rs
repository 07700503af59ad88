//! Spreadsheet rows as name/value maps
//!
//! Sheet fetchers hand over a raw grid of cell values. The first row is
//! the header row; every following row becomes a map keyed by those
//! headers, padding missing trailing cells with empty strings.

use serde::Serialize;
use std::collections::BTreeMap;

/// One spreadsheet row, keyed by column header
pub type Row = BTreeMap<String, String>;

/// Rows included in a data preview
pub const PREVIEW_SAMPLE_ROWS: usize = 10;

/// Split a value grid into trimmed headers and keyed rows.
///
/// Cells beyond the header width are dropped, short rows are padded with
/// empty strings. An empty grid yields no headers and no rows.
pub fn rows_to_objects(values: &[Vec<String>]) -> (Vec<String>, Vec<Row>) {
    let Some((header_row, rest)) = values.split_first() else {
        return (Vec::new(), Vec::new());
    };

    let headers: Vec<String> = header_row.iter().map(|h| h.trim().to_string()).collect();

    let rows = rest
        .iter()
        .map(|raw| {
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), raw.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect();

    (headers, rows)
}

/// Summary of fetched sheet data, shown before a batch is started
#[derive(Debug, Serialize)]
pub struct Preview {
    pub headers: Vec<String>,
    pub count: usize,
    pub sample: Vec<Row>,
}

impl Preview {
    pub fn from_values(values: &[Vec<String>]) -> Self {
        let (headers, rows) = rows_to_objects(values);
        Self {
            count: rows.len(),
            sample: rows.into_iter().take(PREVIEW_SAMPLE_ROWS).collect(),
            headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid(cells: &[&[&str]]) -> Vec<Vec<String>> {
        cells
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_empty_grid() {
        let (headers, rows) = rows_to_objects(&[]);
        assert!(headers.is_empty());
        assert!(rows.is_empty());
    }

    #[test]
    fn test_headers_are_trimmed() {
        let values = grid(&[&[" Name ", "Email"], &["Alice", "a@example.com"]]);
        let (headers, rows) = rows_to_objects(&values);
        assert_eq!(headers, vec!["Name", "Email"]);
        assert_eq!(rows[0]["Name"], "Alice");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let values = grid(&[&["Name", "Email"], &["Bob"]]);
        let (_, rows) = rows_to_objects(&values);
        assert_eq!(rows[0]["Name"], "Bob");
        assert_eq!(rows[0]["Email"], "");
    }

    #[test]
    fn test_extra_cells_are_dropped() {
        let values = grid(&[&["Name"], &["Carol", "stray"]]);
        let (_, rows) = rows_to_objects(&values);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["Name"], "Carol");
    }

    #[test]
    fn test_preview_caps_sample_but_counts_all() {
        let mut values = vec![vec!["Name".to_string()]];
        for i in 0..25 {
            values.push(vec![format!("Person {i}")]);
        }
        let preview = Preview::from_values(&values);
        assert_eq!(preview.count, 25);
        assert_eq!(preview.sample.len(), PREVIEW_SAMPLE_ROWS);
        assert_eq!(preview.sample[0]["Name"], "Person 0");
    }

    #[test]
    fn test_preview_serializes_rows_as_objects() {
        let values = grid(&[&["Name"], &["Dana"]]);
        let preview = Preview::from_values(&values);
        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["sample"][0]["Name"], "Dana");
        assert_eq!(json["headers"][0], "Name");
    }
}
