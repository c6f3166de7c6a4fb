use crate::error::{ReportError, ReportResult};
use crate::types::{
    CoerceReport, Dataset, RawRow, SalesRecord, DATA_FILE_NAME, PRODUCT_COLUMN, REGION_COLUMN,
    REVENUE_COLUMN,
};
use crate::util::{clean_category, is_missing_token, parse_revenue};
use csv::{ReaderBuilder, StringRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Resolve `data.csv` in the directory holding the running executable and
/// make sure it exists. Nothing is opened here.
pub fn locate_data_file() -> ReportResult<PathBuf> {
    let path = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DATA_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(DATA_FILE_NAME));
    ensure_exists(path)
}

fn ensure_exists(path: PathBuf) -> ReportResult<PathBuf> {
    if path.exists() {
        Ok(path)
    } else {
        Err(ReportError::FileNotFound { path })
    }
}

/// Read the whole file into a [`Dataset`].
///
/// - Short rows are padded with blank cells, so their trailing values are missing.
/// - Rows longer than the header, an unclosed quote, or invalid UTF-8 fail the load.
/// - Repeated header names get a `.1`, `.2`, ... suffix; the first one keeps its name.
pub fn load_dataset(path: &Path) -> ReportResult<Dataset> {
    let bytes = fs::read(path).map_err(|source| ReportError::Io { source })?;
    if let Some(line) = unclosed_quote_line(&bytes) {
        return Err(ReportError::UnterminatedQuote { line });
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes.as_slice());
    let raw_headers = rdr.headers()?.clone();
    if raw_headers.is_empty() {
        return Err(ReportError::EmptyFile { path: path.to_path_buf() });
    }
    let headers = dedupe_headers(raw_headers.iter());
    let header_record = StringRecord::from(headers.clone());
    debug!(path = %path.display(), columns = ?headers, "read CSV header");

    let mut rows = Vec::new();
    for result in rdr.records() {
        let mut record = result?;
        if record.len() > headers.len() {
            return Err(ReportError::TooManyFields {
                line: record.position().map_or(0, |p| p.line()),
                expected: headers.len(),
                found: record.len(),
            });
        }
        while record.len() < headers.len() {
            record.push_field("");
        }
        rows.push(record.deserialize::<RawRow>(Some(&header_record))?);
    }
    Ok(Dataset { headers, rows })
}

fn dedupe_headers<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let mut candidate = name.to_string();
        let mut n = 0;
        while out.contains(&candidate) {
            n += 1;
            candidate = format!("{name}.{n}");
        }
        out.push(candidate);
    }
    out
}

/// Line on which a quoted field opens without ever closing. A quote only
/// opens a field when it is the field's first byte; `""` inside a quoted
/// field is an escaped quote.
fn unclosed_quote_line(data: &[u8]) -> Option<usize> {
    let mut line = 1;
    let mut open_at: Option<usize> = None;
    let mut field_start = true;
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        match open_at {
            Some(_) if b == b'"' => {
                if data.get(i + 1) == Some(&b'"') {
                    i += 1;
                } else {
                    open_at = None;
                }
            }
            None if b == b'"' && field_start => open_at = Some(line),
            _ => {}
        }
        if b == b'\n' {
            line += 1;
        }
        field_start = open_at.is_none() && matches!(b, b',' | b'\n' | b'\r');
        i += 1;
    }
    open_at
}

/// Require the revenue column. Missing grouping columns only degrade the
/// matching averages, so they are reported and let through.
pub fn validate(dataset: &Dataset) -> ReportResult<()> {
    if !dataset.has_column(REVENUE_COLUMN) {
        return Err(ReportError::MissingColumn { column: REVENUE_COLUMN.to_string() });
    }
    for column in [REGION_COLUMN, PRODUCT_COLUMN] {
        if !dataset.has_column(column) {
            warn!(column, "grouping column not present; its averages will be empty");
        }
    }
    Ok(())
}

/// Turn raw rows into typed records. Unparseable revenue never fails the
/// run; the cell just becomes `None`.
pub fn coerce(dataset: Dataset) -> (Vec<SalesRecord>, CoerceReport) {
    let mut report = CoerceReport { total_rows: dataset.rows.len(), ..CoerceReport::default() };
    let records = dataset
        .rows
        .into_iter()
        .map(|row| {
            let revenue = parse_revenue(row.revenue.as_deref());
            if revenue.is_none() {
                match row.revenue.as_deref().map(str::trim) {
                    Some(raw) if !is_missing_token(raw) => report.unparsed_revenue += 1,
                    _ => report.blank_revenue += 1,
                }
            }
            SalesRecord {
                region: clean_category(row.region),
                product: clean_category(row.product),
                revenue,
            }
        })
        .collect();
    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(DATA_FILE_NAME);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn locate_points_next_to_executable() {
        // The test harness has no data.csv beside it.
        match locate_data_file() {
            Err(ReportError::FileNotFound { path }) => {
                assert_eq!(path.file_name().unwrap(), DATA_FILE_NAME);
                let exe = std::env::current_exe().unwrap();
                assert_eq!(path.parent(), exe.parent());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn ensure_exists_accepts_present_file() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, b"Revenue\n1\n");
        assert_eq!(ensure_exists(path.clone()).unwrap(), path);
        let gone = dir.path().join("nope.csv");
        assert!(matches!(ensure_exists(gone), Err(ReportError::FileNotFound { .. })));
    }

    #[test]
    fn loads_rows_and_ignores_extra_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, b"Date,Region,Product,Revenue\n2024-01-01,A,X,10\n2024-01-02,B,,\n");
        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds.headers, vec!["Date", "Region", "Product", "Revenue"]);
        assert_eq!(ds.rows.len(), 2);
        assert_eq!(ds.rows[0].region.as_deref(), Some("A"));
        assert_eq!(ds.rows[0].revenue.as_deref(), Some("10"));
        assert_eq!(ds.rows[1].product, None);
        assert_eq!(ds.rows[1].revenue, None);
    }

    #[test]
    fn absent_optional_columns_load_as_none() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, b"Revenue\n5\n");
        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds.rows.len(), 1);
        assert_eq!(ds.rows[0].region, None);
        assert_eq!(ds.rows[0].product, None);
    }

    #[test]
    fn long_rows_are_a_read_failure() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, b"Region,Product,Revenue\nA,X,10\nB,Y,20,extra\n");
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, ReportError::TooManyFields { line: 3, expected: 3, found: 4 }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn short_rows_are_padded_with_missing_cells() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, b"Region,Product,Revenue\nA,X,10\nB,Y\nC\n");
        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds.rows.len(), 3);
        assert_eq!(ds.rows[1].region.as_deref(), Some("B"));
        assert_eq!(ds.rows[1].product.as_deref(), Some("Y"));
        assert_eq!(ds.rows[1].revenue, None);
        assert_eq!(ds.rows[2].product, None);
        assert_eq!(ds.rows[2].revenue, None);
    }

    #[test]
    fn unterminated_quote_is_a_read_failure() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, b"Region,Product,Revenue\nA,\"X,10\nB,Y,20\n");
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, ReportError::UnterminatedQuote { line: 2 }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn quoted_fields_with_commas_and_escapes_load() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            b"Region,Product,Revenue\n\"North, East\",\"12\"\" pipe\",\"1e1\"\nSouth,5\" bolt,2\n",
        );
        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds.rows[0].region.as_deref(), Some("North, East"));
        assert_eq!(ds.rows[0].product.as_deref(), Some("12\" pipe"));
        assert_eq!(ds.rows[0].revenue.as_deref(), Some("1e1"));
        assert_eq!(ds.rows[1].product.as_deref(), Some("5\" bolt"));
    }

    #[test]
    fn quote_scan_tracks_lines() {
        assert_eq!(unclosed_quote_line(b"a,b\n1,2\n"), None);
        assert_eq!(unclosed_quote_line(b"a,b\n\"1\n2\",3\n"), None);
        assert_eq!(unclosed_quote_line(b"a,b\n1,2\n3,\"4\n"), Some(3));
        assert_eq!(unclosed_quote_line(b"a,b\r\n\"x\"\"\n"), Some(2));
    }

    #[test]
    fn repeated_headers_keep_first_column() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, b"Region,Revenue,Product,Revenue\nA,10,X,oops\n");
        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds.headers, vec!["Region", "Revenue", "Product", "Revenue.1"]);
        assert_eq!(ds.rows[0].revenue.as_deref(), Some("10"));
        assert_eq!(ds.rows[0].product.as_deref(), Some("X"));
    }

    #[test]
    fn dedupe_skips_names_already_taken() {
        let names = ["a", "a.1", "a", "a"];
        assert_eq!(dedupe_headers(names.into_iter()), vec!["a", "a.1", "a.2", "a.3"]);
    }

    #[test]
    fn invalid_utf8_is_a_read_failure() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, b"Region,Product,Revenue\nA,\xff\xfe,10\n");
        assert!(matches!(load_dataset(&path), Err(ReportError::Csv(_))));
    }

    #[test]
    fn empty_file_is_a_read_failure() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, b"");
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, ReportError::EmptyFile { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn validate_requires_revenue_only() {
        let no_revenue = Dataset { headers: vec!["Region".into(), "Product".into()], rows: vec![] };
        let err = validate(&no_revenue).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { ref column } if column == "Revenue"));

        let revenue_only = Dataset { headers: vec!["Revenue".into()], rows: vec![] };
        assert!(validate(&revenue_only).is_ok());
    }

    #[test]
    fn validate_is_case_sensitive() {
        let ds = Dataset { headers: vec!["revenue".into()], rows: vec![] };
        assert!(validate(&ds).is_err());
    }

    #[test]
    fn coerce_marks_bad_cells_missing() {
        let row = |region: &str, revenue: Option<&str>| RawRow {
            region: Some(region.to_string()),
            product: Some("X".to_string()),
            revenue: revenue.map(str::to_string),
        };
        let ds = Dataset {
            headers: vec!["Region".into(), "Product".into(), "Revenue".into()],
            rows: vec![row("A", Some("10")), row("NA", Some("N/A")), row("B", Some("ten")), row("C", None)],
        };
        let (records, report) = coerce(ds);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].revenue, Some(10.0));
        assert_eq!(records[1].region, None);
        assert_eq!(records[1].revenue, None);
        assert_eq!(records[2].revenue, None);
        assert_eq!(records[3].revenue, None);
        assert_eq!(
            report,
            CoerceReport { total_rows: 4, blank_revenue: 2, unparsed_revenue: 1 }
        );
    }
}
