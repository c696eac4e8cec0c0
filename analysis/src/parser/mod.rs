//! Raw table loading.
//!
//! Spreadsheets (one table per sheet) and CSV files (one table per file)
//! are read into [`RawTable`]s whose rows are JSON objects keyed by the
//! original headers. No marking-specific logic here; see
//! [`crate::transform::normalize`] for the column mapping.

pub mod workbook;

use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{LoadError, LoadResult};

pub use workbook::{load_data, load_sheet, sheet_names, InputSource};

/// One loaded sheet or CSV file.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// File and sheet the table came from, for error messages
    pub source: String,
    /// Column headers in file order
    pub headers: Vec<String>,
    /// One JSON object per data row
    pub records: Vec<Value>,
    /// 1-based file row of each record (the header is row 1)
    pub row_numbers: Vec<usize>,
}

impl RawTable {
    /// Build from a header row and `(row number, cells)` pairs.
    ///
    /// Blank headers get the `Unnamed: <index>` name spreadsheet tools give
    /// an exported index column. Fully empty rows are skipped but the
    /// remaining rows keep their file row numbers.
    pub fn from_rows<I>(source: impl Into<String>, headers: Vec<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = (usize, Vec<Value>)>,
    {
        let headers: Vec<String> = headers
            .into_iter()
            .enumerate()
            .map(|(i, h)| {
                let h = h.trim_matches('"').to_string();
                if h.trim().is_empty() { format!("Unnamed: {}", i) } else { h }
            })
            .collect();

        let mut records = Vec::new();
        let mut row_numbers = Vec::new();
        for (row, cells) in rows {
            if cells.iter().all(Value::is_null) {
                continue;
            }
            let mut obj = Map::new();
            for (i, header) in headers.iter().enumerate() {
                obj.insert(header.clone(), cells.get(i).cloned().unwrap_or(Value::Null));
            }
            records.push(Value::Object(obj));
            row_numbers.push(row);
        }

        Self {
            source: source.into(),
            headers,
            records,
            row_numbers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // UTF-8 and unknown charsets: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [b',', b';', b'\t', b'|'];
    let mut best_sep = b',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep as char).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Interpret a CSV cell: blank → null, else the text as written.
///
/// Identifiers such as `0123` must survive untouched, so numbers are only
/// parsed later for the mark columns.
fn csv_cell(raw: &str) -> Value {
    if raw.trim().is_empty() {
        Value::Null
    } else {
        Value::String(raw.to_string())
    }
}

/// Parse CSV text with an explicit delimiter.
pub fn parse_csv_str(content: &str, delimiter: u8, source: &str) -> LoadResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::NoHeaders(source.to_string()));
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // csv skips blank lines, so the reader position is the file row
        let row = record.position().map(|p| p.line() as usize).unwrap_or(i + 2);
        rows.push((row, record.iter().map(csv_cell).collect::<Vec<_>>()));
    }

    Ok(RawTable::from_rows(source, headers, rows))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8], source: &str) -> LoadResult<RawTable> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(LoadError::NoHeaders(source.to_string()));
    }
    let delimiter = detect_delimiter(content);
    parse_csv_str(content, delimiter, source)
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> LoadResult<RawTable> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    parse_bytes_auto(&bytes, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let csv = "Paper,Examiner,Initial Mark\nP1,Smith,64\nP1,Jones,\n";
        let table = parse_csv_str(csv, b',', "test").unwrap();

        assert_eq!(table.headers, vec!["Paper", "Examiner", "Initial Mark"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0]["Examiner"], "Smith");
        assert_eq!(table.records[0]["Initial Mark"], "64");
        assert!(table.records[1]["Initial Mark"].is_null());
    }

    #[test]
    fn test_blank_header_becomes_unnamed() {
        let csv = ",Paper\n0,P1\n1,P2";
        let table = parse_csv_str(csv, b',', "test").unwrap();
        assert_eq!(table.headers[0], "Unnamed: 0");
        assert_eq!(table.records[1]["Paper"], "P2");
    }

    #[test]
    fn test_quoted_values_keep_delimiter() {
        let csv = "Examiner;Paper\n\"Smith; J\";P1";
        let table = parse_csv_str(csv, b';', "test").unwrap();
        assert_eq!(table.records[0]["Examiner"], "Smith; J");
    }

    #[test]
    fn test_empty_rows_skipped() {
        let csv = "a,b\n1,2\n,\n3,4\n";
        let table = parse_csv_str(csv, b',', "test").unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.row_numbers, vec![2, 4]);
    }

    #[test]
    fn test_blank_lines_keep_row_numbers() {
        let csv = "a,b\n1,2\n\n\n3,4\n";
        let table = parse_csv_str(csv, b',', "test").unwrap();
        assert_eq!(table.row_numbers, vec![2, 5]);
    }

    #[test]
    fn test_identifier_text_preserved() {
        let csv = "CandNo,Examiner,Initial Mark\n0123,Smith,60\n12345678901234567890,Jones,61\n";
        let table = parse_csv_str(csv, b',', "test").unwrap();
        assert_eq!(table.records[0]["CandNo"], "0123");
        assert_eq!(table.records[1]["CandNo"], "12345678901234567890");
    }

    #[test]
    fn test_trailing_space_header_preserved() {
        let csv = "Overall Initial Mark ,Your Name\n55,Smith";
        let table = parse_csv_str(csv, b',', "test").unwrap();
        assert_eq!(table.headers[0], "Overall Initial Mark ");
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), b'|');
    }

    #[test]
    fn test_auto_parse() {
        let csv = "Examiner;Initial Mark\nSmith;60\nJones;71";
        let table = parse_bytes_auto(csv.as_bytes(), "auto").unwrap();
        assert_eq!(table.headers, vec!["Examiner", "Initial Mark"]);
        assert_eq!(table.records.len(), 2);
    }

    #[test]
    fn test_empty_input_error() {
        let result = parse_bytes_auto(b"", "empty.csv");
        assert!(matches!(result, Err(LoadError::NoHeaders(_))));
    }

    #[test]
    fn test_latin1_decoding() {
        // "Müller" in ISO-8859-1
        let bytes: &[u8] = &[0x4D, 0xFC, 0x6C, 0x6C, 0x65, 0x72];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Müller");
    }
}
