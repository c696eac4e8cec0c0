//! Spreadsheet ingestion via calamine.
//!
//! Each named sheet becomes one [`RawTable`]; the first row is the header.
//! Files with a `.csv`/`.txt` extension go through the CSV parser instead.

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use serde_json::{json, Number, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::{parse_csv_file_auto, RawTable};
use crate::error::{LoadError, LoadResult};
use crate::logs::{log_info, log_success};

/// A file to load and the sheets to read from it.
///
/// An empty `sheets` list means every sheet in the workbook.
#[derive(Debug, Clone)]
pub struct InputSource {
    pub path: PathBuf,
    pub sheets: Vec<String>,
}

impl InputSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), sheets: Vec::new() }
    }

    pub fn with_sheets<I, S>(mut self, sheets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sheets = sheets.into_iter().map(Into::into).collect();
        self
    }

    fn is_csv(&self) -> bool {
        is_csv_path(&self.path)
    }
}

fn is_csv_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv") || e.eq_ignore_ascii_case("txt"))
}

/// Convert one spreadsheet cell to JSON.
fn cell_to_json(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => json!(i),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Number::from_f64(dt.as_f64()).map(Value::Number).unwrap_or(Value::Null),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

fn cell_to_header(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// List the sheet names of a workbook.
pub fn sheet_names<P: AsRef<Path>>(path: P) -> LoadResult<Vec<String>> {
    let path = path.as_ref();
    if is_csv_path(path) {
        return Ok(vec![path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("csv")
            .to_string()]);
    }
    let workbook = open_workbook_auto(path)?;
    Ok(workbook.sheet_names())
}

/// Read one named sheet.
pub fn load_sheet<P: AsRef<Path>>(path: P, sheet: &str) -> LoadResult<RawTable> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;
    read_sheet(&mut workbook, path, sheet)
}

fn read_sheet(
    workbook: &mut Sheets<BufReader<File>>,
    path: &Path,
    sheet: &str,
) -> LoadResult<RawTable> {
    let source = format!("{}[{}]", path.display(), sheet);

    if !workbook.sheet_names().iter().any(|s| s == sheet) {
        return Err(LoadError::MissingSheet {
            file: path.display().to_string(),
            sheet: sheet.to_string(),
        });
    }

    let range = workbook.worksheet_range(sheet)?;
    // The range starts at the first used cell, not necessarily A1
    let header_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| LoadError::NoHeaders(source.clone()))?
        .iter()
        .map(cell_to_header)
        .collect();

    let body = rows
        .enumerate()
        .map(|(i, row)| (header_row + 1 + i, row.iter().map(cell_to_json).collect::<Vec<_>>()));
    Ok(RawTable::from_rows(source, headers, body))
}

/// Load every requested sheet of every input, in order.
///
/// Each sheet yields one table; CSV inputs yield exactly one.
pub fn load_data(inputs: &[InputSource]) -> LoadResult<Vec<RawTable>> {
    let mut tables = Vec::new();

    for input in inputs {
        log_info(format!("📖 Reading {}", input.path.display()));

        if input.is_csv() {
            let table = parse_csv_file_auto(&input.path)?;
            log_success(format!("{} rows", table.records.len()));
            tables.push(table);
            continue;
        }

        let mut workbook = open_workbook_auto(&input.path)?;
        let sheets = if input.sheets.is_empty() {
            workbook.sheet_names()
        } else {
            input.sheets.clone()
        };

        for sheet in &sheets {
            let table = read_sheet(&mut workbook, &input.path, sheet)?;
            log_success(format!("Sheet '{}': {} rows", sheet, table.records.len()));
            tables.push(table);
        }
    }

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cell_conversion() {
        assert_eq!(cell_to_json(&Data::Int(7)), json!(7));
        assert_eq!(cell_to_json(&Data::Float(61.5)), json!(61.5));
        assert_eq!(cell_to_json(&Data::String("Smith".into())), json!("Smith"));
        assert!(cell_to_json(&Data::String("  ".into())).is_null());
        assert!(cell_to_json(&Data::Empty).is_null());
    }

    #[test]
    fn test_header_cells() {
        assert_eq!(cell_to_header(&Data::Empty), "");
        assert_eq!(cell_to_header(&Data::String("Your Name".into())), "Your Name");
    }

    #[test]
    fn test_csv_inputs_bypass_workbook() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("marks.csv");
        fs::write(&path, "Examiner,Initial Mark\nSmith,60\n").unwrap();

        let tables = load_data(&[InputSource::new(&path)]).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].records[0]["Examiner"], "Smith");

        assert_eq!(sheet_names(&path).unwrap(), vec!["marks"]);
    }

    #[test]
    fn test_missing_workbook_is_error() {
        let dir = tempdir().unwrap();
        let result = load_data(&[InputSource::new(dir.path().join("absent.xlsx"))]);
        assert!(result.is_err());
    }
}
