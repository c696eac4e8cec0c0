//! Raw table → typed records.
//!
//! Drops exported index columns, maps the sheet headers onto the normalized
//! names in [`crate::models`] and coerces cells into [`MarkRecord`] /
//! [`PaperRecord`] fields.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

use crate::error::{SchemaError, SchemaResult};
use crate::models::{
    MarkRecord, PaperRecord, COL_AGREED_MARK, COL_CANDIDATE, COL_EXAMINER, COL_EXAM_BOARD,
    COL_INITIAL_MARK, COL_PAPER,
};
use crate::parser::RawTable;

/// Index columns written by spreadsheet exports (`Unnamed: 0`, ...).
static UNNAMED_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Unnamed: \d+$").expect("valid regex"));

/// Source header → normalized header.
///
/// Headers are compared after trimming, so `Overall Initial Mark ` (with its
/// trailing space) and `Overall Initial Mark` both map.
const MARKER_RENAMES: &[(&str, &str)] = &[
    ("Exam Board Code", COL_EXAM_BOARD),
    ("Paper Name", COL_PAPER),
    ("Candidate Number", COL_CANDIDATE),
    ("Your Name", COL_EXAMINER),
    ("Overall Initial Mark", COL_INITIAL_MARK),
];

const PAPER_RENAMES: &[(&str, &str)] = &[
    ("Exam Board Code", COL_EXAM_BOARD),
    ("Paper Name", COL_PAPER),
    ("Candidate Number", COL_CANDIDATE),
];

/// Normalized header for a raw one, or `None` when the column is dropped.
fn rename_header(header: &str, renames: &[(&str, &str)]) -> Option<String> {
    if UNNAMED_COLUMN.is_match(header.trim()) {
        return None;
    }
    let trimmed = header.trim();
    let renamed = renames
        .iter()
        .find(|(from, _)| *from == trimmed)
        .map(|(_, to)| (*to).to_string());
    Some(renamed.unwrap_or_else(|| trimmed.to_string()))
}

/// Re-key every row by normalized header, dropping index columns.
fn rename_rows(table: &RawTable, renames: &[(&str, &str)]) -> Vec<Map<String, Value>> {
    let mapping: Vec<(&String, String)> = table
        .headers
        .iter()
        .filter_map(|h| rename_header(h, renames).map(|to| (h, to)))
        .collect();

    table
        .records
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            for (from, to) in &mapping {
                obj.insert(to.clone(), row.get(from.as_str()).cloned().unwrap_or(Value::Null));
            }
            obj
        })
        .collect()
}

fn require_columns(table: &RawTable, renames: &[(&str, &str)], required: &[&str]) -> SchemaResult<bool> {
    let present: HashSet<String> = table
        .headers
        .iter()
        .filter_map(|h| rename_header(h, renames))
        .collect();

    for column in required {
        if !present.contains(*column) {
            return Err(SchemaError::MissingColumn {
                sheet: table.source.clone(),
                column: (*column).to_string(),
            });
        }
    }
    Ok(present.contains(COL_AGREED_MARK))
}

/// Render an identifier cell. Integral numbers print without a decimal
/// point so candidate `1234.0` from a spreadsheet reads `1234`.
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn cell_number(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| n.to_string()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Some)
            .ok_or_else(|| s.clone()),
        other => Err(other.to_string()),
    }
}

/// File row of the `index`-th record, as shown in a spreadsheet tool.
fn row_number(table: &RawTable, index: usize) -> usize {
    table.row_numbers.get(index).copied().unwrap_or(index + 2)
}

fn required_text(row: &Map<String, Value>, column: &str, line: usize) -> SchemaResult<String> {
    row.get(column)
        .and_then(cell_text)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SchemaError::InvalidValue {
            row: line,
            column: column.to_string(),
            value: String::new(),
            expected: "a non-empty value",
        })
}

fn optional_text(row: &Map<String, Value>, column: &str) -> String {
    row.get(column).and_then(cell_text).unwrap_or_default()
}

fn number_at(row: &Map<String, Value>, column: &str, line: usize) -> SchemaResult<Option<f64>> {
    match row.get(column) {
        None => Ok(None),
        Some(value) => cell_number(value).map_err(|raw| SchemaError::InvalidValue {
            row: line,
            column: column.to_string(),
            value: raw,
            expected: "a number",
        }),
    }
}

/// Normalize one marker sheet into [`MarkRecord`]s.
///
/// Requires exam board, paper, candidate, examiner and initial mark
/// columns. `Agreed Mark` is optional; blank cells read as `None`.
pub fn preprocess_marker_data(table: &RawTable) -> SchemaResult<Vec<MarkRecord>> {
    let has_agreed = require_columns(
        table,
        MARKER_RENAMES,
        &[COL_EXAM_BOARD, COL_PAPER, COL_CANDIDATE, COL_EXAMINER, COL_INITIAL_MARK],
    )?;

    rename_rows(table, MARKER_RENAMES)
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let line = row_number(table, i);
            let initial_mark = number_at(row, COL_INITIAL_MARK, line)?.ok_or_else(|| {
                SchemaError::InvalidValue {
                    row: line,
                    column: COL_INITIAL_MARK.to_string(),
                    value: String::new(),
                    expected: "a number",
                }
            })?;
            let agreed_mark = if has_agreed { number_at(row, COL_AGREED_MARK, line)? } else { None };

            Ok(MarkRecord {
                candidate: required_text(row, COL_CANDIDATE, line)?,
                paper: required_text(row, COL_PAPER, line)?,
                exam_board: optional_text(row, COL_EXAM_BOARD),
                examiner: required_text(row, COL_EXAMINER, line)?,
                initial_mark,
                agreed_mark,
            })
        })
        .collect()
}

/// Normalize one paper sheet into [`PaperRecord`]s.
///
/// Columns other than board, paper, candidate and agreed mark are carried
/// through as text in `extra`.
pub fn preprocess_paper_data(table: &RawTable) -> SchemaResult<Vec<PaperRecord>> {
    let has_agreed =
        require_columns(table, PAPER_RENAMES, &[COL_EXAM_BOARD, COL_PAPER, COL_CANDIDATE])?;

    rename_rows(table, PAPER_RENAMES)
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let line = row_number(table, i);
            let extra: BTreeMap<String, String> = row
                .iter()
                .filter(|(k, _)| {
                    ![COL_EXAM_BOARD, COL_PAPER, COL_CANDIDATE, COL_AGREED_MARK]
                        .contains(&k.as_str())
                })
                .map(|(k, v)| (k.clone(), cell_text(v).unwrap_or_default()))
                .collect();

            Ok(PaperRecord {
                candidate: required_text(row, COL_CANDIDATE, line)?,
                paper: required_text(row, COL_PAPER, line)?,
                exam_board: optional_text(row, COL_EXAM_BOARD),
                agreed_mark: if has_agreed { number_at(row, COL_AGREED_MARK, line)? } else { None },
                extra,
            })
        })
        .collect()
}

/// Normalize and concatenate several marker sheets.
pub fn preprocess_all(tables: &[RawTable]) -> SchemaResult<Vec<MarkRecord>> {
    let mut records = Vec::new();
    for table in tables {
        records.extend(preprocess_marker_data(table)?);
    }
    Ok(records)
}

/// `(candidate, paper, examiner)` triples that occur more than once.
pub fn duplicate_scripts(records: &[MarkRecord]) -> Vec<(String, String, String)> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for r in records {
        let key = (r.candidate.clone(), r.paper.clone(), r.examiner.clone());
        if !seen.insert(key.clone()) && !duplicates.contains(&key) {
            duplicates.push(key);
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    const MARKER_CSV: &str = "\
,Exam Board Code,Paper Name,Candidate Number,Your Name,Overall Initial Mark ,Agreed Mark
0,AQA,Paper 1,1001,Smith,64,65
1,AQA,Paper 1,1001,Jones,66,65
2,OCR,Paper 2,1002,Smith,48,
";

    fn marker_table() -> RawTable {
        parse_csv_str(MARKER_CSV, b',', "markers").unwrap()
    }

    #[test]
    fn test_marker_columns_renamed() {
        let records = preprocess_marker_data(&marker_table()).unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.exam_board, "AQA");
        assert_eq!(first.paper, "Paper 1");
        assert_eq!(first.candidate, "1001");
        assert_eq!(first.examiner, "Smith");
        assert_eq!(first.initial_mark, 64.0);
        assert_eq!(first.agreed_mark, Some(65.0));

        assert_eq!(records[2].agreed_mark, None);
    }

    #[test]
    fn test_agreed_mark_column_optional() {
        let csv = "Exam Board,Paper,CandNo,Examiner,Initial Mark\nAQA,P1,7,Smith,55";
        let table = parse_csv_str(csv, b',', "plain").unwrap();
        let records = preprocess_marker_data(&table).unwrap();
        assert_eq!(records[0].candidate, "7");
        assert!(records[0].agreed_mark.is_none());
    }

    #[test]
    fn test_missing_column_reported() {
        let csv = "Exam Board,Paper,CandNo,Initial Mark\nAQA,P1,7,55";
        let table = parse_csv_str(csv, b',', "nomarker").unwrap();
        let err = preprocess_marker_data(&table).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn { ref column, .. } if column == "Examiner"));
    }

    #[test]
    fn test_non_numeric_mark_reported() {
        let csv = "Exam Board,Paper,CandNo,Examiner,Initial Mark\nAQA,P1,7,Smith,absent";
        let table = parse_csv_str(csv, b',', "bad").unwrap();
        let err = preprocess_marker_data(&table).unwrap_err();
        match err {
            SchemaError::InvalidValue { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "absent");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_row_counts_blank_lines() {
        let csv = "Exam Board,Paper,CandNo,Examiner,Initial Mark\nAQA,P1,7,Smith,55\n\nAQA,P1,8,Smith,absent\n";
        let table = parse_csv_str(csv, b',', "gap").unwrap();
        let err = preprocess_marker_data(&table).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValue { row: 4, .. }), "got {err}");
    }

    #[test]
    fn test_leading_zero_candidate_kept() {
        let csv = "Exam Board,Paper,CandNo,Examiner,Initial Mark\nAQA,P1,0123,Smith,55.5\n";
        let table = parse_csv_str(csv, b',', "zeros").unwrap();
        let records = preprocess_marker_data(&table).unwrap();
        assert_eq!(records[0].candidate, "0123");
        assert_eq!(records[0].initial_mark, 55.5);
    }

    #[test]
    fn test_integral_candidate_numbers() {
        assert_eq!(cell_text(&serde_json::json!(1234.0)).unwrap(), "1234");
        assert_eq!(cell_text(&serde_json::json!(12.5)).unwrap(), "12.5");
        assert_eq!(cell_text(&serde_json::json!(" A12 ")).unwrap(), "A12");
    }

    #[test]
    fn test_paper_data_keeps_extra_columns() {
        let csv = "\
Unnamed: 0,Exam Board Code,Paper Name,Candidate Number,Centre,Agreed Mark
0,AQA,Paper 1,1001,North,65
";
        let table = parse_csv_str(csv, b',', "papers").unwrap();
        let papers = preprocess_paper_data(&table).unwrap();

        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].candidate, "1001");
        assert_eq!(papers[0].agreed_mark, Some(65.0));
        assert_eq!(papers[0].extra.get("Centre").map(String::as_str), Some("North"));
        assert!(!papers[0].extra.contains_key("Unnamed: 0"));
    }

    #[test]
    fn test_duplicate_scripts() {
        let mut records = preprocess_marker_data(&marker_table()).unwrap();
        assert!(duplicate_scripts(&records).is_empty());

        records.push(records[0].clone());
        let dups = duplicate_scripts(&records);
        assert_eq!(dups, vec![("1001".into(), "Paper 1".into(), "Smith".into())]);
    }
}
