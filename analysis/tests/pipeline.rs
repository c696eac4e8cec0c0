//! End-to-end runs over marker sheets written to a temporary directory.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use marks_analysis::export::{read_csv, RANKING_FILE};
use marks_analysis::stats::SUMMARY_COLUMNS;
use marks_analysis::{
    analyze_all_examiners, analyze_data, load_records, AnalysisError, AnalysisOptions,
    BoardFilter, GroupBy, InputSource, MarkColumn, SchemaError,
};
use tempfile::{tempdir, TempDir};

const HEADER: &str =
    ",Exam Board Code,Paper Name,Candidate Number,Your Name,Overall Initial Mark ,Agreed Mark\n";

/// Two examiners double-marking Paper 1 for AQA, a third marking Paper 2
/// for OCR roughly ten marks higher.
fn marker_csv() -> String {
    let mut csv = String::from(HEADER);
    let mut index = 0;
    for i in 0..8 {
        let m = 60.0 + i as f64 * 0.5;
        let agreed = m + 1.0;
        writeln!(csv, "{},AQA,Paper 1,{},Adams,{},{}", index, 1000 + i, m, agreed).unwrap();
        writeln!(csv, "{},AQA,Paper 1,{},Baker,{},{}", index + 1, 1000 + i, m + 2.0, agreed).unwrap();
        index += 2;
    }
    for i in 0..8 {
        let m = 70.0 + i as f64 * 0.5;
        writeln!(csv, "{},OCR,Paper 2,{},Clark,{},{}", index, 2000 + i, m, m).unwrap();
        index += 1;
    }
    csv
}

fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn options(root: &Path) -> AnalysisOptions {
    AnalysisOptions {
        output_dir: root.to_path_buf(),
        figures: false,
        ..AnalysisOptions::default()
    }
}

#[test]
fn test_breakdown_csv_round_trips_labels_and_columns() {
    let dir = tempdir().unwrap();
    let input = write_input(&dir, "markers.csv", &marker_csv());
    let out = dir.path().join("out");

    let records = load_records(&[InputSource::new(&input)]).unwrap();
    assert_eq!(records.len(), 24);
    assert_eq!(records[0].candidate, "1000");

    analyze_data(&records, GroupBy::Examiner, MarkColumn::Initial, &[], &options(&out)).unwrap();

    let (header, rows) =
        read_csv(&out.join("files").join("marks_by_Examiner_Initial Mark_TOTAL.csv")).unwrap();

    let mut expected = vec!["Examiner".to_string()];
    expected.extend(SUMMARY_COLUMNS.iter().map(|c| c.to_string()));
    expected.push("KS P".into());
    expected.push("P**".into());
    assert_eq!(header, expected);

    let labels: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(labels, vec!["Total", "Adams", "Baker", "Clark"]);

    let total = &rows[0];
    assert_eq!(total[1], "24");
    assert_eq!(total[total.len() - 1], "");

    let clark = &rows[3];
    assert_eq!(clark[2], "100%"); // >=70
    assert_eq!(clark[clark.len() - 1], "**");
}

#[test]
fn test_board_breakdowns_written_side_by_side() {
    let dir = tempdir().unwrap();
    let input = write_input(&dir, "markers.csv", &marker_csv());
    let records = load_records(&[InputSource::new(&input)]).unwrap();

    let boards = vec![BoardFilter::Board("AQA".into()), BoardFilter::Board("OCR".into())];
    let breakdowns =
        analyze_data(&records, GroupBy::Paper, MarkColumn::Agreed, &boards, &options(dir.path()))
            .unwrap();

    assert_eq!(breakdowns.len(), 2);
    let files = dir.path().join("files");
    for token in ["AQA", "OCR"] {
        for ext in ["csv", "html", "tex"] {
            assert!(files.join(format!("marks_by_Paper_Agreed Mark_{}.{}", token, ext)).is_file());
        }
    }

    let (_, rows) = read_csv(&files.join("marks_by_Paper_Agreed Mark_OCR.csv")).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][0], "Paper 2");
}

#[test]
fn test_examiner_ranking_file() {
    let dir = tempdir().unwrap();
    let input = write_input(&dir, "markers.csv", &marker_csv());
    let records = load_records(&[InputSource::new(&input)]).unwrap();

    let report = analyze_all_examiners(&records, &options(dir.path())).unwrap().unwrap();
    assert_eq!(report.agreement.differ, 0);

    let content = fs::read_to_string(dir.path().join("files").join(RANKING_FILE)).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec!["Examiner,Mark Difference Absolute", "Adams,8.0", "Baker,8.0", "Clark,0.0"]
    );
}

#[test]
fn test_sheet_without_agreed_marks() {
    let dir = tempdir().unwrap();
    let content = "\
Exam Board,Paper,CandNo,Examiner,Initial Mark
AQA,Paper 1,1,Adams,61
AQA,Paper 1,1,Baker,64
AQA,Paper 1,2,Adams,55
";
    let input = write_input(&dir, "initial_only.csv", content);
    let records = load_records(&[InputSource::new(&input)]).unwrap();
    assert!(records.iter().all(|r| r.agreed_mark.is_none()));

    assert!(analyze_all_examiners(&records, &options(dir.path())).unwrap().is_none());

    let result =
        analyze_data(&records, GroupBy::Examiner, MarkColumn::Agreed, &[], &options(dir.path()));
    assert!(matches!(result, Err(AnalysisError::EmptyInput(_))));

    let initial =
        analyze_data(&records, GroupBy::Examiner, MarkColumn::Initial, &[], &options(dir.path()))
            .unwrap();
    // Baker has a single mark: no KS comparison possible
    assert!(initial[0].group("Baker").unwrap().ks_pvalue.unwrap().is_nan());
}

#[test]
fn test_missing_examiner_column_is_schema_error() {
    let dir = tempdir().unwrap();
    let content = "\
Exam Board Code,Paper Name,Candidate Number,Overall Initial Mark
AQA,Paper 1,1,61
";
    let input = write_input(&dir, "broken.csv", content);

    let err = load_records(&[InputSource::new(&input)]).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Schema(SchemaError::MissingColumn { ref column, .. }) if column == "Examiner"
    ));
}

#[test]
fn test_semicolon_separated_input() {
    let dir = tempdir().unwrap();
    let content = marker_csv().replace(',', ";");
    let input = write_input(&dir, "markers_semicolon.csv", &content);

    let records = load_records(&[InputSource::new(&input)]).unwrap();
    assert_eq!(records.len(), 24);
    assert_eq!(records[23].examiner, "Clark");
}
