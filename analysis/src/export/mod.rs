//! Summary file export.
//!
//! Breakdown tables are written as CSV, HTML and LaTeX under `files/`;
//! charts go to `figures/` (see [`charts`]).

pub mod charts;

use std::fs;
use std::path::{Path, PathBuf};

use crate::agreement::ExaminerDeviation;
use crate::error::ExportResult;
use crate::stats::MarkBreakdown;

/// Subdirectory for tabular exports.
pub const FILES_DIR: &str = "files";
/// Subdirectory for chart images.
pub const FIGURES_DIR: &str = "figures";

/// File name of the examiner deviation ranking.
pub const RANKING_FILE: &str = "Marks by Examiner (Initial vs Agreed Difference).csv";

/// Resolved output directories.
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub files: PathBuf,
    pub figures: PathBuf,
}

impl OutputDirs {
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            files: root.join(FILES_DIR),
            figures: root.join(FIGURES_DIR),
        }
    }

    /// Create both directories if absent.
    pub fn ensure(&self) -> ExportResult<()> {
        fs::create_dir_all(&self.files)?;
        fs::create_dir_all(&self.figures)?;
        Ok(())
    }
}

// =============================================================================
// Breakdown tables
// =============================================================================

/// Paths written by [`save_breakdown`].
#[derive(Debug, Clone)]
pub struct SavedBreakdown {
    pub csv: PathBuf,
    pub html: PathBuf,
    pub latex: PathBuf,
}

/// Write a breakdown as `.csv`, `.html` and `.tex` into `files_dir`.
pub fn save_breakdown(breakdown: &MarkBreakdown, files_dir: &Path) -> ExportResult<SavedBreakdown> {
    let stem = breakdown.file_stem();
    let saved = SavedBreakdown {
        csv: files_dir.join(format!("{}.csv", stem)),
        html: files_dir.join(format!("{}.html", stem)),
        latex: files_dir.join(format!("{}.tex", stem)),
    };

    let header = breakdown.header();
    let rows = breakdown.table();

    write_csv(&saved.csv, &header, &rows)?;
    fs::write(&saved.html, to_html(&header, &rows))?;
    fs::write(&saved.latex, to_latex(&header, &rows))?;

    Ok(saved)
}

/// Write a header and rows as CSV.
pub fn write_csv(path: &Path, header: &[String], rows: &[Vec<String>]) -> ExportResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read back a table written by [`write_csv`].
pub fn read_csv(path: &Path) -> ExportResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::Reader::from_path(path)?;
    let header = reader.headers()?.iter().map(String::from).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(String::from).collect());
    }
    Ok((header, rows))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// HTML table with the first column as row headers.
pub fn to_html(header: &[String], rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table border=\"1\" class=\"dataframe\">\n  <thead>\n");
    html.push_str("    <tr style=\"text-align: right;\">\n");
    for h in header {
        html.push_str(&format!("      <th>{}</th>\n", escape_html(h)));
    }
    html.push_str("    </tr>\n  </thead>\n  <tbody>\n");

    for row in rows {
        html.push_str("    <tr>\n");
        for (i, cell) in row.iter().enumerate() {
            let tag = if i == 0 { "th" } else { "td" };
            html.push_str(&format!("      <{tag}>{}</{tag}>\n", escape_html(cell)));
        }
        html.push_str("    </tr>\n");
    }
    html.push_str("  </tbody>\n</table>\n");
    html
}

fn escape_latex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '<' => out.push_str("\\textless{}"),
            '>' => out.push_str("\\textgreater{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Booktabs `tabular` environment.
pub fn to_latex(header: &[String], rows: &[Vec<String>]) -> String {
    let align: String = std::iter::once('l').chain(header.iter().skip(1).map(|_| 'r')).collect();
    let line = |cells: &[String]| -> String {
        cells.iter().map(|c| escape_latex(c)).collect::<Vec<_>>().join(" & ") + " \\\\\n"
    };

    let mut tex = format!("\\begin{{tabular}}{{{}}}\n\\toprule\n", align);
    tex.push_str(&line(header));
    tex.push_str("\\midrule\n");
    for row in rows {
        tex.push_str(&line(row));
    }
    tex.push_str("\\bottomrule\n\\end{tabular}\n");
    tex
}

// =============================================================================
// Examiner ranking
// =============================================================================

/// Write the examiner deviation ranking (`Examiner,Mark Difference Absolute`).
pub fn save_ranking(ranking: &[ExaminerDeviation], files_dir: &Path) -> ExportResult<PathBuf> {
    let path = files_dir.join(RANKING_FILE);
    let mut writer = csv::Writer::from_path(&path)?;
    for deviation in ranking {
        writer.serialize(deviation)?;
    }
    if ranking.is_empty() {
        writer.write_record(["Examiner", "Mark Difference Absolute"])?;
    }
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_output_dirs_created() {
        let dir = tempdir().unwrap();
        let dirs = OutputDirs::under(dir.path());
        dirs.ensure().unwrap();
        assert!(dirs.files.is_dir());
        assert!(dirs.figures.is_dir());
        // Idempotent
        dirs.ensure().unwrap();
    }

    #[test]
    fn test_html_escapes_and_row_headers() {
        let html = to_html(&strings(&["Examiner", ">=70"]), &[strings(&["O'Neil & Co", "50%"])]);
        assert!(html.contains("<th>&gt;=70</th>"));
        assert!(html.contains("<th>O'Neil &amp; Co</th>"));
        assert!(html.contains("<td>50%</td>"));
    }

    #[test]
    fn test_latex_escapes_specials() {
        let tex = to_latex(&strings(&["Examiner", ">=70"]), &[strings(&["A_B", "50%"])]);
        assert!(tex.starts_with("\\begin{tabular}{lr}"));
        assert!(tex.contains("A\\_B & 50\\% \\\\"));
        assert!(tex.contains("\\textgreater{}=70"));
        assert!(tex.trim_end().ends_with("\\end{tabular}"));
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let header = strings(&["Examiner", "Mean", "P**"]);
        let rows = vec![strings(&["Total", "64", ""]), strings(&["Smith, J", "62.5", "*"])];

        write_csv(&path, &header, &rows).unwrap();
        let (h, r) = read_csv(&path).unwrap();
        assert_eq!(h, header);
        assert_eq!(r, rows);
    }

    #[test]
    fn test_ranking_file() {
        let dir = tempdir().unwrap();
        let ranking = vec![
            ExaminerDeviation { examiner: "Smith".into(), total_absolute: 7.0 },
            ExaminerDeviation { examiner: "Jones".into(), total_absolute: 4.5 },
        ];
        let path = save_ranking(&ranking, dir.path()).unwrap();
        let content = fs::read_to_string(path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("Examiner,Mark Difference Absolute"));
        assert_eq!(lines.next(), Some("Smith,7.0"));
        assert_eq!(lines.next(), Some("Jones,4.5"));
    }
}
