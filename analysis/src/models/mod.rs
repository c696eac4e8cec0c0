//! Domain models for the marks analysis pipeline.
//!
//! - [`MarkRecord`] - One examiner's mark for one candidate on one paper
//! - [`PaperRecord`] - One candidate's row in a paper-level sheet
//! - [`GroupBy`] - Dimension a breakdown is grouped by
//! - [`MarkColumn`] - Which mark a breakdown analyses
//! - [`BoardFilter`] - Optional exam board restriction

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Normalized column names
// =============================================================================

pub const COL_EXAM_BOARD: &str = "Exam Board";
pub const COL_PAPER: &str = "Paper";
pub const COL_CANDIDATE: &str = "CandNo";
pub const COL_EXAMINER: &str = "Examiner";
pub const COL_INITIAL_MARK: &str = "Initial Mark";
pub const COL_AGREED_MARK: &str = "Agreed Mark";

// =============================================================================
// Records
// =============================================================================

/// One row of a marker dataset.
///
/// `candidate + paper + examiner` is unique within one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkRecord {
    pub candidate: String,
    pub paper: String,
    pub exam_board: String,
    pub examiner: String,
    pub initial_mark: f64,
    /// Present only once the two examiners' marks were reconciled.
    pub agreed_mark: Option<f64>,
}

impl MarkRecord {
    /// Value of the requested mark column, if the record carries one.
    pub fn mark(&self, column: MarkColumn) -> Option<f64> {
        match column {
            MarkColumn::Initial => Some(self.initial_mark),
            MarkColumn::Agreed => self.agreed_mark,
        }
    }

    /// Label of this record in the given grouping dimension.
    pub fn key(&self, by: GroupBy) -> &str {
        match by {
            GroupBy::Examiner => &self.examiner,
            GroupBy::Paper => &self.paper,
            GroupBy::ExamBoard => &self.exam_board,
            GroupBy::Candidate => &self.candidate,
        }
    }

    /// Same candidate sitting the same paper.
    pub fn same_script(&self, other: &MarkRecord) -> bool {
        self.candidate == other.candidate && self.paper == other.paper
    }
}

/// One row of a paper-level dataset.
///
/// Columns beyond the identifying ones are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub candidate: String,
    pub paper: String,
    pub exam_board: String,
    pub agreed_mark: Option<f64>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

// =============================================================================
// Analysis dimensions
// =============================================================================

/// Grouping dimension for a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Examiner,
    Paper,
    ExamBoard,
    Candidate,
}

impl GroupBy {
    /// Normalized column header, also used in output file names.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Examiner => COL_EXAMINER,
            Self::Paper => COL_PAPER,
            Self::ExamBoard => COL_EXAM_BOARD,
            Self::Candidate => COL_CANDIDATE,
        }
    }

    /// Parse from a CLI value or a column header.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "examiner" | "marker" | "your name" => Some(Self::Examiner),
            "paper" | "paper name" => Some(Self::Paper),
            "exam board" | "board" | "exam board code" => Some(Self::ExamBoard),
            "candno" | "candidate" | "candidate number" => Some(Self::Candidate),
            _ => None,
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mark column a breakdown is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkColumn {
    Initial,
    Agreed,
}

impl MarkColumn {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initial => COL_INITIAL_MARK,
            Self::Agreed => COL_AGREED_MARK,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "initial" | "initial mark" => Some(Self::Initial),
            "agreed" | "agreed mark" => Some(Self::Agreed),
            _ => None,
        }
    }
}

impl fmt::Display for MarkColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Restricts an analysis to one exam board, or `All` for the full population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardFilter {
    All,
    Board(String),
}

impl BoardFilter {
    pub fn matches(&self, record: &MarkRecord) -> bool {
        match self {
            Self::All => true,
            Self::Board(board) => record.exam_board == *board,
        }
    }

    /// Token used in output file names.
    pub fn file_token(&self) -> &str {
        match self {
            Self::All => "TOTAL",
            Self::Board(board) => board,
        }
    }

    /// Board name for chart titles, empty when unfiltered.
    pub fn title(&self) -> &str {
        match self {
            Self::All => "",
            Self::Board(board) => board,
        }
    }
}

impl Default for BoardFilter {
    fn default() -> Self {
        Self::All
    }
}

impl From<Option<String>> for BoardFilter {
    fn from(board: Option<String>) -> Self {
        board.map_or(Self::All, Self::Board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(examiner: &str, agreed: Option<f64>) -> MarkRecord {
        MarkRecord {
            candidate: "1001".into(),
            paper: "Paper 1".into(),
            exam_board: "AQA".into(),
            examiner: examiner.into(),
            initial_mark: 64.0,
            agreed_mark: agreed,
        }
    }

    #[test]
    fn test_mark_column_selection() {
        let r = record("Smith", None);
        assert_eq!(r.mark(MarkColumn::Initial), Some(64.0));
        assert_eq!(r.mark(MarkColumn::Agreed), None);

        let r = record("Smith", Some(66.0));
        assert_eq!(r.mark(MarkColumn::Agreed), Some(66.0));
    }

    #[test]
    fn test_group_key() {
        let r = record("Smith", None);
        assert_eq!(r.key(GroupBy::Examiner), "Smith");
        assert_eq!(r.key(GroupBy::Paper), "Paper 1");
        assert_eq!(r.key(GroupBy::ExamBoard), "AQA");
        assert_eq!(r.key(GroupBy::Candidate), "1001");
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(GroupBy::parse("Examiner"), Some(GroupBy::Examiner));
        assert_eq!(GroupBy::parse("exam-board"), Some(GroupBy::ExamBoard));
        assert_eq!(GroupBy::parse("CandNo"), Some(GroupBy::Candidate));
        assert_eq!(GroupBy::parse("grade"), None);

        assert_eq!(MarkColumn::parse("Agreed Mark"), Some(MarkColumn::Agreed));
        assert_eq!(MarkColumn::parse("initial"), Some(MarkColumn::Initial));
    }

    #[test]
    fn test_board_filter() {
        let r = record("Smith", None);
        assert!(BoardFilter::All.matches(&r));
        assert!(BoardFilter::Board("AQA".into()).matches(&r));
        assert!(!BoardFilter::Board("OCR".into()).matches(&r));

        assert_eq!(BoardFilter::All.file_token(), "TOTAL");
        assert_eq!(BoardFilter::from(Some("OCR".to_string())).file_token(), "OCR");
    }
}
