//! High-level analysis API.
//!
//! Each function takes normalized records, writes its tables and charts under
//! [`AnalysisOptions::output_dir`] and logs its progress.
//!
//! # Example
//!
//! ```rust,ignore
//! use marks_analysis::{analyze_data, load_records, AnalysisOptions, BoardFilter, GroupBy, InputSource, MarkColumn};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let records = load_records(&[InputSource::new("marks.xlsx")])?;
//!     let tables = analyze_data(
//!         &records,
//!         GroupBy::Examiner,
//!         MarkColumn::Initial,
//!         &[BoardFilter::All],
//!         &AnalysisOptions::default(),
//!     )?;
//!     println!("{} breakdowns written", tables.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::grouper::{group_marks, papers_by_count};
use super::normalize::{duplicate_scripts, preprocess_all};
use crate::agreement::{
    absolute_difference_totals, check_agreed_marks, mark_differences, AgreementCounts,
    ExaminerDeviation, MarkDifference,
};
use crate::error::{AnalysisError, AnalysisResult, LoadError};
use crate::export::charts::{
    agreed_distribution_figure, breakdown_figure, difference_histogram, paper_examiner_figure,
    ranking_figure, AGREED_MARKS_FIGURE, DIFFERENCE_FIGURE, PAPER_EXAMINER_FIGURE, RANKING_FIGURE,
};
use crate::export::{save_breakdown, save_ranking, OutputDirs};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::{BoardFilter, GroupBy, MarkColumn, MarkRecord};
use crate::parser::{load_data, InputSource};
use crate::stats::{MarkBreakdown, Summary};

/// Options shared by every analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Root under which `files/` and `figures/` are created
    pub output_dir: PathBuf,

    /// Render PNG charts (on by default only when built with `fonts`)
    pub figures: bool,

    /// Annotate breakdown charts with per-group record counts
    pub counts: bool,

    /// Chart size in pixels (width, height)
    pub figure_size: (u32, u32),
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            figures: cfg!(feature = "fonts"),
            counts: false,
            figure_size: (1200, 800),
        }
    }
}

impl AnalysisOptions {
    /// Read options from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> AnalysisResult<Self> {
        let content = fs::read_to_string(path).map_err(LoadError::from)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn dirs(&self) -> OutputDirs {
        OutputDirs::under(&self.output_dir)
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load and normalize every input into one record list.
pub fn load_records(inputs: &[InputSource]) -> AnalysisResult<Vec<MarkRecord>> {
    let tables = load_data(inputs)?;
    let records = preprocess_all(&tables)?;
    if records.is_empty() {
        return Err(AnalysisError::EmptyInput(String::new()));
    }
    log_success(format!("{} mark records loaded", records.len()));
    warn_duplicates(&records);
    Ok(records)
}

fn warn_duplicates(records: &[MarkRecord]) {
    let duplicates = duplicate_scripts(records);
    if duplicates.is_empty() {
        return;
    }
    log_warning(format!(
        "{} scripts marked more than once by the same examiner",
        duplicates.len()
    ));
    for (candidate, paper, examiner) in duplicates.iter().take(5) {
        log_info_indent(format!("{} / {} / {}", candidate, paper, examiner), 1);
    }
}

// =============================================================================
// Breakdowns
// =============================================================================

/// Build, log and save one breakdown per board filter.
///
/// An empty `boards` slice analyses the unfiltered population.
pub fn analyze_data(
    records: &[MarkRecord],
    by: GroupBy,
    mark: MarkColumn,
    boards: &[BoardFilter],
    options: &AnalysisOptions,
) -> AnalysisResult<Vec<MarkBreakdown>> {
    let dirs = options.dirs();
    dirs.ensure()?;

    let unfiltered = [BoardFilter::All];
    let boards = if boards.is_empty() { &unfiltered[..] } else { boards };

    let mut breakdowns = Vec::with_capacity(boards.len());
    for board in boards {
        let breakdown = MarkBreakdown::new(records, by, mark, board.clone())?;

        log_info(format!("📊 {} by {} ({})", mark, by, board.file_token()));
        log_info_indent(breakdown.to_text_table(), 1);

        if options.figures {
            let path = dirs.figures.join(format!("{}.png", breakdown.figure_stem()));
            breakdown_figure(&breakdown, &path, options.figure_size, options.counts)?;
            log_info_indent(format!("→ {}", path.display()), 1);
        }

        let saved = save_breakdown(&breakdown, &dirs.files)?;
        log_success(format!("Saved {}", saved.csv.display()));

        breakdowns.push(breakdown);
    }

    Ok(breakdowns)
}

// =============================================================================
// Examiner agreement
// =============================================================================

/// Outcome of [`analyze_all_examiners`]
#[derive(Debug, Clone)]
pub struct ExaminerReport {
    pub agreement: AgreementCounts,
    pub differences: Vec<MarkDifference>,
    /// Examiners by total absolute deviation, largest first
    pub ranking: Vec<ExaminerDeviation>,
    pub ranking_path: PathBuf,
}

/// Agreed-mark consistency, initial vs agreed deviations and the examiner
/// ranking.
///
/// Returns `Ok(None)` with a warning when no record carries an agreed mark.
pub fn analyze_all_examiners(
    records: &[MarkRecord],
    options: &AnalysisOptions,
) -> AnalysisResult<Option<ExaminerReport>> {
    let dirs = options.dirs();
    dirs.ensure()?;

    if !records.iter().any(|r| r.agreed_mark.is_some()) {
        log_warning("No agreed marks found, skipping examiner agreement analysis");
        return Ok(None);
    }

    if options.figures {
        agreed_distribution_figure(records, &dirs.figures.join(AGREED_MARKS_FIGURE), options.figure_size)?;
    }

    let agreement = check_agreed_marks(records);
    log_info(format!("🤝 {}", agreement));
    if agreement.differ > 0 {
        log_warning(format!("{} scripts carry conflicting agreed marks", agreement.differ));
    }

    let differences = mark_differences(records);
    if options.figures {
        difference_histogram(&differences, &dirs.figures.join(DIFFERENCE_FIGURE), options.figure_size)?;
    }

    let ranking = absolute_difference_totals(&differences);
    if options.figures {
        ranking_figure(&ranking, &dirs.figures.join(RANKING_FIGURE), options.figure_size)?;
    }

    log_info("📋 Total absolute difference from agreed marks:");
    for deviation in &ranking {
        log_info_indent(format!("{}: {}", deviation.examiner, deviation.total_absolute), 1);
    }

    let ranking_path = save_ranking(&ranking, &dirs.files)?;
    log_success(format!("Saved {}", ranking_path.display()));

    Ok(Some(ExaminerReport { agreement, differences, ranking, ranking_path }))
}

// =============================================================================
// Paper x examiner distribution
// =============================================================================

/// Summaries of one paper, per examiner.
#[derive(Debug, Clone)]
pub struct PaperPanel {
    pub paper: String,
    pub count: usize,
    /// Examiner name and summary, sorted by name
    pub examiners: Vec<(String, Summary)>,
}

/// Per-paper breakdown of each examiner's marks, papers ordered by record
/// count, largest first.
pub fn analyze_paper_examiner_distribution(
    records: &[MarkRecord],
    mark: MarkColumn,
    options: &AnalysisOptions,
) -> AnalysisResult<Vec<PaperPanel>> {
    let dirs = options.dirs();
    dirs.ensure()?;

    let mut panels = Vec::new();
    for (paper, count) in papers_by_count(records) {
        let in_paper: Vec<&MarkRecord> = records.iter().filter(|r| r.paper == paper).collect();
        let examiners: Vec<(String, Summary)> = group_marks(in_paper, GroupBy::Examiner, mark)
            .into_iter()
            .filter_map(|(examiner, values)| Summary::of(&values).map(|s| (examiner, s)))
            .collect();

        log_info(format!("📄 {} ({} records)", paper, count));
        for (examiner, summary) in &examiners {
            log_info_indent(
                format!("{}: n={}, median={}", examiner, summary.count, summary.median),
                1,
            );
        }

        panels.push(PaperPanel { paper, count, examiners });
    }

    if panels.iter().all(|p| p.examiners.is_empty()) {
        return Err(AnalysisError::EmptyInput(format!(" for {}", mark.label())));
    }

    if options.figures {
        let path = dirs.figures.join(PAPER_EXAMINER_FIGURE);
        paper_examiner_figure(records, mark, &path, options.figure_size)?;
        log_success(format!("Saved {}", path.display()));
    }

    Ok(panels)
}
