//! # Marks Analysis - distribution and agreement analysis of exam marks
//!
//! Reads examiner marking spreadsheets, compares each examiner's (or paper's,
//! or board's) mark distribution against everyone else with a two-sample
//! Kolmogorov-Smirnov test, and checks how far initial marks sit from the
//! agreed outcome.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ XLSX / CSV  │────▶│   Parser    │────▶│  Normalize  │────▶│ MarkRecords │
//! │  (sheets)   │     │ (calamine)  │     │  (headers)  │     │             │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                       ┌────────────────────────┬───────────────────┤
//!                       ▼                        ▼                   ▼
//!                ┌─────────────┐          ┌─────────────┐     ┌─────────────┐
//!                │  Breakdown  │          │  Agreement  │     │ Paper grid  │
//!                │  (stats+KS) │          │ (diffs/rank)│     │             │
//!                └──────┬──────┘          └──────┬──────┘     └──────┬──────┘
//!                       └──────────────┬─────────┴───────────────────┘
//!                                      ▼
//!                          files/*.csv|html|tex, figures/*.png
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marks_analysis::{analyze_data, load_records, AnalysisOptions, GroupBy, InputSource, MarkColumn};
//!
//! let records = load_records(&[InputSource::new("marks.xlsx")]).unwrap();
//! analyze_data(&records, GroupBy::Examiner, MarkColumn::Initial, &[], &AnalysisOptions::default()).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Progress log broadcaster
//! - [`models`] - Mark records, grouping dimensions, board filters
//! - [`parser`] - Spreadsheet and CSV loading
//! - [`transform`] - Normalization, grouping and the analysis pipeline
//! - [`stats`] - Summary statistics, KS test, breakdown tables
//! - [`agreement`] - Agreed mark consistency and examiner deviations
//! - [`export`] - CSV/HTML/LaTeX tables and PNG charts

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Loading
pub mod parser;

// Transformation
pub mod transform;

// Analysis
pub mod agreement;
pub mod stats;

// Output
pub mod export;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AnalysisError,
    AnalysisResult,
    ExportError,
    LoadError,
    SchemaError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    BoardFilter,
    GroupBy,
    MarkColumn,
    MarkRecord,
    PaperRecord,
};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use parser::{
    load_data,
    load_sheet,
    sheet_names,
    parse_csv_file_auto,
    InputSource,
    RawTable,
};

pub use transform::normalize::{
    preprocess_all,
    preprocess_marker_data,
    preprocess_paper_data,
};

// =============================================================================
// Re-exports - Statistics
// =============================================================================

pub use stats::{
    ks_2samp,
    KsResult,
    MarkBreakdown,
    Significance,
    Summary,
};

// =============================================================================
// Re-exports - Agreement
// =============================================================================

pub use agreement::{
    absolute_difference_totals,
    check_agreed_marks,
    mark_differences,
    other_mark,
    pair_marks,
    AgreementCounts,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    analyze_all_examiners,
    analyze_data,
    analyze_paper_examiner_distribution,
    load_records,
    AnalysisOptions,
    ExaminerReport,
    PaperPanel,
};
