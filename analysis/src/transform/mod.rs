//! Transformation module.
//!
//! - Normalize: raw tables to typed mark records
//! - Grouper: records to per-group mark samples
//! - Pipeline: breakdown, examiner and paper analyses end to end

pub mod grouper;
pub mod normalize;
pub mod pipeline;

pub use grouper::{column_values, filter_board, group_counts, group_marks, papers_by_count, split_group};
pub use normalize::{duplicate_scripts, preprocess_all, preprocess_marker_data, preprocess_paper_data};
pub use pipeline::*;
