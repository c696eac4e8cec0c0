//! Breakdown tables: one summary row per group plus a population total.
//!
//! ```text
//! | Examiner | Cands | >=70  | ... | Min | KS P  | P** |
//! |----------|-------|-------|-----|-----|-------|-----|
//! | Total    |   120 | 18.3% | ... |  31 |       |     |
//! | Jones    |    40 |   25% | ... |  44 | 0.012 |   * |
//! | Smith    |    80 |   15% | ... |  31 | 0.412 |     |
//! ```

use std::collections::BTreeMap;

use comfy_table::{presets::ASCII_MARKDOWN, Cell, CellAlignment, ContentArrangement, Row, Table};

use super::ks::{group_ks_pvalue, Significance};
use super::{Summary, SUMMARY_COLUMNS};
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{BoardFilter, GroupBy, MarkColumn, MarkRecord};
use crate::transform::grouper::{column_values, group_counts, group_marks};

/// Label of the synthetic population row.
pub const TOTAL_LABEL: &str = "Total";

pub const KS_COLUMN: &str = "KS P";
pub const SIGNIFICANCE_COLUMN: &str = "P**";

/// One row of a breakdown table.
#[derive(Debug, Clone)]
pub struct BreakdownRow {
    pub label: String,
    pub summary: Summary,
    /// KS p-value against the rest of the population; `None` on the total row
    pub ks_pvalue: Option<f64>,
}

impl BreakdownRow {
    pub fn significance(&self) -> Significance {
        self.ks_pvalue.map_or(Significance::None, Significance::from_p)
    }

    pub fn is_total(&self) -> bool {
        self.ks_pvalue.is_none()
    }

    /// Label followed by formatted statistic, KS and marker cells.
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![self.label.clone()];
        cells.extend(self.summary.formatted());
        match self.ks_pvalue {
            Some(p) => {
                cells.push(format!("{:.3}", p));
                cells.push(self.significance().marker().to_string());
            }
            None => {
                cells.push(String::new());
                cells.push(String::new());
            }
        }
        cells
    }
}

/// Distribution of one mark column broken down by one dimension.
#[derive(Debug, Clone)]
pub struct MarkBreakdown {
    pub by: GroupBy,
    pub mark: MarkColumn,
    pub board: BoardFilter,
    /// Records passing the board filter
    pub records: Vec<MarkRecord>,
    /// Total row first, then groups in ascending label order
    pub rows: Vec<BreakdownRow>,
}

impl MarkBreakdown {
    /// Build the table for `records` restricted to `board`.
    ///
    /// Fails with [`AnalysisError::EmptyInput`] when no record passing the
    /// filter carries the requested mark.
    pub fn new(
        records: &[MarkRecord],
        by: GroupBy,
        mark: MarkColumn,
        board: BoardFilter,
    ) -> AnalysisResult<Self> {
        let data: Vec<MarkRecord> = records.iter().filter(|r| board.matches(r)).cloned().collect();

        let total = Summary::of(&column_values(&data, mark)).ok_or_else(|| {
            AnalysisError::EmptyInput(format!(
                " for {} ({})",
                mark.label(),
                board.file_token()
            ))
        })?;

        let mut rows = vec![BreakdownRow {
            label: TOTAL_LABEL.to_string(),
            summary: total,
            ks_pvalue: None,
        }];

        for (label, values) in group_marks(&data, by, mark) {
            if let Some(summary) = Summary::of(&values) {
                let p = group_ks_pvalue(&data, by, &label, mark);
                rows.push(BreakdownRow { label, summary, ks_pvalue: Some(p) });
            }
        }

        Ok(Self { by, mark, board, records: data, rows })
    }

    /// Column headers, index column first.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec![self.by.label().to_string()];
        header.extend(SUMMARY_COLUMNS.iter().map(|c| c.to_string()));
        header.push(KS_COLUMN.to_string());
        header.push(SIGNIFICANCE_COLUMN.to_string());
        header
    }

    /// Formatted cells for every row.
    pub fn table(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(BreakdownRow::cells).collect()
    }

    pub fn total(&self) -> &BreakdownRow {
        &self.rows[0]
    }

    pub fn groups(&self) -> &[BreakdownRow] {
        &self.rows[1..]
    }

    pub fn group(&self, label: &str) -> Option<&BreakdownRow> {
        self.groups().iter().find(|r| r.label == label)
    }

    /// `marks_by_{by}_{mark}_{board|TOTAL}`
    pub fn file_stem(&self) -> String {
        format!(
            "marks_by_{}_{}_{}",
            self.by.label(),
            self.mark.label(),
            self.board.file_token()
        )
    }

    /// `marks_distribution_{by}_{mark}_{board|TOTAL}`
    pub fn figure_stem(&self) -> String {
        format!(
            "marks_distribution_{}_{}_{}",
            self.by.label(),
            self.mark.label(),
            self.board.file_token()
        )
    }

    /// Group labels ordered by ascending mean mark.
    pub fn order_by_mean(&self) -> Vec<String> {
        let mut groups: Vec<&BreakdownRow> = self.groups().iter().collect();
        groups.sort_by(|a, b| {
            a.summary
                .mean
                .total_cmp(&b.summary.mean)
                .then_with(|| a.label.cmp(&b.label))
        });
        groups.into_iter().map(|r| r.label.clone()).collect()
    }

    /// Number of records per group, whether or not they carry the mark.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        group_counts(&self.records, self.by)
    }

    /// Mark values of one group.
    pub fn values_of(&self, label: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.key(self.by) == label)
            .filter_map(|r| r.mark(self.mark))
            .collect()
    }

    /// Markdown-style text table, group label left and figures right.
    pub fn to_text_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(ASCII_MARKDOWN);
        table.set_content_arrangement(ContentArrangement::Disabled);
        table.set_header(self.header());

        for cells in self.table() {
            let mut row = Row::new();
            for (i, cell) in cells.into_iter().enumerate() {
                let cell = Cell::new(cell);
                row.add_cell(if i == 0 { cell } else { cell.set_alignment(CellAlignment::Right) });
            }
            table.add_row(row);
        }

        table.to_string()
    }
}
