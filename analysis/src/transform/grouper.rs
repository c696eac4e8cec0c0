//! Grouping of mark records by an analysis dimension.
//!
//! ```text
//! records                              groups (sorted by label)
//! ┌───────────────────────────┐       ┌──────────────────────────┐
//! │ Examiner: Smith, mark: 64 │       │ Jones → [66]             │
//! │ Examiner: Jones, mark: 66 │  →    │ Smith → [64, 48]         │
//! │ Examiner: Smith, mark: 48 │       └──────────────────────────┘
//! └───────────────────────────┘
//! ```

use std::collections::BTreeMap;

use crate::models::{BoardFilter, GroupBy, MarkColumn, MarkRecord};

/// Records passing the board filter.
pub fn filter_board<'a>(records: &'a [MarkRecord], board: &BoardFilter) -> Vec<&'a MarkRecord> {
    records.iter().filter(|r| board.matches(r)).collect()
}

/// Mark values per group label, in input order within each group.
///
/// Records without a value for `mark` are left out.
pub fn group_marks<'a, I>(records: I, by: GroupBy, mark: MarkColumn) -> BTreeMap<String, Vec<f64>>
where
    I: IntoIterator<Item = &'a MarkRecord>,
{
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(value) = record.mark(mark) {
            groups.entry(record.key(by).to_string()).or_default().push(value);
        }
    }
    groups
}

/// All values of `mark`, skipping records without one.
pub fn column_values<'a, I>(records: I, mark: MarkColumn) -> Vec<f64>
where
    I: IntoIterator<Item = &'a MarkRecord>,
{
    records.into_iter().filter_map(|r| r.mark(mark)).collect()
}

/// Values of `mark` inside one group and outside it.
pub fn split_group<'a, I>(records: I, by: GroupBy, label: &str, mark: MarkColumn) -> (Vec<f64>, Vec<f64>)
where
    I: IntoIterator<Item = &'a MarkRecord>,
{
    let mut inside = Vec::new();
    let mut outside = Vec::new();
    for record in records {
        if let Some(value) = record.mark(mark) {
            if record.key(by) == label {
                inside.push(value);
            } else {
                outside.push(value);
            }
        }
    }
    (inside, outside)
}

/// Record count per group, including records without the analysed mark.
pub fn group_counts<'a, I>(records: I, by: GroupBy) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a MarkRecord>,
{
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.key(by).to_string()).or_insert(0) += 1;
    }
    counts
}

/// Papers ordered by record count, largest first; ties by name.
pub fn papers_by_count(records: &[MarkRecord]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in records {
        *counts.entry(r.paper.as_str()).or_insert(0) += 1;
    }
    let mut papers: Vec<(String, usize)> = counts.into_iter().map(|(p, n)| (p.to_string(), n)).collect();
    papers.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    papers
}
