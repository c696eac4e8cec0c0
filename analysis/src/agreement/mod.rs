//! Agreement between the two examiners who marked the same script.
//!
//! A script is one candidate's answer to one paper. Each script is marked
//! independently by two examiners; once reconciled, every row for that
//! script carries the agreed mark.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::MarkRecord;

// =============================================================================
// Counterpart marks
// =============================================================================

/// Initial mark given to the same script by a different examiner.
///
/// Returns the first counterpart found, or `None` when the script was marked
/// only once.
pub fn other_mark(record: &MarkRecord, records: &[MarkRecord]) -> Option<f64> {
    records
        .iter()
        .find(|r| r.same_script(record) && r.examiner != record.examiner)
        .map(|r| r.initial_mark)
}

/// A record joined to its counterpart examiner's initial mark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkPair {
    pub candidate: String,
    pub paper: String,
    pub examiner: String,
    pub initial_mark: f64,
    pub other_examiner: String,
    pub other_mark: f64,
}

impl MarkPair {
    /// This examiner's mark minus the counterpart's.
    pub fn gap(&self) -> f64 {
        self.initial_mark - self.other_mark
    }
}

/// Join every record to its counterpart on candidate + paper, excluding
/// self-matches. Records marked only once are left out.
pub fn pair_marks(records: &[MarkRecord]) -> Vec<MarkPair> {
    let mut by_script: BTreeMap<(&str, &str), Vec<&MarkRecord>> = BTreeMap::new();
    for r in records {
        by_script.entry((r.candidate.as_str(), r.paper.as_str())).or_default().push(r);
    }

    let mut pairs = Vec::new();
    for r in records {
        let script = &by_script[&(r.candidate.as_str(), r.paper.as_str())];
        if let Some(other) = script.iter().find(|o| o.examiner != r.examiner) {
            pairs.push(MarkPair {
                candidate: r.candidate.clone(),
                paper: r.paper.clone(),
                examiner: r.examiner.clone(),
                initial_mark: r.initial_mark,
                other_examiner: other.examiner.clone(),
                other_mark: other.initial_mark,
            });
        }
    }
    pairs
}

// =============================================================================
// Agreed mark consistency
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgreementStatus {
    Agree,
    Differ,
}

impl fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agree => f.write_str("Agree"),
            Self::Differ => f.write_str("Differ"),
        }
    }
}

/// Number of scripts in each agreement state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgreementCounts {
    pub agree: usize,
    pub differ: usize,
}

impl AgreementCounts {
    pub fn total(&self) -> usize {
        self.agree + self.differ
    }
}

impl fmt::Display for AgreementCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agree: {}, Differ: {}", self.agree, self.differ)
    }
}

/// Agreement state of every script that has at least one agreed mark.
///
/// A script agrees when all of its rows carry the same agreed mark.
pub fn classify_scripts(records: &[MarkRecord]) -> BTreeMap<(String, String), AgreementStatus> {
    let mut agreed: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    for r in records {
        if let Some(mark) = r.agreed_mark {
            let marks = agreed.entry((r.candidate.clone(), r.paper.clone())).or_default();
            if !marks.contains(&mark) {
                marks.push(mark);
            }
        }
    }

    agreed
        .into_iter()
        .map(|(script, distinct)| {
            let status = if distinct.len() > 1 { AgreementStatus::Differ } else { AgreementStatus::Agree };
            (script, status)
        })
        .collect()
}

/// Count scripts whose rows agree or differ on the agreed mark.
pub fn check_agreed_marks(records: &[MarkRecord]) -> AgreementCounts {
    let mut counts = AgreementCounts::default();
    for status in classify_scripts(records).values() {
        match status {
            AgreementStatus::Agree => counts.agree += 1,
            AgreementStatus::Differ => counts.differ += 1,
        }
    }
    counts
}

// =============================================================================
// Initial vs agreed differences
// =============================================================================

/// Deviation of an examiner's initial mark from the agreed mark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkDifference {
    pub candidate: String,
    pub paper: String,
    pub examiner: String,
    pub initial_mark: f64,
    pub agreed_mark: f64,
    /// `initial - agreed`
    pub difference: f64,
    pub absolute: f64,
}

/// Differences for every record that has an agreed mark.
pub fn mark_differences(records: &[MarkRecord]) -> Vec<MarkDifference> {
    records
        .iter()
        .filter_map(|r| {
            let agreed = r.agreed_mark?;
            let difference = r.initial_mark - agreed;
            Some(MarkDifference {
                candidate: r.candidate.clone(),
                paper: r.paper.clone(),
                examiner: r.examiner.clone(),
                initial_mark: r.initial_mark,
                agreed_mark: agreed,
                difference,
                absolute: difference.abs(),
            })
        })
        .collect()
}

/// An examiner's total absolute deviation from agreed outcomes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExaminerDeviation {
    #[serde(rename = "Examiner")]
    pub examiner: String,
    #[serde(rename = "Mark Difference Absolute")]
    pub total_absolute: f64,
}

/// Sum absolute differences per examiner, largest first. Ties are ordered by
/// examiner name.
pub fn absolute_difference_totals(differences: &[MarkDifference]) -> Vec<ExaminerDeviation> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for d in differences {
        *totals.entry(d.examiner.as_str()).or_insert(0.0) += d.absolute;
    }

    let mut ranking: Vec<ExaminerDeviation> = totals
        .into_iter()
        .map(|(examiner, total_absolute)| ExaminerDeviation {
            examiner: examiner.to_string(),
            total_absolute,
        })
        .collect();
    ranking.sort_by(|a, b| {
        b.total_absolute
            .total_cmp(&a.total_absolute)
            .then_with(|| a.examiner.cmp(&b.examiner))
    });
    ranking
}
