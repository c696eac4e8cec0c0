//! Two-sample Kolmogorov-Smirnov test.
//!
//! The statistic is the largest vertical distance between the two empirical
//! CDFs. The two-sided p-value is exact for moderate sample sizes: it counts
//! the monotone lattice paths from `(0, 0)` to `(n, m)` that stay strictly
//! inside the band `|i/n - j/m| < D`. Larger samples use the asymptotic
//! Kolmogorov distribution.

use std::fmt;

use super::sorted;
use crate::models::{GroupBy, MarkColumn, MarkRecord};
use crate::transform::grouper::split_group;

/// Largest sample size for which the exact distribution is computed.
const EXACT_MAX_SAMPLE: usize = 10_000;

/// Outcome of a two-sample KS test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    pub statistic: f64,
    pub pvalue: f64,
}

/// Two-sided two-sample KS test. NaN statistic and p-value if either sample
/// is empty.
pub fn ks_2samp(a: &[f64], b: &[f64]) -> KsResult {
    if a.is_empty() || b.is_empty() {
        return KsResult { statistic: f64::NAN, pvalue: f64::NAN };
    }

    let a = sorted(a);
    let b = sorted(b);
    let (n, m) = (a.len(), b.len());

    let statistic = ks_statistic(&a, &b);

    let pvalue = if n.max(m) <= EXACT_MAX_SAMPLE {
        exact_pvalue(n, m, statistic)
    } else {
        let en = ((n * m) as f64 / (n + m) as f64).sqrt();
        kolmogorov_sf(statistic * en)
    };

    KsResult { statistic, pvalue: pvalue.clamp(0.0, 1.0) }
}

/// `sup |F_a - F_b|` over all observed values; inputs sorted ascending.
fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;

    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    d
}

/// `P(D >= d)` under the null hypothesis, by lattice-path counting.
///
/// `A(i, j)` is the fraction of paths to `(i, j)` that stay inside the band;
/// it satisfies `A(i, j) = (i A(i-1, j) + j A(i, j-1)) / (i + j)`, which keeps
/// every intermediate value in `[0, 1]`.
fn exact_pvalue(n: usize, m: usize, d: f64) -> f64 {
    // D * n * m is an integer; compare in integers to avoid float ties.
    let h = (d * n as f64 * m as f64).round() as i64;
    if h == 0 {
        return 1.0;
    }
    let (ni, mi) = (n as i64, m as i64);
    let inside = |i: usize, j: usize| (i as i64 * mi - j as i64 * ni).abs() < h;

    let mut row = vec![0.0f64; m + 1];
    row[0] = 1.0;
    for j in 1..=m {
        row[j] = if inside(0, j) { row[j - 1] } else { 0.0 };
    }

    for i in 1..=n {
        row[0] = if inside(i, 0) { row[0] } else { 0.0 };
        for j in 1..=m {
            row[j] = if inside(i, j) {
                (i as f64 * row[j] + j as f64 * row[j - 1]) / (i + j) as f64
            } else {
                0.0
            };
        }
    }

    1.0 - row[m]
}

/// Survival function of the Kolmogorov distribution, `Q(z) = P(K > z)`.
pub fn kolmogorov_sf(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z <= 0.0 {
        return 1.0;
    }

    if z < 1.18 {
        // Jacobi theta form converges quickly for small z
        let y = -std::f64::consts::PI.powi(2) / (8.0 * z * z);
        let mut sum = 0.0;
        for k in 1..=20 {
            let odd = (2 * k - 1) as f64;
            sum += (odd * odd * y).exp();
        }
        1.0 - (2.0 * std::f64::consts::PI).sqrt() / z * sum
    } else {
        let mut sum = 0.0;
        for k in 1..=100 {
            let kf = k as f64;
            let term = (-2.0 * kf * kf * z * z).exp();
            sum += if k % 2 == 1 { term } else { -term };
            if term < 1e-16 {
                break;
            }
        }
        (2.0 * sum).clamp(0.0, 1.0)
    }
}

/// p-value of one group against every other group combined.
///
/// A group with fewer than two marks, or with no other marks to compare
/// against, yields NaN.
pub fn group_ks_pvalue<'a, I>(records: I, by: GroupBy, label: &str, mark: MarkColumn) -> f64
where
    I: IntoIterator<Item = &'a MarkRecord>,
{
    let (inside, outside) = split_group(records, by, label, mark);
    if inside.len() < 2 || outside.is_empty() {
        return f64::NAN;
    }
    ks_2samp(&inside, &outside).pvalue
}

// =============================================================================
// Significance markers
// =============================================================================

/// Three-tier significance flag for a KS p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Significance {
    /// p < 0.01
    Strong,
    /// p < 0.05
    Moderate,
    /// p < 0.1
    Weak,
    None,
}

impl Significance {
    pub const ALL: [Significance; 4] = [Self::Strong, Self::Moderate, Self::Weak, Self::None];

    pub fn from_p(p: f64) -> Self {
        if p < 0.01 {
            Self::Strong
        } else if p < 0.05 {
            Self::Moderate
        } else if p < 0.1 {
            Self::Weak
        } else {
            // NaN compares false everywhere and lands here
            Self::None
        }
    }

    /// Table marker.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Strong => "**",
            Self::Moderate => "*",
            Self::Weak => "`",
            Self::None => "",
        }
    }

    /// Legend label used on distribution charts.
    pub fn tier(&self) -> &'static str {
        match self {
            Self::Strong => "<0.01",
            Self::Moderate => "<0.05",
            Self::Weak => "<0.1",
            Self::None => ">=0.1",
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}
