//! Descriptive statistics over mark samples.
//!
//! - [`Summary`] - count, score bands, quartiles, mean, spread, range
//! - [`ks`] - two-sample Kolmogorov-Smirnov test
//! - [`breakdown`] - per-group summary tables with KS p-values

pub mod breakdown;
pub mod ks;

pub use breakdown::{BreakdownRow, MarkBreakdown, TOTAL_LABEL};
pub use ks::{group_ks_pvalue, ks_2samp, KsResult, Significance};

/// Significant figures used for every formatted statistic.
pub const SIG_FIGS: usize = 3;

/// Statistic column headers, in table order.
pub const SUMMARY_COLUMNS: [&str; 14] = [
    "Cands", ">=70", ">=60", ">=50", ">=40", ">=30", "<30", "Q1", "Median", "Q3", "Mean",
    "St. Dev.", "Max", "Min",
];

// =============================================================================
// Score bands
// =============================================================================

/// Fixed score bands. A mark on a boundary belongs to the higher band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    From70,
    From60,
    From50,
    From40,
    From30,
    Below30,
}

impl ScoreBand {
    pub const ALL: [ScoreBand; 6] = [
        Self::From70,
        Self::From60,
        Self::From50,
        Self::From40,
        Self::From30,
        Self::Below30,
    ];

    pub fn of(mark: f64) -> Self {
        if mark >= 70.0 {
            Self::From70
        } else if mark >= 60.0 {
            Self::From60
        } else if mark >= 50.0 {
            Self::From50
        } else if mark >= 40.0 {
            Self::From40
        } else if mark >= 30.0 {
            Self::From30
        } else {
            Self::Below30
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::From70 => ">=70",
            Self::From60 => ">=60",
            Self::From50 => ">=50",
            Self::From40 => ">=40",
            Self::From30 => ">=30",
            Self::Below30 => "<30",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::From70 => 0,
            Self::From60 => 1,
            Self::From50 => 2,
            Self::From40 => 3,
            Self::From30 => 4,
            Self::Below30 => 5,
        }
    }
}

// =============================================================================
// Sample statistics
// =============================================================================

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); NaN below two values.
pub fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Copy of `values` sorted ascending.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Quantile of pre-sorted data with linear interpolation between the two
/// nearest ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Summary statistics of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    /// Percentage of marks per [`ScoreBand`], in [`ScoreBand::ALL`] order
    pub bands: [f64; 6],
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
    pub min: f64,
}

impl Summary {
    /// `None` for an empty sample.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sorted = sorted(values);
        let n = values.len() as f64;

        let mut counts = [0usize; 6];
        for v in values {
            counts[ScoreBand::of(*v).index()] += 1;
        }
        let bands = counts.map(|c| 100.0 * c as f64 / n);

        Some(Self {
            count: values.len(),
            bands,
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q3: quantile_sorted(&sorted, 0.75),
            mean: mean(values),
            std_dev: std_dev(values),
            max: sorted[sorted.len() - 1],
            min: sorted[0],
        })
    }

    pub fn band(&self, band: ScoreBand) -> f64 {
        self.bands[band.index()]
    }

    /// Cells in [`SUMMARY_COLUMNS`] order.
    pub fn formatted(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(SUMMARY_COLUMNS.len());
        cells.push(self.count.to_string());
        cells.extend(self.bands.iter().map(|p| format!("{}%", format_sig(*p, SIG_FIGS))));
        cells.extend(
            [self.q1, self.median, self.q3, self.mean, self.std_dev, self.max, self.min]
                .iter()
                .map(|v| format_sig(*v, SIG_FIGS)),
        );
        cells
    }
}

// =============================================================================
// Density estimation
// =============================================================================

/// Scott's rule bandwidth, `σ · n^(-1/5)`. Falls back to 1 for samples
/// without spread.
pub fn scott_bandwidth(values: &[f64]) -> f64 {
    let sd = std_dev(values);
    if !sd.is_finite() || sd == 0.0 {
        return 1.0;
    }
    sd * (values.len() as f64).powf(-0.2)
}

/// Gaussian kernel density of `values` evaluated at each point of `grid`.
pub fn gaussian_kde(values: &[f64], grid: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![0.0; grid.len()];
    }
    let h = scott_bandwidth(values);
    let norm = 1.0 / (values.len() as f64 * h * (2.0 * std::f64::consts::PI).sqrt());
    grid.iter()
        .map(|x| {
            values
                .iter()
                .map(|v| (-0.5 * ((x - v) / h).powi(2)).exp())
                .sum::<f64>()
                * norm
        })
        .collect()
}

// =============================================================================
// Formatting
// =============================================================================

/// Format with `sig` significant figures, like printf `%.{sig}g`.
///
/// Fixed notation when the decimal exponent is in `[-4, sig)`, scientific
/// otherwise; trailing zeros are removed in both.
pub fn format_sig(value: f64, sig: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let sig = sig.max(1);
    let sci = format!("{:.*e}", sig - 1, value);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= sig as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (sig as i32 - 1 - exponent).max(0) as usize;
        strip_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sig() {
        assert_eq!(format_sig(64.0, 3), "64");
        assert_eq!(format_sig(64.27, 3), "64.3");
        assert_eq!(format_sig(100.0, 3), "100");
        assert_eq!(format_sig(66.666666, 3), "66.7");
        assert_eq!(format_sig(0.5, 3), "0.5");
        assert_eq!(format_sig(1234.0, 3), "1.23e+03");
        assert_eq!(format_sig(0.00001234, 3), "1.23e-05");
        assert_eq!(format_sig(99.96, 3), "100");
        assert_eq!(format_sig(-3.14159, 3), "-3.14");
        assert_eq!(format_sig(0.0, 3), "0");
        assert_eq!(format_sig(f64::NAN, 3), "nan");
    }

    #[test]
    fn test_band_boundaries_belong_to_higher_band() {
        assert_eq!(ScoreBand::of(70.0), ScoreBand::From70);
        assert_eq!(ScoreBand::of(69.999), ScoreBand::From60);
        assert_eq!(ScoreBand::of(60.0), ScoreBand::From60);
        assert_eq!(ScoreBand::of(30.0), ScoreBand::From30);
        assert_eq!(ScoreBand::of(29.5), ScoreBand::Below30);
        assert_eq!(ScoreBand::of(-5.0), ScoreBand::Below30);
    }

    #[test]
    fn test_quantiles_interpolate() {
        let s = sorted(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(quantile_sorted(&s, 0.25), 1.75);
        assert_eq!(quantile_sorted(&s, 0.5), 2.5);
        assert_eq!(quantile_sorted(&s, 0.75), 3.25);
        assert_eq!(quantile_sorted(&[7.0], 0.25), 7.0);
    }

    #[test]
    fn test_std_dev_sample() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&v) - 2.13808993).abs() < 1e-6);
        assert!(std_dev(&[5.0]).is_nan());
    }

    #[test]
    fn test_summary_bands_sum_to_100() {
        let marks = [72.0, 65.0, 55.0, 45.0, 35.0, 25.0, 70.0];
        let s = Summary::of(&marks).unwrap();
        let total: f64 = s.bands.iter().sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert!((s.band(ScoreBand::From70) - 200.0 / 7.0).abs() < 1e-9);
        assert_eq!(s.max, 72.0);
        assert_eq!(s.min, 25.0);
    }

    #[test]
    fn test_summary_formatted_cells() {
        let s = Summary::of(&[60.0, 62.0, 64.0]).unwrap();
        let cells = s.formatted();
        assert_eq!(cells.len(), SUMMARY_COLUMNS.len());
        assert_eq!(cells[0], "3");
        assert_eq!(cells[2], "100%");
        assert_eq!(cells[1], "0%");
        assert_eq!(cells[8], "62"); // Median
        assert_eq!(cells[11], "2"); // St. Dev.
    }

    #[test]
    fn test_kde_integrates_to_one() {
        let values = [55.0, 60.0, 61.0, 64.0, 70.0];
        let h = scott_bandwidth(&values);
        let grid: Vec<f64> = (0..=2000).map(|i| 20.0 + i as f64 * 0.05).collect();
        let density = gaussian_kde(&values, &grid);
        let area: f64 = density.iter().sum::<f64>() * 0.05;
        assert!(h > 0.0);
        assert!((area - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_sample() {
        assert!(Summary::of(&[]).is_none());
        assert!(mean(&[]).is_nan());
    }
}
