//! PNG charts rendered with plotters.
//!
//! Every public function wraps a private `draw_*` that returns a boxed error
//! so plotters' backend errors can be propagated with `?`; the wrapper turns
//! it into [`ExportError::Chart`].

use std::collections::BTreeMap;
use std::path::Path;

use plotters::prelude::*;

use crate::agreement::{ExaminerDeviation, MarkDifference};
use crate::error::{ExportError, ExportResult};
use crate::models::{MarkColumn, MarkRecord};
use crate::stats::{gaussian_kde, scott_bandwidth, MarkBreakdown, Significance};
use crate::transform::grouper::papers_by_count;

type DrawResult = Result<(), Box<dyn std::error::Error>>;

pub const AGREED_MARKS_FIGURE: &str = "Aggregate_Agreed_Marks.png";
pub const DIFFERENCE_FIGURE: &str = "Difference_between_Initial_and_Agreed_Marks.png";
pub const RANKING_FIGURE: &str = "Absolute_Mark_Difference.png";
pub const PAPER_EXAMINER_FIGURE: &str = "Marks_distribution_by_Paper_and_Examiner.png";

/// Panels per row on the paper/examiner grid.
const GRID_COLUMNS: usize = 3;

const FONT: &str = "sans-serif";

fn chart_error(e: Box<dyn std::error::Error>) -> ExportError {
    ExportError::Chart(e.to_string())
}

/// Every figure carries a caption, and plotters without a TrueType backend
/// panics on the first glyph.
fn require_fonts() -> ExportResult<()> {
    if cfg!(feature = "fonts") {
        Ok(())
    } else {
        Err(ExportError::Chart(
            "built without the `fonts` feature, charts cannot draw text".to_string(),
        ))
    }
}

/// Box colour for a significance tier, red for strong through blue for none.
pub fn tier_color(significance: Significance) -> RGBColor {
    match significance {
        Significance::Strong => RGBColor(202, 0, 32),
        Significance::Moderate => RGBColor(244, 165, 130),
        Significance::Weak => RGBColor(146, 197, 222),
        Significance::None => RGBColor(5, 113, 176),
    }
}

/// Horizontal axis range: at least 40..85, widened to cover the data.
pub fn mark_axis(values: &[f64]) -> (f64, f64) {
    let lo = values.iter().copied().fold(40.0, f64::min);
    let hi = values.iter().copied().fold(85.0, f64::max);
    (lo.floor(), hi.ceil())
}

// =============================================================================
// Breakdown box plot
// =============================================================================

/// Horizontal box plot of each group ordered by mean mark, coloured by the
/// group's KS significance tier. `counts` appends `N=` annotations.
pub fn breakdown_figure(
    breakdown: &MarkBreakdown,
    path: &Path,
    size: (u32, u32),
    counts: bool,
) -> ExportResult<()> {
    require_fonts()?;
    draw_breakdown(breakdown, path, size, counts).map_err(chart_error)
}

fn draw_breakdown(breakdown: &MarkBreakdown, path: &Path, size: (u32, u32), counts: bool) -> DrawResult {
    let order = breakdown.order_by_mean();
    if order.is_empty() {
        return Ok(());
    }

    let all_values: Vec<f64> = order.iter().flat_map(|l| breakdown.values_of(l)).collect();
    let (lo, hi) = mark_axis(&all_values);
    let (lo, hi) = (lo as f32, hi as f32);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let title = match breakdown.board.title() {
        "" => format!("Marks Distribution by {}, whiskers 1.5xIQR", breakdown.by.label()),
        board => format!(
            "Marks Distribution by {} for {}, whiskers 1.5xIQR",
            breakdown.by.label(),
            board
        ),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(140)
        .build_cartesian_2d(lo..hi, order[..].into_segmented())?;

    chart
        .configure_mesh()
        .x_desc(breakdown.mark.label())
        .y_desc(breakdown.by.label())
        .draw()?;

    for label in &order {
        let values = breakdown.values_of(label);
        let quartiles = Quartiles::new(&values);
        let significance = breakdown
            .group(label)
            .map_or(Significance::None, |row| row.significance());
        let color = tier_color(significance);

        chart.draw_series(std::iter::once(
            Boxplot::new_horizontal(SegmentValue::CenterOf(label), &quartiles)
                .width(16)
                .whisker_width(0.6)
                .style(color.stroke_width(2)),
        ))?;
    }

    if counts {
        let per_group = breakdown.counts();
        let x = hi - (hi - lo) * 0.08;
        for label in &order {
            let n = per_group.get(label).copied().unwrap_or(0);
            chart.plotting_area().draw(&Text::new(
                format!("N={}", n),
                (x, SegmentValue::CenterOf(label)),
                (FONT, 14).into_font(),
            ))?;
        }
    }

    for significance in Significance::ALL {
        let color = tier_color(significance);
        chart
            .draw_series(std::iter::empty::<Circle<(f32, SegmentValue<&String>), i32>>())?
            .label(significance.tier())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 14, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

// =============================================================================
// Agreed marks density
// =============================================================================

/// Kernel density of the agreed marks with a rug of the observations.
pub fn agreed_distribution_figure(records: &[MarkRecord], path: &Path, size: (u32, u32)) -> ExportResult<()> {
    require_fonts()?;
    draw_agreed_distribution(records, path, size).map_err(chart_error)
}

fn draw_agreed_distribution(records: &[MarkRecord], path: &Path, size: (u32, u32)) -> DrawResult {
    let values: Vec<f64> = records.iter().filter_map(|r| r.agreed_mark).collect();
    if values.is_empty() {
        return Ok(());
    }

    let h = scott_bandwidth(&values);
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min) - 3.0 * h;
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max) + 3.0 * h;
    let grid: Vec<f64> = (0..=200).map(|i| lo + (hi - lo) * i as f64 / 200.0).collect();
    let density = gaussian_kde(&values, &grid);
    let peak = density.iter().copied().fold(0.0, f64::max);
    let rug = peak * 0.04;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Aggregate Agreed Marks", (FONT, 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, 0.0..peak * 1.1)?;

    chart
        .configure_mesh()
        .x_desc(MarkColumn::Agreed.label())
        .y_desc("Density")
        .draw()?;

    chart.draw_series(
        AreaSeries::new(grid.into_iter().zip(density), 0.0, BLUE.mix(0.3)).border_style(&BLUE),
    )?;

    chart.draw_series(
        values
            .iter()
            .map(|v| PathElement::new(vec![(*v, 0.0), (*v, rug)], BLUE.stroke_width(1))),
    )?;

    root.present()?;
    Ok(())
}

// =============================================================================
// Initial vs agreed differences
// =============================================================================

/// Histogram of `initial - agreed`, binned to whole marks.
pub fn difference_histogram(differences: &[MarkDifference], path: &Path, size: (u32, u32)) -> ExportResult<()> {
    require_fonts()?;
    draw_difference_histogram(differences, path, size).map_err(chart_error)
}

fn draw_difference_histogram(differences: &[MarkDifference], path: &Path, size: (u32, u32)) -> DrawResult {
    if differences.is_empty() {
        return Ok(());
    }

    let mut bins: BTreeMap<i32, u32> = BTreeMap::new();
    for d in differences {
        *bins.entry(d.difference.round() as i32).or_insert(0) += 1;
    }
    let lo = bins.keys().next().copied().unwrap_or(0).min(0) - 1;
    let hi = bins.keys().next_back().copied().unwrap_or(0).max(0) + 1;
    let tallest = bins.values().copied().max().unwrap_or(1);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Difference between Initial and Agreed Marks", (FONT, 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((lo..hi).into_segmented(), 0u32..tallest + 1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Initial - Agreed")
        .y_desc("Count")
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.mix(0.5).filled())
            .margin(2)
            .data(bins.into_iter()),
    )?;

    root.present()?;
    Ok(())
}

/// Horizontal bars of each examiner's total absolute deviation, in ranking
/// order.
pub fn ranking_figure(ranking: &[ExaminerDeviation], path: &Path, size: (u32, u32)) -> ExportResult<()> {
    require_fonts()?;
    draw_ranking(ranking, path, size).map_err(chart_error)
}

fn draw_ranking(ranking: &[ExaminerDeviation], path: &Path, size: (u32, u32)) -> DrawResult {
    if ranking.is_empty() {
        return Ok(());
    }

    let names: Vec<String> = ranking.iter().map(|r| r.examiner.clone()).collect();
    let largest = ranking.iter().map(|r| r.total_absolute).fold(0.0, f64::max);
    let top = if largest > 0.0 { largest * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Absolute Mark Difference by Examiner", (FONT, 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(140)
        .build_cartesian_2d(0.0..top, names[..].into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Total absolute difference")
        .draw()?;

    chart.draw_series(
        Histogram::horizontal(&chart)
            .style(RED.mix(0.6).filled())
            .margin(4)
            .data(names.iter().zip(ranking).map(|(name, r)| (name, r.total_absolute))),
    )?;

    root.present()?;
    Ok(())
}

// =============================================================================
// Paper x examiner grid
// =============================================================================

/// One strip plot per paper, examiners on the vertical axis, laid out three
/// panels to a row.
pub fn paper_examiner_figure(
    records: &[MarkRecord],
    mark: MarkColumn,
    path: &Path,
    size: (u32, u32),
) -> ExportResult<()> {
    require_fonts()?;
    draw_paper_examiner(records, mark, path, size).map_err(chart_error)
}

fn draw_paper_examiner(records: &[MarkRecord], mark: MarkColumn, path: &Path, size: (u32, u32)) -> DrawResult {
    let papers = papers_by_count(records);
    if papers.is_empty() {
        return Ok(());
    }

    let values: Vec<f64> = records.iter().filter_map(|r| r.mark(mark)).collect();
    let (lo, hi) = mark_axis(&values);

    let rows = papers.len().div_ceil(GRID_COLUMNS);
    let root = BitMapBackend::new(path, (size.0, size.1 * rows as u32 / 2 + size.1 / 2)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((rows, GRID_COLUMNS));

    for ((paper, count), panel) in papers.iter().zip(panels.iter()) {
        let in_paper: Vec<&MarkRecord> = records.iter().filter(|r| &r.paper == paper).collect();
        let mut examiners: Vec<String> = in_paper.iter().map(|r| r.examiner.clone()).collect();
        examiners.sort();
        examiners.dedup();

        let mut chart = ChartBuilder::on(panel)
            .caption(format!("{} (N={})", paper, count), (FONT, 16))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(100)
            .build_cartesian_2d(lo..hi, examiners[..].into_segmented())?;

        chart.configure_mesh().x_desc(mark.label()).draw()?;

        for (i, examiner) in examiners.iter().enumerate() {
            let color = Palette99::pick(i).mix(0.6);
            chart.draw_series(
                in_paper
                    .iter()
                    .filter(|r| &r.examiner == examiner)
                    .filter_map(|r| r.mark(mark))
                    .map(|v| Circle::new((v, SegmentValue::CenterOf(examiner)), 4, color.filled())),
            )?;
        }
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_axis_minimum_range() {
        assert_eq!(mark_axis(&[55.0, 70.0]), (40.0, 85.0));
        assert_eq!(mark_axis(&[31.5, 92.2]), (31.0, 93.0));
        assert_eq!(mark_axis(&[]), (40.0, 85.0));
    }

    #[cfg(not(feature = "fonts"))]
    #[test]
    fn test_charts_refused_without_fonts() {
        let dir = tempfile::tempdir().unwrap();
        let result = difference_histogram(&[], &dir.path().join("d.png"), (400, 300));
        assert!(matches!(result, Err(ExportError::Chart(_))));
        assert!(!dir.path().join("d.png").exists());
    }

    #[test]
    fn test_tier_colors_distinct() {
        let colors: Vec<(u8, u8, u8)> = Significance::ALL
            .iter()
            .map(|s| {
                let c = tier_color(*s);
                (c.0, c.1, c.2)
            })
            .collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
