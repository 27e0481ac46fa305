use std::path::Path;

use plotters::prelude::*;

use crate::error::{Error, Result};
use crate::report::aggregate::Aggregates;
use crate::taxonomy::Category;

fn render_err(e: impl std::fmt::Display) -> Error {
    Error::Render(e.to_string())
}

/// Horizontal bar chart of observation counts per category, most frequent at
/// the top, annotated with the share of observations carrying text.
pub fn render_category_summary(agg: &Aggregates, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let n = agg.frequency.len();
    let max_count = agg.frequency.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let x_max = (max_count as f64 * 1.35).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Frequency of 483 Deficiency Categories",
            ("sans-serif", 30),
        )
        .margin(20)
        .x_label_area_size(40)
        .build_cartesian_2d(0f64..x_max, 0f64..n as f64)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .disable_y_axis()
        .x_desc(format!(
            "Observations (n={} with text)",
            agg.observations_with_text
        ))
        .draw()
        .map_err(render_err)?;

    // Most frequent category on top.
    for (rank, (category, count)) in agg.frequency.iter().enumerate() {
        let y = (n - 1 - rank) as f64;
        let color = Palette99::pick(rank).filled();

        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(0.0, y + 0.15), (*count as f64, y + 0.85)],
                color,
            )))
            .map_err(render_err)?;

        let percentage = if agg.observations_with_text > 0 {
            *count as f64 * 100.0 / agg.observations_with_text as f64
        } else {
            0.0
        };
        chart
            .draw_series(std::iter::once(Text::new(
                format!("{} — {:.1}% (n={})", category.label(), percentage, count),
                (*count as f64 + x_max * 0.01, y + 0.4),
                ("sans-serif", 16),
            )))
            .map_err(render_err)?;
    }

    root.present().map_err(render_err)?;
    tracing::info!("Saved category summary chart to {}", path.display());
    Ok(())
}

/// Category-by-category co-occurrence heatmap. Cell intensity scales with
/// the count; the diagonal stays blank.
pub fn render_co_occurrence_heatmap(agg: &Aggregates, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (1000, 800)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let n = Category::ALL.len() as i32;
    let max = agg.co_occurrence.max().max(1) as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Co-occurrence of 483 Deficiency Categories",
            ("sans-serif", 30),
        )
        .margin(20)
        .x_label_area_size(160)
        .y_label_area_size(160)
        .build_cartesian_2d(0i32..n, 0i32..n)
        .map_err(render_err)?;

    let short_label = |idx: &i32| -> String {
        Category::ALL
            .get(*idx as usize)
            .map(|c| truncate_label(c.label(), 24))
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n as usize)
        .y_labels(n as usize)
        .x_label_formatter(&short_label)
        .y_label_formatter(&short_label)
        .label_style(("sans-serif", 12))
        .draw()
        .map_err(render_err)?;

    for (i, a) in Category::ALL.iter().enumerate() {
        for (j, b) in Category::ALL.iter().enumerate() {
            let count = agg.co_occurrence.get(*a, *b);
            let intensity = count as f64 / max;
            let color = RGBColor(
                (255.0 - 205.0 * intensity) as u8,
                (255.0 - 155.0 * intensity) as u8,
                255,
            );

            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(i as i32, j as i32), (i as i32 + 1, j as i32 + 1)],
                    color.filled(),
                )))
                .map_err(render_err)?;

            if count > 0 {
                chart
                    .draw_series(std::iter::once(Text::new(
                        count.to_string(),
                        (i as i32, j as i32),
                        ("sans-serif", 14),
                    )))
                    .map_err(render_err)?;
            }
        }
    }

    root.present().map_err(render_err)?;
    tracing::info!("Saved co-occurrence heatmap to {}", path.display());
    Ok(())
}

/// One line per category of observation counts by inspection year.
pub fn render_trends(agg: &Aggregates, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (1400, 800)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let years: Vec<i32> = agg.yearly.keys().copied().collect();
    let (min_year, max_year) = match (years.first(), years.last()) {
        (Some(&min), Some(&max)) => (min, max),
        _ => return Err(Error::Render("No dated observations to plot".to_string())),
    };
    let y_max = agg
        .yearly
        .values()
        .flat_map(|counts| counts.iter())
        .copied()
        .max()
        .unwrap_or(0)
        .max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption("483 Deficiency Trends Over Time", ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(min_year..max_year + 1, 0usize..y_max + 1)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("Year of Inspection")
        .y_desc("Number of Deficiencies Cited")
        .draw()
        .map_err(render_err)?;

    for (i, category) in Category::ALL.iter().enumerate() {
        let color = Palette99::pick(i).stroke_width(2);
        let points: Vec<(i32, usize)> = agg
            .yearly
            .iter()
            .map(|(year, counts)| (*year, counts[i]))
            .collect();

        chart
            .draw_series(LineSeries::new(points, color.clone()))
            .map_err(render_err)?
            .label(truncate_label(category.label(), 32))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.clone()));
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .label_font(("sans-serif", 14))
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    tracing::info!("Saved trend chart to {}", path.display());
    Ok(())
}

fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let truncated: String = label.chars().take(max_chars - 1).collect();
        format!("{}…", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_truncate_cleanly() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(
            truncate_label("Procedures Not in Writing / Not Followed", 12),
            "Procedures …"
        );
    }
}
