//! Stage 3: aggregate the classified dataset and render the report charts.
//! Each chart renders independently; one chart failing never stops the
//! others, and failures are collected into the run summary.

pub mod aggregate;
pub mod charts;

use std::path::PathBuf;

use crate::config::Config;
use crate::dataset;
use crate::error::Result;

pub use aggregate::{compute, Aggregates, CoOccurrence};

pub const SUMMARY_CHART: &str = "483_category_summary.png";
pub const HEATMAP_CHART: &str = "483_co_occurrence_heatmap.png";
pub const TRENDS_CHART: &str = "483_deficiency_trends.png";

#[derive(Debug, Default)]
pub struct ReportSummary {
    pub total_observations: usize,
    pub rendered: Vec<PathBuf>,
    /// Chart name and the error that prevented rendering it.
    pub failures: Vec<(String, String)>,
}

pub fn run(config: &Config) -> Result<ReportSummary> {
    tracing::info!("Generating 483 analysis report");

    let records = dataset::read_classified(&config.classified_file)?;
    std::fs::create_dir_all(&config.report_dir)?;

    let agg = aggregate::compute(&records);
    let mut summary = ReportSummary {
        total_observations: agg.total_observations,
        ..Default::default()
    };

    type RenderFn = fn(&Aggregates, &std::path::Path) -> Result<()>;
    let charts: [(&str, RenderFn); 3] = [
        (SUMMARY_CHART, charts::render_category_summary),
        (HEATMAP_CHART, charts::render_co_occurrence_heatmap),
        (TRENDS_CHART, charts::render_trends),
    ];

    for (name, render) in &charts {
        let path = config.report_dir.join(name);
        match render(&agg, &path) {
            Ok(()) => summary.rendered.push(path),
            Err(e) => {
                tracing::error!("Failed to render {}: {}", name, e);
                summary.failures.push((name.to_string(), e.to_string()));
            }
        }
    }

    tracing::info!(
        "Report generation finished: {} chart(s) rendered, {} failed",
        summary.rendered.len(),
        summary.failures.len()
    );
    Ok(summary)
}
