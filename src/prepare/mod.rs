//! Stage 1: load the raw inspection, citation, and published-483 tables,
//! join and filter them down to drug/biologic observations, and write the
//! merged dataset the classifier consumes.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;

use crate::config::Config;
use crate::dataset::{self, Table};
use crate::error::Result;
use crate::models::{CitationRow, InspectionRow, MergedRecord, PublishedRow};

/// Product types kept in the merged dataset. Matching is a case-insensitive
/// substring test, so "Drugs" and "Biologics/Drugs" both qualify.
pub const PRODUCT_TYPE_ALLOW_LIST: [&str; 2] = ["drug", "biologic"];

#[derive(Debug, Default, Clone)]
pub struct PrepareSummary {
    pub inspections_loaded: usize,
    pub citations_loaded: usize,
    pub observations_written: usize,
    pub dropped_unmatched_join: usize,
    pub dropped_product_type: usize,
    pub dropped_missing_date: usize,
    pub dropped_duplicates: usize,
}

pub fn run(config: &Config) -> Result<PrepareSummary> {
    tracing::info!("Starting data preparation (drugs and biologics only)");

    let inspections = load_inspections(&config.inspections_file)?;
    let citations = load_citations(&config.citations_file)?;
    let published = load_published(&config.published_file)?;

    let (records, mut summary) = merge(&inspections, &citations, &published);
    summary.inspections_loaded = inspections.len();
    summary.citations_loaded = citations.len();

    dataset::write_merged(&config.merged_file, &records)?;
    tracing::info!(
        "Merged dataset written to {} ({} observations)",
        config.merged_file.display(),
        records.len()
    );

    Ok(summary)
}

pub fn load_inspections(path: &Path) -> Result<Vec<InspectionRow>> {
    let table = Table::read(path)?;
    let id_col = table.column("inspection_id")?;
    let fei_col = table.column("fei_number")?;
    let name_col = table.column("legal_name")?;
    let product_col = table.column("product_type")?;
    let date_col = table.column("inspection_end_date")?;
    let class_col = table.column("classification").ok();

    let mut rows = Vec::with_capacity(table.rows().len());
    for record in table.rows() {
        let id = table.cell(record, id_col);
        let Ok(inspection_id) = id.parse::<i64>() else {
            tracing::warn!("Skipping inspection row with invalid id '{}'", id);
            continue;
        };

        rows.push(InspectionRow {
            inspection_id,
            fei_number: table.cell(record, fei_col).to_string(),
            legal_name: normalize_whitespace(table.cell(record, name_col)),
            product_type: table.cell(record, product_col).to_string(),
            classification: class_col
                .map(|c| table.cell(record, c).to_string())
                .unwrap_or_default(),
            inspection_end_date: parse_source_date(table.cell(record, date_col)),
        });
    }
    Ok(rows)
}

pub fn load_citations(path: &Path) -> Result<Vec<CitationRow>> {
    let table = Table::read(path)?;
    let id_col = table.column("inspection_id")?;
    let area_col = table.column("program_area")?;
    let short_col = table.column("short_description")?;
    let long_col = table.column("long_description")?;

    let mut rows = Vec::with_capacity(table.rows().len());
    for record in table.rows() {
        let id = table.cell(record, id_col);
        let Ok(inspection_id) = id.parse::<i64>() else {
            tracing::warn!("Skipping citation row with invalid id '{}'", id);
            continue;
        };

        rows.push(CitationRow {
            inspection_id,
            program_area: normalize_whitespace(table.cell(record, area_col)),
            short_description: normalize_whitespace(table.cell(record, short_col)),
            long_description: normalize_whitespace(table.cell(record, long_col)),
        });
    }
    Ok(rows)
}

pub fn load_published(path: &Path) -> Result<Vec<PublishedRow>> {
    let table = Table::read(path)?;
    let fei_col = table.column("fei_number")?;
    let url_col = table.column("download")?;

    Ok(table
        .rows()
        .iter()
        .map(|record| PublishedRow {
            fei_number: table.cell(record, fei_col).to_string(),
            url: table.cell(record, url_col).to_string(),
        })
        .collect())
}

/// Inner-joins citations to inspections on inspection id, filters to the
/// drug/biologic allow-list, enriches with published-483 URLs by FEI number,
/// and drops duplicate or undateable observations. Pure so the join and
/// filter rules are testable without touching the filesystem.
pub fn merge(
    inspections: &[InspectionRow],
    citations: &[CitationRow],
    published: &[PublishedRow],
) -> (Vec<MergedRecord>, PrepareSummary) {
    let mut summary = PrepareSummary::default();

    let by_id: HashMap<i64, &InspectionRow> = inspections
        .iter()
        .map(|i| (i.inspection_id, i))
        .collect();

    // First URL wins per facility, mirroring a drop-duplicates on the key.
    let mut urls: HashMap<&str, &str> = HashMap::new();
    for row in published {
        if !row.fei_number.is_empty() && !row.url.is_empty() {
            urls.entry(row.fei_number.as_str()).or_insert(row.url.as_str());
        }
    }

    let mut seen: HashSet<(i64, String)> = HashSet::new();
    let mut records = Vec::new();

    for citation in citations {
        let Some(inspection) = by_id.get(&citation.inspection_id) else {
            summary.dropped_unmatched_join += 1;
            continue;
        };

        if !is_drug_or_biologic(&inspection.product_type) {
            summary.dropped_product_type += 1;
            continue;
        }

        let Some(end_date) = inspection.inspection_end_date else {
            summary.dropped_missing_date += 1;
            continue;
        };

        let dedup_key = (
            citation.inspection_id,
            format!(
                "{}\u{1f}{}\u{1f}{}",
                citation.program_area, citation.short_description, citation.long_description
            ),
        );
        if !seen.insert(dedup_key) {
            summary.dropped_duplicates += 1;
            continue;
        }

        records.push(MergedRecord {
            inspection_id: citation.inspection_id,
            fei_number: inspection.fei_number.clone(),
            legal_name: inspection.legal_name.clone(),
            product_type: inspection.product_type.clone(),
            classification: inspection.classification.clone(),
            inspection_end_date: end_date,
            program_area: citation.program_area.clone(),
            short_description: citation.short_description.clone(),
            long_description: citation.long_description.clone(),
            published_483_url: urls
                .get(inspection.fei_number.as_str())
                .map(|u| u.to_string())
                .unwrap_or_default(),
        });
    }

    summary.observations_written = records.len();
    (records, summary)
}

pub fn is_drug_or_biologic(product_type: &str) -> bool {
    let lower = product_type.to_lowercase();
    PRODUCT_TYPE_ALLOW_LIST
        .iter()
        .any(|allowed| lower.contains(allowed))
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Source spreadsheets carry dates in a handful of shapes; anything else is
/// unparseable and the row gets dropped during merge.
fn parse_source_date(value: &str) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y", "%m/%d/%y"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inspection(id: i64, product_type: &str, date: Option<&str>) -> InspectionRow {
        InspectionRow {
            inspection_id: id,
            fei_number: format!("30000{}", id),
            legal_name: format!("Firm {}", id),
            product_type: product_type.to_string(),
            classification: "VAI".to_string(),
            inspection_end_date: date.and_then(parse_source_date),
        }
    }

    fn citation(id: i64, text: &str) -> CitationRow {
        CitationRow {
            inspection_id: id,
            program_area: "Drug Quality Assurance".to_string(),
            short_description: "Observation".to_string(),
            long_description: text.to_string(),
        }
    }

    #[test]
    fn only_allow_listed_product_types_survive() {
        let inspections = vec![
            inspection(1, "Drugs", Some("2021-06-01")),
            inspection(2, "Devices", Some("2021-06-02")),
            inspection(3, "Biologics", Some("2021-06-03")),
        ];
        let citations = vec![
            citation(1, "obs one"),
            citation(2, "obs two"),
            citation(3, "obs three"),
        ];

        let (records, summary) = merge(&inspections, &citations, &[]);

        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| is_drug_or_biologic(&r.product_type)));
        assert_eq!(summary.dropped_product_type, 1);
    }

    #[test]
    fn unmatched_citations_are_dropped_not_fatal() {
        let inspections = vec![inspection(1, "Drugs", Some("2021-06-01"))];
        let citations = vec![citation(1, "kept"), citation(99, "orphan")];

        let (records, summary) = merge(&inspections, &citations, &[]);

        assert_eq!(records.len(), 1);
        assert_eq!(summary.dropped_unmatched_join, 1);
    }

    #[test]
    fn rows_without_parseable_dates_are_dropped() {
        let inspections = vec![
            inspection(1, "Drugs", Some("2021-06-01")),
            inspection(2, "Drugs", Some("not a date")),
        ];
        let citations = vec![citation(1, "kept"), citation(2, "dropped")];

        let (records, summary) = merge(&inspections, &citations, &[]);

        assert_eq!(records.len(), 1);
        assert_eq!(summary.dropped_missing_date, 1);
    }

    #[test]
    fn exact_duplicate_observations_are_dropped() {
        let inspections = vec![inspection(1, "Drugs", Some("2021-06-01"))];
        let citations = vec![citation(1, "same text"), citation(1, "same text")];

        let (records, summary) = merge(&inspections, &citations, &[]);

        assert_eq!(records.len(), 1);
        assert_eq!(summary.dropped_duplicates, 1);
    }

    #[test]
    fn published_urls_join_by_fei_number() {
        let inspections = vec![inspection(1, "Drugs", Some("2021-06-01"))];
        let citations = vec![citation(1, "obs")];
        let published = vec![
            PublishedRow {
                fei_number: "300001".to_string(),
                url: "https://example.test/483.pdf".to_string(),
            },
            // Duplicate key: first URL wins.
            PublishedRow {
                fei_number: "300001".to_string(),
                url: "https://example.test/other.pdf".to_string(),
            },
        ];

        let (records, _) = merge(&inspections, &citations, &published);

        assert_eq!(records[0].published_483_url, "https://example.test/483.pdf");
    }

    #[test]
    fn whitespace_is_normalized() {
        assert_eq!(
            normalize_whitespace("  failure\tto   follow\nprocedures "),
            "failure to follow procedures"
        );
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn source_dates_accept_common_formats() {
        assert_eq!(
            parse_source_date("2021-06-01"),
            NaiveDate::from_ymd_opt(2021, 6, 1)
        );
        assert_eq!(
            parse_source_date("06/01/2021"),
            NaiveDate::from_ymd_opt(2021, 6, 1)
        );
        assert_eq!(parse_source_date("June 2021"), None);
    }
}
