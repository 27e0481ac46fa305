//! CSV table plumbing shared by all stages: header-normalized reads with
//! required-column resolution, and atomic writes so an interrupted run never
//! leaves a truncated output file at the final path.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::error::{Error, Result};
use crate::models::{ClassifiedRecord, MergedRecord};
use crate::taxonomy::{Category, CategorySet};

/// A loaded tabular source. Headers are normalized to lowercase snake_case
/// on read so the heterogeneous source spreadsheets resolve consistently.
#[derive(Debug)]
pub struct Table {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl Table {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Input file not found: {}",
                path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| {
                Error::Config(format!("Could not read {}: {}", path.display(), e))
            })?;

        let headers = reader
            .headers()
            .map_err(|e| Error::Config(format!("Could not read {}: {}", path.display(), e)))?
            .iter()
            .map(normalize_header)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?);
        }

        tracing::debug!("Loaded {} rows from {}", rows.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    /// Index of a required column. A missing column is a fatal shape error;
    /// the pipeline cannot proceed safely without it.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| {
                Error::DataShape(format!(
                    "Required column '{}' missing from {}",
                    name,
                    self.path.display()
                ))
            })
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    /// Cell value at `idx`, trimmed; short rows yield the empty string.
    pub fn cell<'a>(&self, record: &'a StringRecord, idx: usize) -> &'a str {
        record.get(idx).unwrap_or("").trim()
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Writes a CSV file via a temp sibling and a final rename. If the process
/// is interrupted before `commit`, the temp file is cleaned up on drop and
/// the final path is left untouched.
pub struct AtomicCsvWriter {
    tmp_path: PathBuf,
    final_path: PathBuf,
    writer: Option<csv::Writer<File>>,
}

impl AtomicCsvWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut tmp_path = path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let writer = csv::Writer::from_path(&tmp_path)?;
        Ok(Self {
            tmp_path,
            final_path: path.to_path_buf(),
            writer: Some(writer),
        })
    }

    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .as_mut()
            .expect("writer already committed")
            .write_record(record)?;
        Ok(())
    }

    pub fn commit(mut self) -> Result<()> {
        let mut writer = self.writer.take().expect("writer already committed");
        writer.flush()?;
        drop(writer);
        std::fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(())
    }
}

impl Drop for AtomicCsvWriter {
    fn drop(&mut self) {
        if self.writer.is_some() {
            // Uncommitted: discard the partial temp file.
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column order of the merged dataset. Fixed so re-runs on unchanged inputs
/// produce byte-identical output.
pub const MERGED_COLUMNS: [&str; 10] = [
    "inspection_id",
    "fei_number",
    "legal_name",
    "product_type",
    "classification",
    "inspection_end_date",
    "program_area",
    "short_description",
    "long_description",
    "published_483_url",
];

pub fn write_merged(path: &Path, records: &[MergedRecord]) -> Result<()> {
    let mut writer = AtomicCsvWriter::create(path)?;
    writer.write_record(MERGED_COLUMNS)?;
    for r in records {
        writer.write_record([
            r.inspection_id.to_string(),
            r.fei_number.clone(),
            r.legal_name.clone(),
            r.product_type.clone(),
            r.classification.clone(),
            r.inspection_end_date.format(DATE_FORMAT).to_string(),
            r.program_area.clone(),
            r.short_description.clone(),
            r.long_description.clone(),
            r.published_483_url.clone(),
        ])?;
    }
    writer.commit()
}

pub fn read_merged(path: &Path) -> Result<Vec<MergedRecord>> {
    let table = Table::read(path)?;
    let cols: Vec<usize> = MERGED_COLUMNS
        .iter()
        .map(|name| table.column(name))
        .collect::<Result<_>>()?;

    let mut records = Vec::with_capacity(table.rows().len());
    for row in table.rows() {
        records.push(MergedRecord {
            inspection_id: parse_cell(table.cell(row, cols[0]), "inspection_id")?,
            fei_number: table.cell(row, cols[1]).to_string(),
            legal_name: table.cell(row, cols[2]).to_string(),
            product_type: table.cell(row, cols[3]).to_string(),
            classification: table.cell(row, cols[4]).to_string(),
            inspection_end_date: parse_date_cell(table.cell(row, cols[5]))?,
            program_area: table.cell(row, cols[6]).to_string(),
            short_description: table.cell(row, cols[7]).to_string(),
            long_description: row.get(cols[8]).unwrap_or("").to_string(),
            published_483_url: table.cell(row, cols[9]).to_string(),
        });
    }
    Ok(records)
}

pub fn write_classified(path: &Path, records: &[ClassifiedRecord]) -> Result<()> {
    let mut writer = AtomicCsvWriter::create(path)?;

    let mut header: Vec<String> = MERGED_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(Category::ALL.iter().map(|c| c.label().to_string()));
    header.push("unclassified".to_string());
    header.push("classification_error".to_string());
    writer.write_record(&header)?;

    for cr in records {
        let r = &cr.record;
        let mut row = vec![
            r.inspection_id.to_string(),
            r.fei_number.clone(),
            r.legal_name.clone(),
            r.product_type.clone(),
            r.classification.clone(),
            r.inspection_end_date.format(DATE_FORMAT).to_string(),
            r.program_area.clone(),
            r.short_description.clone(),
            r.long_description.clone(),
            r.published_483_url.clone(),
        ];
        for category in Category::ALL {
            row.push(cr.categories.contains(category).to_string());
        }
        row.push(cr.is_unclassified().to_string());
        row.push(cr.error.clone().unwrap_or_default());
        writer.write_record(&row)?;
    }
    writer.commit()
}

pub fn read_classified(path: &Path) -> Result<Vec<ClassifiedRecord>> {
    let table = Table::read(path)?;
    let merged_cols: Vec<usize> = MERGED_COLUMNS
        .iter()
        .map(|name| table.column(name))
        .collect::<Result<_>>()?;
    // Category labels keep their original casing in the header; the
    // normalizer only touches case and spaces, so resolve them normalized.
    let category_cols: Vec<usize> = Category::ALL
        .iter()
        .map(|c| table.column(&normalize_header(c.label())))
        .collect::<Result<_>>()?;
    let error_col = table.column("classification_error")?;

    let mut records = Vec::with_capacity(table.rows().len());
    for row in table.rows() {
        let record = MergedRecord {
            inspection_id: parse_cell(table.cell(row, merged_cols[0]), "inspection_id")?,
            fei_number: table.cell(row, merged_cols[1]).to_string(),
            legal_name: table.cell(row, merged_cols[2]).to_string(),
            product_type: table.cell(row, merged_cols[3]).to_string(),
            classification: table.cell(row, merged_cols[4]).to_string(),
            inspection_end_date: parse_date_cell(table.cell(row, merged_cols[5]))?,
            program_area: table.cell(row, merged_cols[6]).to_string(),
            short_description: table.cell(row, merged_cols[7]).to_string(),
            long_description: row.get(merged_cols[8]).unwrap_or("").to_string(),
            published_483_url: table.cell(row, merged_cols[9]).to_string(),
        };

        let mut categories = CategorySet::new();
        for (category, &idx) in Category::ALL.iter().zip(&category_cols) {
            if table.cell(row, idx).eq_ignore_ascii_case("true") {
                categories.insert(*category);
            }
        }

        let error = table.cell(row, error_col);
        let error = (!error.is_empty()).then(|| error.to_string());
        records.push(ClassifiedRecord {
            record,
            categories,
            error,
        });
    }
    Ok(records)
}

fn parse_cell<T: std::str::FromStr>(value: &str, column: &str) -> Result<T> {
    value.parse().map_err(|_| {
        Error::DataShape(format!("Invalid value '{}' in column '{}'", value, column))
    })
}

fn parse_date_cell(value: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        Error::DataShape(format!(
            "Invalid date '{}' in column 'inspection_end_date'",
            value
        ))
    })
}
