use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// File layout shared by all three pipeline stages. Each stage reads the
/// previous stage's output from these fixed locations.
#[derive(Debug, Clone)]
pub struct Config {
    pub inspections_file: PathBuf,
    pub citations_file: PathBuf,
    pub published_file: PathBuf,
    pub merged_file: PathBuf,
    pub classified_file: PathBuf,
    pub report_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
        let results_dir =
            PathBuf::from(env::var("RESULTS_DIR").unwrap_or_else(|_| "results".to_string()));

        Self {
            inspections_file: data_dir.join("inspections_details.csv"),
            citations_file: data_dir.join("inspections_citations_details.csv"),
            published_file: data_dir.join("published_483s.csv"),
            merged_file: results_dir.join("merged_483_drug_bio_data.csv"),
            classified_file: results_dir.join("classified_483_drug_bio_data.csv"),
            report_dir: results_dir.join("final_483_report"),
        }
    }
}

/// Settings for the classification stage. Construction fails fast when the
/// service credential is absent, before any file I/O happens.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub api_key: String,
    pub model: String,
    pub concurrency_limit: usize,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl ClassifierConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| Error::Config("GEMINI_API_KEY environment variable not set".to_string()))?;

        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());

        let concurrency_limit = env::var("CONCURRENCY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8);

        let max_retries = env::var("MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        Ok(Self {
            api_key,
            model,
            concurrency_limit,
            max_retries,
            retry_base_delay: Duration::from_millis(500),
        })
    }
}

/// The subset of classifier settings the runner itself needs; the credential
/// stays with the provider.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub concurrency_limit: usize,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            concurrency_limit: 8,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl From<&ClassifierConfig> for RunnerOptions {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            concurrency_limit: config.concurrency_limit,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        }
    }
}
