use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};

use crate::classify::prompts::ClassificationRequest;
use crate::classify::provider::ClassifierProvider;
use crate::config::RunnerOptions;
use crate::dataset;
use crate::error::{Error, Result};
use crate::models::{ClassifiedRecord, MergedRecord};
use crate::taxonomy::Category;

/// Sentinel reason recorded when an observation has no text to classify.
/// These rows never reach the external service.
pub const EMPTY_TEXT_REASON: &str = "No text to analyze";

#[derive(Debug, Clone)]
pub struct ClassifySummary {
    pub total: usize,
    pub classified: usize,
    pub empty_text: usize,
    pub failed: usize,
    pub category_counts: Vec<(Category, usize)>,
}

/// Drives per-observation classification: empty-text short-circuit, bounded
/// retries with backoff, bounded-concurrency fan-out, and an atomic write of
/// the classified dataset. A single observation's failure marks that row
/// with the sentinel and the batch continues.
pub struct Classifier {
    provider: Arc<dyn ClassifierProvider>,
    options: RunnerOptions,
}

impl Classifier {
    pub fn new(provider: impl ClassifierProvider + 'static, options: RunnerOptions) -> Self {
        Self {
            provider: Arc::new(provider),
            options,
        }
    }

    pub async fn run(&self, input: &Path, output: &Path) -> Result<ClassifySummary> {
        let records = dataset::read_merged(input)?;
        tracing::info!(
            "Loaded {} observations from {} for classification via {}",
            records.len(),
            input.display(),
            self.provider.name()
        );

        let classified = self.classify_records(records).await;
        let summary = summarize(&classified);

        // Every call that reached the service failed: treat as systemic
        // rather than writing a dataset that is all sentinel rows.
        if summary.failed > 0 && summary.classified == 0 {
            return Err(Error::ExternalService(format!(
                "All {} classification calls failed; refusing to write output",
                summary.failed
            )));
        }

        dataset::write_classified(output, &classified)?;
        tracing::info!(
            "Classified dataset written to {} ({} classified, {} empty, {} failed)",
            output.display(),
            summary.classified,
            summary.empty_text,
            summary.failed
        );
        Ok(summary)
    }

    /// Classifies each record independently under a concurrency bound.
    /// Results are keyed by row index, so output order always matches input
    /// order no matter which calls finish first.
    pub async fn classify_records(&self, records: Vec<MergedRecord>) -> Vec<ClassifiedRecord> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency_limit.max(1)));

        let pb = ProgressBar::new(records.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} observations",
                )
                .unwrap()
                .progress_chars("#>-"),
        );

        let futures = records.into_iter().enumerate().map(|(idx, record)| {
            let sem = semaphore.clone();
            let pb = pb.clone();
            async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                let result = self.classify_one(record).await;
                pb.inc(1);
                (idx, result)
            }
        });

        let mut results: Vec<(usize, ClassifiedRecord)> = join_all(futures).await;
        pb.finish_and_clear();

        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, record)| record).collect()
    }

    async fn classify_one(&self, record: MergedRecord) -> ClassifiedRecord {
        if record.long_description.trim().is_empty() {
            return ClassifiedRecord::unclassified(record, EMPTY_TEXT_REASON);
        }

        let request =
            ClassificationRequest::new(record.inspection_id, record.long_description.clone());

        let mut attempt: u32 = 0;
        loop {
            match self.provider.classify(&request).await {
                Ok(categories) => return ClassifiedRecord::classified(record, categories),
                Err(e) if e.is_retryable() && attempt < self.options.max_retries => {
                    attempt += 1;
                    let delay = match &e {
                        Error::RateLimited(secs) => Duration::from_secs(*secs),
                        _ => self.options.retry_base_delay * 2u32.pow(attempt - 1),
                    };
                    tracing::warn!(
                        "Classification attempt {} failed for inspection {}: {}. Retrying in {:?}",
                        attempt,
                        record.inspection_id,
                        e,
                        delay
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    tracing::warn!(
                        "Giving up on inspection {} after {} attempt(s): {}",
                        record.inspection_id,
                        attempt + 1,
                        e
                    );
                    return ClassifiedRecord::unclassified(record, e.to_string());
                }
            }
        }
    }
}

fn summarize(records: &[ClassifiedRecord]) -> ClassifySummary {
    let empty_text = records
        .iter()
        .filter(|r| r.error.as_deref() == Some(EMPTY_TEXT_REASON))
        .count();
    let failed = records
        .iter()
        .filter(|r| r.is_unclassified())
        .count()
        - empty_text;

    let category_counts = Category::ALL
        .iter()
        .map(|&category| {
            let count = records
                .iter()
                .filter(|r| r.categories.contains(category))
                .count();
            (category, count)
        })
        .collect();

    ClassifySummary {
        total: records.len(),
        classified: records.len() - empty_text - failed,
        empty_text,
        failed,
        category_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::taxonomy::CategorySet;

    fn record(id: i64, text: &str) -> MergedRecord {
        MergedRecord {
            inspection_id: id,
            fei_number: format!("30000{}", id),
            legal_name: "Acme Pharma".to_string(),
            product_type: "Drugs".to_string(),
            classification: "OAI".to_string(),
            inspection_end_date: NaiveDate::from_ymd_opt(2022, 1, 10).unwrap(),
            program_area: "Drug Quality Assurance".to_string(),
            short_description: "Observation".to_string(),
            long_description: text.to_string(),
            published_483_url: String::new(),
        }
    }

    fn validation_set() -> CategorySet {
        let mut set = CategorySet::new();
        set.insert(Category::LackOfValidation);
        set
    }

    fn fast_options() -> RunnerOptions {
        RunnerOptions {
            concurrency_limit: 4,
            max_retries: 2,
            retry_base_delay: Duration::from_millis(1),
        }
    }

    /// Scripted provider: fails the first `failures` calls for each
    /// inspection, then answers with the configured set.
    struct StubProvider {
        failures: u32,
        answer: CategorySet,
        calls: Arc<AtomicUsize>,
        seen: Mutex<HashMap<i64, u32>>,
    }

    impl StubProvider {
        fn new(failures: u32, answer: CategorySet) -> Self {
            Self {
                failures,
                answer,
                calls: Arc::new(AtomicUsize::new(0)),
                seen: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl ClassifierProvider for StubProvider {
        async fn classify(&self, request: &ClassificationRequest) -> crate::error::Result<CategorySet> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut seen = self.seen.lock().unwrap();
            let attempts = seen.entry(request.inspection_id).or_insert(0);
            *attempts += 1;
            if *attempts <= self.failures {
                Err(Error::ExternalService("simulated outage".to_string()))
            } else {
                Ok(self.answer)
            }
        }

        fn name(&self) -> &str {
            "Stub"
        }
    }

    #[tokio::test]
    async fn empty_text_never_reaches_the_provider() {
        let provider = StubProvider::new(0, validation_set());
        let calls = provider.calls.clone();
        let classifier = Classifier::new(provider, fast_options());

        let results = classifier
            .classify_records(vec![record(1, ""), record(2, "   ")])
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_unclassified()));
        assert!(results
            .iter()
            .all(|r| r.error.as_deref() == Some(EMPTY_TEXT_REASON)));
        // The stub was never invoked.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_to_success() {
        // Fails twice, succeeds on the third call; max_retries = 2 allows it.
        let provider = StubProvider::new(2, validation_set());
        let classifier = Classifier::new(provider, fast_options());

        let results = classifier
            .classify_records(vec![record(1, "failure to validate cleaning procedures")])
            .await;

        assert!(!results[0].is_unclassified());
        assert!(results[0].categories.contains(Category::LackOfValidation));
    }

    #[tokio::test]
    async fn exhausted_retries_mark_the_sentinel_and_continue() {
        // Fails more times than the retry budget for every row.
        let provider = StubProvider::new(10, validation_set());
        let classifier = Classifier::new(provider, fast_options());

        let results = classifier
            .classify_records(vec![record(1, "first"), record(2, "second")])
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_unclassified()));
        assert!(results.iter().all(|r| r.categories.is_empty()));
    }

    #[tokio::test]
    async fn output_order_matches_input_order() {
        struct SlowFirst;

        #[async_trait]
        impl ClassifierProvider for SlowFirst {
            async fn classify(
                &self,
                request: &ClassificationRequest,
            ) -> crate::error::Result<CategorySet> {
                if request.inspection_id == 1 {
                    sleep(Duration::from_millis(50)).await;
                }
                Ok(CategorySet::new())
            }

            fn name(&self) -> &str {
                "SlowFirst"
            }
        }

        let classifier = Classifier::new(SlowFirst, fast_options());
        let results = classifier
            .classify_records(vec![record(1, "slow row"), record(2, "fast row")])
            .await;

        let ids: Vec<i64> = results.iter().map(|r| r.record.inspection_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn systemic_failure_aborts_the_run_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("merged.csv");
        let output = dir.path().join("classified.csv");
        dataset::write_merged(&input, &[record(1, "some text"), record(2, "more text")]).unwrap();

        let provider = StubProvider::new(10, validation_set());
        let classifier = Classifier::new(provider, fast_options());

        let err = classifier.run(&input, &output).await.unwrap_err();
        assert!(matches!(err, Error::ExternalService(_)));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn run_writes_summary_counts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("merged.csv");
        let output = dir.path().join("classified.csv");
        dataset::write_merged(
            &input,
            &[record(1, "failure to validate cleaning procedures"), record(2, "")],
        )
        .unwrap();

        let provider = StubProvider::new(0, validation_set());
        let classifier = Classifier::new(provider, fast_options());

        let summary = classifier.run(&input, &output).await.unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.classified, 1);
        assert_eq!(summary.empty_text, 1);
        assert_eq!(summary.failed, 0);

        let validation_count = summary
            .category_counts
            .iter()
            .find(|(c, _)| *c == Category::LackOfValidation)
            .map(|(_, n)| *n)
            .unwrap();
        assert_eq!(validation_count, 1);
        assert!(output.exists());
    }
}
