use chrono::NaiveDate;

use crate::taxonomy::CategorySet;

/// One observation of the merged dataset: a citation enriched with its
/// inspection's attributes. This is the unit the classifier operates on.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub inspection_id: i64,
    pub fei_number: String,
    pub legal_name: String,
    pub product_type: String,
    pub classification: String,
    pub inspection_end_date: NaiveDate,
    pub program_area: String,
    pub short_description: String,
    /// The free-text observation narrative sent to the classifier.
    pub long_description: String,
    pub published_483_url: String,
}

/// A merged observation plus its category assignment.
#[derive(Debug, Clone)]
pub struct ClassifiedRecord {
    pub record: MergedRecord,
    pub categories: CategorySet,
    /// Reason the observation carries the sentinel instead of a real
    /// assignment. `None` means a validated classification.
    pub error: Option<String>,
}

impl ClassifiedRecord {
    pub fn classified(record: MergedRecord, categories: CategorySet) -> Self {
        Self {
            record,
            categories,
            error: None,
        }
    }

    pub fn unclassified(record: MergedRecord, reason: impl Into<String>) -> Self {
        Self {
            record,
            categories: CategorySet::new(),
            error: Some(reason.into()),
        }
    }

    pub fn is_unclassified(&self) -> bool {
        self.error.is_some()
    }
}
