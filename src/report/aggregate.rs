use std::collections::{BTreeMap, HashMap};

use crate::models::ClassifiedRecord;
use crate::taxonomy::{Category, CategorySet};

const N: usize = Category::ALL.len();

/// Symmetric category-by-category co-occurrence counts. A pair is counted
/// once per inspection in which both categories are cited; the diagonal is
/// held at zero.
#[derive(Debug, Clone, Default)]
pub struct CoOccurrence {
    counts: [[usize; N]; N],
}

impl CoOccurrence {
    pub fn get(&self, a: Category, b: Category) -> usize {
        self.counts[index(a)][index(b)]
    }

    pub fn max(&self) -> usize {
        self.counts
            .iter()
            .flat_map(|row| row.iter())
            .copied()
            .max()
            .unwrap_or(0)
    }

    fn record_pair(&mut self, a: Category, b: Category) {
        let (i, j) = (index(a), index(b));
        if i != j {
            self.counts[i][j] += 1;
            self.counts[j][i] += 1;
        }
    }
}

fn index(category: Category) -> usize {
    Category::ALL
        .iter()
        .position(|c| *c == category)
        .expect("category missing from ALL")
}

#[derive(Debug, Clone)]
pub struct Aggregates {
    pub total_observations: usize,
    /// Observations with non-empty narrative text, the denominator for the
    /// frequency percentages.
    pub observations_with_text: usize,
    /// Observation count per category, sorted descending; ties keep
    /// taxonomy order.
    pub frequency: Vec<(Category, usize)>,
    pub co_occurrence: CoOccurrence,
    /// Per-year observation counts per category, keyed by calendar year of
    /// the inspection end date.
    pub yearly: BTreeMap<i32, [usize; N]>,
}

pub fn compute(records: &[ClassifiedRecord]) -> Aggregates {
    let observations_with_text = records
        .iter()
        .filter(|r| !r.record.long_description.trim().is_empty())
        .count();

    let mut frequency: Vec<(Category, usize)> = Category::ALL
        .iter()
        .map(|&category| {
            let count = records
                .iter()
                .filter(|r| r.categories.contains(category))
                .count();
            (category, count)
        })
        .collect();
    frequency.sort_by(|a, b| b.1.cmp(&a.1));

    // Union the categories cited across each inspection's observations, then
    // count every distinct pair once per inspection.
    let mut per_inspection: HashMap<i64, CategorySet> = HashMap::new();
    for r in records {
        let entry = per_inspection
            .entry(r.record.inspection_id)
            .or_default();
        for category in r.categories.iter() {
            entry.insert(category);
        }
    }

    let mut co_occurrence = CoOccurrence::default();
    for set in per_inspection.values() {
        let cited: Vec<Category> = set.iter().collect();
        for (i, &a) in cited.iter().enumerate() {
            for &b in &cited[i + 1..] {
                co_occurrence.record_pair(a, b);
            }
        }
    }

    let mut yearly: BTreeMap<i32, [usize; N]> = BTreeMap::new();
    for r in records {
        use chrono::Datelike;
        let year = r.record.inspection_end_date.year();
        let counts = yearly.entry(year).or_insert([0; N]);
        for category in r.categories.iter() {
            counts[index(category)] += 1;
        }
    }

    Aggregates {
        total_observations: records.len(),
        observations_with_text,
        frequency,
        co_occurrence,
        yearly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::models::MergedRecord;

    fn record(inspection_id: i64, year: i32, categories: &[Category]) -> ClassifiedRecord {
        let merged = MergedRecord {
            inspection_id,
            fei_number: "3000001".to_string(),
            legal_name: "Acme Pharma".to_string(),
            product_type: "Drugs".to_string(),
            classification: "VAI".to_string(),
            inspection_end_date: NaiveDate::from_ymd_opt(year, 5, 1).unwrap(),
            program_area: "Drug Quality Assurance".to_string(),
            short_description: "Observation".to_string(),
            long_description: "observation text".to_string(),
            published_483_url: String::new(),
        };
        ClassifiedRecord::classified(merged, categories.iter().copied().collect())
    }

    #[test]
    fn frequency_is_sorted_descending() {
        let records = vec![
            record(1, 2021, &[Category::DataIntegrity, Category::LackOfValidation]),
            record(2, 2021, &[Category::DataIntegrity]),
            record(3, 2022, &[Category::DataIntegrity, Category::InadequateTesting]),
        ];

        let agg = compute(&records);
        assert_eq!(agg.frequency[0], (Category::DataIntegrity, 3));
        for window in agg.frequency.windows(2) {
            assert!(window[0].1 >= window[1].1);
        }
    }

    #[test]
    fn co_occurrence_is_symmetric_with_zero_diagonal() {
        let records = vec![
            record(1, 2021, &[Category::DataIntegrity, Category::LackOfValidation]),
            record(2, 2021, &[Category::DataIntegrity, Category::LackOfValidation]),
            record(3, 2022, &[Category::DataIntegrity]),
        ];

        let agg = compute(&records);
        for a in Category::ALL {
            for b in Category::ALL {
                assert_eq!(agg.co_occurrence.get(a, b), agg.co_occurrence.get(b, a));
            }
            assert_eq!(agg.co_occurrence.get(a, a), 0);
        }
        assert_eq!(
            agg.co_occurrence
                .get(Category::DataIntegrity, Category::LackOfValidation),
            2
        );
    }

    #[test]
    fn pairs_count_once_per_inspection() {
        // Two observations in the same inspection citing the same pair.
        let records = vec![
            record(1, 2021, &[Category::DataIntegrity, Category::DeficientCleaning]),
            record(1, 2021, &[Category::DataIntegrity, Category::DeficientCleaning]),
        ];

        let agg = compute(&records);
        assert_eq!(
            agg.co_occurrence
                .get(Category::DataIntegrity, Category::DeficientCleaning),
            1
        );
    }

    #[test]
    fn yearly_trends_bucket_by_inspection_year() {
        let records = vec![
            record(1, 2020, &[Category::InadequateTesting]),
            record(2, 2020, &[Category::InadequateTesting]),
            record(3, 2022, &[Category::InadequateTesting]),
        ];

        let agg = compute(&records);
        let years: Vec<i32> = agg.yearly.keys().copied().collect();
        assert_eq!(years, vec![2020, 2022]);
        assert_eq!(agg.yearly[&2020][index(Category::InadequateTesting)], 2);
        assert_eq!(agg.yearly[&2022][index(Category::InadequateTesting)], 1);
    }

    #[test]
    fn sentinel_rows_contribute_no_categories() {
        let mut sentinel = record(1, 2021, &[]);
        sentinel.error = Some("No text to analyze".to_string());
        let records = vec![sentinel, record(2, 2021, &[Category::DataIntegrity])];

        let agg = compute(&records);
        assert_eq!(agg.total_observations, 2);
        assert_eq!(agg.frequency[0], (Category::DataIntegrity, 1));
    }
}
