use chrono::NaiveDate;

/// One row of the raw inspections-details table.
#[derive(Debug, Clone)]
pub struct InspectionRow {
    pub inspection_id: i64,
    pub fei_number: String,
    pub legal_name: String,
    pub product_type: String,
    pub classification: String,
    /// `None` when the source value failed to parse; such rows are dropped
    /// and counted during merge.
    pub inspection_end_date: Option<NaiveDate>,
}

/// One row of the raw citations-details table: a single cited deficiency
/// within an inspection.
#[derive(Debug, Clone)]
pub struct CitationRow {
    pub inspection_id: i64,
    pub program_area: String,
    pub short_description: String,
    pub long_description: String,
}

/// One row of the published-483s table, keyed by facility (FEI) number.
#[derive(Debug, Clone)]
pub struct PublishedRow {
    pub fei_number: String,
    pub url: String,
}
