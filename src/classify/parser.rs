use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::taxonomy::{Category, CategorySet};

#[derive(Deserialize)]
struct ResponseEnvelope {
    analysis_summary: BTreeMap<String, bool>,
}

/// Parses the model's response into a validated category set. Labels are
/// checked against the taxonomy; a key the taxonomy does not know is logged
/// and dropped, never turned into a fabricated category. An empty set is a
/// legitimate outcome (no category applies).
pub fn parse_classification(response: &str) -> Result<CategorySet> {
    let json = extract_json(response)?;
    let envelope: ResponseEnvelope = serde_json::from_str(&json)
        .map_err(|e| Error::Parse(format!("Response was not the expected JSON shape: {}", e)))?;

    let mut categories = CategorySet::new();
    for (label, flagged) in &envelope.analysis_summary {
        if !flagged {
            continue;
        }
        match Category::from_label(label) {
            Some(category) => categories.insert(category),
            None => tracing::warn!("Ignoring unknown category label in response: '{}'", label),
        }
    }
    Ok(categories)
}

/// Pulls the JSON object out of a response that may wrap it in markdown
/// fences or surrounding prose.
fn extract_json(text: &str) -> Result<String> {
    if let Some(start) = text.find("```json") {
        let start = start + 7;
        if let Some(end) = text[start..].find("```") {
            return Ok(text[start..start + end].trim().to_string());
        }
    }

    if let Some(start) = text.find('{') {
        let mut depth = 0;
        let mut in_string = false;
        let mut escape_next = false;

        for (i, c) in text[start..].char_indices() {
            if escape_next {
                escape_next = false;
                continue;
            }
            match c {
                '\\' if in_string => escape_next = true,
                '"' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(text[start..start + i + 1].to_string());
                    }
                }
                _ => {}
            }
        }
    }

    Err(Error::Parse("No valid JSON found in response".to_string()))
}
