use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::score::CompanyRecord;

pub const CORE_COLUMNS: &[&str] = &[
    "company_id",
    "name",
    "normalized_name",
    "industry",
    "inn",
    "primary_site",
    "primary_email",
    "data_quality_score",
];

pub const SUPPORT_COLUMNS: &[&str] = &[
    "has_support_team",
    "support_team_size",
    "support_channels_count",
    "has_24_7_support",
    "support_vacancies",
    "total_vacancies",
];

/// The final table handed to storage/export: ordered columns, score-sorted rows.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub records: Vec<CompanyRecord>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Each record as a flat JSON object; nested fields stay nested.
    pub fn rows(&self) -> serde_json::Result<Vec<Map<String, Value>>> {
        self.records.iter().map(record_to_map).collect()
    }
}

/// Sort by score (stable, descending) and fix the column order:
/// core columns, then support columns, then everything else alphabetically.
pub fn assemble(mut records: Vec<CompanyRecord>) -> Dataset {
    records.sort_by(|a, b| b.data_quality_score.cmp(&a.data_quality_score));

    // to_value only fails on non-string map keys, which a record never has; `rows()` reports it
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for record in &records {
        if let Ok(map) = record_to_map(record) {
            seen.extend(map.into_iter().map(|(k, _)| k));
        }
    }

    let mut columns: Vec<String> = Vec::with_capacity(seen.len());
    for col in CORE_COLUMNS.iter().chain(SUPPORT_COLUMNS) {
        if seen.remove(*col) {
            columns.push(col.to_string());
        }
    }
    // BTreeSet iterates in sorted order
    columns.extend(seen);

    Dataset { columns, records }
}

fn record_to_map(record: &CompanyRecord) -> serde_json::Result<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "record serialized to {} instead of an object",
            other
        ))),
    }
}
