use std::io::Read;

use serde::{Deserialize, Deserializer};
use serde_json::json;
use tracing::debug;

use crate::aggregate;
use crate::classifier::RiskModel;
use crate::models::{BatchResult, RowAssessment, RowSkip};
use crate::risk;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    name: Option<String>,
    attendance: f64,
    marks: f64,
    #[serde(default = "fees_paid_default", deserialize_with = "flexible_bool")]
    fees_paid: bool,
}

fn fees_paid_default() -> bool {
    true
}

fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "unrecognized fees_paid value `{other}`"
        ))),
    }
}

/// Assess every row of a CSV document, each row as a single-subject student. Rows
/// that fail to parse or fail the well-formedness check are reported in `skipped`
/// rather than silently dropped.
pub fn assess_csv(input: impl Read, model: Option<&RiskModel>) -> BatchResult {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut results = Vec::new();
    let mut skipped = Vec::new();

    for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row_number = index + 1;
        let row = match row {
            Ok(row) => row,
            Err(error) => {
                skipped.push(RowSkip {
                    row: row_number,
                    reason: error.to_string(),
                });
                continue;
            }
        };

        let name = row
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Row {row_number}"));
        let subject = json!({
            "name": name,
            "attendance": row.attendance,
            "marks": row.marks,
        });

        if !aggregate::is_well_formed(&subject) {
            skipped.push(RowSkip {
                row: row_number,
                reason: "attendance or marks outside 0-100".to_string(),
            });
            continue;
        }

        let assessment = risk::assess(&[subject], row.fees_paid, model);
        results.push(RowAssessment {
            row: row_number,
            name,
            assessment,
        });
    }

    debug!(
        assessed = results.len(),
        skipped = skipped.len(),
        "csv batch complete"
    );

    BatchResult {
        count: results.len(),
        results,
        skipped,
    }
}
