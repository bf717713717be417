use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub subjects: Option<Vec<Value>>,
    #[serde(default = "fees_paid_default")]
    pub fees_paid: bool,
}

fn fees_paid_default() -> bool {
    true
}

/// Validated view of one raw subject entry. Fields stay optional: a record missing a
/// numeric attendance or marks is counted but kept out of the statistics pools.
#[derive(Debug, Clone)]
pub struct SubjectRecord {
    pub name: Option<String>,
    pub attendance: Option<f64>,
    pub marks: Option<f64>,
}

impl SubjectRecord {
    /// Returns None when the entry is not a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self {
            name: map.get("name").and_then(Value::as_str).map(str::to_string),
            attendance: map.get("attendance").and_then(Value::as_f64),
            marks: map.get("marks").and_then(Value::as_f64),
        })
    }
}

/// Statistics across one student's subject records. `subject_count` is the raw number
/// of input entries, including ones that failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectSummary {
    pub avg_attendance: f64,
    pub avg_marks: f64,
    pub subject_count: usize,
    pub attendance_std: f64,
    pub marks_std: f64,
    pub min_attendance: f64,
    pub max_attendance: f64,
    pub min_marks: f64,
    pub max_marks: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score <= 0.3 {
            RiskLevel::Low
        } else if score <= 0.6 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn from_class(class: u8) -> Self {
        match class {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(label)
    }
}

/// Assessment returned to every caller. The optional trio is present only when enough
/// valid subject data existed to compute it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub predicted_risk_score: f64,
    pub factors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_attendance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_marks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_count: Option<usize>,
}

impl RiskAssessment {
    pub fn insufficient_data() -> Self {
        Self::sentinel("Insufficient data")
    }

    pub fn analysis_error() -> Self {
        Self::sentinel("Analysis error")
    }

    fn sentinel(factor: &str) -> Self {
        Self {
            risk_level: RiskLevel::Medium,
            predicted_risk_score: 0.5,
            factors: vec![factor.to_string()],
            avg_attendance: None,
            avg_marks: None,
            subject_count: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowAssessment {
    pub row: usize,
    pub name: String,
    #[serde(flatten)]
    pub assessment: RiskAssessment,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowSkip {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub count: usize,
    pub results: Vec<RowAssessment>,
    pub skipped: Vec<RowSkip>,
}

#[derive(Debug, Clone)]
pub struct LevelSummary {
    pub level: RiskLevel,
    pub count: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone)]
pub struct FactorSummary {
    pub factor: String,
    pub count: usize,
}
