use serde_json::Value;

use crate::models::{SubjectRecord, SubjectSummary};

/// Fold a list of raw subject entries into summary statistics.
///
/// Entries that are not objects, or that carry non-numeric attendance or marks, are
/// skipped; surviving values are clamped to [0, 100] before entering the pools.
/// Returns None when no valid values remain, which callers treat as insufficient data.
pub fn summarize_subjects(subjects: &[Value]) -> Option<SubjectSummary> {
    let mut attendance = Vec::new();
    let mut marks = Vec::new();

    for entry in subjects {
        let Some(record) = SubjectRecord::from_value(entry) else {
            continue;
        };
        if let (Some(a), Some(m)) = (record.attendance, record.marks) {
            attendance.push(clamp_percent(a));
            marks.push(clamp_percent(m));
        }
    }

    if attendance.is_empty() {
        return None;
    }

    Some(SubjectSummary {
        avg_attendance: mean(&attendance),
        avg_marks: mean(&marks),
        subject_count: subjects.len(),
        attendance_std: population_std(&attendance),
        marks_std: population_std(&marks),
        min_attendance: fold_min(&attendance),
        max_attendance: fold_max(&attendance),
        min_marks: fold_min(&marks),
        max_marks: fold_max(&marks),
    })
}

/// Strict validity check for a single subject entry: an object carrying a name plus
/// attendance and marks that are numeric and within [0, 100]. Batch ingestion uses
/// this to reject bad rows outright instead of silently dropping their values.
pub fn is_well_formed(subject: &Value) -> bool {
    let Some(map) = subject.as_object() else {
        return false;
    };
    if !map.contains_key("name") {
        return false;
    }
    in_percent_range(map.get("attendance")) && in_percent_range(map.get("marks"))
}

fn in_percent_range(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_f64)
        .is_some_and(|v| (0.0..=100.0).contains(&v))
}

fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn fold_min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn fold_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
