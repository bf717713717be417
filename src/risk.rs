use anyhow::Context;
use serde_json::Value;
use tracing::{debug, warn};

use crate::aggregate;
use crate::classifier::RiskModel;
use crate::models::{RiskAssessment, RiskLevel, SubjectRecord, SubjectSummary};

const ATTENDANCE_WEIGHT: f64 = 0.4;
const MARKS_WEIGHT: f64 = 0.4;
const FEE_WEIGHT: f64 = 0.2;

/// Assess one student. Never fails: missing data and internal faults both map to
/// fixed sentinel assessments, so callers always receive a well-formed result.
pub fn assess(subjects: &[Value], fees_paid: bool, model: Option<&RiskModel>) -> RiskAssessment {
    let Some(summary) = aggregate::summarize_subjects(subjects) else {
        return RiskAssessment::insufficient_data();
    };

    debug!(
        avg_attendance = summary.avg_attendance,
        avg_marks = summary.avg_marks,
        attendance_std = summary.attendance_std,
        marks_std = summary.marks_std,
        min_attendance = summary.min_attendance,
        max_attendance = summary.max_attendance,
        min_marks = summary.min_marks,
        max_marks = summary.max_marks,
        subject_count = summary.subject_count,
        "aggregated subject records"
    );

    match assess_summary(subjects, &summary, fees_paid, model) {
        Ok(assessment) => assessment,
        Err(error) => {
            warn!(error = %error, "risk assessment failed");
            RiskAssessment::analysis_error()
        }
    }
}

fn assess_summary(
    subjects: &[Value],
    summary: &SubjectSummary,
    fees_paid: bool,
    model: Option<&RiskModel>,
) -> anyhow::Result<RiskAssessment> {
    let (score, level) = match model {
        Some(model) => {
            let class = model.predict(summary.avg_attendance, summary.avg_marks, fees_paid)?;
            (f64::from(class) / 2.0, RiskLevel::from_class(class))
        }
        None => {
            let score = combined_score(summary.avg_attendance, summary.avg_marks, fees_paid);
            (score, RiskLevel::from_score(score))
        }
    };

    let factors = risk_factors(subjects, summary.avg_attendance, summary.avg_marks, fees_paid)?;

    Ok(RiskAssessment {
        risk_level: level,
        predicted_risk_score: round_to(score, 3),
        factors,
        avg_attendance: Some(round_to(summary.avg_attendance, 1)),
        avg_marks: Some(round_to(summary.avg_marks, 1)),
        subject_count: Some(summary.subject_count),
    })
}

/// Attendance band, inclusive on the lower edge of each band.
pub fn attendance_risk(avg_attendance: f64) -> f64 {
    if avg_attendance >= 85.0 {
        0.0
    } else if avg_attendance >= 75.0 {
        0.2
    } else if avg_attendance >= 65.0 {
        0.4
    } else if avg_attendance >= 50.0 {
        0.6
    } else {
        0.8
    }
}

pub fn marks_risk(avg_marks: f64) -> f64 {
    if avg_marks >= 80.0 {
        0.0
    } else if avg_marks >= 70.0 {
        0.2
    } else if avg_marks >= 60.0 {
        0.4
    } else if avg_marks >= 50.0 {
        0.6
    } else {
        0.8
    }
}

pub fn fee_risk(fees_paid: bool) -> f64 {
    if fees_paid {
        0.0
    } else {
        0.3
    }
}

pub fn combined_score(avg_attendance: f64, avg_marks: f64, fees_paid: bool) -> f64 {
    let score = attendance_risk(avg_attendance) * ATTENDANCE_WEIGHT
        + marks_risk(avg_marks) * MARKS_WEIGHT
        + fee_risk(fees_paid) * FEE_WEIGHT;
    score.clamp(0.0, 1.0)
}

/// Qualitative factors, appended in a fixed order; subject name lists preserve input
/// order.
fn risk_factors(
    subjects: &[Value],
    avg_attendance: f64,
    avg_marks: f64,
    fees_paid: bool,
) -> anyhow::Result<Vec<String>> {
    let mut factors = Vec::new();

    if avg_attendance < 75.0 {
        factors.push("Low attendance".to_string());
    }
    if avg_marks < 60.0 {
        factors.push("Poor academic performance".to_string());
    }
    if !fees_paid {
        factors.push("Outstanding fees".to_string());
    }

    let failing = names_below(subjects, |record| record.marks, 40.0)?;
    if !failing.is_empty() {
        factors.push(format!("Failing subjects: {}", failing.join(", ")));
    }

    let low_attendance = names_below(subjects, |record| record.attendance, 60.0)?;
    if !low_attendance.is_empty() {
        factors.push(format!("Low attendance in: {}", low_attendance.join(", ")));
    }

    if factors.is_empty() {
        factors.push("Good overall performance".to_string());
    }

    Ok(factors)
}

/// Names of subjects whose selected field falls below `cutoff`. A missing or
/// non-numeric value counts as 0; a flagged subject without a usable name aborts
/// the scan.
fn names_below<F>(subjects: &[Value], field: F, cutoff: f64) -> anyhow::Result<Vec<String>>
where
    F: Fn(&SubjectRecord) -> Option<f64>,
{
    let mut names = Vec::new();
    for entry in subjects {
        let record =
            SubjectRecord::from_value(entry).context("subject entry is not an object")?;
        if field(&record).unwrap_or(0.0) < cutoff {
            names.push(record.name.context("flagged subject has no name")?);
        }
    }
    Ok(names)
}

fn round_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}
