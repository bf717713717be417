use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{BatchResult, FactorSummary, LevelSummary, RiskLevel, RowAssessment};

pub fn summarize_by_level(results: &[RowAssessment]) -> Vec<LevelSummary> {
    let mut map: std::collections::HashMap<RiskLevel, (usize, f64)> =
        std::collections::HashMap::new();

    for row in results {
        let entry = map.entry(row.assessment.risk_level).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += row.assessment.predicted_risk_score;
    }

    let mut summaries: Vec<LevelSummary> = map
        .into_iter()
        .map(|(level, (count, total_score))| LevelSummary {
            level,
            count,
            avg_score: if count == 0 {
                0.0
            } else {
                total_score / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

pub fn summarize_factors(results: &[RowAssessment]) -> Vec<FactorSummary> {
    let mut map: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for row in results {
        for factor in &row.assessment.factors {
            *map.entry(factor.clone()).or_insert(0) += 1;
        }
    }

    let mut summaries: Vec<FactorSummary> = map
        .into_iter()
        .map(|(factor, count)| FactorSummary { factor, count })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.factor.cmp(&b.factor)));
    summaries
}

pub fn build_report(source: &str, generated_on: NaiveDate, batch: &BatchResult) -> String {
    let levels = summarize_by_level(&batch.results);
    let factors = summarize_factors(&batch.results);

    let mut output = String::new();

    let _ = writeln!(output, "# Student Risk Report");
    let _ = writeln!(output, "Generated for {} on {}", source, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");

    if levels.is_empty() {
        let _ = writeln!(output, "No students assessed.");
    } else {
        for summary in levels.iter() {
            let _ = writeln!(
                output,
                "- {}: {} students (avg score {:.3})",
                summary.level, summary.count, summary.avg_score
            );
        }
    }

    let mut ranked = batch.results.to_vec();
    ranked.sort_by(|a, b| {
        b.assessment
            .predicted_risk_score
            .partial_cmp(&a.assessment.predicted_risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Students");

    if ranked.is_empty() {
        let _ = writeln!(output, "No students assessed.");
    } else {
        for row in ranked.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} (row {}) {} risk, score {:.3}: {}",
                row.name,
                row.row,
                row.assessment.risk_level,
                row.assessment.predicted_risk_score,
                row.assessment.factors.join("; ")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Common Risk Factors");

    if factors.is_empty() {
        let _ = writeln!(output, "No factors recorded.");
    } else {
        for summary in factors.iter() {
            let _ = writeln!(output, "- {}: {} students", summary.factor, summary.count);
        }
    }

    if !batch.skipped.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "{} rows were skipped (malformed or out-of-range data).",
            batch.skipped.len()
        );
    }

    output
}
