//! Metrics derived from captured answers.

use crate::models::{Answer, ConsultationMetrics};

pub const WEIGHT_CODE: &str = "peso_kg";
pub const HEIGHT_CODE: &str = "altura_cm";

fn positive_by_code(answers: &[Answer], code: &str) -> Option<f64> {
    answers
        .iter()
        .find(|a| a.code.as_deref() == Some(code))
        .and_then(|a| a.value.as_f64())
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Body-mass index from weight (kg) and height (cm), two decimals.
pub fn body_mass_index(answers: &[Answer]) -> Option<f64> {
    let kg = positive_by_code(answers, WEIGHT_CODE)?;
    let meters = positive_by_code(answers, HEIGHT_CODE)? / 100.0;
    let bmi = kg / (meters * meters);
    Some((bmi * 100.0).round() / 100.0).filter(|b| b.is_finite())
}

pub fn derive_metrics(answers: &[Answer]) -> ConsultationMetrics {
    ConsultationMetrics {
        bmi: body_mass_index(answers),
    }
}
