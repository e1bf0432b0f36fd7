//! Question selection for manual drafts.

use std::collections::HashSet;

use crate::bank::{NewQuestion, QuestionBuildResult};
use crate::models::{Consultation, Question, QuestionOrigin};
use crate::normalize::TypeNormalizer;
use crate::snapshot::{ManualSelection, SnapshotQuestion};

/// Rebuild a question definition from its captured form.
fn from_snapshot(captured: &SnapshotQuestion, captured_at: &str) -> Question {
    Question {
        id: captured.question_id.clone(),
        text: captured.text.clone(),
        question_type: captured.question_type,
        unit: captured.unit.clone(),
        code: captured.code.clone(),
        options: captured.options.clone(),
        required: captured.base_required,
        origin: if captured.custom {
            QuestionOrigin::Custom
        } else {
            QuestionOrigin::System
        },
        owner: None,
        active: true,
        created_at: captured_at.to_string(),
    }
}

/// Follow-up candidates: the initial consultation's questions, then the
/// practitioner's custom questions, deduplicated by ID.
pub fn followup_candidates(initial: Option<&Consultation>, custom: &[Question]) -> Vec<Question> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    if let Some(initial) = initial {
        let snapshot = initial.template_snapshot();
        for captured in snapshot.questions() {
            if seen.insert(captured.question_id.clone()) {
                candidates.push(from_snapshot(captured, snapshot.captured_at()));
            }
        }
    }
    for question in custom {
        if seen.insert(question.id.clone()) {
            candidates.push(question.clone());
        }
    }
    candidates
}

/// Offer questions with required ones and the given codes preselected.
pub fn preselect(offered: Vec<Question>, preselected_codes: &[String]) -> Vec<ManualSelection> {
    offered
        .into_iter()
        .map(|question| {
            let by_code = question
                .code
                .as_deref()
                .is_some_and(|code| preselected_codes.iter().any(|c| c == code));
            ManualSelection {
                selected: question.required || by_code,
                question,
            }
        })
        .collect()
}

/// Inline question added while answering: free text, optional, custom.
pub fn adhoc_question(owner: &str, text: &str) -> QuestionBuildResult<Question> {
    NewQuestion::new(text, "text").build(owner, &TypeNormalizer::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConsultType, NewConsultation, PatientRef, QuestionType};
    use crate::snapshot::{build_snapshot, SnapshotSource};
    use chrono::Utc;

    fn initial_consultation(questions: &[Question]) -> Consultation {
        let selection: Vec<ManualSelection> = questions
            .iter()
            .cloned()
            .map(|question| ManualSelection {
                question,
                selected: true,
            })
            .collect();
        let snapshot = build_snapshot(SnapshotSource::Manual(&selection), Utc::now()).unwrap();
        Consultation::record(
            NewConsultation {
                patient: PatientRef::Existing { id: "p-1".into() },
                practitioner: None,
                consult_type: ConsultType::Initial,
                template_used_ref: None,
                template_snapshot: snapshot,
                answers: Vec::new(),
                metrics: Default::default(),
                notes: String::new(),
            },
            "p-1".into(),
        )
    }

    #[test]
    fn test_candidates_dedupe() {
        let shared = Question::custom("dr-1", "Sueño", QuestionType::Text);
        let initial = initial_consultation(&[
            Question::system("peso", "Peso", QuestionType::Decimal).required(),
            shared.clone(),
        ]);
        let other = Question::custom("dr-1", "Estrés", QuestionType::Text);

        let candidates = followup_candidates(Some(&initial), &[shared.clone(), other.clone()]);
        let ids: Vec<&str> = candidates.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["peso", shared.id.as_str(), other.id.as_str()]);
        assert!(candidates[0].required);
        assert_eq!(candidates[1].origin, QuestionOrigin::Custom);
    }

    #[test]
    fn test_candidates_without_initial() {
        let custom = vec![Question::custom("dr-1", "Estrés", QuestionType::Text)];
        assert_eq!(followup_candidates(None, &custom).len(), 1);
    }

    #[test]
    fn test_preselect() {
        let offered = vec![
            Question::system("1", "Peso", QuestionType::Decimal).with_code("peso_kg"),
            Question::system("2", "Edad", QuestionType::Integer).required(),
            Question::system("3", "Notas", QuestionType::Text),
        ];
        let selection = preselect(offered, &["peso_kg".to_string()]);
        let selected: Vec<bool> = selection.iter().map(|s| s.selected).collect();
        assert_eq!(selected, vec![true, true, false]);
    }

    #[test]
    fn test_adhoc_question() {
        let question = adhoc_question("dr-1", "  ¿Cambios recientes?  ").unwrap();
        assert_eq!(question.question_type, QuestionType::Text);
        assert!(!question.required);
        assert_eq!(question.origin, QuestionOrigin::Custom);
        assert!(adhoc_question("dr-1", " ").is_err());
    }
}
