//! End-to-end consultation flows against an in-memory store.

use std::sync::Arc;

use intake_forms_core::collector::{DraftError, ValidationError};
use intake_forms_core::models::{AnswerValue, ConsultType, PatientRef, Question, QuestionType, Template};
use intake_forms_core::{open_store_in_memory, DraftState, EngineConfig, IntakeFormsCore, IntakeFormsError};
use serde_json::{json, Map};

fn seeded_core() -> Arc<IntakeFormsCore> {
    let core = open_store_in_memory(EngineConfig::default()).unwrap();
    for question in [
        Question::system("peso", "Peso", QuestionType::Decimal)
            .with_code("peso_kg")
            .with_unit("kg")
            .required(),
        Question::system("altura", "Altura", QuestionType::Decimal)
            .with_code("altura_cm")
            .with_unit("cm"),
        Question::system("actividad", "Actividad física", QuestionType::Text)
            .with_code("actividad_fisica"),
    ] {
        core.register_system_question(&question).unwrap();
    }
    core
}

fn initial_template(core: &IntakeFormsCore) -> Template {
    let mut template = Template::new(None, "Primera visita", ConsultType::Initial);
    template.add_category("Hábitos").unwrap();
    let antropo = template.add_category("Antropometría").unwrap().id.clone();
    for id in ["peso", "altura", "actividad"] {
        let question = core
            .list_questions(&Default::default())
            .unwrap()
            .into_iter()
            .find(|q| q.id == id)
            .unwrap();
        template.add_question(&question);
    }
    template.set_category("peso", Some(&antropo)).unwrap();
    template.set_category("altura", Some(&antropo)).unwrap();
    core.create_template(&template).unwrap()
}

fn intake() -> PatientRef {
    let mut fields = Map::new();
    fields.insert("nombre".into(), json!("Ana"));
    fields.insert("edad".into(), json!(34));
    PatientRef::Intake { fields }
}

#[test]
fn test_missing_required_then_success() {
    let core = seeded_core();
    let template = initial_template(&core);
    let mut draft = core
        .start_template_draft(intake(), Some("dr-1".into()), &template.id)
        .unwrap();

    let err = core.submit_draft(&mut draft).unwrap_err();
    match err {
        IntakeFormsError::Draft(DraftError::Validation(ValidationError::MissingRequired {
            question_id,
            ..
        })) => assert_eq!(question_id, "peso"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(draft.state(), DraftState::Editing);
    assert!(core.consultations_for_patient("anyone").unwrap().is_empty());

    draft.sheet_mut().unwrap().set_input("peso", "70").unwrap();
    draft.sheet_mut().unwrap().set_input("altura", "175").unwrap();
    let consultation = core.submit_draft(&mut draft).unwrap();

    assert_eq!(draft.state(), DraftState::Succeeded);
    assert_eq!(consultation.template_used_ref(), Some(template.id.as_str()));
    assert_eq!(consultation.metrics().bmi, Some(22.86));
    let peso = consultation
        .answers()
        .iter()
        .find(|a| a.question_id == "peso")
        .unwrap();
    assert_eq!(peso.value.as_f64(), Some(70.0));
    assert!(peso.required_at_capture);

    assert!(matches!(
        core.submit_draft(&mut draft),
        Err(IntakeFormsError::Draft(DraftError::AlreadySubmitted))
    ));
}

#[test]
fn test_snapshot_survives_template_edits() {
    let core = seeded_core();
    let template = initial_template(&core);
    let mut draft = core
        .start_template_draft(intake(), Some("dr-1".into()), &template.id)
        .unwrap();
    draft.sheet_mut().unwrap().set_input("peso", "64,5").unwrap();
    let consultation = core.submit_draft(&mut draft).unwrap();
    let recorded = consultation.template_snapshot().clone();

    let mut edited = core.get_template(&template.id).unwrap();
    edited.name = "Primera visita v2".into();
    edited.remove_question("actividad").unwrap();
    core.update_template(&edited).unwrap();

    let stored = core.get_consultation(consultation.id()).unwrap();
    assert_eq!(stored.template_snapshot(), &recorded);
    assert!(stored.template_snapshot().verify_digest());
    assert_eq!(
        stored.template_snapshot().template().unwrap().name,
        "Primera visita"
    );
    assert_eq!(stored.template_snapshot().questions().len(), 3);
}

#[test]
fn test_deleted_template_falls_back_to_rendered_questions() {
    let core = seeded_core();
    let template = initial_template(&core);
    let mut draft = core
        .start_template_draft(intake(), None, &template.id)
        .unwrap();
    draft.sheet_mut().unwrap().set_input("peso", "80").unwrap();

    core.delete_template(&template.id).unwrap();
    let consultation = core.submit_draft(&mut draft).unwrap();

    assert!(consultation.template_used_ref().is_none());
    let snapshot = consultation.template_snapshot();
    assert!(snapshot.template().is_none());
    let ids: Vec<&str> = snapshot
        .questions()
        .iter()
        .map(|q| q.question_id.as_str())
        .collect();
    assert_eq!(ids, vec!["peso", "altura", "actividad"]);
    assert!(snapshot.question("peso").unwrap().required);
}

#[test]
fn test_followup_offers_initial_questions_and_custom_ones() {
    let core = seeded_core();
    let template = initial_template(&core);
    let mut initial = core
        .start_template_draft(intake(), Some("dr-1".into()), &template.id)
        .unwrap();
    initial.sheet_mut().unwrap().set_input("peso", "70").unwrap();
    let first = core.submit_draft(&mut initial).unwrap();

    let sleep = core
        .create_custom_question(
            "dr-1",
            &intake_forms_core::NewQuestion::new("Horas de sueño", "entero"),
        )
        .unwrap();

    let mut followup = core
        .start_followup_draft(first.patient_ref(), Some("dr-1".into()))
        .unwrap();
    assert_eq!(followup.consult_type(), ConsultType::FollowUp);
    let offered: Vec<&str> = followup
        .sheet()
        .entries()
        .iter()
        .map(|e| e.question.question_id.as_str())
        .collect();
    assert_eq!(offered, vec!["peso", "altura", "actividad", sleep.id.as_str()]);

    // Only the required question starts selected
    let selected: Vec<&str> = followup
        .sheet()
        .answerable()
        .map(|e| e.question.question_id.as_str())
        .collect();
    assert_eq!(selected, vec!["peso"]);

    assert!(followup.toggle_selection(&sleep.id).unwrap());
    let note_id = followup.add_adhoc_question("¿Cambios en la dieta?").unwrap();
    let sheet = followup.sheet_mut().unwrap();
    sheet.set_input("peso", "68").unwrap();
    sheet.set_input(&sleep.id, "7").unwrap();
    sheet.set_text(&note_id, "Menos azúcar").unwrap();
    sheet.set_observation("peso", "  tras el desayuno ").unwrap();

    let second = core.submit_draft(&mut followup).unwrap();
    assert_eq!(second.patient_ref(), first.patient_ref());
    assert!(second.template_used_ref().is_none());

    let adhoc = second
        .answers()
        .iter()
        .find(|a| a.question_id == note_id)
        .unwrap();
    assert!(adhoc.custom);
    assert_eq!(adhoc.value, AnswerValue::Text("Menos azúcar".into()));
    let peso = second.answers().iter().find(|a| a.question_id == "peso").unwrap();
    assert_eq!(peso.observation.as_deref(), Some("tras el desayuno"));

    let history = core.consultations_for_patient(first.patient_ref()).unwrap();
    assert_eq!(history.len(), 2);
}

#[test]
fn test_followup_without_initial_is_rejected() {
    let core = seeded_core();
    let template = initial_template(&core);
    let mut initial = core
        .start_template_draft(intake(), None, &template.id)
        .unwrap();
    initial.sheet_mut().unwrap().set_input("peso", "70").unwrap();
    let first = core.submit_draft(&mut initial).unwrap();

    let mut draft = core.start_followup_draft("unknown-patient", None).unwrap();
    draft.sheet_mut().unwrap().set_input("peso", "70").unwrap_err();
    draft.add_question(
        core.list_questions(&Default::default())
            .unwrap()
            .into_iter()
            .find(|q| q.id == "peso")
            .unwrap(),
    )
    .unwrap();
    draft.sheet_mut().unwrap().set_input("peso", "70").unwrap();

    let err = core.submit_draft(&mut draft).unwrap_err();
    assert!(matches!(err, IntakeFormsError::Draft(DraftError::Api(_))));
    assert_eq!(draft.state(), DraftState::Failed);
    assert!(draft.last_error().is_some());
    // The entered value is kept for a retry
    assert_eq!(
        draft.sheet().value("peso").and_then(AnswerValue::as_f64),
        Some(70.0)
    );
    assert_eq!(core.consultations_for_patient(first.patient_ref()).unwrap().len(), 1);
}

#[test]
fn test_store_rejects_snapshot_rewrites() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("intake.db");
    let consultation_id = {
        let core = intake_forms_core::open_store(&path, EngineConfig::default()).unwrap();
        core.register_system_question(
            &Question::system("peso", "Peso", QuestionType::Decimal).required(),
        )
        .unwrap();
        let mut draft = core.start_initial_draft(intake(), None).unwrap();
        draft.sheet_mut().unwrap().set_input("peso", "70").unwrap();
        core.submit_draft(&mut draft).unwrap().id().to_string()
    };

    let db = intake_forms_core::Database::open(&path).unwrap();
    let result = db.conn().execute(
        "UPDATE consultations SET template_snapshot = '{}' WHERE id = ?",
        [&consultation_id],
    );
    assert!(result.is_err());
}
