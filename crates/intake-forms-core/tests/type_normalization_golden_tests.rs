//! Golden tests for question type and option normalization.
//!
//! These tests verify the synonym table and option slugs against known cases.

use intake_forms_core::bank::NewQuestion;
use intake_forms_core::models::{AnswerOption, QuestionType};
use intake_forms_core::normalize::{normalize_options, normalize_type, RawOption, TypeNormalizer};
use intake_forms_core::EngineConfig;

/// Test case from golden file.
struct GoldenCase {
    id: &'static str,
    raw_type: &'static str,
    expected: QuestionType,
}

fn get_golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase { id: "multi-es", raw_type: "opcion_multiple", expected: QuestionType::Multi },
        GoldenCase { id: "multi-checkbox", raw_type: "checkbox", expected: QuestionType::Multi },
        GoldenCase { id: "multi-canonical", raw_type: "multi", expected: QuestionType::Multi },
        GoldenCase { id: "single-es", raw_type: "opcion_unica", expected: QuestionType::Single },
        GoldenCase { id: "single-radio", raw_type: "radio", expected: QuestionType::Single },
        GoldenCase { id: "single-select", raw_type: "select", expected: QuestionType::Single },
        GoldenCase { id: "boolean-es", raw_type: "si_no", expected: QuestionType::Boolean },
        GoldenCase { id: "boolean-canonical", raw_type: "boolean", expected: QuestionType::Boolean },
        GoldenCase { id: "integer-es", raw_type: "entero", expected: QuestionType::Integer },
        GoldenCase { id: "decimal-es", raw_type: "numero", expected: QuestionType::Decimal },
        GoldenCase { id: "decimal-number", raw_type: "number", expected: QuestionType::Decimal },
        GoldenCase { id: "date-es", raw_type: "fecha", expected: QuestionType::Date },
        GoldenCase { id: "text-long", raw_type: "texto_largo", expected: QuestionType::Text },
        GoldenCase { id: "case-and-space", raw_type: "  OPCION_MULTIPLE ", expected: QuestionType::Multi },
        GoldenCase { id: "unknown", raw_type: "escala_likert", expected: QuestionType::Text },
        GoldenCase { id: "empty", raw_type: "", expected: QuestionType::Text },
    ]
}

#[test]
fn test_golden_cases() {
    let normalizer = TypeNormalizer::new();

    for case in get_golden_cases() {
        assert_eq!(
            normalizer.normalize(case.raw_type),
            case.expected,
            "Case {}: type mismatch",
            case.id
        );
        assert_eq!(
            normalize_type(case.raw_type),
            case.expected,
            "Case {}: free function disagrees",
            case.id
        );
    }
}

#[test]
fn test_canonical_names_round_trip() {
    let normalizer = TypeNormalizer::new();
    for question_type in QuestionType::all() {
        assert_eq!(normalizer.normalize(question_type.as_str()), question_type);
    }
}

#[test]
fn test_configured_synonyms_layer_over_defaults() {
    let config = EngineConfig::from_json_str(r#"{"type_synonyms": {"escala": "single"}}"#).unwrap();
    let normalizer = config.type_normalizer();

    assert_eq!(normalizer.normalize("escala"), QuestionType::Single);
    assert_eq!(normalizer.normalize("checkbox"), QuestionType::Multi);
}

#[test]
fn test_duplicate_option_labels_collapse() {
    let raw = vec![RawOption::from("Desayuno"), RawOption::from("Desayuno ")];
    assert_eq!(
        normalize_options(&raw),
        vec![AnswerOption::new("desayuno", "Desayuno")]
    );
}

#[test]
fn test_multi_question_from_legacy_type() {
    let draft = NewQuestion::new("Comidas del día", "opcion_multiple")
        .with_options(["Desayuno", "Desayuno ", "Cena"]);
    let question = draft.build("dr-1", &TypeNormalizer::new()).unwrap();

    assert_eq!(question.question_type, QuestionType::Multi);
    let values: Vec<&str> = question.options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(values, vec!["desayuno", "cena"]);
}
