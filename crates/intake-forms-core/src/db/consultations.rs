//! Consultation and patient database operations.

use rusqlite::{params, OptionalExtension, Row};
use serde_json::{Map, Value};
use tracing::info;

use super::templates::string_to_consult_type;
use super::{Database, DbError, DbResult};
use crate::api::{ApiResult, ConsultationApi};
use crate::models::{ConsultType, Consultation, NewConsultation, PatientRef};

const CONSULTATION_COLUMNS: &str = "id, patient_ref, practitioner, consult_type, template_used, \
     template_snapshot, answers, metrics, notes, created_at";

impl Database {
    /// Register a patient from intake fields. Returns the new patient ID.
    pub fn insert_patient(&self, fields: &Map<String, Value>) -> DbResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO patients (id, fields, created_at) VALUES (?1, ?2, ?3)",
            params![id, serde_json::to_string(fields)?, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    pub fn patient_exists(&self, id: &str) -> DbResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM patients WHERE id = ?", [id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Append a consultation. There is no update counterpart.
    pub fn insert_consultation(&self, consultation: &Consultation) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO consultations (
                id, patient_ref, practitioner, consult_type, template_used,
                template_snapshot, answers, metrics, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                consultation.id(),
                consultation.patient_ref(),
                consultation.practitioner(),
                consultation.consult_type().as_str(),
                consultation.template_used_ref(),
                serde_json::to_string(consultation.template_snapshot())?,
                serde_json::to_string(consultation.answers())?,
                serde_json::to_string(consultation.metrics())?,
                consultation.notes(),
                consultation.created_at(),
            ],
        )?;
        Ok(())
    }

    pub fn find_consultation(&self, id: &str) -> DbResult<Option<Consultation>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM consultations WHERE id = ?", CONSULTATION_COLUMNS),
                [id],
                ConsultationRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Consultations of a patient, oldest first.
    pub fn list_consultations_for_patient(&self, patient_ref: &str) -> DbResult<Vec<Consultation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM consultations WHERE patient_ref = ? ORDER BY created_at, rowid",
            CONSULTATION_COLUMNS
        ))?;
        let rows = stmt.query_map([patient_ref], ConsultationRow::from_row)?;

        let mut consultations = Vec::new();
        for row in rows {
            consultations.push(row?.try_into()?);
        }
        Ok(consultations)
    }

    fn existing_patient(&self, patient: &PatientRef) -> DbResult<String> {
        match patient {
            PatientRef::Existing { id } => {
                if self.patient_exists(id)? {
                    Ok(id.clone())
                } else {
                    Err(DbError::NotFound(format!("patient {}", id)))
                }
            }
            PatientRef::Intake { .. } => Err(DbError::Constraint(
                "a follow-up needs an existing patient".to_string(),
            )),
        }
    }

    fn record(&self, request: &NewConsultation, patient_ref: String) -> DbResult<Consultation> {
        if let Some(template_id) = request.template_used_ref.as_deref() {
            if self.find_template(template_id)?.is_none() {
                return Err(DbError::NotFound(format!("template {}", template_id)));
            }
        }
        let consultation = Consultation::record(request.clone(), patient_ref);
        self.insert_consultation(&consultation)?;
        info!(
            consultation_id = consultation.id(),
            patient_ref = consultation.patient_ref(),
            consult_type = consultation.consult_type().as_str(),
            "consultation recorded"
        );
        Ok(consultation)
    }
}

impl ConsultationApi for Database {
    fn create_initial(&self, request: &NewConsultation) -> ApiResult<Consultation> {
        if request.consult_type != ConsultType::Initial {
            return Err(DbError::Constraint("expected an initial consultation".to_string()).into());
        }
        let tx = self.conn.unchecked_transaction().map_err(DbError::from)?;
        let patient_ref = match &request.patient {
            PatientRef::Existing { id } => {
                if !self.patient_exists(id)? {
                    return Err(DbError::NotFound(format!("patient {}", id)).into());
                }
                id.clone()
            }
            PatientRef::Intake { fields } => self.insert_patient(fields)?,
        };
        let consultation = self.record(request, patient_ref)?;
        tx.commit().map_err(DbError::from)?;
        Ok(consultation)
    }

    fn create_followup(&self, request: &NewConsultation) -> ApiResult<Consultation> {
        if request.consult_type != ConsultType::FollowUp {
            return Err(DbError::Constraint("expected a follow-up consultation".to_string()).into());
        }
        let patient_ref = self.existing_patient(&request.patient)?;
        if self.initial_for_patient(&patient_ref)?.is_none() {
            return Err(DbError::Constraint(
                "the patient has no initial consultation".to_string(),
            )
            .into());
        }
        Ok(self.record(request, patient_ref)?)
    }

    fn list_for_patient(&self, patient_ref: &str) -> ApiResult<Vec<Consultation>> {
        Ok(self.list_consultations_for_patient(patient_ref)?)
    }

    fn get_consultation(&self, id: &str) -> ApiResult<Consultation> {
        self.find_consultation(id)?
            .ok_or_else(|| DbError::NotFound(format!("consultation {}", id)).into())
    }
}

/// Intermediate row struct for database mapping.
struct ConsultationRow {
    id: String,
    patient_ref: String,
    practitioner: Option<String>,
    consult_type: String,
    template_used: Option<String>,
    template_snapshot: String,
    answers: String,
    metrics: String,
    notes: String,
    created_at: String,
}

impl ConsultationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ConsultationRow {
            id: row.get(0)?,
            patient_ref: row.get(1)?,
            practitioner: row.get(2)?,
            consult_type: row.get(3)?,
            template_used: row.get(4)?,
            template_snapshot: row.get(5)?,
            answers: row.get(6)?,
            metrics: row.get(7)?,
            notes: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

impl TryFrom<ConsultationRow> for Consultation {
    type Error = DbError;

    fn try_from(row: ConsultationRow) -> Result<Self, Self::Error> {
        Ok(Consultation::from_parts(
            row.id,
            row.patient_ref,
            row.practitioner,
            string_to_consult_type(&row.consult_type)?,
            row.template_used,
            serde_json::from_str(&row.template_snapshot)?,
            serde_json::from_str(&row.answers)?,
            serde_json::from_str(&row.metrics)?,
            row.notes,
            row.created_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, QuestionBank, TemplateApi};
    use crate::models::{Question, QuestionType, Template};
    use crate::snapshot::{build_snapshot, SnapshotSource};
    use serde_json::json;

    fn setup() -> (Database, Template, Vec<Question>) {
        let db = Database::open_in_memory().unwrap();
        let questions = vec![Question::system("peso", "Peso", QuestionType::Decimal).required()];
        for q in &questions {
            db.create_question(q).unwrap();
        }
        let mut template = Template::new(None, "Inicial", ConsultType::Initial);
        template.add_question(&questions[0]);
        db.create_template(&template).unwrap();
        (db, template, questions)
    }

    fn request(template: &Template, questions: &[Question], patient: PatientRef) -> NewConsultation {
        let snapshot = build_snapshot(
            SnapshotSource::Template { template, questions },
            chrono::Utc::now(),
        )
        .unwrap();
        NewConsultation {
            patient,
            practitioner: Some("dr-1".into()),
            consult_type: ConsultType::Initial,
            template_used_ref: Some(template.id.clone()),
            template_snapshot: snapshot,
            answers: Vec::new(),
            metrics: Default::default(),
            notes: String::new(),
        }
    }

    fn intake() -> PatientRef {
        let mut fields = Map::new();
        fields.insert("nombre".into(), json!("Ana"));
        PatientRef::Intake { fields }
    }

    #[test]
    fn test_initial_registers_patient() {
        let (db, template, questions) = setup();
        let created = db.create_initial(&request(&template, &questions, intake())).unwrap();

        assert!(db.patient_exists(created.patient_ref()).unwrap());
        let stored = db.get_consultation(created.id()).unwrap();
        assert_eq!(stored, created);
        assert!(stored.template_snapshot().verify_digest());
    }

    #[test]
    fn test_followup_requires_initial() {
        let (db, template, questions) = setup();
        let patient_id = db.insert_patient(&Map::new()).unwrap();
        let mut followup = request(
            &template,
            &questions,
            PatientRef::Existing { id: patient_id.clone() },
        );
        followup.consult_type = ConsultType::FollowUp;
        assert!(matches!(db.create_followup(&followup), Err(ApiError::Rejected { .. })));

        let initial = request(&template, &questions, PatientRef::Existing { id: patient_id.clone() });
        db.create_initial(&initial).unwrap();
        db.create_followup(&followup).unwrap();

        let history = db.list_for_patient(&patient_id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].consult_type(), ConsultType::Initial);
        assert!(db.initial_for_patient(&patient_id).unwrap().is_some());
    }

    #[test]
    fn test_unknown_patient() {
        let (db, template, questions) = setup();
        let req = request(&template, &questions, PatientRef::Existing { id: "ghost".into() });
        assert!(matches!(db.create_initial(&req), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_snapshot_and_answers_are_immutable() {
        let (db, template, questions) = setup();
        let created = db.create_initial(&request(&template, &questions, intake())).unwrap();

        let result = db.conn().execute(
            "UPDATE consultations SET answers = '[]', template_snapshot = '{}' WHERE id = ?",
            [created.id()],
        );
        assert!(result.is_err());

        // Other columns may still change
        db.conn()
            .execute("UPDATE consultations SET notes = 'revisado' WHERE id = ?", [created.id()])
            .unwrap();
    }

    #[test]
    fn test_deleting_template_nulls_reference() {
        let (db, template, questions) = setup();
        let created = db.create_initial(&request(&template, &questions, intake())).unwrap();

        db.delete_template(&template.id).unwrap();
        let stored = db.get_consultation(created.id()).unwrap();
        assert!(stored.template_used_ref().is_none());
        assert_eq!(stored.template_snapshot(), created.template_snapshot());
    }
}
