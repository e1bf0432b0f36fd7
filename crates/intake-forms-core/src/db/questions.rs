//! Question bank database operations.

use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

use super::{bool_to_int, Database, DbError, DbResult};
use crate::api::{ApiResult, QuestionBank};
use crate::bank::QuestionFilter;
use crate::models::{AnswerOption, Question, QuestionOrigin, QuestionType};

const QUESTION_COLUMNS: &str =
    "id, text, type, unit, code, options, required, origin, owner, active, created_at";

impl Database {
    /// Insert a question. Codes are unique per owner.
    pub fn insert_question(&self, question: &Question) -> DbResult<()> {
        self.ensure_code_free(question)?;
        let options_json = serde_json::to_string(&question.options)?;

        self.conn.execute(
            r#"
            INSERT INTO questions (
                id, text, type, unit, code, options,
                required, origin, owner, active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                question.id,
                question.text,
                question.question_type.as_str(),
                question.unit,
                question.code,
                options_json,
                bool_to_int(question.required),
                origin_to_string(&question.origin),
                question.owner,
                bool_to_int(question.active),
                question.created_at,
            ],
        )?;
        Ok(())
    }

    /// Update a custom question. System questions are read-only.
    pub fn update_question_row(&self, question: &Question) -> DbResult<bool> {
        let Some(existing) = self.find_question(&question.id)? else {
            return Ok(false);
        };
        if existing.is_system() {
            return Err(DbError::Constraint(format!(
                "system question {} is read-only",
                question.id
            )));
        }
        self.ensure_code_free(question)?;
        let options_json = serde_json::to_string(&question.options)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE questions SET
                text = ?2,
                type = ?3,
                unit = ?4,
                code = ?5,
                options = ?6,
                required = ?7,
                active = ?8
            WHERE id = ?1
            "#,
            params![
                question.id,
                question.text,
                question.question_type.as_str(),
                question.unit,
                question.code,
                options_json,
                bool_to_int(question.required),
                bool_to_int(question.active),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Deactivate a custom question. Templates and snapshots referencing it keep working.
    pub fn deactivate_question(&self, id: &str) -> DbResult<bool> {
        let Some(existing) = self.find_question(id)? else {
            return Ok(false);
        };
        if existing.is_system() {
            return Err(DbError::Constraint(format!("system question {} is read-only", id)));
        }
        let rows_affected = self
            .conn
            .execute("UPDATE questions SET active = 0 WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Get a question by ID (inactive ones included).
    pub fn find_question(&self, id: &str) -> DbResult<Option<Question>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM questions WHERE id = ?", QUESTION_COLUMNS),
                [id],
                QuestionRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// All questions in bank order: system first, then by creation time.
    pub fn list_all_questions(&self) -> DbResult<Vec<Question>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM questions ORDER BY origin DESC, created_at, rowid",
            QUESTION_COLUMNS
        ))?;
        let rows = stmt.query_map([], QuestionRow::from_row)?;

        let mut questions = Vec::new();
        for row in rows {
            questions.push(row?.try_into()?);
        }
        Ok(questions)
    }

    fn ensure_code_free(&self, question: &Question) -> DbResult<()> {
        let Some(code) = question.code.as_deref().filter(|c| !c.is_empty()) else {
            return Ok(());
        };
        let taken: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM questions WHERE owner IS ?1 AND code = ?2 AND id != ?3",
                params![question.owner, code, question.id],
                |row| row.get(0),
            )
            .optional()?;
        match taken {
            Some(other) => Err(DbError::Conflict(format!(
                "code '{}' is already used by question {}",
                code, other
            ))),
            None => Ok(()),
        }
    }
}

impl QuestionBank for Database {
    fn list_questions(&self, filter: &QuestionFilter) -> ApiResult<Vec<Question>> {
        Ok(self
            .list_all_questions()?
            .into_iter()
            .filter(|q| filter.matches(q))
            .collect())
    }

    fn get_question(&self, id: &str) -> ApiResult<Question> {
        self.find_question(id)?
            .ok_or_else(|| DbError::NotFound(format!("question {}", id)).into())
    }

    fn create_question(&self, question: &Question) -> ApiResult<Question> {
        self.insert_question(question)?;
        info!(question_id = %question.id, owner = ?question.owner, "question created");
        self.get_question(&question.id)
    }

    fn update_question(&self, question: &Question) -> ApiResult<Question> {
        if !self.update_question_row(question)? {
            return Err(DbError::NotFound(format!("question {}", question.id)).into());
        }
        debug!(question_id = %question.id, "question updated");
        self.get_question(&question.id)
    }

    fn delete_question(&self, id: &str) -> ApiResult<()> {
        if !self.deactivate_question(id)? {
            return Err(DbError::NotFound(format!("question {}", id)).into());
        }
        info!(question_id = id, "question deactivated");
        Ok(())
    }
}

/// Intermediate row struct for database mapping.
struct QuestionRow {
    id: String,
    text: String,
    question_type: String,
    unit: Option<String>,
    code: Option<String>,
    options: String,
    required: bool,
    origin: String,
    owner: Option<String>,
    active: bool,
    created_at: String,
}

impl QuestionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(QuestionRow {
            id: row.get(0)?,
            text: row.get(1)?,
            question_type: row.get(2)?,
            unit: row.get(3)?,
            code: row.get(4)?,
            options: row.get(5)?,
            required: row.get(6)?,
            origin: row.get(7)?,
            owner: row.get(8)?,
            active: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

impl TryFrom<QuestionRow> for Question {
    type Error = DbError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let options: Vec<AnswerOption> = serde_json::from_str(&row.options)?;
        let question_type = string_to_type(&row.question_type)?;
        let origin = string_to_origin(&row.origin)?;

        Ok(Question {
            id: row.id,
            text: row.text,
            question_type,
            unit: row.unit,
            code: row.code,
            options,
            required: row.required,
            origin,
            owner: row.owner,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

fn origin_to_string(origin: &QuestionOrigin) -> &'static str {
    match origin {
        QuestionOrigin::System => "SYSTEM",
        QuestionOrigin::Custom => "CUSTOM",
    }
}

fn string_to_origin(s: &str) -> Result<QuestionOrigin, DbError> {
    match s {
        "SYSTEM" => Ok(QuestionOrigin::System),
        "CUSTOM" => Ok(QuestionOrigin::Custom),
        _ => Err(DbError::Constraint(format!("Unknown question origin: {}", s))),
    }
}

fn string_to_type(s: &str) -> Result<QuestionType, DbError> {
    QuestionType::all()
        .into_iter()
        .find(|t| t.as_str() == s)
        .ok_or_else(|| DbError::Constraint(format!("Unknown question type: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::bank::QuestionScope;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_question(
            &Question::system("sys-peso", "Peso", QuestionType::Decimal)
                .with_code("peso_kg")
                .with_unit("kg")
                .required(),
        )
        .unwrap();
        db
    }

    #[test]
    fn test_insert_and_get_question() {
        let db = setup_db();
        let question = Question::custom("dr-1", "Comidas", QuestionType::Multi)
            .with_options(vec![AnswerOption::new("desayuno", "Desayuno")]);
        db.create_question(&question).unwrap();

        let retrieved = db.get_question(&question.id).unwrap();
        assert_eq!(retrieved, question);
        assert!(matches!(db.get_question("nope"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_code_unique_per_owner() {
        let db = setup_db();
        let mine = Question::custom("dr-1", "Peso propio", QuestionType::Decimal).with_code("peso_kg");
        db.create_question(&mine).unwrap();

        let again = Question::custom("dr-1", "Otro", QuestionType::Decimal).with_code("peso_kg");
        assert!(matches!(db.create_question(&again), Err(ApiError::Conflict { .. })));

        let other_owner = Question::custom("dr-2", "Peso", QuestionType::Decimal).with_code("peso_kg");
        assert!(db.create_question(&other_owner).is_ok());
    }

    #[test]
    fn test_system_questions_are_read_only() {
        let db = setup_db();
        let mut system = db.get_question("sys-peso").unwrap();
        system.text = "Peso corporal".into();

        assert!(matches!(db.update_question(&system), Err(ApiError::Rejected { .. })));
        assert!(matches!(db.delete_question("sys-peso"), Err(ApiError::Rejected { .. })));
    }

    #[test]
    fn test_update_and_deactivate_custom() {
        let db = setup_db();
        let mut question = Question::custom("dr-1", "Sueño", QuestionType::Text);
        db.create_question(&question).unwrap();

        question.text = "Horas de sueño".into();
        question.question_type = QuestionType::Integer;
        let updated = db.update_question(&question).unwrap();
        assert_eq!(updated.text, "Horas de sueño");
        assert_eq!(updated.question_type, QuestionType::Integer);

        db.delete_question(&question.id).unwrap();
        let filter = QuestionFilter::for_owner("dr-1");
        let listed = db.list_questions(&filter).unwrap();
        assert!(listed.iter().all(|q| q.id != question.id));
        assert!(!db.get_question(&question.id).unwrap().active);
    }

    #[test]
    fn test_list_with_filter() {
        let db = setup_db();
        db.create_question(&Question::custom("dr-1", "Mía", QuestionType::Text))
            .unwrap();
        db.create_question(&Question::custom("dr-2", "Ajena", QuestionType::Text))
            .unwrap();

        let all = db.list_questions(&QuestionFilter::for_owner("dr-1")).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].is_system());

        let custom = db
            .list_questions(&QuestionFilter::for_owner("dr-1").with_scope(QuestionScope::Custom))
            .unwrap();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].text, "Mía");
    }
}
