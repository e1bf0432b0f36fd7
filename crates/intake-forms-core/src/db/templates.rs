//! Template database operations.

use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info, warn};

use super::{bool_to_int, Database, DbError, DbResult};
use crate::api::{ApiResult, TemplateApi};
use crate::models::{Category, ConsultType, Template, TemplateQuestionConfig};

const TEMPLATE_COLUMNS: &str = "id, owner, name, description, consult_type, is_default, active, \
     config, categories, question_configs, created_at, updated_at";

impl Database {
    /// Insert a template after checking it is well formed.
    pub fn insert_template(&self, template: &Template) -> DbResult<()> {
        self.check_template(template)?;
        let tx = self.conn.unchecked_transaction()?;
        self.clear_other_defaults(template)?;
        self.conn.execute(
            r#"
            INSERT INTO templates (
                id, owner, name, description, consult_type, is_default, active,
                config, categories, question_configs, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                template.id,
                template.owner,
                template.name.trim(),
                template.description,
                template.consult_type.as_str(),
                bool_to_int(template.is_default),
                bool_to_int(template.active),
                serde_json::to_string(&template.config)?,
                serde_json::to_string(&template.categories)?,
                serde_json::to_string(&template.question_configs)?,
                template.created_at,
                template.updated_at,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Overwrite a template. Last write wins; there is no version check.
    pub fn update_template_row(&self, template: &Template) -> DbResult<bool> {
        self.check_template(template)?;
        let tx = self.conn.unchecked_transaction()?;
        self.clear_other_defaults(template)?;
        let rows_affected = self.conn.execute(
            r#"
            UPDATE templates SET
                owner = ?2,
                name = ?3,
                description = ?4,
                consult_type = ?5,
                is_default = ?6,
                active = ?7,
                config = ?8,
                categories = ?9,
                question_configs = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
            params![
                template.id,
                template.owner,
                template.name.trim(),
                template.description,
                template.consult_type.as_str(),
                bool_to_int(template.is_default),
                bool_to_int(template.active),
                serde_json::to_string(&template.config)?,
                serde_json::to_string(&template.categories)?,
                serde_json::to_string(&template.question_configs)?,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(rows_affected > 0)
    }

    /// Get a template by ID.
    pub fn find_template(&self, id: &str) -> DbResult<Option<Template>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM templates WHERE id = ?", TEMPLATE_COLUMNS),
                [id],
                TemplateRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Templates visible to an owner: system ones plus their own, defaults first.
    pub fn list_templates_for(
        &self,
        owner: Option<&str>,
        consult_type: Option<ConsultType>,
    ) -> DbResult<Vec<Template>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM templates
            WHERE (owner IS NULL OR owner IS ?1)
              AND (?2 IS NULL OR consult_type = ?2)
            ORDER BY is_default DESC, name COLLATE NOCASE, created_at
            "#,
            TEMPLATE_COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![owner, consult_type.map(|t| t.as_str())],
            TemplateRow::from_row,
        )?;

        let mut templates = Vec::new();
        for row in rows {
            templates.push(row?.try_into()?);
        }
        Ok(templates)
    }

    /// Delete a template. Consultations keep their snapshots; their reference is nulled.
    pub fn delete_template_row(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM templates WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Deep copy under a new ID. Copies are never default.
    pub fn duplicate_template_row(
        &self,
        id: &str,
        name: &str,
        owner: Option<&str>,
    ) -> DbResult<Template> {
        let source = self
            .find_template(id)?
            .ok_or_else(|| DbError::NotFound(format!("template {}", id)))?;

        let mut copy = Template::new(owner.map(str::to_string), name.trim(), source.consult_type);
        copy.description = source.description;
        copy.config = source.config;
        copy.categories = source.categories;
        copy.question_configs = source.question_configs;
        self.insert_template(&copy)?;
        Ok(copy)
    }

    /// Store-side rules: well-formed composition and question ownership.
    fn check_template(&self, template: &Template) -> DbResult<()> {
        template
            .validate()
            .map_err(|err| DbError::Constraint(err.to_string()))?;

        for config in &template.question_configs {
            let question = self.find_question(&config.question_id)?.ok_or_else(|| {
                DbError::Constraint(format!("unknown question {}", config.question_id))
            })?;
            if !question.usable_by(template.owner.as_deref()) {
                warn!(
                    template_id = %template.id,
                    question_id = %question.id,
                    "custom question belongs to another practitioner"
                );
                return Err(DbError::Constraint(format!(
                    "question {} belongs to another practitioner",
                    question.id
                )));
            }
        }
        Ok(())
    }

    fn clear_other_defaults(&self, template: &Template) -> DbResult<()> {
        if !(template.is_default && template.active) {
            return Ok(());
        }
        let cleared = self.conn.execute(
            r#"
            UPDATE templates SET is_default = 0, updated_at = ?4
            WHERE owner IS ?1 AND consult_type = ?2 AND id != ?3 AND is_default = 1
            "#,
            params![
                template.owner,
                template.consult_type.as_str(),
                template.id,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        if cleared > 0 {
            debug!(template_id = %template.id, cleared, "previous default template cleared");
        }
        Ok(())
    }
}

impl TemplateApi for Database {
    fn list_templates(
        &self,
        owner: Option<&str>,
        consult_type: Option<ConsultType>,
    ) -> ApiResult<Vec<Template>> {
        Ok(self.list_templates_for(owner, consult_type)?)
    }

    fn get_template(&self, id: &str) -> ApiResult<Template> {
        self.find_template(id)?
            .ok_or_else(|| DbError::NotFound(format!("template {}", id)).into())
    }

    fn create_template(&self, template: &Template) -> ApiResult<Template> {
        self.insert_template(template)?;
        info!(template_id = %template.id, name = %template.name, "template created");
        self.get_template(&template.id)
    }

    fn update_template(&self, template: &Template) -> ApiResult<Template> {
        if !self.update_template_row(template)? {
            return Err(DbError::NotFound(format!("template {}", template.id)).into());
        }
        info!(template_id = %template.id, "template updated");
        self.get_template(&template.id)
    }

    fn delete_template(&self, id: &str) -> ApiResult<()> {
        if !self.delete_template_row(id)? {
            return Err(DbError::NotFound(format!("template {}", id)).into());
        }
        info!(template_id = id, "template deleted");
        Ok(())
    }

    fn duplicate_template(&self, id: &str, name: &str, owner: Option<&str>) -> ApiResult<Template> {
        let copy = self.duplicate_template_row(id, name, owner)?;
        info!(source_id = id, template_id = %copy.id, "template duplicated");
        Ok(copy)
    }
}

/// Intermediate row struct for database mapping.
struct TemplateRow {
    id: String,
    owner: Option<String>,
    name: String,
    description: Option<String>,
    consult_type: String,
    is_default: bool,
    active: bool,
    config: String,
    categories: String,
    question_configs: String,
    created_at: String,
    updated_at: String,
}

impl TemplateRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TemplateRow {
            id: row.get(0)?,
            owner: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            consult_type: row.get(4)?,
            is_default: row.get(5)?,
            active: row.get(6)?,
            config: row.get(7)?,
            categories: row.get(8)?,
            question_configs: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl TryFrom<TemplateRow> for Template {
    type Error = DbError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        let categories: Vec<Category> = serde_json::from_str(&row.categories)?;
        let question_configs: Vec<TemplateQuestionConfig> =
            serde_json::from_str(&row.question_configs)?;
        let consult_type = string_to_consult_type(&row.consult_type)?;

        Ok(Template {
            id: row.id,
            owner: row.owner,
            name: row.name,
            description: row.description,
            consult_type,
            is_default: row.is_default,
            active: row.active,
            config: serde_json::from_str(&row.config)?,
            categories,
            question_configs,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(super) fn string_to_consult_type(s: &str) -> Result<ConsultType, DbError> {
    ConsultType::parse(s).ok_or_else(|| DbError::Constraint(format!("Unknown consult type: {}", s)))
}
