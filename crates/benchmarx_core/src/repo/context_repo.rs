//! Context profile and weight repository.
//!
//! # Invariants
//! - A weight targets exactly one category or one attack.
//! - Setting a weight for an existing target replaces it in place.

use crate::model::context::{
    validate_weight, CompanySize, ContextId, ContextProfile, ContextWeight, SecurityMaturity,
    WeightTarget,
};
use crate::model::catalog::CategoryId;
use crate::repo::{count_u32, ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const CONTEXT_SELECT_SQL: &str = "SELECT
    id,
    name,
    industry,
    company_size,
    security_maturity,
    description
FROM context_profiles";

pub trait ContextRepository {
    fn create_context(&self, context: &ContextProfile) -> RepoResult<ContextId>;
    fn get_context(&self, id: ContextId) -> RepoResult<Option<ContextProfile>>;
    fn find_context_by_name(&self, name: &str) -> RepoResult<Option<ContextProfile>>;
    fn list_contexts(&self) -> RepoResult<Vec<ContextProfile>>;
    fn count_contexts(&self) -> RepoResult<u32>;
    /// Inserts or replaces the weight for `target` in `context_id`.
    fn set_weight(
        &self,
        context_id: ContextId,
        target: WeightTarget,
        weight: f64,
        rationale: Option<&str>,
    ) -> RepoResult<()>;
    fn remove_weight(&self, context_id: ContextId, target: WeightTarget) -> RepoResult<bool>;
    fn category_weight(
        &self,
        context_id: ContextId,
        category_id: CategoryId,
    ) -> RepoResult<Option<f64>>;
    /// Lists weights of one context by `weight DESC`, then target name.
    fn list_weights(&self, context_id: ContextId) -> RepoResult<Vec<ContextWeight>>;
}

pub struct SqliteContextRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContextRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["context_profiles", "context_weights"])?;
        Ok(Self { conn })
    }

    fn query_contexts(&self, sql: &str, key: Option<&str>) -> RepoResult<Vec<ContextProfile>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match key {
            Some(key) => stmt.query([key])?,
            None => stmt.query([])?,
        };
        let mut contexts = Vec::new();
        while let Some(row) = rows.next()? {
            contexts.push(parse_context_row(row)?);
        }
        Ok(contexts)
    }
}

impl ContextRepository for SqliteContextRepository<'_> {
    fn create_context(&self, context: &ContextProfile) -> RepoResult<ContextId> {
        context.validate()?;

        self.conn.execute(
            "INSERT INTO context_profiles (
                id,
                name,
                industry,
                company_size,
                security_maturity,
                description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                context.id.to_string(),
                context.name.trim(),
                context.industry.trim(),
                context.company_size.as_str(),
                context.security_maturity.as_str(),
                context.description.as_deref(),
            ],
        )?;
        Ok(context.id)
    }

    fn get_context(&self, id: ContextId) -> RepoResult<Option<ContextProfile>> {
        let id_text = id.to_string();
        let mut contexts = self.query_contexts(
            &format!("{CONTEXT_SELECT_SQL} WHERE id = ?1;"),
            Some(id_text.as_str()),
        )?;
        Ok(contexts.pop())
    }

    fn find_context_by_name(&self, name: &str) -> RepoResult<Option<ContextProfile>> {
        let mut contexts = self.query_contexts(
            &format!("{CONTEXT_SELECT_SQL} WHERE name = ?1 COLLATE NOCASE;"),
            Some(name.trim()),
        )?;
        Ok(contexts.pop())
    }

    fn list_contexts(&self) -> RepoResult<Vec<ContextProfile>> {
        self.query_contexts(
            &format!("{CONTEXT_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"),
            None,
        )
    }

    fn count_contexts(&self) -> RepoResult<u32> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM context_profiles;", [], |row| {
                row.get(0)
            })?;
        count_u32(count, "context_profiles")
    }

    fn set_weight(
        &self,
        context_id: ContextId,
        target: WeightTarget,
        weight: f64,
        rationale: Option<&str>,
    ) -> RepoResult<()> {
        validate_weight(weight)?;
        if self.get_context(context_id)?.is_none() {
            return Err(RepoError::not_found("context", context_id));
        }

        let (category_id, attack_id) = target_columns(target);
        let changed = self.conn.execute(
            "UPDATE context_weights
             SET
                weight = ?4,
                rationale = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE context_profile_id = ?1
               AND attack_category_id IS ?2
               AND attack_id IS ?3;",
            params![
                context_id.to_string(),
                category_id,
                attack_id,
                weight,
                rationale
            ],
        )?;
        if changed > 0 {
            return Ok(());
        }

        self.conn.execute(
            "INSERT INTO context_weights (
                id,
                context_profile_id,
                attack_category_id,
                attack_id,
                weight,
                rationale
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                Uuid::new_v4().to_string(),
                context_id.to_string(),
                category_id,
                attack_id,
                weight,
                rationale,
            ],
        )?;
        Ok(())
    }

    fn remove_weight(&self, context_id: ContextId, target: WeightTarget) -> RepoResult<bool> {
        let (category_id, attack_id) = target_columns(target);
        let changed = self.conn.execute(
            "DELETE FROM context_weights
             WHERE context_profile_id = ?1
               AND attack_category_id IS ?2
               AND attack_id IS ?3;",
            params![context_id.to_string(), category_id, attack_id],
        )?;
        Ok(changed > 0)
    }

    fn category_weight(
        &self,
        context_id: ContextId,
        category_id: CategoryId,
    ) -> RepoResult<Option<f64>> {
        let weight = self
            .conn
            .query_row(
                "SELECT weight
                 FROM context_weights
                 WHERE context_profile_id = ?1
                   AND attack_category_id = ?2;",
                [context_id.to_string(), category_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(weight)
    }

    fn list_weights(&self, context_id: ContextId) -> RepoResult<Vec<ContextWeight>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                cw.attack_category_id AS attack_category_id,
                cw.attack_id AS attack_id,
                COALESCE(c.name, a.name) AS target_name,
                cw.weight AS weight,
                cw.rationale AS rationale
             FROM context_weights cw
             LEFT JOIN attack_categories c ON c.id = cw.attack_category_id
             LEFT JOIN attacks a ON a.id = cw.attack_id
             WHERE cw.context_profile_id = ?1
             ORDER BY cw.weight DESC, target_name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([context_id.to_string()])?;
        let mut weights = Vec::new();
        while let Some(row) = rows.next()? {
            weights.push(parse_weight_row(context_id, row)?);
        }
        Ok(weights)
    }
}

fn target_columns(target: WeightTarget) -> (Option<String>, Option<String>) {
    match target {
        WeightTarget::Category(id) => (Some(id.to_string()), None),
        WeightTarget::Attack(id) => (None, Some(id.to_string())),
    }
}

fn parse_context_row(row: &Row<'_>) -> RepoResult<ContextProfile> {
    let id_text: String = row.get("id")?;
    let size_text: String = row.get("company_size")?;
    let maturity_text: String = row.get("security_maturity")?;

    let context = ContextProfile {
        id: parse_uuid(&id_text, "context_profiles.id")?,
        name: row.get("name")?,
        industry: row.get("industry")?,
        company_size: CompanySize::parse(&size_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid company size `{size_text}` in context_profiles.company_size"
            ))
        })?,
        security_maturity: SecurityMaturity::parse(&maturity_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid maturity `{maturity_text}` in context_profiles.security_maturity"
            ))
        })?,
        description: row.get("description")?,
    };
    context.validate()?;
    Ok(context)
}

fn parse_weight_row(context_id: ContextId, row: &Row<'_>) -> RepoResult<ContextWeight> {
    let category_text: Option<String> = row.get("attack_category_id")?;
    let attack_text: Option<String> = row.get("attack_id")?;
    let target = match (category_text, attack_text) {
        (Some(category), None) => WeightTarget::Category(parse_uuid(
            &category,
            "context_weights.attack_category_id",
        )?),
        (None, Some(attack)) => {
            WeightTarget::Attack(parse_uuid(&attack, "context_weights.attack_id")?)
        }
        _ => {
            return Err(RepoError::InvalidData(
                "context weight must target exactly one category or attack".to_string(),
            ));
        }
    };

    let weight: f64 = row.get("weight")?;
    validate_weight(weight)?;
    Ok(ContextWeight {
        context_id,
        target,
        target_name: row.get("target_name")?,
        weight,
        rationale: row.get("rationale")?,
    })
}
