//! Attack catalog repository: categories and attacks.
//!
//! # Invariants
//! - Attack listings are ordered by category name, then attack name.
//! - An attack always references an existing category (foreign key).

use crate::model::catalog::{
    Attack, AttackCategory, AttackId, AttackListing, CategoryId, Severity,
};
use crate::repo::{count_u32, ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const CATEGORY_SELECT_SQL: &str = "SELECT
    id,
    name,
    mitre_tactic,
    description
FROM attack_categories";

const ATTACK_SELECT_SQL: &str = "SELECT
    a.id AS id,
    a.name AS name,
    a.category_id AS category_id,
    a.mitre_technique_id AS mitre_technique_id,
    a.severity AS severity,
    a.description AS description,
    c.name AS category_name,
    c.mitre_tactic AS mitre_tactic
FROM attacks a
INNER JOIN attack_categories c ON c.id = a.category_id";

pub trait CatalogRepository {
    fn create_category(&self, category: &AttackCategory) -> RepoResult<CategoryId>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<AttackCategory>>;
    fn find_category_by_name(&self, name: &str) -> RepoResult<Option<AttackCategory>>;
    fn list_categories(&self) -> RepoResult<Vec<AttackCategory>>;
    fn create_attack(&self, attack: &Attack) -> RepoResult<AttackId>;
    fn get_attack(&self, id: AttackId) -> RepoResult<Option<AttackListing>>;
    fn find_attack_by_name(&self, name: &str) -> RepoResult<Option<AttackListing>>;
    fn list_attacks(&self) -> RepoResult<Vec<AttackListing>>;
    fn count_attacks(&self) -> RepoResult<u32>;
}

pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["attack_categories", "attacks"])?;
        Ok(Self { conn })
    }

    fn query_categories(&self, sql: &str, key: Option<&str>) -> RepoResult<Vec<AttackCategory>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match key {
            Some(key) => stmt.query([key])?,
            None => stmt.query([])?,
        };
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    fn query_attacks(&self, sql: &str, key: Option<&str>) -> RepoResult<Vec<AttackListing>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match key {
            Some(key) => stmt.query([key])?,
            None => stmt.query([])?,
        };
        let mut attacks = Vec::new();
        while let Some(row) = rows.next()? {
            attacks.push(parse_attack_row(row)?);
        }
        Ok(attacks)
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_category(&self, category: &AttackCategory) -> RepoResult<CategoryId> {
        category.validate()?;

        self.conn.execute(
            "INSERT INTO attack_categories (id, name, mitre_tactic, description)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                category.id.to_string(),
                category.name.trim(),
                category.mitre_tactic.as_deref(),
                category.description.as_deref(),
            ],
        )?;
        Ok(category.id)
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<AttackCategory>> {
        let id_text = id.to_string();
        let mut categories = self.query_categories(
            &format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"),
            Some(id_text.as_str()),
        )?;
        Ok(categories.pop())
    }

    fn find_category_by_name(&self, name: &str) -> RepoResult<Option<AttackCategory>> {
        let mut categories = self.query_categories(
            &format!("{CATEGORY_SELECT_SQL} WHERE name = ?1 COLLATE NOCASE;"),
            Some(name.trim()),
        )?;
        Ok(categories.pop())
    }

    fn list_categories(&self) -> RepoResult<Vec<AttackCategory>> {
        self.query_categories(
            &format!("{CATEGORY_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"),
            None,
        )
    }

    fn create_attack(&self, attack: &Attack) -> RepoResult<AttackId> {
        attack.validate()?;

        self.conn.execute(
            "INSERT INTO attacks (
                id,
                name,
                category_id,
                mitre_technique_id,
                severity,
                description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                attack.id.to_string(),
                attack.name.trim(),
                attack.category_id.to_string(),
                attack.mitre_technique_id.as_deref(),
                attack.severity.as_str(),
                attack.description.as_deref(),
            ],
        )?;
        Ok(attack.id)
    }

    fn get_attack(&self, id: AttackId) -> RepoResult<Option<AttackListing>> {
        let id_text = id.to_string();
        let mut attacks = self.query_attacks(
            &format!("{ATTACK_SELECT_SQL} WHERE a.id = ?1;"),
            Some(id_text.as_str()),
        )?;
        Ok(attacks.pop())
    }

    fn find_attack_by_name(&self, name: &str) -> RepoResult<Option<AttackListing>> {
        let mut attacks = self.query_attacks(
            &format!("{ATTACK_SELECT_SQL} WHERE a.name = ?1 COLLATE NOCASE;"),
            Some(name.trim()),
        )?;
        Ok(attacks.pop())
    }

    fn list_attacks(&self) -> RepoResult<Vec<AttackListing>> {
        self.query_attacks(
            &format!(
                "{ATTACK_SELECT_SQL}
                 ORDER BY c.name COLLATE NOCASE ASC, a.name COLLATE NOCASE ASC, a.id ASC;"
            ),
            None,
        )
    }

    fn count_attacks(&self) -> RepoResult<u32> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM attacks;", [], |row| row.get(0))?;
        count_u32(count, "attacks")
    }
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<AttackCategory> {
    let id_text: String = row.get("id")?;
    let category = AttackCategory {
        id: parse_uuid(&id_text, "attack_categories.id")?,
        name: row.get("name")?,
        mitre_tactic: row.get("mitre_tactic")?,
        description: row.get("description")?,
    };
    category.validate()?;
    Ok(category)
}

fn parse_attack_row(row: &Row<'_>) -> RepoResult<AttackListing> {
    let id_text: String = row.get("id")?;
    let category_text: String = row.get("category_id")?;
    let severity_text: String = row.get("severity")?;
    let severity = Severity::parse(&severity_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid severity `{severity_text}` in attacks.severity"
        ))
    })?;

    let attack = Attack {
        id: parse_uuid(&id_text, "attacks.id")?,
        name: row.get("name")?,
        category_id: parse_uuid(&category_text, "attacks.category_id")?,
        mitre_technique_id: row.get("mitre_technique_id")?,
        severity,
        description: row.get("description")?,
    };
    attack.validate()?;

    Ok(AttackListing {
        attack,
        category_name: row.get("category_name")?,
        mitre_tactic: row.get("mitre_tactic")?,
    })
}
