//! Vendor repository contract and SQLite implementation.

use crate::model::vendor::{Vendor, VendorId, VendorType};
use crate::repo::{
    count_u32, ensure_connection_ready, parse_date, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const VENDOR_SELECT_SQL: &str = "SELECT
    id,
    name,
    vendor_type,
    description,
    test_version,
    test_date
FROM vendors";

pub trait VendorRepository {
    fn create_vendor(&self, vendor: &Vendor) -> RepoResult<VendorId>;
    fn update_vendor(&self, vendor: &Vendor) -> RepoResult<()>;
    fn get_vendor(&self, id: VendorId) -> RepoResult<Option<Vendor>>;
    /// Case-insensitive exact name lookup.
    fn find_vendor_by_name(&self, name: &str) -> RepoResult<Option<Vendor>>;
    /// Lists vendors ordered by name.
    fn list_vendors(&self) -> RepoResult<Vec<Vendor>>;
    fn count_vendors(&self) -> RepoResult<u32>;
}

pub struct SqliteVendorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVendorRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["vendors"])?;
        Ok(Self { conn })
    }
}

impl VendorRepository for SqliteVendorRepository<'_> {
    fn create_vendor(&self, vendor: &Vendor) -> RepoResult<VendorId> {
        vendor.validate()?;

        self.conn.execute(
            "INSERT INTO vendors (
                id,
                name,
                vendor_type,
                description,
                test_version,
                test_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                vendor.id.to_string(),
                vendor.name.trim(),
                vendor.vendor_type.as_str(),
                vendor.description.as_deref(),
                vendor.test_version.as_deref(),
                vendor.test_date.map(|date| date.to_string()),
            ],
        )?;

        Ok(vendor.id)
    }

    fn update_vendor(&self, vendor: &Vendor) -> RepoResult<()> {
        vendor.validate()?;

        let changed = self.conn.execute(
            "UPDATE vendors
             SET
                name = ?2,
                vendor_type = ?3,
                description = ?4,
                test_version = ?5,
                test_date = ?6
             WHERE id = ?1;",
            params![
                vendor.id.to_string(),
                vendor.name.trim(),
                vendor.vendor_type.as_str(),
                vendor.description.as_deref(),
                vendor.test_version.as_deref(),
                vendor.test_date.map(|date| date.to_string()),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("vendor", vendor.id));
        }
        Ok(())
    }

    fn get_vendor(&self, id: VendorId) -> RepoResult<Option<Vendor>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{VENDOR_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_vendor_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_vendor_by_name(&self, name: &str) -> RepoResult<Option<Vendor>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{VENDOR_SELECT_SQL} WHERE name = ?1 COLLATE NOCASE;"))?;
        let mut rows = stmt.query([name.trim()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_vendor_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_vendors(&self) -> RepoResult<Vec<Vendor>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VENDOR_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut vendors = Vec::new();
        while let Some(row) = rows.next()? {
            vendors.push(parse_vendor_row(row)?);
        }
        Ok(vendors)
    }

    fn count_vendors(&self) -> RepoResult<u32> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM vendors;", [], |row| row.get(0))?;
        count_u32(count, "vendors")
    }
}

fn parse_vendor_row(row: &Row<'_>) -> RepoResult<Vendor> {
    let id_text: String = row.get("id")?;
    let type_text: String = row.get("vendor_type")?;
    let vendor_type = VendorType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid vendor type `{type_text}` in vendors.vendor_type"
        ))
    })?;
    let test_date = match row.get::<_, Option<String>>("test_date")? {
        Some(value) => Some(parse_date(&value, "vendors.test_date")?),
        None => None,
    };

    let vendor = Vendor {
        id: parse_uuid(&id_text, "vendors.id")?,
        name: row.get("name")?,
        vendor_type,
        description: row.get("description")?,
        test_version: row.get("test_version")?,
        test_date,
    };
    vendor.validate()?;
    Ok(vendor)
}
