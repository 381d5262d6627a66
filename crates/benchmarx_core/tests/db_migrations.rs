use benchmarx_core::db::migrations::{apply_migrations, latest_version};
use benchmarx_core::db::{open_db, open_db_in_memory, DbError};
use benchmarx_core::repo::score_repo::{ScoreRepository, SqliteScoreRepository};
use benchmarx_core::repo::vendor_repo::SqliteVendorRepository;
use benchmarx_core::RepoError;
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "vendors",
        "attack_categories",
        "attacks",
        "benchmarks",
        "detection_results",
        "context_profiles",
        "context_weights",
        "scoring_rules",
        "scored_results",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn default_scoring_rule_is_seeded_and_active() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteScoreRepository::try_new(&conn).unwrap();

    let rule = repo.active_rule().unwrap().unwrap();
    assert_eq!(rule.version, "v1.0");
    assert_eq!(rule.active_points, 2.0);
    assert_eq!(rule.dynamic_points, 1.0);
    assert_eq!(rule.no_evid_points, 0.0);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("benchmarx.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let rules: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM scoring_rules;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rules, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failing_migration_is_named_and_rolled_back() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();

    let err = apply_migrations(&mut conn).unwrap_err();

    match err {
        DbError::Migration { version, name, .. } => {
            assert_eq!(version, 2);
            assert_eq!(name, "default_scoring_rule");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(schema_version(&conn), 1);
}

#[test]
fn repositories_reject_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteVendorRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn repositories_reject_missing_tables() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE scored_results;").unwrap();

    let err = SqliteScoreRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("scored_results")));
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
