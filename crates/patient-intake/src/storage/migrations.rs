//! Database migration system for patient-intake.
//!
//! This module handles database schema versioning and migrations,
//! ensuring the database schema stays up-to-date as the application evolves.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::password::default_rules;

use super::rules::insert_rule;
use super::schema::{BASE_STATEMENTS, V1_STATEMENTS, V2_STATEMENTS};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates the metadata table, then runs any pending migrations to bring
/// the schema up to the current version. When `seed_default_rules` is set,
/// the migration that creates the rule registry also fills it with
/// [`default_rules`].
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection, seed_default_rules: bool) -> Result<()> {
    for statement in BASE_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version < CURRENT_VERSION {
        run_migrations(conn, version, seed_default_rules)?;
    } else if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
///
/// Each step commits on its own, so an interrupted run resumes where it stopped.
fn run_migrations(conn: &Connection, from_version: i32, seed_default_rules: bool) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        let tx = conn.unchecked_transaction()?;
        run_migration(&tx, current, seed_default_rules)?;
        set_schema_version(&tx, current)?;
        tx.commit()?;
        info!(version = current, "Applied schema migration");
    }

    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32, seed_default_rules: bool) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn, seed_default_rules),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Migration to version 1: the patients table.
fn migrate_v1(conn: &Connection) -> Result<()> {
    for statement in V1_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}

/// Migration to version 2: the password rule registry.
fn migrate_v2(conn: &Connection, seed_default_rules: bool) -> Result<()> {
    for statement in V2_STATEMENTS {
        conn.execute(statement, [])?;
    }

    if seed_default_rules {
        let rules = default_rules();
        for rule in &rules {
            let rule_id = rule
                .rule_id
                .as_deref()
                .ok_or_else(|| Error::internal("default rule without id"))?;
            insert_rule(conn, rule, rule_id)?;
        }
        debug!(count = rules.len(), "Seeded default password rules");
    }
    Ok(())
}
