//! Storage layer for patient-intake.
//!
//! This module provides `SQLite`-based persistent storage for registered
//! patients and the password rule registry. Every statement is
//! parameter-bound; submitted values never become part of the SQL text.

pub mod migrations;
mod rules;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::patient::{BloodGroup, Gender, NewPatient, PatientRecord};

pub use rules::RuleFilter;

const PATIENT_COLUMNS: &str = "id, patient_id, patient_name, age, blood_group, gender, address, \
                               password_hash, created_at";

/// Storage engine for patients and password rules.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Patient registration with duplicate-ID protection
/// - Paged patient listings
/// - The password rule registry
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// A fresh database is seeded with the default password rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, true)
    }

    /// Open the database named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open_with(config.database_path(), config.policy.seed_default_rules)
    }

    /// Open or create a storage database, choosing whether a fresh rule
    /// registry receives the default rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open_with(path: impl AsRef<Path>, seed_default_rules: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn, seed_default_rules)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance with the default rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn, true)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a validated patient with an already-hashed password.
    ///
    /// Returns the assigned row id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatePatient`] if the patient ID is already
    /// registered, or an error if the database operation fails.
    pub fn insert_patient(&self, patient: &NewPatient, password_hash: &str) -> Result<i64> {
        if self.patient_exists(&patient.patient_id)? {
            return Err(Error::DuplicatePatient {
                patient_id: patient.patient_id.clone(),
            });
        }

        let created_at = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            r"
            INSERT INTO patients
                (patient_id, patient_name, age, blood_group, gender, address, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                patient.patient_id,
                patient.patient_name,
                patient.age,
                patient.blood_group.label(),
                patient.gender.value(),
                patient.address,
                password_hash,
                created_at,
            ],
        );

        match inserted {
            Ok(_) => {}
            // Lost a race with a concurrent insert of the same ID
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(Error::DuplicatePatient {
                    patient_id: patient.patient_id.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let id = self.conn.last_insert_rowid();
        debug!(id, "Inserted patient");
        Ok(id)
    }

    /// Check whether a patient ID is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn patient_exists(&self, patient_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE patient_id = ?1",
            [patient_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get a patient by patient ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE patient_id = ?1");
        let result = self
            .conn
            .query_row(&sql, [patient_id], Self::row_to_patient)
            .optional()?;
        Ok(result)
    }

    /// List patients in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_patients(&self, limit: usize, offset: usize) -> Result<Vec<PatientRecord>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY id ASC LIMIT ?1 OFFSET ?2");
        let mut stmt = self.conn.prepare(&sql)?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset_i64 = i64::try_from(offset).unwrap_or(i64::MAX);
        let patients = stmt
            .query_map(params![limit_i64, offset_i64], Self::row_to_patient)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(patients)
    }

    /// Count registered patients.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_patients(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_patients = self.count_patients()?;
        let total_rules = self.count_rules(None)?;
        let enabled_rules = self.count_rules(Some(crate::password::RuleState::Enabled))?;

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT created_at FROM patients ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let newest_registration = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        // Get database file size
        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_patients,
            total_rules,
            enabled_rules,
            newest_registration,
            db_size_bytes,
        })
    }

    /// Convert a database row to a `PatientRecord`.
    fn row_to_patient(row: &rusqlite::Row) -> rusqlite::Result<PatientRecord> {
        let blood_group_str: String = row.get(4)?;
        let gender_str: String = row.get(5)?;
        let created_at_str: String = row.get(8)?;

        let blood_group = blood_group_str.parse().unwrap_or_else(|_| {
            warn!(
                "Unknown blood group: {}, defaulting to Unknown",
                blood_group_str
            );
            BloodGroup::Unknown
        });
        let gender = gender_str.parse().unwrap_or_else(|_| {
            warn!("Unknown gender: {}, defaulting to other", gender_str);
            Gender::Other
        });
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

        Ok(PatientRecord {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            patient_name: row.get(2)?,
            age: row.get(3)?,
            blood_group,
            gender,
            address: row.get(6)?,
            password_hash: row.get(7)?,
            created_at,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of registered patients.
    pub total_patients: i64,
    /// Total number of password rules.
    pub total_rules: i64,
    /// Number of enabled password rules.
    pub enabled_rules: i64,
    /// When the most recent patient was registered.
    pub newest_registration: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
