//! `SQLite` schema definitions for patient-intake.
//!
//! Statements are grouped by the schema version that introduces them; see
//! [`super::migrations`].

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the patients table.
///
/// Only the Argon2id PHC string of the password is stored.
pub const CREATE_PATIENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id TEXT NOT NULL UNIQUE,
    patient_name TEXT NOT NULL,
    age INTEGER NOT NULL CHECK (age >= 0),
    blood_group TEXT NOT NULL,
    gender TEXT NOT NULL,
    address TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `created_at` for recent listings.
pub const CREATE_PATIENTS_CREATED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_patients_created_at ON patients(created_at DESC)
";

/// SQL statement to create the password policy rule registry.
pub const CREATE_RULES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS validation_rules (
    rule_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    rule_type TEXT NOT NULL,
    validation_type TEXT NOT NULL,
    state TEXT NOT NULL,
    expression TEXT,
    implementation_reference TEXT,
    description TEXT NOT NULL DEFAULT '',
    order_no INTEGER NOT NULL CHECK (order_no >= 0),
    err_message_id TEXT NOT NULL
)
";

/// SQL statement to create an index on rule state and order.
pub const CREATE_RULES_ORDER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_rules_state_order ON validation_rules(state, order_no)
";

/// Statements that always run before migrations.
pub const BASE_STATEMENTS: &[&str] = &[CREATE_METADATA_TABLE];

/// Statements introduced by schema version 1.
pub const V1_STATEMENTS: &[&str] = &[CREATE_PATIENTS_TABLE, CREATE_PATIENTS_CREATED_INDEX];

/// Statements introduced by schema version 2.
pub const V2_STATEMENTS: &[&str] = &[CREATE_RULES_TABLE, CREATE_RULES_ORDER_INDEX];
