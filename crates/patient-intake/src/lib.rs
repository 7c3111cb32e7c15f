//! `patient-intake` - A patient registration web form backed by `SQLite`
//!
//! This library provides form validation, password policy evaluation,
//! Argon2id password hashing, and parameter-bound persistence for patient
//! registrations, plus the axum server that ties them together.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod intake;
pub mod logging;
pub mod password;
pub mod patient;
pub mod server;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use intake::{IntakeService, RegistrationOutcome};
pub use logging::init_logging;
pub use patient::{BloodGroup, Gender, NewPatient, PatientRecord, PatientSubmission};
pub use storage::{Storage, StorageStats};
