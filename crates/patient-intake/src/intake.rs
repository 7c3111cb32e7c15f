//! Patient registration.
//!
//! [`IntakeService`] is the single write path for patient records: it
//! validates a [`PatientSubmission`], applies the password policy, hashes the
//! password and stores exactly one row. Rejections are returned as values;
//! only infrastructure failures surface as errors.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::password::{PasswordHasher, PasswordPolicy, Rule, ValidationOutcome};
use crate::patient::{IntakeLimits, PatientRecord, PatientSubmission};
use crate::storage::Storage;

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The patient was stored.
    Registered(PatientRecord),
    /// The submission was refused; nothing was stored.
    Rejected(Vec<String>),
}

impl RegistrationOutcome {
    /// Whether the patient was stored.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }
}

/// Registers patients against shared storage.
#[derive(Debug)]
pub struct IntakeService {
    storage: Mutex<Storage>,
    hasher: PasswordHasher,
    limits: IntakeLimits,
    enforce_rules: bool,
}

impl IntakeService {
    /// Create a service over an open storage.
    #[must_use]
    pub fn new(
        storage: Storage,
        hasher: PasswordHasher,
        limits: IntakeLimits,
        enforce_rules: bool,
    ) -> Self {
        Self {
            storage: Mutex::new(storage),
            hasher,
            limits,
            enforce_rules,
        }
    }

    /// Open the configured database and build a service from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the Argon2
    /// parameters are rejected.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = Storage::from_config(config)?;
        let hasher = PasswordHasher::from_config(config)?;
        Ok(Self::new(
            storage,
            hasher,
            config.intake_limits(),
            config.policy.enforce_rules,
        ))
    }

    /// Run a closure with exclusive access to the storage.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or [`Error::Internal`] if the storage
    /// lock was poisoned.
    pub fn with_storage<T>(&self, f: impl FnOnce(&Storage) -> Result<T>) -> Result<T> {
        let storage = self.lock()?;
        f(&storage)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Storage>> {
        self.storage
            .lock()
            .map_err(|_| Error::internal("storage lock poisoned"))
    }

    /// Register a patient from a form submission.
    ///
    /// Field validation (including the password confirmation) runs first,
    /// then the password policy, then the duplicate check. The password is
    /// hashed only once all of these pass, and nothing is written unless the
    /// outcome is [`RegistrationOutcome::Registered`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatePatient`] if the patient ID is taken,
    /// [`Error::RuleEvaluation`] if a strong rule cannot run, or a storage or
    /// hashing error.
    #[instrument(skip_all, fields(patient_id = submission.patient_id.as_deref().unwrap_or_default()))]
    pub fn register(&self, submission: &PatientSubmission) -> Result<RegistrationOutcome> {
        let patient = match submission.validate(&self.limits) {
            Ok(patient) => patient,
            Err(errors) => {
                debug!(count = errors.len(), "Submission failed field validation");
                return Ok(RegistrationOutcome::Rejected(
                    errors.into_iter().map(|e| e.message).collect(),
                ));
            }
        };

        {
            let storage = self.lock()?;

            if self.enforce_rules {
                let rules = storage.enabled_rules()?;
                let outcome = PasswordPolicy::new(rules.iter().cloned())
                    .validate(&patient.password, Some(&patient.patient_id))?;
                if !outcome.is_valid() {
                    debug!(failed = outcome.messages.len(), "Password failed policy");
                    return Ok(RegistrationOutcome::Rejected(describe_failures(
                        &outcome, &rules,
                    )));
                }
            }

            if storage.patient_exists(&patient.patient_id)? {
                return Err(Error::DuplicatePatient {
                    patient_id: patient.patient_id,
                });
            }
        }

        // Hashing is slow; keep it outside the lock
        let password_hash = self.hasher.hash(&patient.password)?;

        let storage = self.lock()?;
        storage.insert_patient(&patient, &password_hash)?;
        let record = storage
            .get_patient(&patient.patient_id)?
            .ok_or_else(|| Error::internal("inserted patient not found"))?;

        info!(id = record.id, "Registered patient");
        Ok(RegistrationOutcome::Registered(record))
    }

    /// Check a password against the enabled rules without storing anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RuleEvaluation`] if a strong rule cannot run, or a
    /// storage error.
    pub fn check_password(
        &self,
        password: &str,
        patient_id: Option<&str>,
    ) -> Result<ValidationOutcome> {
        let rules = self.lock()?.enabled_rules()?;
        PasswordPolicy::new(rules).validate(password, patient_id)
    }

    /// Verify a password against a registered patient's stored hash.
    ///
    /// Returns `None` if the patient is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash is unreadable or storage fails.
    pub fn verify_password(&self, patient_id: &str, password: &str) -> Result<Option<bool>> {
        let Some(record) = self.lock()?.get_patient(patient_id)? else {
            return Ok(None);
        };
        self.hasher.verify(password, &record.password_hash).map(Some)
    }
}

/// Turn failed message ids into readable messages using the rule descriptions.
fn describe_failures(outcome: &ValidationOutcome, rules: &[Rule]) -> Vec<String> {
    outcome
        .messages
        .iter()
        .map(|id| {
            rules
                .iter()
                .find(|r| &r.err_message_id == id && !r.description.is_empty())
                .map_or_else(|| id.clone(), |r| r.description.clone())
        })
        .collect()
}
