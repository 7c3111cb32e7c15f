//! Patient record types and form field validation.
//!
//! A submission arrives as raw, optional strings. [`PatientSubmission::validate`]
//! turns it into a [`NewPatient`] or the full list of field problems; only a
//! `NewPatient` can reach storage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message reported when the password and its confirmation differ.
pub const PASSWORD_MISMATCH: &str = "Passwords do not match";

/// Blood group options offered by the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    /// A, Rh positive.
    #[serde(rename = "A Positive")]
    APositive,
    /// A, Rh negative.
    #[serde(rename = "A Negative")]
    ANegative,
    /// A, Rh unknown.
    #[serde(rename = "A Unknown")]
    AUnknown,
    /// B, Rh positive.
    #[serde(rename = "B Positive")]
    BPositive,
    /// B, Rh negative.
    #[serde(rename = "B Negative")]
    BNegative,
    /// B, Rh unknown.
    #[serde(rename = "B Unknown")]
    BUnknown,
    /// AB, Rh positive.
    #[serde(rename = "AB Positive")]
    AbPositive,
    /// AB, Rh negative.
    #[serde(rename = "AB Negative")]
    AbNegative,
    /// AB, Rh unknown.
    #[serde(rename = "AB Unknown")]
    AbUnknown,
    /// O, Rh positive.
    #[serde(rename = "O Positive")]
    OPositive,
    /// O, Rh negative.
    #[serde(rename = "O Negative")]
    ONegative,
    /// O, Rh unknown.
    #[serde(rename = "O Unknown")]
    OUnknown,
    /// Blood group not known.
    #[serde(rename = "Unknown")]
    Unknown,
}

impl BloodGroup {
    /// Every option, in form order.
    pub const ALL: [BloodGroup; 13] = [
        Self::APositive,
        Self::ANegative,
        Self::AUnknown,
        Self::BPositive,
        Self::BNegative,
        Self::BUnknown,
        Self::AbPositive,
        Self::AbNegative,
        Self::AbUnknown,
        Self::OPositive,
        Self::ONegative,
        Self::OUnknown,
        Self::Unknown,
    ];

    /// The label shown in the form and stored in the database.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::APositive => "A Positive",
            Self::ANegative => "A Negative",
            Self::AUnknown => "A Unknown",
            Self::BPositive => "B Positive",
            Self::BNegative => "B Negative",
            Self::BUnknown => "B Unknown",
            Self::AbPositive => "AB Positive",
            Self::AbNegative => "AB Negative",
            Self::AbUnknown => "AB Unknown",
            Self::OPositive => "O Positive",
            Self::ONegative => "O Negative",
            Self::OUnknown => "O Unknown",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BloodGroup {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|group| group.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown blood group: {s}"))
    }
}

/// Gender options offered by the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Other.
    Other,
}

impl Gender {
    /// Every option, in form order.
    pub const ALL: [Gender; 3] = [Self::Male, Self::Female, Self::Other];

    /// The submitted and stored value.
    #[must_use]
    pub fn value(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }

    /// The label shown in the form.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|gender| gender.value().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown gender: {s}"))
    }
}

/// Limits applied while validating a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    /// Largest accepted age in years.
    pub max_age: u16,
    /// Maximum length of single-line fields, in characters.
    pub max_field_length: usize,
    /// Maximum length of the address, in characters.
    pub max_address_length: usize,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_age: 150,
            max_field_length: 255,
            max_address_length: 1_000,
        }
    }
}

/// A problem with one submitted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Canonical field name.
    pub field: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Raw form submission.
///
/// Accepts the canonical field names as well as both legacy naming schemes
/// (`patientid`/`pass`/`passr` and `PATIENT_ID`/`PASSWORD`/`psw_repeat`).
#[derive(Clone, Default, Deserialize)]
pub struct PatientSubmission {
    /// Patient identifier.
    #[serde(default, alias = "patientid", alias = "PATIENT_ID")]
    pub patient_id: Option<String>,
    /// Patient name.
    #[serde(default, alias = "patientname", alias = "PATIENT_NAME")]
    pub patient_name: Option<String>,
    /// Chosen password.
    #[serde(default, alias = "pass", alias = "PASSWORD")]
    pub password: Option<String>,
    /// Repeated password.
    #[serde(default, alias = "passr", alias = "psw_repeat")]
    pub password_confirmation: Option<String>,
    /// Age in whole years, as typed.
    #[serde(default, alias = "AGE")]
    pub age: Option<String>,
    /// Blood group label.
    #[serde(default, alias = "bloodgroup", alias = "BLOOD_GROUP")]
    pub blood_group: Option<String>,
    /// Gender value.
    #[serde(default, alias = "GENDER")]
    pub gender: Option<String>,
    /// Postal address.
    #[serde(default, alias = "ADDRESS")]
    pub address: Option<String>,
}

impl fmt::Debug for PatientSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatientSubmission")
            .field("patient_id", &self.patient_id)
            .field("patient_name", &self.patient_name)
            .field("password", &redacted(self.password.as_deref()))
            .field(
                "password_confirmation",
                &redacted(self.password_confirmation.as_deref()),
            )
            .field("age", &self.age)
            .field("blood_group", &self.blood_group)
            .field("gender", &self.gender)
            .field("address", &self.address)
            .finish()
    }
}

fn redacted(value: Option<&str>) -> Option<&'static str> {
    value.map(|_| "[REDACTED]")
}

/// Return the value when it is present and not blank.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl PatientSubmission {
    /// Validate every field, collecting all problems.
    ///
    /// The password comparison happens here, so a mismatched confirmation can
    /// never produce a [`NewPatient`].
    ///
    /// # Errors
    ///
    /// Returns every [`FieldError`] found when the submission is not acceptable.
    pub fn validate(&self, limits: &IntakeLimits) -> Result<NewPatient, Vec<FieldError>> {
        let mut errors = Vec::new();

        let patient_id = required_text(
            &mut errors,
            "patient_id",
            "PATIENT ID",
            self.patient_id.as_deref(),
            limits.max_field_length,
        );
        let patient_name = required_text(
            &mut errors,
            "patient_name",
            "PATIENT NAME",
            self.patient_name.as_deref(),
            limits.max_field_length,
        );

        let password = match self.password.as_deref() {
            None => {
                errors.push(FieldError::new("password", "PASSWORD is required"));
                None
            }
            Some(p) if p.trim().is_empty() => {
                errors.push(FieldError::new("password", "PASSWORD is required"));
                None
            }
            Some(p) if p.chars().count() > limits.max_field_length => {
                errors.push(FieldError::new(
                    "password",
                    format!(
                        "PASSWORD must be at most {} characters",
                        limits.max_field_length
                    ),
                ));
                None
            }
            Some(p) => Some(p.to_string()),
        };

        if let Some(ref p) = password {
            if self.password_confirmation.as_deref() != Some(p.as_str()) {
                errors.push(FieldError::new("password_confirmation", PASSWORD_MISMATCH));
            }
        }

        let age = match present(self.age.as_deref()) {
            None => {
                errors.push(FieldError::new("age", "AGE is required"));
                None
            }
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(age) if age <= limits.max_age => Some(age),
                Ok(_) => {
                    errors.push(FieldError::new(
                        "age",
                        format!("AGE must be between 0 and {}", limits.max_age),
                    ));
                    None
                }
                Err(_) => {
                    errors.push(FieldError::new("age", "AGE must be a whole number"));
                    None
                }
            },
        };

        let blood_group = match present(self.blood_group.as_deref()) {
            None => {
                errors.push(FieldError::new("blood_group", "BLOOD GROUP is required"));
                None
            }
            Some(raw) => raw.parse::<BloodGroup>().map_or_else(
                |_| {
                    errors.push(FieldError::new(
                        "blood_group",
                        "BLOOD GROUP is not a recognised option",
                    ));
                    None
                },
                Some,
            ),
        };

        let gender = match present(self.gender.as_deref()) {
            None => {
                errors.push(FieldError::new("gender", "GENDER is required"));
                None
            }
            Some(raw) => raw.parse::<Gender>().map_or_else(
                |_| {
                    errors.push(FieldError::new("gender", "GENDER is not a recognised option"));
                    None
                },
                Some,
            ),
        };

        let address = match present(self.address.as_deref()) {
            None => {
                errors.push(FieldError::new("address", "ADDRESS is required"));
                None
            }
            Some(a) if a.chars().count() > limits.max_address_length => {
                errors.push(FieldError::new(
                    "address",
                    format!(
                        "ADDRESS must be at most {} characters",
                        limits.max_address_length
                    ),
                ));
                None
            }
            Some(a) => Some(a.to_string()),
        };

        match (
            patient_id,
            patient_name,
            password,
            age,
            blood_group,
            gender,
            address,
        ) {
            (
                Some(patient_id),
                Some(patient_name),
                Some(password),
                Some(age),
                Some(blood_group),
                Some(gender),
                Some(address),
            ) if errors.is_empty() => Ok(NewPatient {
                patient_id,
                patient_name,
                age,
                blood_group,
                gender,
                address,
                password,
            }),
            _ => Err(errors),
        }
    }
}

fn required_text(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    label: &str,
    value: Option<&str>,
    max_len: usize,
) -> Option<String> {
    match present(value) {
        None => {
            errors.push(FieldError::new(field, format!("{label} is required")));
            None
        }
        Some(v) => {
            let v = v.trim();
            if v.chars().count() > max_len {
                errors.push(FieldError::new(
                    field,
                    format!("{label} must be at most {max_len} characters"),
                ));
                None
            } else {
                Some(v.to_string())
            }
        }
    }
}

/// A validated submission, ready to be hashed and stored.
#[derive(Clone, PartialEq, Eq)]
pub struct NewPatient {
    /// Patient identifier.
    pub patient_id: String,
    /// Patient name.
    pub patient_name: String,
    /// Age in whole years.
    pub age: u16,
    /// Blood group.
    pub blood_group: BloodGroup,
    /// Gender.
    pub gender: Gender,
    /// Postal address, verbatim.
    pub address: String,
    /// Plaintext password; only held until it is hashed.
    pub password: String,
}

impl fmt::Debug for NewPatient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewPatient")
            .field("patient_id", &self.patient_id)
            .field("patient_name", &self.patient_name)
            .field("age", &self.age)
            .field("blood_group", &self.blood_group)
            .field("gender", &self.gender)
            .field("address", &self.address)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A stored patient record.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PatientRecord {
    /// Row identifier assigned by storage.
    pub id: i64,
    /// Patient identifier.
    pub patient_id: String,
    /// Patient name.
    pub patient_name: String,
    /// Age in whole years.
    pub age: u16,
    /// Blood group.
    pub blood_group: BloodGroup,
    /// Gender.
    pub gender: Gender,
    /// Postal address.
    pub address: String,
    /// Argon2id PHC string; never serialized.
    #[serde(skip)]
    pub password_hash: String,
    /// When the record was stored.
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for PatientRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatientRecord")
            .field("id", &self.id)
            .field("patient_id", &self.patient_id)
            .field("patient_name", &self.patient_name)
            .field("age", &self.age)
            .field("blood_group", &self.blood_group)
            .field("gender", &self.gender)
            .field("address", &self.address)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_submission() -> PatientSubmission {
        PatientSubmission {
            patient_id: Some("P-1001".to_string()),
            patient_name: Some("Meera Sekar".to_string()),
            password: Some("Tr1ck-Pony".to_string()),
            password_confirmation: Some("Tr1ck-Pony".to_string()),
            age: Some("42".to_string()),
            blood_group: Some("AB Negative".to_string()),
            gender: Some("female".to_string()),
            address: Some("12 Gandhi Road\nChennai".to_string()),
        }
    }

    #[test]
    fn test_complete_submission_validates() {
        let patient = complete_submission()
            .validate(&IntakeLimits::default())
            .unwrap();

        assert_eq!(patient.patient_id, "P-1001");
        assert_eq!(patient.patient_name, "Meera Sekar");
        assert_eq!(patient.age, 42);
        assert_eq!(patient.blood_group, BloodGroup::AbNegative);
        assert_eq!(patient.gender, Gender::Female);
        assert_eq!(patient.address, "12 Gandhi Road\nChennai");
        assert_eq!(patient.password, "Tr1ck-Pony");
    }

    #[test]
    fn test_password_mismatch_is_rejected() {
        let mut submission = complete_submission();
        submission.password_confirmation = Some("something-else".to_string());

        let errors = submission.validate(&IntakeLimits::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "password_confirmation");
        assert_eq!(errors[0].message, PASSWORD_MISMATCH);
    }

    #[test]
    fn test_missing_confirmation_is_a_mismatch() {
        let mut submission = complete_submission();
        submission.password_confirmation = None;

        let errors = submission.validate(&IntakeLimits::default()).unwrap_err();
        assert!(errors.iter().any(|e| e.message == PASSWORD_MISMATCH));
    }

    #[test]
    fn test_empty_submission_reports_every_field() {
        let errors = PatientSubmission::default()
            .validate(&IntakeLimits::default())
            .unwrap_err();

        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "patient_id",
                "patient_name",
                "password",
                "age",
                "blood_group",
                "gender",
                "address"
            ]
        );
    }

    #[test]
    fn test_blank_fields_count_as_missing() {
        let mut submission = complete_submission();
        submission.patient_name = Some("   ".to_string());

        let errors = submission.validate(&IntakeLimits::default()).unwrap_err();
        assert_eq!(errors[0].message, "PATIENT NAME is required");
    }

    #[test]
    fn test_blank_password_is_required() {
        let mut submission = complete_submission();
        submission.password = Some("   ".to_string());
        submission.password_confirmation = Some("   ".to_string());

        let errors = submission.validate(&IntakeLimits::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "password");
        assert_eq!(errors[0].message, "PASSWORD is required");
    }

    #[test]
    fn test_password_whitespace_kept_verbatim() {
        let mut submission = complete_submission();
        submission.password = Some(" Tr1ck-Pony ".to_string());
        submission.password_confirmation = Some(" Tr1ck-Pony ".to_string());

        let patient = submission.validate(&IntakeLimits::default()).unwrap();
        assert_eq!(patient.password, " Tr1ck-Pony ");
    }

    #[test]
    fn test_age_must_be_numeric() {
        let mut submission = complete_submission();
        submission.age = Some("forty".to_string());

        let errors = submission.validate(&IntakeLimits::default()).unwrap_err();
        assert_eq!(errors[0].message, "AGE must be a whole number");
    }

    #[test]
    fn test_age_out_of_range() {
        let mut submission = complete_submission();
        submission.age = Some("151".to_string());

        let errors = submission.validate(&IntakeLimits::default()).unwrap_err();
        assert_eq!(errors[0].message, "AGE must be between 0 and 150");

        submission.age = Some("-1".to_string());
        let errors = submission.validate(&IntakeLimits::default()).unwrap_err();
        assert_eq!(errors[0].field, "age");
    }

    #[test]
    fn test_age_zero_is_accepted() {
        let mut submission = complete_submission();
        submission.age = Some(" 0 ".to_string());

        let patient = submission.validate(&IntakeLimits::default()).unwrap();
        assert_eq!(patient.age, 0);
    }

    #[test]
    fn test_unknown_options_rejected() {
        let mut submission = complete_submission();
        submission.blood_group = Some("Z Positive".to_string());
        submission.gender = Some("robot".to_string());

        let errors = submission.validate(&IntakeLimits::default()).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["blood_group", "gender"]);
    }

    #[test]
    fn test_field_length_limit() {
        let limits = IntakeLimits {
            max_field_length: 5,
            ..IntakeLimits::default()
        };
        let mut submission = complete_submission();
        submission.password = Some("abc".to_string());
        submission.password_confirmation = Some("abc".to_string());
        submission.patient_id = Some("P-1".to_string());

        let errors = submission.validate(&limits).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "patient_name");
    }

    #[test]
    fn test_address_kept_verbatim() {
        let mut submission = complete_submission();
        submission.address = Some("  Flat 3, 'Rose' Villa; --\n".to_string());

        let patient = submission.validate(&IntakeLimits::default()).unwrap();
        assert_eq!(patient.address, "  Flat 3, 'Rose' Villa; --\n");
    }

    #[test]
    fn test_blood_group_labels_round_trip() {
        for group in BloodGroup::ALL {
            assert_eq!(group.label().parse::<BloodGroup>().unwrap(), group);
        }
        assert_eq!(
            "ab positive".parse::<BloodGroup>().unwrap(),
            BloodGroup::AbPositive
        );
    }

    #[test]
    fn test_blood_group_serializes_as_label() {
        let json = serde_json::to_string(&BloodGroup::ONegative).unwrap();
        assert_eq!(json, "\"O Negative\"");
    }

    #[test]
    fn test_gender_values() {
        assert_eq!("Other".parse::<Gender>().unwrap(), Gender::Other);
        assert_eq!(Gender::Male.to_string(), "male");
        assert_eq!(Gender::Male.label(), "Male");
    }

    #[test]
    fn test_submission_debug_hides_passwords() {
        let debug_str = format!("{:?}", complete_submission());
        assert!(!debug_str.contains("Tr1ck-Pony"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_new_patient_debug_hides_password() {
        let patient = complete_submission()
            .validate(&IntakeLimits::default())
            .unwrap();
        assert!(!format!("{patient:?}").contains("Tr1ck-Pony"));
    }

    #[test]
    fn test_record_serialization_skips_hash() {
        let record = PatientRecord {
            id: 1,
            patient_id: "P-1".to_string(),
            patient_name: "Name".to_string(),
            age: 30,
            blood_group: BloodGroup::Unknown,
            gender: Gender::Other,
            address: "Somewhere".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!format!("{record:?}").contains("argon2id"));
    }
}
