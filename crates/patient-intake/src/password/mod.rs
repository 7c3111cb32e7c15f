//! Password handling for patient registration.
//!
//! This module covers both halves of credential safety:
//!
//! - **Hashing**: passwords are stored only as salted Argon2id PHC strings.
//!
//! - **Policy rules**: an ordered registry of `RegExp` and `Programmatic`
//!   rules decides whether a password is acceptable, reporting a message id
//!   for every rule it fails.
//!
//! # Example
//!
//! ```
//! use patient_intake::password::{default_rules, PasswordPolicy};
//!
//! let policy = PasswordPolicy::new(default_rules());
//! let outcome = policy.validate("short", Some("P-1001")).unwrap();
//!
//! assert!(!outcome.is_valid());
//! assert_eq!(outcome.messages[0], "password.length.invalid");
//! ```

mod defaults;
mod engine;
mod hash;
mod rules;

pub use defaults::default_rules;
pub use engine::{PasswordPolicy, ValidationOutcome, ValidationResult};
pub use hash::PasswordHasher;
pub use rules::{BuiltinCheck, Rule, RuleState, RuleType, ValidationType, USER_NAME_PLACEHOLDER};
